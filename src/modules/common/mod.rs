// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod parallel;
pub mod signal;
