// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod audit;
pub mod common;
pub mod context;
pub mod directory;
pub mod error;
pub mod ews;
pub mod logger;
pub mod purge;
pub mod settings;
pub mod sweep;
pub mod utils;
