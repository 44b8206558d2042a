// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::MailSweepResult;

pub trait Initialize {
    async fn initialize() -> MailSweepResult<()>;
}
