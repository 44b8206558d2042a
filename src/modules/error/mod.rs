// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use code::ErrorCode;
use http::StatusCode;
use snafu::{Location, Snafu};

pub mod code;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MailSweepError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

pub type MailSweepResult<T, E = MailSweepError> = std::result::Result<T, E>;

impl MailSweepError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MailSweepError::Generic { code, .. } => *code,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code().status()
    }
}
