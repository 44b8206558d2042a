// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use http::StatusCode;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCode {
    // Client-side errors (10000–10999)
    InvalidParameter = 10000,
    MissingConfiguration = 10010,
    UnsupportedFolder = 10020,

    // Resource errors (30000–30999)
    OperationNotFound = 30000,
    OperationAlreadyFinished = 30010,

    // Remote protocol errors (40000–40999)
    UpstreamUnavailable = 40000,

    // External process errors (50000–50999)
    SpawnFailure = 50000,
    ProcessFailure = 50010,

    // Internal system errors (70000–70999)
    InternalError = 70000,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidParameter
            | ErrorCode::MissingConfiguration
            | ErrorCode::UnsupportedFolder => StatusCode::BAD_REQUEST,
            ErrorCode::OperationNotFound => StatusCode::NOT_FOUND,
            ErrorCode::OperationAlreadyFinished => StatusCode::CONFLICT,
            ErrorCode::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::SpawnFailure | ErrorCode::ProcessFailure | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_codes_map_to_conflict_semantics() {
        assert_eq!(
            ErrorCode::OperationNotFound.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::OperationAlreadyFinished.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::SpawnFailure as u32, 50000);
    }
}
