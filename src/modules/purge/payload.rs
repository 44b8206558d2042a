// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::Path;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    modules::ews::DeleteMode,
    raise_error, validate_email,
};

/// Lookback window handed to the purge tool when the caller gives neither
/// `days_back` nor an explicit date range.
pub const DEFAULT_DAYS_BACK: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PurgeMethod {
    /// Organization-wide search-then-purge through the compliance search facility
    ComplianceSearch,
    /// Trace-based targeting of recently delivered messages
    MessageTrace,
}

impl PurgeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurgeMethod::ComplianceSearch => "compliance-search",
            PurgeMethod::MessageTrace => "message-trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectMode {
    Equals,
    Contains,
}

/// How the purge tool should match message subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMatch {
    pub mode: SubjectMode,
    pub value: String,
}

/// One request to run the privileged purge executable.
///
/// Example JSON payload:
/// ```json
/// {
///    "senderEmail": "evil@example.com",
///    "subject": { "mode": "contains", "value": "Invoice" },
///    "method": "compliance-search",
///    "daysBack": 14,
///    "simulate": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeRequest {
    /// Sender address whose messages the tool should target
    pub sender_email: String,
    pub subject: SubjectMatch,
    pub method: PurgeMethod,
    /// Lookback window in days; ignored when an explicit date range is given
    pub days_back: Option<u32>,
    /// Start of the receipt date range, inclusive
    pub received_from: Option<NaiveDate>,
    /// End of the receipt date range, exclusive
    pub received_to: Option<NaiveDate>,
    /// Run the tool with --dry-run; nothing is deleted
    #[serde(default)]
    pub simulate: bool,
    /// Permit the tool to fall back to a permanent hard delete
    #[serde(default)]
    pub allow_hard_delete: bool,
}

impl PurgeRequest {
    pub fn validate(&self) -> MailSweepResult<()> {
        validate_email!(&self.sender_email)?;
        if self.subject.value.trim().is_empty() {
            return Err(raise_error!(
                "Subject match value must not be empty".into(),
                ErrorCode::InvalidParameter
            ));
        }
        match (self.received_from, self.received_to) {
            (Some(from), Some(to)) if from >= to => Err(raise_error!(
                format!("received_from ({}) must be before received_to ({})", from, to),
                ErrorCode::InvalidParameter
            )),
            (Some(_), None) | (None, Some(_)) => Err(raise_error!(
                "received_from and received_to must be given together".into(),
                ErrorCode::InvalidParameter
            )),
            _ => Ok(()),
        }
    }

    /// Days the tool is asked to look back. Zero when an explicit date range
    /// takes its place.
    pub fn effective_days_back(&self) -> u32 {
        if self.date_range().is_some() {
            0
        } else {
            self.days_back.unwrap_or(DEFAULT_DAYS_BACK)
        }
    }

    /// Disposition recorded in the audit trail: soft delete unless the
    /// caller permitted the hard-delete fallback.
    pub fn disposition(&self) -> DeleteMode {
        if self.allow_hard_delete {
            DeleteMode::HardDelete
        } else {
            DeleteMode::SoftDelete
        }
    }

    fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.received_from, self.received_to) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => None,
        }
    }

    /// Builds the exact argument vector handed to the purge executable.
    /// No shell sits in between, so values are passed through verbatim.
    /// Dates are rendered day/month/year, the textual form the tool parses.
    pub fn to_args(&self, log_file: &Path) -> Vec<String> {
        let mut args = vec!["--sender".to_string(), self.sender_email.clone()];
        match self.subject.mode {
            SubjectMode::Equals => args.push("--subject-equals".to_string()),
            SubjectMode::Contains => args.push("--subject-contains".to_string()),
        }
        args.push(self.subject.value.clone());
        args.push("--method".to_string());
        args.push(self.method.as_str().to_string());
        if let Some((from, before)) = self.date_range() {
            args.push("--from".to_string());
            args.push(from.format("%d/%m/%Y").to_string());
            args.push("--before".to_string());
            args.push(before.format("%d/%m/%Y").to_string());
        } else {
            args.push("--days-back".to_string());
            args.push(self.effective_days_back().to_string());
        }
        args.push("--log-file".to_string());
        args.push(log_file.display().to_string());
        if self.simulate {
            args.push("--dry-run".to_string());
        }
        args.push("--auto-confirm".to_string());
        if self.allow_hard_delete {
            args.push("--allow-hard-delete".to_string());
        }
        args
    }
}
