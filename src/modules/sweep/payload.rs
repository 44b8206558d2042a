// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    modules::ews::{folder::MailFolder, DeleteMode},
    raise_error, validate_email,
};

/// Criteria for one cross-mailbox sweep.
///
/// Example JSON payload:
/// ```json
/// {
///    "sender": "evil@example.com",
///    "subject": "Invoice overdue",
///    "receivedFrom": "2025-01-01",
///    "receivedTo": "2025-02-01",
///    "folders": ["inbox", "junk"],
///    "maxPerMailbox": 50
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    /// Sender address to match
    pub sender: Option<String>,
    /// Text to match in the subject
    pub subject: Option<String>,
    /// Text to match in the message body
    pub body: Option<String>,
    /// Free-text terms, all of which must match
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Earliest receipt date, inclusive
    pub received_from: Option<NaiveDate>,
    /// Latest receipt date, inclusive
    pub received_to: Option<NaiveDate>,
    pub has_attachments: Option<bool>,
    pub importance: Option<Importance>,
    /// Logical folder names to scan, in order. Defaults to the inbox.
    #[serde(default)]
    pub folders: Vec<String>,
    /// Upper bound on matches collected per mailbox
    pub max_per_mailbox: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Normal,
    High,
}

impl Importance {
    fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Normal => "normal",
            Importance::High => "high",
        }
    }
}

/// A sweep that also removes what it finds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeleteRequest {
    #[serde(flatten)]
    pub filter: SearchFilter,
    #[serde(default)]
    pub mode: DeleteMode,
    /// Scan and report only; no delete call is issued.
    #[serde(default)]
    pub simulate: bool,
}

impl SearchFilter {
    pub fn validate(&self, for_delete: bool) -> MailSweepResult<()> {
        if let Some(sender) = &self.sender {
            validate_email!(sender)?;
        }
        if for_delete && self.sender.is_none() && self.subject.is_none() {
            return Err(raise_error!(
                "Delete requests must specify a sender or a subject".into(),
                ErrorCode::InvalidParameter
            ));
        }
        if let (Some(from), Some(to)) = (self.received_from, self.received_to) {
            if from > to {
                return Err(raise_error!(
                    format!("received_from ({}) is after received_to ({})", from, to),
                    ErrorCode::InvalidParameter
                ));
            }
        }
        self.resolved_folders()?;
        Ok(())
    }

    /// Maps the caller-supplied folder names onto the fixed folder set, in
    /// the order given. An empty list means the inbox.
    pub fn resolved_folders(&self) -> MailSweepResult<Vec<MailFolder>> {
        if self.folders.is_empty() {
            return Ok(vec![MailFolder::Inbox]);
        }
        self.folders.iter().map(|name| MailFolder::parse(name)).collect()
    }

    /// Compiles the filter into a single AQS query string.
    ///
    /// Clause order is fixed so identical filters always compile to the same
    /// text. Quote characters inside values are doubled, which is how the
    /// remote search syntax escapes them inside quoted phrases. A filter
    /// with no applicable clause compiles to the match-all mail clause.
    pub fn to_aqs_query(&self) -> String {
        let mut clauses = Vec::new();

        if let Some(sender) = non_empty(&self.sender) {
            clauses.push(format!("from:\"{}\"", quote_value(sender)));
        }
        if let Some(subject) = non_empty(&self.subject) {
            clauses.push(format!("subject:\"{}\"", quote_value(subject)));
        }
        if let Some(body) = non_empty(&self.body) {
            clauses.push(format!("body:\"{}\"", quote_value(body)));
        }
        for keyword in self.keywords.iter().filter(|k| !k.trim().is_empty()) {
            clauses.push(format!("\"{}\"", quote_value(keyword)));
        }
        if let Some(from) = self.received_from {
            clauses.push(format!("received>={}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = self.received_to {
            clauses.push(format!("received<={}", to.format("%Y-%m-%d")));
        }
        if let Some(has_attachments) = self.has_attachments {
            clauses.push(format!("hasattachments:{}", has_attachments));
        }
        if let Some(importance) = self.importance {
            clauses.push(format!("importance:{}", importance.as_str()));
        }

        if clauses.is_empty() {
            "kind:email".to_string()
        } else {
            clauses.join(" AND ")
        }
    }
}

impl DeleteRequest {
    pub fn validate(&self) -> MailSweepResult<()> {
        self.filter.validate(true)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn quote_value(value: &str) -> String {
    value.trim().replace('"', "\"\"")
}
