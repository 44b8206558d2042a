// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    raise_error,
};

/// The fixed set of folders a sweep may target, mapped to the remote
/// protocol's well-known folder identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailFolder {
    Inbox,
    Junk,
    Deleted,
    Sent,
    Drafts,
    Archive,
}

impl MailFolder {
    /// Resolves a caller-supplied logical folder name. Unknown names are
    /// rejected here, before any remote call is issued.
    pub fn parse(name: &str) -> MailSweepResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "inbox" => Ok(MailFolder::Inbox),
            "junk" => Ok(MailFolder::Junk),
            "deleted" => Ok(MailFolder::Deleted),
            "sent" => Ok(MailFolder::Sent),
            "drafts" => Ok(MailFolder::Drafts),
            "archive" => Ok(MailFolder::Archive),
            other => Err(raise_error!(
                format!(
                    "Unsupported folder '{}' (expected one of: inbox, junk, deleted, sent, drafts, archive)",
                    other
                ),
                ErrorCode::UnsupportedFolder
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MailFolder::Inbox => "inbox",
            MailFolder::Junk => "junk",
            MailFolder::Deleted => "deleted",
            MailFolder::Sent => "sent",
            MailFolder::Drafts => "drafts",
            MailFolder::Archive => "archive",
        }
    }

    pub fn protocol_folder_id(&self) -> &'static str {
        match self {
            MailFolder::Inbox => "inbox",
            MailFolder::Junk => "junkemail",
            MailFolder::Deleted => "deleteditems",
            MailFolder::Sent => "sentitems",
            MailFolder::Drafts => "drafts",
            MailFolder::Archive => "archive",
        }
    }
}

impl fmt::Display for MailFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_known_names() {
        assert_eq!(MailFolder::parse("inbox").unwrap(), MailFolder::Inbox);
        assert_eq!(MailFolder::parse(" Junk ").unwrap(), MailFolder::Junk);
        assert_eq!(MailFolder::parse("ARCHIVE").unwrap(), MailFolder::Archive);
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        let err = MailFolder::parse("outbox").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedFolder);
    }

    #[test]
    fn test_protocol_folder_ids() {
        assert_eq!(MailFolder::Inbox.protocol_folder_id(), "inbox");
        assert_eq!(MailFolder::Junk.protocol_folder_id(), "junkemail");
        assert_eq!(MailFolder::Deleted.protocol_folder_id(), "deleteditems");
        assert_eq!(MailFolder::Sent.protocol_folder_id(), "sentitems");
        assert_eq!(MailFolder::Drafts.protocol_folder_id(), "drafts");
        assert_eq!(MailFolder::Archive.protocol_folder_id(), "archive");
    }
}
