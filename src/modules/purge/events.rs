// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::modules::{
    audit::AuditLogEntry,
    purge::payload::{PurgeMethod, SubjectMode},
    purge::registry::CancelReason,
    purge::PurgeStatus,
};

/// Events emitted over one purge operation's stream: exactly one `start`
/// first, any number of `stdout`/`stderr` chunks in arrival order, then
/// exactly one `end` (or `error`) last.
#[derive(Debug, Clone)]
pub enum PurgeEvent {
    Start(StartEvent),
    Stdout(ChunkEvent),
    Stderr(ChunkEvent),
    End(EndEvent),
    Error(ErrorEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    pub operation_id: String,
    pub log_file_path: String,
    pub started_at: i64,
    pub simulate: bool,
    pub allow_hard_delete: bool,
    pub method: PurgeMethod,
    pub days_back: u32,
    pub subject_mode: SubjectMode,
    pub subject_value: String,
    pub received_from: Option<NaiveDate>,
    pub received_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEvent {
    pub chunk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndEvent {
    pub operation_id: String,
    pub exit_code: Option<i32>,
    pub status: PurgeStatus,
    pub cancelled: bool,
    pub cancel_reason: Option<CancelReason>,
    pub log_file_path: String,
    pub simulate: bool,
    pub log_entry: AuditLogEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
    pub details: Option<String>,
}

impl PurgeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PurgeEvent::Start(_) => "start",
            PurgeEvent::Stdout(_) => "stdout",
            PurgeEvent::Stderr(_) => "stderr",
            PurgeEvent::End(_) => "end",
            PurgeEvent::Error(_) => "error",
        }
    }

    /// A terminal event closes the stream; nothing follows it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PurgeEvent::End(_) | PurgeEvent::Error(_))
    }

    /// Renders the event as one `event:`/`data:` frame, the newline-delimited
    /// form the streaming surface forwards verbatim.
    pub fn to_sse_frame(&self) -> String {
        let data = match self {
            PurgeEvent::Start(event) => serde_json::to_string(event),
            PurgeEvent::Stdout(event) | PurgeEvent::Stderr(event) => serde_json::to_string(event),
            PurgeEvent::End(event) => serde_json::to_string(event),
            PurgeEvent::Error(event) => serde_json::to_string(event),
        }
        .unwrap_or_default();
        format!("event: {}\ndata: {}\n\n", self.kind(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_frame_layout() {
        let event = PurgeEvent::Stdout(ChunkEvent {
            chunk: "Deleted 3 items from user1@x.com".to_string(),
        });
        assert_eq!(
            event.to_sse_frame(),
            "event: stdout\ndata: {\"chunk\":\"Deleted 3 items from user1@x.com\"}\n\n"
        );
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_error_frame_is_terminal() {
        let event = PurgeEvent::Error(ErrorEvent {
            message: "Failed to await purge process".to_string(),
            details: None,
        });
        assert!(event.is_terminal());
        assert!(event.to_sse_frame().starts_with("event: error\ndata: "));
        assert!(event.to_sse_frame().ends_with("\n\n"));
    }
}
