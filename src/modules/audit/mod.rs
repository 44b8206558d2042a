// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::warn;

use crate::{
    id,
    modules::error::{code::ErrorCode, MailSweepResult},
    modules::ews::DeleteMode,
    modules::purge::payload::{PurgeMethod, SubjectMode},
    modules::purge::registry::CancelReason,
    modules::purge::PurgeStatus,
    raise_error, utc_now,
};

/// One immutable record of a finished purge operation. Written exactly once,
/// after the external process reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Assigned by the store on append when zero
    #[serde(default)]
    pub id: u64,
    /// Milliseconds since epoch; assigned by the store on append when zero
    #[serde(default)]
    pub timestamp: i64,
    pub operation_id: String,
    pub sender_email: String,
    pub subject_mode: SubjectMode,
    pub subject_value: String,
    pub received_from: Option<NaiveDate>,
    pub received_to: Option<NaiveDate>,
    pub simulate: bool,
    pub allow_hard_delete: bool,
    /// Disposition the operator requested for matched items
    pub mode: DeleteMode,
    pub method: PurgeMethod,
    /// Lookback window in days; zero when an explicit date range was used
    pub days_back: u32,
    pub exit_code: Option<i32>,
    /// Signal that terminated the process, when it did not exit normally
    pub exit_signal: Option<i32>,
    pub status: PurgeStatus,
    pub cancelled: bool,
    pub cancel_reason: Option<CancelReason>,
    pub completed_at: i64,
    pub duration_ms: i64,
    pub log_file_path: String,
    /// Mailbox addresses mined from the tool's standard output
    pub affected_mailboxes: Vec<String>,
    /// The request exactly as submitted, for later reconstruction
    pub request_payload: serde_json::Value,
}

/// Append-only newline-delimited JSON store for purge audit records.
pub struct AuditLogStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLogStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Appends one record, assigning `id` and `timestamp` when unset, and
    /// returns the record as stored.
    pub async fn append(&self, mut entry: AuditLogEntry) -> MailSweepResult<AuditLogEntry> {
        if entry.id == 0 {
            entry.id = id!(64);
        }
        if entry.timestamp == 0 {
            entry.timestamp = utc_now!();
        }
        let line = serde_json::to_string(&entry).map_err(|error| {
            raise_error!(
                format!("Failed to encode audit record: {}", error),
                ErrorCode::InternalError
            )
        })?;

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|error| {
                raise_error!(
                    format!("Failed to open audit log {:?}: {}", self.path, error),
                    ErrorCode::InternalError
                )
            })?;
        file.write_all(line.as_bytes()).await.map_err(|error| {
            raise_error!(
                format!("Failed to append audit record: {}", error),
                ErrorCode::InternalError
            )
        })?;
        file.write_all(b"\n").await.map_err(|error| {
            raise_error!(
                format!("Failed to append audit record: {}", error),
                ErrorCode::InternalError
            )
        })?;
        file.flush().await.map_err(|error| {
            raise_error!(
                format!("Failed to flush audit log: {}", error),
                ErrorCode::InternalError
            )
        })?;
        Ok(entry)
    }

    /// Returns up to `limit` records, newest first. A missing file reads as
    /// empty; unparseable lines are skipped with a warning.
    pub async fn read_recent(&self, limit: usize) -> MailSweepResult<Vec<AuditLogEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(raise_error!(
                    format!("Failed to read audit log {:?}: {}", self.path, error),
                    ErrorCode::InternalError
                ))
            }
        };

        let mut entries: Vec<AuditLogEntry> = Vec::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(error) => warn!("Skipping unparseable audit record: {}", error),
            }
        }
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }
}
