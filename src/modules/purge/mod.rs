// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    sync::Arc,
};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{ChildStderr, ChildStdout, Command},
    sync::mpsc,
};
use tracing::{error, info, warn};

use crate::{
    generate_token,
    modules::{
        audit::{AuditLogEntry, AuditLogStore},
        error::{code::ErrorCode, MailSweepResult},
        purge::{
            events::{ChunkEvent, EndEvent, ErrorEvent, PurgeEvent, StartEvent},
            payload::PurgeRequest,
            registry::{ActiveOperationRegistry, CancelReason, PurgeContext},
        },
    },
    raise_error, utc_now,
};

pub mod events;
pub mod mining;
pub mod payload;
pub mod registry;
#[cfg(test)]
mod tests;

/// Terminal classification of one purge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeStatus {
    /// Exit code zero on a dry run
    Simulated,
    /// Exit code zero on a live run
    Completed,
    /// Non-zero exit, spawn error, or wait error, without cancellation
    Failed,
    /// Cancellation was requested and the process has exited
    Cancelled,
}

impl PurgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurgeStatus::Simulated => "simulated",
            PurgeStatus::Completed => "completed",
            PurgeStatus::Failed => "failed",
            PurgeStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PurgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synchronous result for callers that run an operation without subscribing
/// to its event stream.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeOutcome {
    pub entry: AuditLogEntry,
    pub stdout: String,
    pub stderr: String,
}

/// Launches the privileged purge executable and shepherds it to a terminal
/// state: output multiplexing, cooperative cancellation, output mining, and
/// exactly one audit record per operation.
pub struct PurgeOrchestrator {
    script_path: PathBuf,
    log_dir: PathBuf,
    registry: Arc<ActiveOperationRegistry>,
    audit: Arc<AuditLogStore>,
}

struct LaunchedOperation {
    context: Arc<PurgeContext>,
    log_file: PathBuf,
    started_at: i64,
    stdout: ChildStdout,
    stderr: ChildStderr,
}

impl PurgeOrchestrator {
    pub fn new(
        script_path: PathBuf,
        log_dir: PathBuf,
        registry: Arc<ActiveOperationRegistry>,
        audit: Arc<AuditLogStore>,
    ) -> Self {
        Self {
            script_path,
            log_dir,
            registry,
            audit,
        }
    }

    /// Runs one operation to completion and returns the audit record plus
    /// the full buffered output.
    pub async fn run(&self, request: PurgeRequest) -> MailSweepResult<PurgeOutcome> {
        let launched = self.launch(&request).await?;
        Ok(drive(self.registry.clone(), self.audit.clone(), launched, request, None).await)
    }

    /// Launches one operation and returns its id plus an ordered event
    /// stream: one `start`, the output chunks as they arrive, then one
    /// terminal `end` or `error`. Dropping the receiver cancels the
    /// operation with reason `connection_closed`.
    pub async fn stream(
        &self,
        request: PurgeRequest,
    ) -> MailSweepResult<(String, mpsc::Receiver<PurgeEvent>)> {
        let launched = self.launch(&request).await?;
        let operation_id = launched.context.operation_id.clone();
        let (sender, receiver) = mpsc::channel(64);
        let registry = self.registry.clone();
        let audit = self.audit.clone();
        tokio::spawn(async move {
            drive(registry, audit, launched, request, Some(sender)).await;
        });
        Ok((operation_id, receiver))
    }

    async fn launch(&self, request: &PurgeRequest) -> MailSweepResult<LaunchedOperation> {
        request.validate()?;
        let operation_id = format!("purge-{}-{}", utc_now!(), generate_token!(32));
        let log_file = self.log_dir.join(format!("{}.log", operation_id));
        let started_at = utc_now!();
        let args = request.to_args(&log_file);

        info!(
            "Launching purge operation {}: {:?} {}",
            operation_id,
            self.script_path,
            args.join(" ")
        );
        let spawned = Command::new(&self.script_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(spawn_error) => {
                let entry = audit_entry(
                    request,
                    &operation_id,
                    &log_file,
                    started_at,
                    Termination {
                        exit_code: None,
                        exit_signal: None,
                        status: PurgeStatus::Failed,
                        cancel_reason: None,
                        affected_mailboxes: Vec::new(),
                    },
                );
                if let Err(audit_error) = self.audit.append(entry).await {
                    error!(
                        "Failed to persist audit record for {}: {:#?}",
                        operation_id, audit_error
                    );
                }
                return Err(raise_error!(
                    format!(
                        "Failed to launch purge executable {:?}: {}",
                        self.script_path, spawn_error
                    ),
                    ErrorCode::SpawnFailure
                ));
            }
        };

        let stdout = child.stdout.take().ok_or_else(|| {
            raise_error!(
                "Purge process stdout pipe was not captured".into(),
                ErrorCode::InternalError
            )
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            raise_error!(
                "Purge process stderr pipe was not captured".into(),
                ErrorCode::InternalError
            )
        })?;

        let context = Arc::new(PurgeContext::new(operation_id, child));
        self.registry.register(context.clone());
        Ok(LaunchedOperation {
            context,
            log_file,
            started_at,
            stdout,
            stderr,
        })
    }
}

/// Shepherds one registered operation to its terminal state. This is the
/// single place that classifies the outcome and persists the audit record;
/// the registry entry is released on every exit path.
async fn drive(
    registry: Arc<ActiveOperationRegistry>,
    audit: Arc<AuditLogStore>,
    launched: LaunchedOperation,
    request: PurgeRequest,
    mut subscriber: Option<mpsc::Sender<PurgeEvent>>,
) -> PurgeOutcome {
    let LaunchedOperation {
        context,
        log_file,
        started_at,
        stdout,
        stderr,
    } = launched;
    let _guard = RegistryGuard {
        registry,
        operation_id: context.operation_id.clone(),
    };

    if let Some(sender) = subscriber.as_ref() {
        let start = PurgeEvent::Start(StartEvent {
            operation_id: context.operation_id.clone(),
            log_file_path: log_file.display().to_string(),
            started_at,
            simulate: request.simulate,
            allow_hard_delete: request.allow_hard_delete,
            method: request.method,
            days_back: request.effective_days_back(),
            subject_mode: request.subject.mode,
            subject_value: request.subject.value.clone(),
            received_from: request.received_from,
            received_to: request.received_to,
        });
        if sender.send(start).await.is_err() {
            subscriber = None;
            context.signal_cancel(CancelReason::ConnectionClosed);
        }
    }

    // One reader task per pipe feeds a single bounded channel, so the
    // forwarder sees chunks in OS arrival order across both streams.
    let (chunk_tx, mut chunk_rx) = mpsc::channel::<OutputChunk>(1024);
    let stdout_pump = tokio::spawn(pump_lines(stdout, OutputKind::Stdout, chunk_tx.clone()));
    let stderr_pump = tokio::spawn(pump_lines(stderr, OutputKind::Stderr, chunk_tx));

    let mut stdout_text = String::new();
    let mut stderr_text = String::new();
    while let Some(chunk) = chunk_rx.recv().await {
        let buffer = match chunk.kind {
            OutputKind::Stdout => &mut stdout_text,
            OutputKind::Stderr => &mut stderr_text,
        };
        buffer.push_str(&chunk.text);
        buffer.push('\n');

        if let Some(sender) = subscriber.as_ref() {
            let event = match chunk.kind {
                OutputKind::Stdout => PurgeEvent::Stdout(ChunkEvent { chunk: chunk.text }),
                OutputKind::Stderr => PurgeEvent::Stderr(ChunkEvent { chunk: chunk.text }),
            };
            if sender.send(event).await.is_err() {
                info!(
                    "Event subscriber for {} went away, cancelling the operation",
                    context.operation_id
                );
                subscriber = None;
                context.signal_cancel(CancelReason::ConnectionClosed);
            }
        }
    }
    let _ = join_all([stdout_pump, stderr_pump]).await;

    // Cancel requests that arrive while we own the process handle are
    // delivered through the notify; Child::wait is cancel safe.
    let wait_result = {
        let mut child = context.child.lock().await;
        loop {
            tokio::select! {
                status = child.wait() => break status,
                _ = context.cancel_notify.notified() => {
                    let _ = child.start_kill();
                }
            }
        }
    };
    context.mark_finished();

    let cancel_reason = context.cancel_reason();
    let (exit_code, exit_signal, wait_error) = match &wait_result {
        Ok(status) => (status.code(), exit_signal(status), None),
        Err(error) => (None, None, Some(error.to_string())),
    };
    let succeeded = wait_result
        .as_ref()
        .map(|status| status.success())
        .unwrap_or(false);
    let status = if cancel_reason.is_some() {
        PurgeStatus::Cancelled
    } else if succeeded {
        if request.simulate {
            PurgeStatus::Simulated
        } else {
            PurgeStatus::Completed
        }
    } else {
        PurgeStatus::Failed
    };

    let affected = mining::mine_affected_mailboxes(&stdout_text);
    let entry = audit_entry(
        &request,
        &context.operation_id,
        &log_file,
        started_at,
        Termination {
            exit_code,
            exit_signal,
            status,
            cancel_reason,
            affected_mailboxes: affected,
        },
    );
    let entry = match audit.append(entry.clone()).await {
        Ok(stored) => stored,
        Err(audit_error) => {
            error!(
                "Failed to persist audit record for {}: {:#?}",
                context.operation_id, audit_error
            );
            entry
        }
    };

    if let Some(sender) = subscriber.as_ref() {
        let event = match wait_error {
            Some(details) => PurgeEvent::Error(ErrorEvent {
                message: format!("Failed to await purge process {}", context.operation_id),
                details: Some(details),
            }),
            None => PurgeEvent::End(EndEvent {
                operation_id: context.operation_id.clone(),
                exit_code,
                status,
                cancelled: cancel_reason.is_some(),
                cancel_reason,
                log_file_path: log_file.display().to_string(),
                simulate: request.simulate,
                log_entry: entry.clone(),
            }),
        };
        let _ = sender.send(event).await;
    }

    info!(
        "Purge operation {} finished with status {}",
        context.operation_id, status
    );
    PurgeOutcome {
        entry,
        stdout: stdout_text,
        stderr: stderr_text,
    }
}

struct RegistryGuard {
    registry: Arc<ActiveOperationRegistry>,
    operation_id: String,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.operation_id);
    }
}

#[derive(Clone, Copy)]
enum OutputKind {
    Stdout,
    Stderr,
}

struct OutputChunk {
    kind: OutputKind,
    text: String,
}

async fn pump_lines<R>(pipe: R, kind: OutputKind, sender: mpsc::Sender<OutputChunk>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(text)) => {
                if sender.send(OutputChunk { kind, text }).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(read_error) => {
                warn!("Failed to read purge output pipe: {}", read_error);
                break;
            }
        }
    }
}

struct Termination {
    exit_code: Option<i32>,
    exit_signal: Option<i32>,
    status: PurgeStatus,
    cancel_reason: Option<CancelReason>,
    affected_mailboxes: Vec<String>,
}

fn audit_entry(
    request: &PurgeRequest,
    operation_id: &str,
    log_file: &Path,
    started_at: i64,
    termination: Termination,
) -> AuditLogEntry {
    let completed_at = utc_now!();
    AuditLogEntry {
        id: 0,
        timestamp: 0,
        operation_id: operation_id.to_string(),
        sender_email: request.sender_email.clone(),
        subject_mode: request.subject.mode,
        subject_value: request.subject.value.clone(),
        received_from: request.received_from,
        received_to: request.received_to,
        simulate: request.simulate,
        allow_hard_delete: request.allow_hard_delete,
        mode: request.disposition(),
        method: request.method,
        days_back: request.effective_days_back(),
        exit_code: termination.exit_code,
        exit_signal: termination.exit_signal,
        status: termination.status,
        cancelled: termination.cancel_reason.is_some(),
        cancel_reason: termination.cancel_reason,
        completed_at,
        duration_ms: completed_at - started_at,
        log_file_path: log_file.display().to_string(),
        affected_mailboxes: termination.affected_mailboxes,
        request_payload: serde_json::to_value(request).unwrap_or(serde_json::Value::Null),
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
