// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::{process::Child, sync::Notify};

use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    raise_error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    UserRequested,
    ConnectionClosed,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::UserRequested => "user_requested",
            CancelReason::ConnectionClosed => "connection_closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelStatus {
    /// The termination signal was issued immediately
    Cancelling,
    /// The process handle was busy; the wait loop will deliver the kill
    Pending,
    NotFound,
    AlreadyFinished,
}

/// Live state of one spawned purge process.
///
/// Cancellation is two-phase: callers only record a reason and request
/// termination here; the operation reaches its terminal state when the
/// process actually exits, observed by the orchestrator's wait loop.
pub struct PurgeContext {
    pub operation_id: String,
    pub(crate) child: tokio::sync::Mutex<Child>,
    cancel: Mutex<Option<CancelReason>>,
    finished: AtomicBool,
    pub(crate) cancel_notify: Notify,
}

impl PurgeContext {
    pub(crate) fn new(operation_id: String, child: Child) -> Self {
        Self {
            operation_id,
            child: tokio::sync::Mutex::new(child),
            cancel: Mutex::new(None),
            finished: AtomicBool::new(false),
            cancel_notify: Notify::new(),
        }
    }

    /// Records the cancel reason (first writer wins) and asks the process to
    /// terminate. When the wait loop currently owns the process handle, the
    /// kill is deferred to it via the notify.
    pub(crate) fn signal_cancel(&self, reason: CancelReason) -> CancelStatus {
        {
            let mut slot = self.cancel.lock().unwrap();
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        let accepted = match self.child.try_lock() {
            Ok(mut child) => child.start_kill().is_ok(),
            Err(_) => false,
        };
        self.cancel_notify.notify_one();
        if accepted {
            CancelStatus::Cancelling
        } else {
            CancelStatus::Pending
        }
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        *self.cancel.lock().unwrap()
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Process-wide map of in-flight purge operations, keyed by operation id.
/// Owned by the orchestrator; entries live strictly from spawn to the
/// terminal transition.
pub struct ActiveOperationRegistry {
    operations: DashMap<String, Arc<PurgeContext>>,
}

impl ActiveOperationRegistry {
    pub fn new() -> Self {
        Self {
            operations: DashMap::new(),
        }
    }

    pub(crate) fn register(&self, context: Arc<PurgeContext>) {
        self.operations
            .insert(context.operation_id.clone(), context);
    }

    pub(crate) fn remove(&self, operation_id: &str) {
        self.operations.remove(operation_id);
    }

    pub fn active_count(&self) -> usize {
        self.operations.len()
    }

    /// Requests cancellation of a live operation. An id whose process has
    /// already exited reports `AlreadyFinished` and the stale entry is
    /// purged.
    pub fn cancel(&self, operation_id: &str, reason: CancelReason) -> CancelStatus {
        let context = match self.operations.get(operation_id) {
            Some(entry) => entry.value().clone(),
            None => return CancelStatus::NotFound,
        };
        if context.is_finished() {
            self.operations.remove(operation_id);
            return CancelStatus::AlreadyFinished;
        }
        context.signal_cancel(reason)
    }

    /// Variant of [`Self::cancel`] for surfaces that report a missing or
    /// finished operation as an error response.
    pub fn try_cancel(
        &self,
        operation_id: &str,
        reason: CancelReason,
    ) -> MailSweepResult<CancelStatus> {
        match self.cancel(operation_id, reason) {
            CancelStatus::NotFound => Err(raise_error!(
                format!("No active purge operation with id '{}'", operation_id),
                ErrorCode::OperationNotFound
            )),
            CancelStatus::AlreadyFinished => Err(raise_error!(
                format!("Purge operation '{}' has already finished", operation_id),
                ErrorCode::OperationAlreadyFinished
            )),
            status => Ok(status),
        }
    }
}
