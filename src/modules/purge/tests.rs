// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

#[cfg(all(test, unix))]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::{tempdir, TempDir};

    use crate::modules::audit::{AuditLogEntry, AuditLogStore};
    use crate::modules::error::code::ErrorCode;
    use crate::modules::purge::events::PurgeEvent;
    use crate::modules::purge::payload::{
        PurgeMethod, PurgeRequest, SubjectMatch, SubjectMode,
    };
    use crate::modules::purge::registry::{
        ActiveOperationRegistry, CancelReason, CancelStatus, PurgeContext,
    };
    use crate::modules::purge::{PurgeOrchestrator, PurgeStatus};

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("purge.sh");
        std::fs::write(&path, body).unwrap();
        let mut permissions = std::fs::metadata(&path).unwrap().permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(&path, permissions).unwrap();
        path
    }

    fn fixture(
        script_body: &str,
    ) -> (
        PurgeOrchestrator,
        Arc<ActiveOperationRegistry>,
        Arc<AuditLogStore>,
        TempDir,
    ) {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), script_body);
        let registry = Arc::new(ActiveOperationRegistry::new());
        let audit = Arc::new(AuditLogStore::new(dir.path().join("audit.ndjson")));
        let orchestrator = PurgeOrchestrator::new(
            script,
            dir.path().to_path_buf(),
            registry.clone(),
            audit.clone(),
        );
        (orchestrator, registry, audit, dir)
    }

    fn request(simulate: bool) -> PurgeRequest {
        PurgeRequest {
            sender_email: "evil@x.com".to_string(),
            subject: SubjectMatch {
                mode: SubjectMode::Contains,
                value: "Overdue invoice".to_string(),
            },
            method: PurgeMethod::ComplianceSearch,
            days_back: Some(7),
            received_from: None,
            received_to: None,
            simulate,
            allow_hard_delete: false,
        }
    }

    async fn wait_for_audit(audit: &AuditLogStore) -> Vec<AuditLogEntry> {
        let started = std::time::Instant::now();
        loop {
            let entries = audit.read_recent(10).await.unwrap();
            if !entries.is_empty() {
                return entries;
            }
            assert!(
                started.elapsed() < Duration::from_secs(10),
                "no audit record appeared in time"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    async fn test_completed_run_mines_mailboxes_and_audits_once() {
        let (orchestrator, registry, audit, _dir) = fixture(
            "#!/bin/sh\n\
             echo \"[INFO] Mailbox user1@x.com: 3 active items\"\n\
             echo \"Deleted 3 items from user1@x.com\"\n\
             exit 0\n",
        );

        let outcome = orchestrator.run(request(false)).await.unwrap();

        assert_eq!(outcome.entry.status, PurgeStatus::Completed);
        assert_eq!(outcome.entry.exit_code, Some(0));
        assert!(!outcome.entry.cancelled);
        assert_ne!(outcome.entry.id, 0);
        assert_eq!(outcome.entry.affected_mailboxes, vec!["user1@x.com"]);
        assert!(outcome.stdout.contains("3 active items"));
        assert_eq!(audit.read_recent(10).await.unwrap().len(), 1);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_simulated_run_passes_dry_run_to_the_tool() {
        let (orchestrator, _registry, _audit, _dir) =
            fixture("#!/bin/sh\necho \"args: $@\"\nexit 0\n");

        let outcome = orchestrator.run(request(true)).await.unwrap();

        assert_eq!(outcome.entry.status, PurgeStatus::Simulated);
        assert!(outcome.entry.simulate);
        assert!(outcome.stdout.contains("--dry-run"));
        assert!(outcome.stdout.contains("--auto-confirm"));
        assert!(outcome.stdout.contains("--days-back 7"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_failed() {
        let (orchestrator, _registry, audit, _dir) =
            fixture("#!/bin/sh\necho \"something broke\" >&2\nexit 3\n");

        let outcome = orchestrator.run(request(false)).await.unwrap();

        assert_eq!(outcome.entry.status, PurgeStatus::Failed);
        assert_eq!(outcome.entry.exit_code, Some(3));
        assert!(outcome.entry.cancel_reason.is_none());
        assert!(outcome.stderr.contains("something broke"));
        let entries = audit.read_recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, PurgeStatus::Failed);
    }

    #[tokio::test]
    async fn test_stream_emits_start_first_and_end_last() {
        let (orchestrator, registry, _audit, _dir) =
            fixture("#!/bin/sh\necho one\necho two\nexit 0\n");

        let (operation_id, mut receiver) = orchestrator.stream(request(false)).await.unwrap();
        assert!(operation_id.starts_with("purge-"));

        let mut events = Vec::new();
        while let Some(event) = receiver.recv().await {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(PurgeEvent::Start(_))));
        let last = events.last().unwrap();
        assert!(last.is_terminal());
        match last {
            PurgeEvent::End(end) => {
                assert_eq!(end.operation_id, operation_id);
                assert_eq!(end.status, PurgeStatus::Completed);
                assert_eq!(end.log_entry.operation_id, operation_id);
            }
            other => panic!("expected an end event, got {:?}", other),
        }

        let chunks: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                PurgeEvent::Stdout(chunk) => Some(chunk.chunk.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(chunks, vec!["one", "two"]);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_explicit_cancel_terminates_and_classifies_cancelled() {
        let (orchestrator, registry, _audit, _dir) =
            fixture("#!/bin/sh\necho started\nexec sleep 30\n");

        let (operation_id, mut receiver) = orchestrator.stream(request(false)).await.unwrap();

        assert!(matches!(receiver.recv().await, Some(PurgeEvent::Start(_))));
        match receiver.recv().await {
            Some(PurgeEvent::Stdout(chunk)) => assert_eq!(chunk.chunk, "started"),
            other => panic!("expected the first stdout chunk, got {:?}", other),
        }
        assert_eq!(registry.active_count(), 1);

        let status = registry.cancel(&operation_id, CancelReason::UserRequested);
        assert_eq!(status, CancelStatus::Cancelling);

        let mut terminal = None;
        while let Some(event) = receiver.recv().await {
            if event.is_terminal() {
                terminal = Some(event);
            }
        }
        match terminal {
            Some(PurgeEvent::End(end)) => {
                assert_eq!(end.status, PurgeStatus::Cancelled);
                assert!(end.cancelled);
                assert_eq!(end.cancel_reason, Some(CancelReason::UserRequested));
                assert_eq!(end.exit_code, None);
                assert!(end.log_entry.exit_signal.is_some());
            }
            other => panic!("expected an end event, got {:?}", other),
        }
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_receiver_cancels_with_connection_closed() {
        let (orchestrator, _registry, audit, _dir) = fixture(
            "#!/bin/sh\n\
             echo started\n\
             while true; do\n\
               echo tick\n\
               sleep 0.1\n\
             done\n",
        );

        let (_operation_id, mut receiver) = orchestrator.stream(request(false)).await.unwrap();
        assert!(matches!(receiver.recv().await, Some(PurgeEvent::Start(_))));
        drop(receiver);

        let entries = wait_for_audit(&audit).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, PurgeStatus::Cancelled);
        assert!(entries[0].cancelled);
        assert_eq!(entries[0].cancel_reason, Some(CancelReason::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_cancel_unknown_operation_reports_not_found() {
        let registry = ActiveOperationRegistry::new();
        assert_eq!(
            registry.cancel("purge-unknown", CancelReason::UserRequested),
            CancelStatus::NotFound
        );
        let err = registry
            .try_cancel("purge-unknown", CancelReason::UserRequested)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationNotFound);
    }

    #[tokio::test]
    async fn test_cancel_after_exit_reports_already_finished_and_purges() {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), "#!/bin/sh\nexit 0\n");
        let child = tokio::process::Command::new(&script)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .unwrap();

        let registry = ActiveOperationRegistry::new();
        let context = Arc::new(PurgeContext::new("purge-finished".to_string(), child));
        context.mark_finished();
        registry.register(context);

        assert_eq!(
            registry.cancel("purge-finished", CancelReason::UserRequested),
            CancelStatus::AlreadyFinished
        );
        // The stale entry is purged on that lookup.
        assert_eq!(
            registry.cancel("purge-finished", CancelReason::UserRequested),
            CancelStatus::NotFound
        );
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_try_cancel_maps_finished_to_conflict_error() {
        let dir = tempdir().unwrap();
        let script = write_script(dir.path(), "#!/bin/sh\nexit 0\n");
        let child = tokio::process::Command::new(&script)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .unwrap();

        let registry = ActiveOperationRegistry::new();
        let context = Arc::new(PurgeContext::new("purge-done".to_string(), child));
        context.mark_finished();
        registry.register(context);

        let err = registry
            .try_cancel("purge-done", CancelReason::UserRequested)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OperationAlreadyFinished);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_audited_and_never_registered() {
        let dir = tempdir().unwrap();
        let registry = Arc::new(ActiveOperationRegistry::new());
        let audit = Arc::new(AuditLogStore::new(dir.path().join("audit.ndjson")));
        let orchestrator = PurgeOrchestrator::new(
            dir.path().join("missing.sh"),
            dir.path().to_path_buf(),
            registry.clone(),
            audit.clone(),
        );

        let err = orchestrator.run(request(false)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SpawnFailure);

        let entries = audit.read_recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, PurgeStatus::Failed);
        assert_eq!(entries[0].exit_code, None);
        assert_eq!(registry.active_count(), 0);
    }
}
