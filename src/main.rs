use mimalloc::MiMalloc;
use modules::{
    audit::AuditLogStore,
    common::signal::SIGNAL_MANAGER,
    context::Initialize,
    error::{code::ErrorCode, MailSweepResult},
    logger,
    purge::{
        events::PurgeEvent,
        payload::PurgeRequest,
        registry::{ActiveOperationRegistry, CancelReason},
        PurgeOrchestrator, PurgeStatus,
    },
    settings::cli::{MailSweepCommand, SETTINGS},
};
use std::{io::Write, sync::Arc};
use tracing::info;

use crate::modules::{
    common::signal::SignalManager,
    settings::dir::{DataDirManager, DATA_DIR_MANAGER},
};

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

static LOGO: &str = r#"
  __  __       _ _ ____
 |  \/  | __ _(_) / ___|_      _____  ___ _ __
 | |\/| |/ _` | | \___ \ \ /\ / / _ \/ _ \ '_ \
 | |  | | (_| | | |___) \ V  V /  __/  __/ |_) |
 |_|  |_|\__,_|_|_|____/ \_/\_/ \___|\___| .__/
                                         |_|
"#;

#[tokio::main]
async fn main() -> MailSweepResult<()> {
    logger::initialize_logging();
    info!("{}", LOGO);
    info!("Starting mailsweep");
    info!("Version:  {}", mailsweep_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));

    if let Err(error) = initialize().await {
        eprintln!("{:?}", error);
        return Err(error);
    }

    match &SETTINGS.command {
        Some(MailSweepCommand::Purge(args)) => {
            let request = args.clone().into_request()?;
            run_purge(request).await
        }
        Some(MailSweepCommand::Audit { limit }) => print_audit(*limit).await,
        None => {
            info!("Nothing to do. See `mailsweep purge --help` or `mailsweep audit --help`.");
            Ok(())
        }
    }
}

async fn initialize() -> MailSweepResult<()> {
    SignalManager::initialize().await?;
    DataDirManager::initialize().await?;
    Ok(())
}

/// Streams one purge operation to stdout as event frames; Ctrl-C requests
/// explicit cancellation and the loop keeps draining until the terminal
/// event arrives.
async fn run_purge(request: PurgeRequest) -> MailSweepResult<()> {
    let script_path = SETTINGS.mailsweep_purge_script.clone().ok_or_else(|| {
        raise_error!(
            "--mailsweep-purge-script is required for the purge subcommand".into(),
            ErrorCode::MissingConfiguration
        )
    })?;

    let registry = Arc::new(ActiveOperationRegistry::new());
    let audit = Arc::new(AuditLogStore::new(DATA_DIR_MANAGER.audit_file.clone()));
    let orchestrator = PurgeOrchestrator::new(
        script_path,
        DATA_DIR_MANAGER.script_log_dir.clone(),
        registry.clone(),
        audit,
    );

    let (operation_id, mut receiver) = orchestrator.stream(request).await?;
    let mut shutdown = SIGNAL_MANAGER.subscribe();
    let mut stdout = std::io::stdout();

    let mut final_status: Option<PurgeStatus> = None;
    loop {
        tokio::select! {
            event = receiver.recv() => {
                let Some(event) = event else { break };
                match &event {
                    PurgeEvent::End(end) => final_status = Some(end.status),
                    PurgeEvent::Error(_) => final_status = Some(PurgeStatus::Failed),
                    _ => {}
                }
                write!(stdout, "{}", event.to_sse_frame()).map_err(|error| {
                    raise_error!(
                        format!("Failed to write event frame: {}", error),
                        ErrorCode::InternalError
                    )
                })?;
                stdout.flush().map_err(|error| {
                    raise_error!(
                        format!("Failed to flush event frame: {}", error),
                        ErrorCode::InternalError
                    )
                })?;
            }
            _ = shutdown.recv() => {
                info!("Cancelling purge operation {}", operation_id);
                registry.cancel(&operation_id, CancelReason::UserRequested);
            }
        }
    }

    match final_status {
        Some(PurgeStatus::Failed) => Err(raise_error!(
            format!("Purge operation {} failed", operation_id),
            ErrorCode::ProcessFailure
        )),
        None => Err(raise_error!(
            format!("Purge operation {} ended without a terminal event", operation_id),
            ErrorCode::ProcessFailure
        )),
        _ => Ok(()),
    }
}

async fn print_audit(limit: usize) -> MailSweepResult<()> {
    let store = AuditLogStore::new(DATA_DIR_MANAGER.audit_file.clone());
    let entries = store.read_recent(limit).await?;
    if entries.is_empty() {
        info!("No audit records yet");
        return Ok(());
    }
    let mut stdout = std::io::stdout();
    for entry in entries {
        let line = serde_json::to_string(&entry).map_err(|error| {
            raise_error!(
                format!("Failed to encode audit record: {}", error),
                ErrorCode::InternalError
            )
        })?;
        writeln!(stdout, "{}", line).map_err(|error| {
            raise_error!(
                format!("Failed to print audit record: {}", error),
                ErrorCode::InternalError
            )
        })?;
    }
    Ok(())
}
