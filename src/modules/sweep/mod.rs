// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use tracing::info;

use crate::modules::common::parallel::run_with_limit;
use crate::modules::directory::resolve_mailboxes;
use crate::modules::error::MailSweepResult;
use crate::modules::ews::{folder::MailFolder, DeleteMode, MailGateway};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::sweep::aggregate::{aggregate, AggregateResult};
use crate::modules::sweep::executor::sweep_mailbox;
use crate::modules::sweep::payload::{DeleteRequest, SearchFilter};

pub mod aggregate;
pub mod executor;
pub mod payload;
pub mod scanner;

/// Shared, read-only description of one sweep, handed to every mailbox task.
pub(crate) struct SweepPlan {
    pub query: String,
    pub folders: Vec<MailFolder>,
    pub max_per_mailbox: usize,
    pub action: SweepAction,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum SweepAction {
    Search,
    Delete { mode: DeleteMode, simulate: bool },
}

/// Searches every resolvable mailbox for messages matching the filter.
pub async fn search_messages<G: MailGateway>(
    gateway: Arc<G>,
    filter: SearchFilter,
) -> MailSweepResult<AggregateResult> {
    filter.validate(false)?;
    run_sweep(gateway, filter, SweepAction::Search, None).await
}

/// Searches every resolvable mailbox and removes what it finds, unless the
/// request asks for a simulation.
pub async fn delete_messages<G: MailGateway>(
    gateway: Arc<G>,
    request: DeleteRequest,
) -> MailSweepResult<AggregateResult> {
    request.validate()?;
    let action = SweepAction::Delete {
        mode: request.mode,
        simulate: request.simulate,
    };
    run_sweep(
        gateway,
        request.filter,
        action,
        Some((request.mode, request.simulate)),
    )
    .await
}

async fn run_sweep<G: MailGateway>(
    gateway: Arc<G>,
    filter: SearchFilter,
    action: SweepAction,
    delete: Option<(DeleteMode, bool)>,
) -> MailSweepResult<AggregateResult> {
    let folders = filter.resolved_folders()?;
    let query = filter.to_aqs_query();

    let entries = resolve_mailboxes(gateway.as_ref()).await?;
    let scanned = entries.len();
    if entries.is_empty() {
        return Ok(aggregate(query, 0, Vec::new(), delete));
    }

    info!(
        "Sweeping {} mailboxes across {} folders (query: {})",
        scanned,
        folders.len(),
        query
    );

    let plan = Arc::new(SweepPlan {
        query: query.clone(),
        folders,
        max_per_mailbox: filter.max_per_mailbox,
        action,
    });

    let reports = run_with_limit(mailbox_concurrency(), entries, move |entry| {
        let gateway = gateway.clone();
        let plan = plan.clone();
        async move { Ok(sweep_mailbox(gateway, entry, plan).await) }
    })
    .await?;

    Ok(aggregate(query, scanned, reports, delete))
}

fn mailbox_concurrency() -> usize {
    SETTINGS
        .mailsweep_mailbox_concurrency
        .map(|v| v as usize)
        .unwrap_or_else(|| num_cpus::get() * 2)
}
