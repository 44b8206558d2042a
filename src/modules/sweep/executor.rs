// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use crate::modules::directory::MailboxDirectoryEntry;
use crate::modules::error::{MailSweepError, MailSweepResult};
use crate::modules::ews::{MailGateway, MailboxSession};
use crate::modules::sweep::aggregate::{MailboxFailure, MailboxOutcome, MailboxReport};
use crate::modules::sweep::scanner::{scan_folder, MatchRecord};
use crate::modules::sweep::{SweepAction, SweepPlan};

/// Runs the whole sweep for one mailbox: impersonate, scan the target
/// folders in order, and delete what was collected when asked to.
///
/// Every failure is converted into a report here; nothing escapes to abort
/// sibling mailbox tasks.
pub(crate) async fn sweep_mailbox<G: MailGateway>(
    gateway: Arc<G>,
    entry: MailboxDirectoryEntry,
    plan: Arc<SweepPlan>,
) -> MailboxReport {
    match sweep_one(gateway, &entry, &plan).await {
        Ok(report) => report,
        Err(error) => MailboxReport::Failed(to_failure(&entry, error)),
    }
}

async fn sweep_one<G: MailGateway>(
    gateway: Arc<G>,
    entry: &MailboxDirectoryEntry,
    plan: &SweepPlan,
) -> MailSweepResult<MailboxReport> {
    if plan.max_per_mailbox == 0 {
        return Ok(MailboxReport::Empty);
    }

    let mut session = gateway.create_session().await?;
    session.impersonate(&entry.address).await?;

    let mut matches: Vec<MatchRecord> = Vec::new();
    let mut folders_with_matches: Vec<String> = Vec::new();

    for folder in &plan.folders {
        let remaining = plan.max_per_mailbox - matches.len();
        if remaining == 0 {
            break;
        }
        let found = scan_folder(&session, &entry.address, *folder, &plan.query, remaining).await?;
        if !found.is_empty() {
            folders_with_matches.push(folder.as_str().to_string());
            matches.extend(found);
        }
    }

    if matches.is_empty() {
        return Ok(MailboxReport::Empty);
    }

    let deleted = match plan.action {
        SweepAction::Search => None,
        SweepAction::Delete { simulate: true, .. } => Some(0),
        SweepAction::Delete {
            mode,
            simulate: false,
        } => {
            let item_ids: Vec<String> = matches.iter().map(|m| m.item_id.clone()).collect();
            session.bulk_delete(&item_ids, mode, false, true).await?;
            Some(item_ids.len())
        }
    };

    Ok(MailboxReport::Matched(MailboxOutcome {
        mailbox: entry.address.clone(),
        display_name: entry.display_name.clone(),
        total_matches: matches.len(),
        deleted,
        folders: folders_with_matches,
        matches,
    }))
}

fn to_failure(entry: &MailboxDirectoryEntry, error: MailSweepError) -> MailboxFailure {
    MailboxFailure {
        mailbox: entry.address.clone(),
        display_name: entry.display_name.clone(),
        error: error.to_string(),
        details: Some(format!("{:?}", error.code())),
    }
}
