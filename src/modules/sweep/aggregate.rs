// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::modules::ews::DeleteMode;
use crate::modules::sweep::scanner::MatchRecord;

/// Per-mailbox result for a mailbox that produced at least one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxOutcome {
    pub mailbox: String,
    pub display_name: Option<String>,
    pub total_matches: usize,
    /// Number of items removed; absent for pure searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<usize>,
    /// Logical names of the folders that produced matches, in scan order.
    pub folders: Vec<String>,
    pub matches: Vec<MatchRecord>,
}

/// Per-mailbox failure; one mailbox failing never affects its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxFailure {
    pub mailbox: String,
    pub display_name: Option<String>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    /// Number of mailboxes resolved for this request.
    pub scanned: usize,
    /// Mailboxes that produced at least one match.
    pub with_matches: usize,
    pub total_matches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_deleted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DeleteMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulate: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    pub summary: SweepSummary,
    /// The compiled query that was executed.
    pub query: String,
    /// Sorted ascending by mailbox address.
    pub results: Vec<MailboxOutcome>,
    pub failures: Vec<MailboxFailure>,
}

/// What one mailbox task reports back to the aggregator.
#[derive(Debug)]
pub(crate) enum MailboxReport {
    Matched(MailboxOutcome),
    Empty,
    Failed(MailboxFailure),
}

/// Merges per-mailbox reports into the caller-visible result.
///
/// Every report lands in exactly one bucket: outcomes with matches, the
/// failure list, or nowhere (clean but empty). Completion order is
/// meaningless, so outcomes are sorted by address to keep responses
/// deterministic.
pub(crate) fn aggregate(
    query: String,
    scanned: usize,
    reports: Vec<MailboxReport>,
    delete: Option<(DeleteMode, bool)>,
) -> AggregateResult {
    let mut outcomes = Vec::new();
    let mut failures = Vec::new();

    for report in reports {
        match report {
            MailboxReport::Matched(outcome) => outcomes.push(outcome),
            MailboxReport::Empty => {}
            MailboxReport::Failed(failure) => failures.push(failure),
        }
    }

    let results: Vec<MailboxOutcome> = outcomes
        .into_iter()
        .sorted_by(|a, b| a.mailbox.cmp(&b.mailbox))
        .collect();

    let total_matches: usize = results.iter().map(|r| r.total_matches).sum();
    let total_deleted = delete
        .is_some()
        .then(|| results.iter().filter_map(|r| r.deleted).sum());

    AggregateResult {
        summary: SweepSummary {
            scanned,
            with_matches: results.len(),
            total_matches,
            total_deleted,
            mode: delete.map(|(mode, _)| mode),
            simulate: delete.map(|(_, simulate)| simulate),
        },
        query,
        results,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(mailbox: &str, matches: usize, deleted: Option<usize>) -> MailboxReport {
        MailboxReport::Matched(MailboxOutcome {
            mailbox: mailbox.to_string(),
            display_name: None,
            total_matches: matches,
            deleted,
            folders: vec!["inbox".to_string()],
            matches: Vec::new(),
        })
    }

    fn failure(mailbox: &str) -> MailboxReport {
        MailboxReport::Failed(MailboxFailure {
            mailbox: mailbox.to_string(),
            display_name: None,
            error: "session creation failed".to_string(),
            details: None,
        })
    }

    #[test]
    fn test_results_are_sorted_by_mailbox() {
        let reports = vec![
            outcome("c@example.com", 1, None),
            outcome("a@example.com", 2, None),
            outcome("b@example.com", 3, None),
        ];
        let result = aggregate("kind:email".into(), 3, reports, None);
        let addresses: Vec<&str> = result.results.iter().map(|r| r.mailbox.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["a@example.com", "b@example.com", "c@example.com"]
        );
    }

    #[test]
    fn test_every_report_lands_in_one_bucket() {
        let reports = vec![
            outcome("a@example.com", 2, None),
            MailboxReport::Empty,
            failure("c@example.com"),
        ];
        let result = aggregate("kind:email".into(), 3, reports, None);
        assert_eq!(result.summary.scanned, 3);
        assert_eq!(result.summary.with_matches, 1);
        assert_eq!(result.summary.total_matches, 2);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert!(result.summary.total_deleted.is_none());
    }

    #[test]
    fn test_deleted_counts_are_summed() {
        let reports = vec![
            outcome("a@example.com", 5, Some(5)),
            outcome("b@example.com", 2, Some(2)),
        ];
        let result = aggregate(
            "from:\"x@y.com\"".into(),
            2,
            reports,
            Some((DeleteMode::MoveToDeletedItems, false)),
        );
        assert_eq!(result.summary.total_deleted, Some(7));
        assert_eq!(result.summary.simulate, Some(false));
    }
}
