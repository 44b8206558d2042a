// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    modules::ews::MailGateway,
    raise_error,
};

/// One mailbox the service identity may act on, resolved per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxDirectoryEntry {
    pub address: String,
    pub display_name: Option<String>,
    pub is_external: bool,
}

/// Resolves the set of sweepable mailboxes. Membership groups and entries
/// without a primary address are not actionable and are filtered out.
pub async fn resolve_mailboxes<G: MailGateway>(
    gateway: &G,
) -> MailSweepResult<Vec<MailboxDirectoryEntry>> {
    let mailboxes = gateway
        .enumerate_searchable_mailboxes()
        .await
        .map_err(|e| {
            raise_error!(
                format!("Searchable mailbox enumeration failed: {}", e),
                ErrorCode::UpstreamUnavailable
            )
        })?;

    Ok(mailboxes
        .into_iter()
        .filter(|m| !m.is_membership_group && !m.primary_smtp_address.is_empty())
        .map(|m| MailboxDirectoryEntry {
            address: m.primary_smtp_address,
            display_name: m.display_name,
            is_external: m.is_external,
        })
        .collect())
}
