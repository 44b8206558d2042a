// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    modules::settings::cli::SETTINGS,
    raise_error,
};

pub mod folder;

/// Capability exposed by the remote mail protocol client.
///
/// mailsweep never speaks the wire protocol itself; adapters implement this
/// trait and the engine fans out over it. Methods return `Send` futures so
/// per-mailbox tasks can be spawned onto the runtime.
pub trait MailGateway: Send + Sync + 'static {
    type Session: MailboxSession;

    /// Lists every mailbox the service identity is allowed to act on.
    fn enumerate_searchable_mailboxes(
        &self,
    ) -> impl Future<Output = MailSweepResult<Vec<SearchableMailbox>>> + Send;

    /// Opens a fresh protocol session. Sessions are never shared across
    /// concurrent mailbox tasks.
    fn create_session(&self) -> impl Future<Output = MailSweepResult<Self::Session>> + Send;
}

/// One protocol session, bound to a single mailbox after impersonation.
pub trait MailboxSession: Send + Sync + 'static {
    /// Switches the session into the given mailbox owner's security context.
    fn impersonate(&mut self, address: &str) -> impl Future<Output = MailSweepResult<()>> + Send;

    /// Runs one paginated item enumeration against a folder, newest first.
    fn find_items(
        &self,
        folder_id: &str,
        query: &str,
        view: &PageView,
    ) -> impl Future<Output = MailSweepResult<FindPage>> + Send;

    /// Deletes the given items in one call. `send_cancellations` controls
    /// meeting cancellation notices; `all_occurrences` covers every
    /// occurrence of recurring items.
    fn bulk_delete(
        &self,
        item_ids: &[String],
        mode: DeleteMode,
        send_cancellations: bool,
        all_occurrences: bool,
    ) -> impl Future<Output = MailSweepResult<()>> + Send;
}

/// A mailbox as reported by the directory enumeration call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchableMailbox {
    pub reference_id: String,
    pub primary_smtp_address: String,
    pub display_name: Option<String>,
    pub is_external: bool,
    pub is_membership_group: bool,
}

/// Bounded window into a folder enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageView {
    pub max_entries: u32,
    pub offset: u32,
}

/// One page of enumeration results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPage {
    pub items: Vec<RemoteItem>,
    pub more_available: bool,
    pub next_page_offset: Option<u32>,
}

/// Read-optimized projection of one remote message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteItem {
    pub item_id: String,
    pub change_key: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub sender: Option<String>,
    /// Receipt time in epoch milliseconds.
    pub received_at: Option<i64>,
    pub internet_message_id: Option<String>,
    pub has_attachments: bool,
    pub size: Option<u64>,
    pub body_preview: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    SoftDelete,
    #[default]
    MoveToDeletedItems,
    HardDelete,
}

/// Connection parameters for gateway adapters, resolved from settings.
#[derive(Debug, Clone)]
pub struct EwsEndpoint {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl EwsEndpoint {
    pub fn from_settings() -> MailSweepResult<Self> {
        let url = SETTINGS.mailsweep_ews_endpoint.clone().ok_or_else(|| {
            raise_error!(
                "mailsweep_ews_endpoint is not configured".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        let username = SETTINGS.mailsweep_ews_username.clone().ok_or_else(|| {
            raise_error!(
                "mailsweep_ews_username is not configured".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        let password = SETTINGS.mailsweep_ews_password.clone().ok_or_else(|| {
            raise_error!(
                "mailsweep_ews_password is not configured".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        Ok(Self {
            url,
            username,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_requires_configuration() {
        let err = EwsEndpoint::from_settings().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingConfiguration);
    }
}
