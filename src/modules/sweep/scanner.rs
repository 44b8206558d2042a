// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

use crate::{
    modules::error::{code::ErrorCode, MailSweepResult},
    modules::ews::{folder::MailFolder, MailboxSession, PageView, RemoteItem},
    modules::settings::cli::SETTINGS,
    raise_error,
};

const BODY_PREVIEW_CHARS: usize = 500;

/// One matched message, captured while scanning a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub item_id: String,
    pub change_token: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub sender: Option<String>,
    /// Receipt time in epoch milliseconds.
    pub received_at: Option<i64>,
    pub internet_message_id: Option<String>,
    pub has_attachments: bool,
    pub size: Option<u64>,
    /// Body text clipped to the first 500 characters.
    pub body_preview: Option<String>,
    pub mailbox: String,
    pub folder: MailFolder,
}

/// Collects up to `limit` matches from one folder, newest first.
///
/// Pages are sized to the remaining capacity so the last request never
/// over-fetches. The scan stops as soon as the limit is reached or the
/// remote reports no further pages. A zero limit returns immediately
/// without touching the remote at all.
pub async fn scan_folder<S: MailboxSession>(
    session: &S,
    mailbox: &str,
    folder: MailFolder,
    query: &str,
    limit: usize,
) -> MailSweepResult<Vec<MatchRecord>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let page_size = SETTINGS.mailsweep_find_page_size as usize;
    let mut records: Vec<MatchRecord> = Vec::new();
    let mut offset: u32 = 0;

    loop {
        let remaining = limit - records.len();
        let view = PageView {
            max_entries: remaining.min(page_size) as u32,
            offset,
        };

        let page = session
            .find_items(folder.protocol_folder_id(), query, &view)
            .await
            .map_err(|e| {
                raise_error!(
                    format!(
                        "Item enumeration failed for mailbox '{}' folder '{}': {}",
                        mailbox, folder, e
                    ),
                    ErrorCode::UpstreamUnavailable
                )
            })?;

        let fetched = page.items.len();
        for item in page.items {
            if records.len() >= limit {
                break;
            }
            records.push(to_match_record(item, mailbox, folder));
        }

        // An empty page that still claims more would never advance the offset.
        if records.len() >= limit || !page.more_available || fetched == 0 {
            break;
        }
        offset = page.next_page_offset.unwrap_or(offset + fetched as u32);
    }

    Ok(records)
}

fn to_match_record(item: RemoteItem, mailbox: &str, folder: MailFolder) -> MatchRecord {
    MatchRecord {
        item_id: item.item_id,
        change_token: item.change_key,
        subject: item.subject,
        from: item.from,
        sender: item.sender,
        received_at: item.received_at,
        internet_message_id: item.internet_message_id,
        has_attachments: item.has_attachments,
        size: item.size,
        body_preview: item.body_preview.map(clip_preview),
        mailbox: mailbox.to_string(),
        folder,
    }
}

fn clip_preview(mut preview: String) -> String {
    if let Some((idx, _)) = preview.char_indices().nth(BODY_PREVIEW_CHARS) {
        preview.truncate(idx);
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_preview_is_char_boundary_safe() {
        let ascii = "a".repeat(600);
        assert_eq!(clip_preview(ascii).len(), 500);

        let short = "hello".to_string();
        assert_eq!(clip_preview(short), "hello");

        // Multi-byte characters count as one character each.
        let wide = "é".repeat(600);
        let clipped = clip_preview(wide);
        assert_eq!(clipped.chars().count(), 500);
    }
}
