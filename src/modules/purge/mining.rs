// Copyright © 2025 mailsweep.com
// Licensed under MailSweep License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::LazyLock;

use ahash::AHashSet;
use regex::Regex;
use tracing::warn;

// "[INFO] Mailbox user1@x.com: 3 active items"
static ACTIVE_ITEMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmailbox\s+(\S+?)\s*:\s*\d+\s+active\s+items?").unwrap());

// "Affected addresses: a@x.com, b@x.com" (the tool spells it both ways)
static AFFECTED_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[ae]ffected\s+(?:address(?:es)?|mailbox(?:es)?)\b").unwrap()
});

// "Deleted 3 items from user1@x.com"
static DELETED_FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdeleted\s+\d+\s+items?\s+from\s+(\S+)").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

/// Scans the purge tool's accumulated standard output for the mailbox
/// patterns it is known to print and returns every address found, lowercased,
/// deduplicated, and sorted.
///
/// This is evidence extraction from free-form diagnostic text, not a
/// structured contract with the tool. Lines that match a pattern without a
/// parseable address are logged instead of silently dropped.
pub fn mine_affected_mailboxes(output: &str) -> Vec<String> {
    let mut found: AHashSet<String> = AHashSet::new();

    for line in output.lines() {
        if let Some(captures) = ACTIVE_ITEMS_RE.captures(line) {
            harvest(&mut found, &captures[1], line);
        }
        if let Some(captures) = DELETED_FROM_RE.captures(line) {
            harvest(&mut found, &captures[1], line);
        }
        if AFFECTED_LINE_RE.is_match(line) {
            let before = found.len();
            for address in EMAIL_RE.find_iter(line) {
                found.insert(address.as_str().to_ascii_lowercase());
            }
            if found.len() == before {
                warn!("Affected-address line carried no parseable address: {}", line);
            }
        }
    }

    let mut addresses: Vec<String> = found.into_iter().collect();
    addresses.sort();
    addresses
}

fn harvest(found: &mut AHashSet<String>, fragment: &str, line: &str) {
    match EMAIL_RE.find(fragment) {
        Some(address) => {
            found.insert(address.as_str().to_ascii_lowercase());
        }
        None => warn!("Mailbox pattern matched without a parseable address: {}", line),
    }
}
