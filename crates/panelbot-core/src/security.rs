//! Admin authorization gate.

use crate::domain::ChatId;

/// Parse a comma-separated admin chat-id list. Empty tokens and tokens that
/// fail to parse are skipped, never reported.
pub fn parse_chat_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

/// Membership test against the configured allow-list string. The list is
/// re-parsed on every call so configuration edits apply without a restart.
pub fn is_admin(chat_id: ChatId, allowed: &str) -> bool {
    parse_chat_ids(allowed).contains(&chat_id.0)
}
