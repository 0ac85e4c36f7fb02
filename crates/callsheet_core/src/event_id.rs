//! Deterministic task-id → calendar-event-id mapping.
//!
//! The mapping is a pure function of the task id, so any caller can locate an
//! existing event without a side-mapping table. Known limitation: truncating
//! the digest leaves a theoretical collision between two different task ids;
//! the upsert protocol detects (and refuses) such collisions instead of
//! silently overwriting a foreign event.

use sha2::{Digest, Sha256};

/// Namespace prefix for every event id this engine creates.
pub const EVENT_ID_PREFIX: &str = "cstask";

/// Digest characters kept after the prefix.
const DIGEST_LEN: usize = 40;

/// Map a task id to a calendar-legal event id: SHA-256, lower-case hex,
/// truncated, with any character past `v` folded back into `a..=d` to stay
/// inside the calendar service's base32hex alphabet (`a-v`, `0-9`).
pub fn to_event_id(task_id: &str) -> String {
    let digest = Sha256::digest(task_id.as_bytes());
    let hex = format!("{digest:x}");
    let folded: String = hex.chars().take(DIGEST_LEN).map(fold_into_alphabet).collect();
    format!("{EVENT_ID_PREFIX}{folded}")
}

fn fold_into_alphabet(c: char) -> char {
    match c {
        'w'..='z' => ((c as u8) - 22) as char,
        _ => c.to_ascii_lowercase(),
    }
}
