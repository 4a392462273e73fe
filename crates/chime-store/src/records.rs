//! Line-record encoding of a reminder group.
//!
//! A group is stored as one JSON object per line, in instance order. Decoding
//! is corruption-tolerant: each malformed line is dropped individually so a
//! partially damaged group degrades to its surviving records instead of
//! failing the whole read.

use chime_core::ids::BaseId;
use chime_core::model::StoredReminder;
use metrics::counter;
use tracing::warn;

use crate::Result;

/// Encode a group as newline-separated JSON records.
pub fn encode(reminders: &[StoredReminder]) -> Result<String> {
    let mut out = String::new();
    for reminder in reminders {
        out.push_str(&serde_json::to_string(reminder)?);
        out.push('\n');
    }
    Ok(out)
}

/// Decode a group, dropping malformed lines.
pub fn decode(base_id: &BaseId, raw: &str) -> Vec<StoredReminder> {
    let mut out = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StoredReminder>(line) {
            Ok(reminder) => out.push(reminder),
            Err(e) => {
                counter!("store_corrupt_records_total").increment(1);
                warn!(base_id = %base_id, error = %e, "dropping malformed reminder record");
            }
        }
    }
    out
}
