//! Structural deduplication of roster entries.

use crate::entry::RosterEntry;

/// Drop structurally-duplicate entries, keeping the first occurrence.
///
/// Equality is full symmetric structural equality over the typed entries:
/// two entity references are equal when both identifier and options match
/// recursively, two directive rows when their payloads match, and an entity
/// reference never equals a directive row. The operation is idempotent.
pub fn unique(entries: Vec<RosterEntry>) -> Vec<RosterEntry> {
    let mut kept: Vec<RosterEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if !kept.contains(&entry) {
            kept.push(entry);
        }
    }
    kept
}
