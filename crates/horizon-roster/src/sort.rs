//! Sorting and windowing of roster entries.
//!
//! Comparator semantics live with the host's [`ComparatorFactory`]; this
//! engine wraps the factory's ascending order with `reverse` inversion,
//! sorts, and applies the `[first, first + count)` window. All sorting uses
//! the standard library's stable sort, so entries with equal keys keep their
//! assembly order and results are reproducible across runs.

use crate::config::SortSpec;
use crate::entry::RosterEntry;
use crate::host::matcher::ComparatorFactory;
use crate::host::state::StateSnapshot;

/// Sort `entries` in place according to `spec`.
///
/// Used both for per-rule local sorts and as the first half of
/// [`apply_global`].
pub fn sort_entries(
    entries: &mut [RosterEntry],
    spec: &SortSpec,
    snapshot: &StateSnapshot,
    comparators: &dyn ComparatorFactory,
) {
    let compare = comparators.build(spec, snapshot);
    entries.sort_by(|a, b| {
        let ordering = compare(a, b);
        if spec.reverse { ordering.reverse() } else { ordering }
    });
}

/// Sort the full roster and window it to `[first, first + count)`.
///
/// Without `count`, the whole sorted list is kept. The window is clamped to
/// the list, so a `first` past the end yields an empty roster and a window
/// reaching past the end is truncated.
pub fn apply_global(
    mut entries: Vec<RosterEntry>,
    spec: &SortSpec,
    snapshot: &StateSnapshot,
    comparators: &dyn ComparatorFactory,
) -> Vec<RosterEntry> {
    sort_entries(&mut entries, spec, snapshot, comparators);

    if let Some(count) = spec.count {
        let first = spec.first.unwrap_or(0).min(entries.len());
        entries.drain(..first);
        entries.truncate(count);
    }

    entries
}
