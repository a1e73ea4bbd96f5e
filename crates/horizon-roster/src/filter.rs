//! Include and exclude rule application.
//!
//! Include rules run in order; each appends its contribution to the running
//! roster. A directive rule appends its payload verbatim. A match rule
//! evaluates the host-built predicate against every entity in the snapshot,
//! merges its option overrides onto each match (with per-entity placeholder
//! substitution), optionally sorts its own matches locally, and concatenates.
//!
//! Exclude rules then run in order; each removes the entries whose resolvable
//! identifier matches its predicate. Entries without a resolvable identifier
//! - directive rows, malformed rows - are never excluded.

use crate::config::{FilterRule, MatchRule};
use crate::entry::{EntityRef, RosterEntry};
use crate::host::matcher::{ComparatorFactory, PredicateFactory};
use crate::host::state::StateSnapshot;
use crate::sort;

/// Apply every include rule, in rule order, appending to `entries`.
pub fn apply_includes(
    entries: &mut Vec<RosterEntry>,
    rules: &[FilterRule],
    snapshot: &StateSnapshot,
    predicates: &dyn PredicateFactory,
    comparators: &dyn ComparatorFactory,
) {
    for rule in rules {
        match rule {
            FilterRule::Directive(directive) => {
                entries.push(RosterEntry::Directive(directive.clone()));
            }
            FilterRule::Match(rule) => {
                let predicate = predicates.build(rule, snapshot);
                let mut matches: Vec<RosterEntry> = snapshot
                    .keys()
                    .filter(|id| predicate(id))
                    .map(|id| {
                        let mut entity = EntityRef::new(id.as_str());
                        if let Some(options) = &rule.options {
                            entity.merge_options(options);
                        }
                        RosterEntry::Entity(entity)
                    })
                    .collect();

                if let Some(spec) = &rule.sort {
                    sort::sort_entries(&mut matches, spec, snapshot, comparators);
                }

                tracing::trace!(
                    target: "horizon_roster::filter",
                    matched = matches.len(),
                    "include rule applied"
                );
                entries.append(&mut matches);
            }
        }
    }
}

/// Apply every exclude rule, in rule order, removing matching entries.
pub fn apply_excludes(
    entries: &mut Vec<RosterEntry>,
    rules: &[MatchRule],
    snapshot: &StateSnapshot,
    predicates: &dyn PredicateFactory,
) {
    for rule in rules {
        let predicate = predicates.build(rule, snapshot);
        entries.retain(|entry| match entry.entity_id() {
            Some(id) => !predicate(id),
            None => true,
        });
    }
}
