//! Externally supplied predicate and comparator builders.
//!
//! Filtering and sorting semantics - what `domain: light` or
//! `method: last_changed` mean - live with the host. The engines here only
//! orchestrate: they hand a rule or sort spec to the factory, get back a
//! closure, and apply it.

use std::cmp::Ordering;

use crate::config::{MatchRule, SortSpec};
use crate::entry::RosterEntry;
use crate::host::state::StateSnapshot;

/// A predicate over entity identifiers, built for one rule against one
/// snapshot.
pub type EntityPredicate = Box<dyn Fn(&str) -> bool>;

/// An ordering over roster entries, built for one sort spec against one
/// snapshot.
pub type EntryComparator = Box<dyn Fn(&RosterEntry, &RosterEntry) -> Ordering>;

/// Builds match predicates from rule criteria.
pub trait PredicateFactory: Send + Sync {
    /// Build the predicate for `rule` against `snapshot`.
    ///
    /// A rule whose criteria the factory does not recognize should yield a
    /// predicate that matches nothing; an unmatched rule is silent, not an
    /// error.
    fn build(&self, rule: &MatchRule, snapshot: &StateSnapshot) -> EntityPredicate;
}

/// Builds comparators keyed by a sort spec's `method`.
///
/// The returned comparator implements the method's ascending order only;
/// `reverse` inversion and windowing are applied by the sort engine.
pub trait ComparatorFactory: Send + Sync {
    /// Build the comparator for `spec` against `snapshot`.
    fn build(&self, spec: &SortSpec, snapshot: &StateSnapshot) -> EntryComparator;
}
