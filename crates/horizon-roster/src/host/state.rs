//! The externally owned state store.

use std::collections::BTreeMap;
use std::sync::Arc;

use horizon_roster_core::Signal;
use serde_json::Value;

/// A snapshot of every entity's current state and attributes, keyed by
/// entity identifier.
///
/// Snapshots are owned by the host and replaced wholesale on every update;
/// the roster never mutates one. The ordered map keeps candidate iteration
/// deterministic, which in turn keeps resolved rosters deterministic for a
/// fixed snapshot, template result, and configuration.
pub type StateSnapshot = BTreeMap<String, Value>;

/// Read access to the current snapshot plus a change notification.
///
/// The card reads the snapshot once at first configuration; afterwards the
/// host forwards replacements through [`RosterCard::set_state`]
/// (conventionally by connecting it to [`changed`](StateStore::changed)).
///
/// [`RosterCard::set_state`]: crate::card::RosterCard::set_state
pub trait StateStore: Send + Sync {
    /// The current snapshot.
    fn snapshot(&self) -> Arc<StateSnapshot>;

    /// Emitted with the new snapshot whenever it is replaced.
    fn changed(&self) -> &Signal<Arc<StateSnapshot>>;
}
