//! Core systems for Horizon Roster.
//!
//! This crate provides the reactive foundation for the roster card subsystem:
//!
//! - **Signal/Slot System**: Type-safe notification between components
//! - **Property System**: Reactive values with change detection
//! - **Deferred Queue**: Next-tick task deferral for the host's event loop
//!
//! Everything here runs on a single logical thread with cooperative
//! scheduling. Slots are invoked directly on emit; deferral happens only
//! through [`DeferredQueue`], which the host drains once per tick.
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_roster_core::Signal;
//!
//! let list_changed = Signal::<usize>::new();
//!
//! let conn_id = list_changed.connect(|len| {
//!     println!("List now has {} entries", len);
//! });
//!
//! list_changed.emit(3);
//!
//! list_changed.disconnect(conn_id);
//! ```
//!
//! # Property Example
//!
//! ```
//! use horizon_roster_core::{Property, Signal};
//!
//! struct Roster {
//!     entries: Property<Vec<String>>,
//!     entries_changed: Signal<usize>,
//! }
//!
//! impl Roster {
//!     fn update(&self, entries: Vec<String>) {
//!         let len = entries.len();
//!         // `set` diffs by value; the signal only fires on real changes.
//!         if self.entries.set(entries) {
//!             self.entries_changed.emit(len);
//!         }
//!     }
//! }
//! ```

pub mod property;
pub mod scheduler;
pub mod signal;

pub use property::{Property, ReadOnlyProperty};
pub use scheduler::{DeferredQueue, TaskId};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
