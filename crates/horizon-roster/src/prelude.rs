//! Convenient re-exports for host integrations.
//!
//! ```
//! use horizon_roster::prelude::*;
//! ```

pub use crate::card::{HostServices, LifecycleMode, RosterCard, Visibility};
pub use crate::config::{CardConfig, ConfigError, FilterRule, MatchRule, SortSpec};
pub use crate::entry::{DirectiveEntry, EntityRef, RosterEntry};
pub use crate::host::{
    ComparatorFactory, HostBus, HostEvent, MetadataLoader, PredicateFactory, StateSnapshot,
    StateStore, TemplateChannel, TemplateRequest, TemplateSubscription, WidgetFactory,
    WidgetInstance, request_catalog_rebuild,
};
pub use horizon_roster_core::{ConnectionGuard, ConnectionId, DeferredQueue, Property, Signal};
