//! Narrow contracts for the host's collaborators.
//!
//! The roster card consumes the surrounding dashboard through these traits
//! only: the state store, the predicate and comparator factories, the widget
//! factory, the template channel, the metadata loader, and the host event
//! bus. None of them are implemented here; the host wires concrete
//! implementations into [`HostServices`](crate::card::HostServices).

pub mod bus;
pub mod matcher;
pub mod metadata;
pub mod state;
pub mod template;
pub mod widget;

pub use bus::{HostBus, HostEvent, request_catalog_rebuild};
pub use matcher::{ComparatorFactory, EntityPredicate, EntryComparator, PredicateFactory};
pub use metadata::MetadataLoader;
pub use state::{StateSnapshot, StateStore};
pub use template::{TemplateChannel, TemplatePush, TemplateRequest, TemplateSubscription};
pub use widget::{WidgetFactory, WidgetInstance};
