//! Horizon Roster - a filter-driven dynamic entity roster for dashboards.
//!
//! A roster card computes an ordered list of entity references from a
//! declarative configuration - static entries, a live template source, and
//! include/exclude rules with per-rule and global sorting - and uses that
//! list to drive the lifecycle of child widgets inside a host dashboard.
//!
//! The pipeline re-runs reactively whenever the state snapshot, the template
//! result, or the auxiliary metadata changes, and a value-level diff of the
//! resolved list gates all downstream work, so redundant widget rebuilds are
//! skipped.
//!
//! The host's own primitives - widget rendering, the state store, template
//! rendering, metadata loading - stay outside; the card consumes them
//! through the narrow contracts in [`host`].
//!
//! # Example
//!
//! ```no_run
//! use horizon_roster::{HostServices, RosterCard};
//! use serde_json::json;
//!
//! fn build(services: HostServices) -> Result<RosterCard, Box<dyn std::error::Error>> {
//!     let card = RosterCard::new(services);
//!     card.configure(json!({
//!         "card": {"type": "entities", "title": "Lights"},
//!         "filter": {
//!             "include": [{"domain": "light", "options": {"name": "this.entity_id"}}],
//!             "exclude": [{"state": "unavailable"}]
//!         },
//!         "sort": {"method": "name"},
//!         "unique": true
//!     }))?;
//!     Ok(card)
//! }
//! ```

pub mod card;
pub mod config;
pub mod dedup;
pub mod entry;
pub mod filter;
pub mod host;
pub mod pipeline;
pub mod prelude;
pub mod sort;
pub mod source;

pub use card::{HostServices, LifecycleMode, RosterCard, Visibility};
pub use config::{CardConfig, ConfigError, ConfigResult, FilterConfig, FilterRule, MatchRule, SortSpec};
pub use entry::{DirectiveEntry, EntityRef, JsonMap, RosterEntry};
