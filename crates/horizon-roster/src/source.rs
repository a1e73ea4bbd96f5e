//! Candidate assembly: the raw, pre-filter roster.
//!
//! Candidates come from two places, in a fixed order: the statically
//! configured `entities` list, then the identifiers tokenized out of the most
//! recent template result. Include-rule matches are concatenated after both
//! by the filter engine.

use crate::config::CardConfig;
use crate::entry::{EntityRef, RosterEntry};

/// Assemble the raw candidate list from static configuration and the current
/// template result.
///
/// Static values are normalized ([`RosterEntry::from_value`]); values that
/// normalize to nothing are dropped. The template result is split on runs of
/// whitespace and commas, and each non-empty token becomes a bare entity
/// reference appended after the static entries.
pub fn assemble(config: &CardConfig, template: Option<&str>) -> Vec<RosterEntry> {
    let mut entries = Vec::new();

    if let Some(static_entries) = &config.entities {
        entries.extend(static_entries.iter().filter_map(RosterEntry::from_value));
    }

    if let Some(template) = template {
        entries.extend(
            split_template(template).map(|id| RosterEntry::Entity(EntityRef::new(id))),
        );
    }

    entries
}

/// Tokenize a rendered template result into entity identifiers.
fn split_template(template: &str) -> impl Iterator<Item = &str> {
    template
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
}
