//! Roster entry data model.
//!
//! A resolved roster is an ordered list of [`RosterEntry`] values. Each entry
//! is either an [`EntityRef`] - an entity identifier plus arbitrary display
//! options - or a [`DirectiveEntry`] - an opaque non-entity row (typically a
//! card-type placeholder) that passes through filtering, exclusion, and
//! matching untouched.
//!
//! Entries are normalized from raw configuration values: a bare string
//! becomes an [`EntityRef`] with no options, an object carrying a string
//! `entity` key becomes an [`EntityRef`] with the remaining keys as options,
//! and any other object passes through as a [`DirectiveEntry`]. Nulls, empty
//! strings, and non-string scalars are dropped.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::{Map, Value};

/// A JSON object map, the currency for opaque option/criteria values.
pub type JsonMap = Map<String, Value>;

/// The literal token replaced by the matched entity's own identifier inside
/// merged option strings.
pub const ENTITY_PLACEHOLDER: &str = "this.entity_id";

/// An entity reference: an identifier plus arbitrary extra display options.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityRef {
    /// The entity identifier, e.g. `light.kitchen`.
    pub entity: String,
    /// Extra option fields carried alongside the identifier. The `entity`
    /// key itself is never stored here.
    pub options: JsonMap,
}

impl EntityRef {
    /// Create a bare reference with no options.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            options: JsonMap::new(),
        }
    }

    /// Create a reference with options.
    pub fn with_options(entity: impl Into<String>, options: JsonMap) -> Self {
        Self {
            entity: entity.into(),
            options,
        }
    }

    /// Merge rule options onto this reference, rule values winning on key
    /// conflicts, then substitute [`ENTITY_PLACEHOLDER`] occurrences inside
    /// every string leaf of the merged options with this entity's identifier.
    pub fn merge_options(&mut self, rule_options: &JsonMap) {
        for (key, value) in rule_options {
            self.options.insert(key.clone(), value.clone());
        }
        let entity = self.entity.clone();
        for value in self.options.values_mut() {
            substitute_entity_placeholder(value, &entity);
        }
    }
}

impl Serialize for EntityRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.options.len()))?;
        map.serialize_entry("entity", &self.entity)?;
        for (key, value) in &self.options {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// An opaque non-entity row.
///
/// Directive entries carry a `type` tag in well-formed configurations, but
/// any object without a resolvable `entity` identifier is treated the same
/// way: it is never matched, excluded, or merged, and reaches the resolved
/// list with unchanged identity.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectiveEntry(pub JsonMap);

impl DirectiveEntry {
    /// The `type` tag, when present.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }
}

impl Serialize for DirectiveEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// One element of a resolved roster.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RosterEntry {
    /// An entity reference with a resolvable identifier.
    Entity(EntityRef),
    /// An opaque pass-through row.
    Directive(DirectiveEntry),
}

impl RosterEntry {
    /// Normalize a raw configuration value into an entry.
    ///
    /// Returns `None` for values that normalize to nothing: nulls, non-string
    /// scalars, and strings that are empty after trimming.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self::Entity(EntityRef::new(trimmed)))
                }
            }
            Value::Object(map) => Some(Self::from_map(map.clone())),
            _ => None,
        }
    }

    /// Normalize an owned object map into an entry.
    pub fn from_map(mut map: JsonMap) -> Self {
        match map.get("entity").and_then(Value::as_str).map(String::from) {
            Some(entity) => {
                map.remove("entity");
                Self::Entity(EntityRef::with_options(entity, map))
            }
            None => Self::Directive(DirectiveEntry(map)),
        }
    }

    /// The entity identifier, if this entry has one.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::Entity(e) => Some(&e.entity),
            Self::Directive(_) => None,
        }
    }

    /// The entry as a plain JSON value, entity identifier flattened alongside
    /// its options.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Entity(e) => {
                let mut map = JsonMap::new();
                map.insert("entity".to_string(), Value::String(e.entity.clone()));
                for (key, value) in &e.options {
                    map.insert(key.clone(), value.clone());
                }
                Value::Object(map)
            }
            Self::Directive(d) => Value::Object(d.0.clone()),
        }
    }
}

/// A roster as a JSON array, for embedding in a child widget configuration.
pub fn entries_to_value(entries: &[RosterEntry]) -> Value {
    Value::Array(entries.iter().map(RosterEntry::to_value).collect())
}

/// Replace [`ENTITY_PLACEHOLDER`] with `entity_id` in every string leaf of a
/// JSON value tree.
///
/// The traversal is structural: only string leaves are rewritten, and only
/// where the token textually occurs, so keys and non-string values are never
/// touched.
pub fn substitute_entity_placeholder(value: &mut Value, entity_id: &str) {
    match value {
        Value::String(s) => {
            if s.contains(ENTITY_PLACEHOLDER) {
                *s = s.replace(ENTITY_PLACEHOLDER, entity_id);
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_entity_placeholder(item, entity_id);
            }
        }
        Value::Object(map) => {
            for nested in map.values_mut() {
                substitute_entity_placeholder(nested, entity_id);
            }
        }
        _ => {}
    }
}
