//! Card configuration: validation, normalization, and the typed rule model.
//!
//! Raw configuration arrives as an owned [`serde_json::Value`] from the host.
//! [`CardConfig::from_value`] validates it and deserializes into the typed
//! form; because deserialization builds fresh owned values, it doubles as the
//! deep clone that decouples the card from caller-owned mutable objects.
//!
//! Filter rules are a tagged union at the data-model level: a rule carrying a
//! `type` field is a [`FilterRule::Directive`] whose payload is appended to
//! the roster verbatim, anything else is a [`FilterRule::Match`] with matcher
//! criteria, optional option overrides, and an optional local sort.

use serde::Deserialize;
use serde::de::{self, Deserializer};
use serde_json::Value;

use crate::entry::{DirectiveEntry, JsonMap};

/// Result type alias for configuration handling.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors raised while accepting a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration was provided at all.
    #[error("no configuration provided")]
    Missing,

    /// The configuration lacks the required `card` template.
    #[error("configuration must declare a `card` template")]
    MissingCard,

    /// The configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// The full card configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CardConfig {
    /// The opaque child widget configuration template.
    pub card: JsonMap,

    /// Statically configured entity references, in order. Raw values; they
    /// are normalized during assembly.
    #[serde(default)]
    pub entities: Option<Vec<Value>>,

    /// Include/exclude rules and the optional live template source.
    #[serde(default)]
    pub filter: Option<FilterConfig>,

    /// Global sort specification, applied after filtering.
    #[serde(default)]
    pub sort: Option<SortSpec>,

    /// Drop structurally-duplicate entries after sorting.
    #[serde(default)]
    pub unique: bool,

    /// Instantiate one child widget per resolved entry instead of one shared
    /// child carrying the whole list.
    #[serde(default)]
    pub auto_cards: bool,

    /// The config key that receives the entity identifier in per-entity mode.
    #[serde(default = "default_entity_param")]
    pub auto_cards_entity_param: String,

    /// Whether the container stays visible when the resolved list is empty.
    #[serde(default = "default_show_empty")]
    pub show_empty: bool,
}

fn default_entity_param() -> String {
    "entity".to_string()
}

fn default_show_empty() -> bool {
    true
}

impl CardConfig {
    /// Validate and deep-clone a raw configuration value.
    ///
    /// Fails with [`ConfigError::Missing`] when the value is null, and with
    /// [`ConfigError::MissingCard`] when no usable `card` template is
    /// declared. Structural problems inside recognized options surface as
    /// [`ConfigError::Invalid`].
    pub fn from_value(raw: Value) -> ConfigResult<Self> {
        let map = match raw {
            Value::Null => return Err(ConfigError::Missing),
            Value::Object(map) => map,
            _ => return Err(ConfigError::MissingCard),
        };
        match map.get("card") {
            None | Some(Value::Null) => return Err(ConfigError::MissingCard),
            Some(_) => {}
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

/// The `filter` configuration section.
#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct FilterConfig {
    /// Include rules, applied in order; each contributes its matches (or its
    /// directive payload) to the roster.
    #[serde(default)]
    pub include: Vec<FilterRule>,

    /// Exclude rules, applied in order after all includes.
    #[serde(default)]
    pub exclude: Vec<MatchRule>,

    /// A template whose rendered result contributes additional entity
    /// identifiers, re-rendered by the host whenever its inputs change.
    #[serde(default)]
    pub template: Option<String>,

    /// Hint for the template channel: the entities whose updates should
    /// trigger re-evaluation.
    #[serde(default)]
    pub entity_ids: Option<Vec<String>>,
}

/// Returns whether a template string contains template syntax markers and
/// therefore warrants a live subscription.
pub fn template_has_syntax(template: &str) -> bool {
    template.contains("{{") || template.contains("{%")
}

/// One include rule: either an opaque directive row or a matcher.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterRule {
    /// A rule carrying a `type` field; its payload is appended to the roster
    /// verbatim and never matched against state.
    Directive(DirectiveEntry),
    /// A matching rule evaluated against every entity in the state snapshot.
    Match(MatchRule),
}

impl<'de> Deserialize<'de> for FilterRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = JsonMap::deserialize(deserializer)?;
        if map.contains_key("type") {
            return Ok(Self::Directive(DirectiveEntry(map)));
        }
        MatchRule::from_map(map).map(Self::Match).map_err(de::Error::custom)
    }
}

/// A matching rule: predicate criteria plus optional option overrides and an
/// optional local sort.
///
/// The criteria fields themselves (domain, area, attribute comparisons, …)
/// are opaque here; the host's predicate factory interprets them.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRule {
    /// Matcher fields, handed to the predicate factory as-is.
    pub criteria: JsonMap,
    /// Options merged onto every matched entity reference; rule values win
    /// on key conflicts.
    pub options: Option<JsonMap>,
    /// Local sort applied to this rule's matches before concatenation,
    /// independent of any later global sort.
    pub sort: Option<SortSpec>,
}

impl MatchRule {
    /// Build a rule that matches on the given criteria alone.
    pub fn from_criteria(criteria: JsonMap) -> Self {
        Self {
            criteria,
            options: None,
            sort: None,
        }
    }

    fn from_map(mut map: JsonMap) -> Result<Self, String> {
        let options = match map.remove("options") {
            None => None,
            Some(Value::Object(options)) => Some(options),
            Some(_) => return Err("filter rule `options` must be an object".to_string()),
        };
        let sort = match map.remove("sort") {
            None => None,
            Some(value) => Some(serde_json::from_value(value).map_err(|e| e.to_string())?),
        };
        Ok(Self {
            criteria: map,
            options,
            sort,
        })
    }
}

impl<'de> Deserialize<'de> for MatchRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = JsonMap::deserialize(deserializer)?;
        Self::from_map(map).map_err(de::Error::custom)
    }
}

/// A sort specification.
///
/// `method` selects a comparator from the host's comparator factory (by
/// name, by state value, by last-changed time, …). `reverse` inverts the
/// resulting order. `count`/`first` window the globally-sorted list to
/// `[first, first + count)`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SortSpec {
    /// Comparator selector, interpreted by the host.
    pub method: String,

    /// Invert the comparator's order.
    #[serde(default)]
    pub reverse: bool,

    /// Keep at most this many entries, starting at `first`.
    #[serde(default)]
    pub count: Option<usize>,

    /// Window start, defaulting to 0.
    #[serde(default)]
    pub first: Option<usize>,
}

impl SortSpec {
    /// A plain ascending sort by the given method.
    pub fn by_method(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            reverse: false,
            count: None,
            first: None,
        }
    }
}
