//! The roster card: reactive control, child widget lifecycle, size
//! aggregation.
//!
//! [`RosterCard`] owns the whole reactive loop described in the crate docs.
//! It accepts configurations, re-resolves the roster on every trigger (state
//! snapshot replaced, template result pushed, metadata load resolved), gates
//! propagation on a value-level diff of the resolved list, and manages child
//! widgets in one of two mutually exclusive modes fixed at first
//! configuration:
//!
//! - **Shared mode** (`auto_cards: false`): one child widget configured with
//!   the `card` template plus an `entities` field carrying the whole roster.
//!   On roster change, the child's configuration is patched in place; the
//!   instance survives.
//! - **Per-entity mode** (`auto_cards: true`): one child widget per roster
//!   entry. On any roster change, the entire child array is discarded and
//!   rebuilt in roster order.
//!
//! The diff and its side effects are two separate steps: the
//! [`Property`] setter reports whether the list changed, and only then do
//! widget patching and the visibility toggle run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use horizon_roster_core::{DeferredQueue, Property, Signal};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};

use crate::config::{CardConfig, ConfigResult, template_has_syntax};
use crate::entry::{JsonMap, RosterEntry, entries_to_value};
use crate::host::template::{TemplatePush, TemplateRequest, TemplateSubscription};
use crate::host::{
    ComparatorFactory, MetadataLoader, PredicateFactory, StateSnapshot, StateStore,
    TemplateChannel, WidgetFactory, WidgetInstance,
};
use crate::pipeline::{self, PipelineContext};

/// Everything the card consumes from its host, bundled for construction.
#[derive(Clone)]
pub struct HostServices {
    /// The state store (initial snapshot acquisition).
    pub states: Arc<dyn StateStore>,
    /// Builds include/exclude predicates.
    pub predicates: Arc<dyn PredicateFactory>,
    /// Builds sort comparators.
    pub comparators: Arc<dyn ComparatorFactory>,
    /// Turns child configurations into live widgets.
    pub widgets: Arc<dyn WidgetFactory>,
    /// Live template rendering.
    pub templates: Arc<dyn TemplateChannel>,
    /// One-shot auxiliary metadata loads.
    pub metadata: Arc<dyn MetadataLoader>,
    /// The host's next-tick queue.
    pub queue: Arc<DeferredQueue>,
}

/// The child lifecycle strategy, chosen once at first configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleMode {
    /// One shared child carrying the whole roster in its configuration.
    Shared,
    /// One child per roster entry.
    PerEntity,
}

/// What the container signals to the host for layout purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Render normally with default margins.
    Visible,
    /// Collapse: hidden, zero margin.
    Hidden,
}

/// A child widget and the configuration it was built from.
struct ChildWidget {
    config: Value,
    instance: Box<dyn WidgetInstance>,
}

/// A dynamically resolved entity roster driving child dashboard widgets.
///
/// Cloning shares the underlying card; the clone is how hosts wire the card
/// into signal connections and deferred tasks.
#[derive(Clone)]
pub struct RosterCard {
    inner: Arc<CardInner>,
}

struct CardInner {
    services: HostServices,
    /// The accepted configuration; `None` until the first successful
    /// `configure`.
    config: RwLock<Option<CardConfig>>,
    /// The accepted raw configuration value, passed to the template channel
    /// as the `config` variable.
    config_value: RwLock<Value>,
    /// The lifecycle mode, fixed by the first configuration.
    mode: RwLock<Option<LifecycleMode>>,
    snapshot: RwLock<Arc<StateSnapshot>>,
    /// The most recent rendered template result; `None` when the
    /// configuration has no template.
    template: RwLock<Option<String>>,
    template_sub: Mutex<Option<TemplateSubscription>>,
    children: Mutex<Vec<ChildWidget>>,
    /// The previous resolved roster; the change gate for downstream work.
    resolved: Property<Vec<RosterEntry>>,
    visibility: Property<Visibility>,
    visibility_changed: Signal<Visibility>,
    /// Coalesces shared-mode state churn into one deferred refresh per tick.
    state_refresh_queued: AtomicBool,
}

impl RosterCard {
    /// Create an unconfigured card wired to the given host services.
    pub fn new(services: HostServices) -> Self {
        Self {
            inner: Arc::new(CardInner {
                services,
                config: RwLock::new(None),
                config_value: RwLock::new(Value::Null),
                mode: RwLock::new(None),
                snapshot: RwLock::new(Arc::new(StateSnapshot::new())),
                template: RwLock::new(None),
                template_sub: Mutex::new(None),
                children: Mutex::new(Vec::new()),
                resolved: Property::new(Vec::new()),
                visibility: Property::new(Visibility::Visible),
                visibility_changed: Signal::new(),
                state_refresh_queued: AtomicBool::new(false),
            }),
        }
    }

    /// Accept a configuration.
    ///
    /// The first successful call stores the configuration, acquires the
    /// current state snapshot, runs the pipeline once, and initializes the
    /// child lifecycle in the mode selected by `auto_cards`. Every later call
    /// replaces the stored configuration wholesale; the snapshot is retained
    /// and the roster re-resolves on the next trigger (the metadata load
    /// requested below guarantees one).
    ///
    /// In both cases the template subscription is replaced - the previous one
    /// is closed first - and a metadata load is requested.
    pub fn configure(&self, raw: Value) -> ConfigResult<()> {
        let config_value = raw.clone();
        let config = CardConfig::from_value(raw)?;
        let inner = &self.inner;

        let first = inner.config.read().is_none();
        *inner.config_value.write() = config_value;

        if first {
            *inner.config.write() = Some(config.clone());
            *inner.snapshot.write() = inner.services.states.snapshot();

            let mode = if config.auto_cards {
                LifecycleMode::PerEntity
            } else {
                LifecycleMode::Shared
            };
            *inner.mode.write() = Some(mode);
            tracing::debug!(
                target: "horizon_roster::card",
                ?mode,
                "first configuration accepted"
            );

            let entries = inner.run_pipeline(&config);
            inner.resolved.set_silent(entries.clone());
            inner.rebuild_children(&config, &entries);
            inner.update_visibility(&config, entries.is_empty());
        } else {
            tracing::debug!(target: "horizon_roster::card", "configuration replaced");
            *inner.config.write() = Some(config.clone());
        }

        CardInner::subscribe_template(inner, &config);
        CardInner::request_metadata(inner);
        Ok(())
    }

    /// Replace the state snapshot.
    ///
    /// In per-entity mode the snapshot is forwarded to every child and the
    /// roster re-resolves synchronously. In shared mode both steps are
    /// deferred to the next tick of the host's queue, and bursts within one
    /// tick coalesce into a single refresh.
    pub fn set_state(&self, snapshot: Arc<StateSnapshot>) {
        let inner = &self.inner;
        *inner.snapshot.write() = snapshot;

        let mode = *inner.mode.read();
        match mode {
            None => {}
            Some(LifecycleMode::PerEntity) => {
                inner.forward_state_to_children();
                inner.refresh();
            }
            Some(LifecycleMode::Shared) => {
                if !inner.state_refresh_queued.swap(true, Ordering::SeqCst) {
                    let weak = Arc::downgrade(inner);
                    inner.services.queue.defer(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.state_refresh_queued.store(false, Ordering::SeqCst);
                            inner.forward_state_to_children();
                            inner.refresh();
                        }
                    });
                }
            }
        }
    }

    /// The current resolved roster.
    pub fn entries(&self) -> Vec<RosterEntry> {
        self.inner.resolved.get()
    }

    /// The lifecycle mode, once configured.
    pub fn mode(&self) -> Option<LifecycleMode> {
        *self.inner.mode.read()
    }

    /// The number of live child widgets.
    pub fn child_count(&self) -> usize {
        self.inner.children.lock().len()
    }

    /// The container's current visibility.
    pub fn visibility(&self) -> Visibility {
        self.inner.visibility.get()
    }

    /// Emitted whenever the visibility policy flips the container.
    pub fn visibility_changed(&self) -> &Signal<Visibility> {
        &self.inner.visibility_changed
    }

    /// Aggregate a reportable size for host layout.
    ///
    /// Sums each child's self-reported size (an unavailable report counts as
    /// 0). A sum of exactly 1 with a non-empty roster is replaced by the
    /// roster length - a single shared child under-reports when it renders
    /// many entities. A sum of 0 with include rules configured falls back to
    /// the include-rule count. Never reports less than 1.
    pub fn card_size(&self) -> usize {
        let inner = &self.inner;

        let mut size: usize = {
            let children = inner.children.lock();
            children
                .iter()
                .map(|child| child.instance.size_hint().unwrap_or(0) as usize)
                .sum()
        };

        let resolved_len = inner.resolved.with(Vec::len);
        if size == 1 && resolved_len > 0 {
            size = resolved_len;
        }
        if size == 0 {
            let config = inner.config.read();
            if let Some(filter) = config.as_ref().and_then(|c| c.filter.as_ref()) {
                size = filter.include.len();
            }
        }
        size.max(1)
    }
}

impl CardInner {
    /// Re-resolve the roster and, if it changed, propagate downstream.
    fn refresh(&self) {
        let Some(config) = self.config.read().clone() else {
            return;
        };

        let entries = self.run_pipeline(&config);
        if self.resolved.set(entries.clone()) {
            self.apply_resolved(&config, &entries);
        } else {
            tracing::trace!(target: "horizon_roster::card", "roster unchanged, discarding run");
        }
    }

    fn run_pipeline(&self, config: &CardConfig) -> Vec<RosterEntry> {
        let snapshot = self.snapshot.read().clone();
        let template = self.template.read().clone();
        let ctx = PipelineContext {
            snapshot: &snapshot,
            predicates: self.services.predicates.as_ref(),
            comparators: self.services.comparators.as_ref(),
        };
        pipeline::resolve(config, template.as_deref(), &ctx)
    }

    /// The side-effect half of a roster change: widget update + visibility.
    fn apply_resolved(&self, config: &CardConfig, entries: &[RosterEntry]) {
        let mode = *self.mode.read();
        match mode {
            None => {}
            Some(LifecycleMode::Shared) => self.patch_shared_child(entries),
            Some(LifecycleMode::PerEntity) => self.rebuild_children(config, entries),
        }
        self.update_visibility(config, entries.is_empty());
    }

    /// Discard and rebuild every child widget from the roster.
    fn rebuild_children(&self, config: &CardConfig, entries: &[RosterEntry]) {
        let Some(mode) = *self.mode.read() else {
            return;
        };
        let snapshot = self.snapshot.read().clone();

        let mut children = self.children.lock();
        children.clear();
        match mode {
            LifecycleMode::Shared => {
                let child_config = shared_child_config(config, entries);
                let instance = self.services.widgets.create(&child_config);
                instance.set_state(&snapshot);
                children.push(ChildWidget {
                    config: child_config,
                    instance,
                });
            }
            LifecycleMode::PerEntity => {
                for entry in entries {
                    let child_config = per_entity_child_config(config, entry);
                    let instance = self.services.widgets.create(&child_config);
                    instance.set_state(&snapshot);
                    children.push(ChildWidget {
                        config: child_config,
                        instance,
                    });
                }
            }
        }
        tracing::debug!(
            target: "horizon_roster::card",
            children = children.len(),
            "child widgets rebuilt"
        );
    }

    /// Merge the new roster into the shared child's configuration and
    /// reconfigure it in place.
    fn patch_shared_child(&self, entries: &[RosterEntry]) {
        let mut children = self.children.lock();
        let Some(child) = children.first_mut() else {
            return;
        };
        if let Value::Object(map) = &mut child.config {
            map.insert("entities".to_string(), entries_to_value(entries));
        }
        child.instance.set_config(&child.config);
        tracing::debug!(target: "horizon_roster::card", "shared child reconfigured");
    }

    fn forward_state_to_children(&self) {
        let snapshot = self.snapshot.read().clone();
        let children = self.children.lock();
        for child in children.iter() {
            child.instance.set_state(&snapshot);
        }
    }

    fn update_visibility(&self, config: &CardConfig, empty: bool) {
        let visibility = if empty && !config.show_empty {
            Visibility::Hidden
        } else {
            Visibility::Visible
        };
        if self.visibility.set(visibility) {
            tracing::debug!(target: "horizon_roster::card", ?visibility, "visibility changed");
            self.visibility_changed.emit(visibility);
        }
    }

    /// Replace the template subscription for a newly accepted configuration.
    ///
    /// The previous subscription is always closed first, so pushes rendered
    /// against superseded template criteria can never mutate this card.
    fn subscribe_template(inner: &Arc<Self>, config: &CardConfig) {
        if let Some(previous) = inner.template_sub.lock().take() {
            previous.close();
        }

        let filter = config.filter.as_ref();
        let Some(template) = filter.and_then(|f| f.template.clone()) else {
            *inner.template.write() = None;
            return;
        };

        *inner.template.write() = Some(String::new());
        if !template_has_syntax(&template) {
            return;
        }

        let weak = Arc::downgrade(inner);
        let on_push: TemplatePush = Arc::new(move |rendered| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_template_push(rendered);
            }
        });
        let request = TemplateRequest {
            template,
            variables: json!({ "config": inner.config_value.read().clone() }),
            entity_ids: filter.and_then(|f| f.entity_ids.clone()),
        };
        let subscription = inner.services.templates.subscribe(request, on_push);
        *inner.template_sub.lock() = Some(subscription);
    }

    fn handle_template_push(&self, rendered: String) {
        tracing::trace!(
            target: "horizon_roster::card",
            len = rendered.len(),
            "template result pushed"
        );
        *self.template.write() = Some(rendered);
        self.refresh();
    }

    /// Request the one-shot metadata load and re-resolve when it completes,
    /// catching matching criteria that depend on metadata not yet available.
    fn request_metadata(inner: &Arc<Self>) {
        let weak = Arc::downgrade(inner);
        inner.services.metadata.load(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                tracing::trace!(target: "horizon_roster::card", "metadata load resolved");
                inner.refresh();
            }
        }));
    }
}

/// The shared child's configuration: the card template with the roster
/// merged in as `entities`.
fn shared_child_config(config: &CardConfig, entries: &[RosterEntry]) -> Value {
    let mut map = config.card.clone();
    map.insert("entities".to_string(), entries_to_value(entries));
    Value::Object(map)
}

/// A per-entity child's configuration: the entity parameter merged under the
/// card template, template keys winning on conflict.
fn per_entity_child_config(config: &CardConfig, entry: &RosterEntry) -> Value {
    let mut map = JsonMap::new();
    if let Some(id) = entry.entity_id() {
        map.insert(
            config.auto_cards_entity_param.clone(),
            Value::String(id.to_string()),
        );
    }
    for (key, value) in &config.card {
        map.insert(key.clone(), value.clone());
    }
    Value::Object(map)
}
