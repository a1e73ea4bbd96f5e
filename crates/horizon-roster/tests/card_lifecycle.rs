//! End-to-end tests for the roster card lifecycle: configuration, reactive
//! triggers, template subscriptions, child widget management, visibility, and
//! size reporting, all over mock host collaborators.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};

use horizon_roster::host::matcher::{EntityPredicate, EntryComparator};
use horizon_roster::prelude::*;

/// Route card logs through the test harness when `RUST_LOG` is set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

struct MockStates {
    snapshot: RwLock<Arc<StateSnapshot>>,
    changed: Signal<Arc<StateSnapshot>>,
}

impl MockStates {
    fn new(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            snapshot: RwLock::new(Arc::new(make_snapshot(ids))),
            changed: Signal::new(),
        })
    }

    fn replace(&self, ids: &[&str]) -> Arc<StateSnapshot> {
        let snapshot = Arc::new(make_snapshot(ids));
        *self.snapshot.write() = snapshot.clone();
        self.changed.emit(snapshot.clone());
        snapshot
    }
}

impl StateStore for MockStates {
    fn snapshot(&self) -> Arc<StateSnapshot> {
        self.snapshot.read().clone()
    }

    fn changed(&self) -> &Signal<Arc<StateSnapshot>> {
        &self.changed
    }
}

fn make_snapshot(ids: &[&str]) -> StateSnapshot {
    ids.iter()
        .map(|id| (id.to_string(), json!({"state": "on"})))
        .collect()
}

/// Matches on a `domain` criterion: identifier prefix up to the first dot.
struct DomainPredicates;

impl PredicateFactory for DomainPredicates {
    fn build(&self, rule: &MatchRule, _snapshot: &StateSnapshot) -> EntityPredicate {
        match rule.criteria.get("domain").and_then(|v| v.as_str()) {
            Some(domain) => {
                let prefix = format!("{domain}.");
                Box::new(move |id| id.starts_with(&prefix))
            }
            None => Box::new(|_| false),
        }
    }
}

/// Orders by entity identifier regardless of method.
struct IdComparators;

impl ComparatorFactory for IdComparators {
    fn build(&self, _spec: &SortSpec, _snapshot: &StateSnapshot) -> EntryComparator {
        Box::new(|a, b| match (a.entity_id(), b.entity_id()) {
            (Some(a), Some(b)) => a.cmp(b),
            _ => Ordering::Equal,
        })
    }
}

/// Everything one widget instance observed, inspectable from the test.
#[derive(Default)]
struct WidgetProbe {
    initial_config: Mutex<Value>,
    reconfigs: Mutex<Vec<Value>>,
    states_seen: AtomicUsize,
    size: Mutex<Option<u32>>,
}

struct ProbeWidget(Arc<WidgetProbe>);

impl WidgetInstance for ProbeWidget {
    fn set_state(&self, _snapshot: &Arc<StateSnapshot>) {
        self.0.states_seen.fetch_add(1, AtomicOrdering::SeqCst);
    }

    fn set_config(&self, config: &Value) {
        self.0.reconfigs.lock().push(config.clone());
    }

    fn size_hint(&self) -> Option<u32> {
        *self.0.size.lock()
    }
}

#[derive(Default)]
struct ProbeFactory {
    size: Option<u32>,
    probes: Mutex<Vec<Arc<WidgetProbe>>>,
}

impl ProbeFactory {
    fn reporting(size: Option<u32>) -> Arc<Self> {
        Arc::new(Self {
            size,
            probes: Mutex::new(Vec::new()),
        })
    }

    fn probe(&self, index: usize) -> Arc<WidgetProbe> {
        self.probes.lock()[index].clone()
    }

    fn created(&self) -> usize {
        self.probes.lock().len()
    }
}

impl WidgetFactory for ProbeFactory {
    fn create(&self, config: &Value) -> Box<dyn WidgetInstance> {
        let probe = Arc::new(WidgetProbe::default());
        *probe.initial_config.lock() = config.clone();
        *probe.size.lock() = self.size;
        self.probes.lock().push(probe.clone());
        Box::new(ProbeWidget(probe))
    }
}

struct SubscriptionRecord {
    request: TemplateRequest,
    push: horizon_roster::host::template::TemplatePush,
    open: Arc<AtomicBool>,
}

/// Records subscriptions; pushes are delivered only while the subscription
/// handle has not been closed.
#[derive(Default)]
struct MockTemplates {
    subscriptions: Mutex<Vec<SubscriptionRecord>>,
}

impl MockTemplates {
    fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    fn is_open(&self, index: usize) -> bool {
        self.subscriptions.lock()[index].open.load(AtomicOrdering::SeqCst)
    }

    fn template_of(&self, index: usize) -> String {
        self.subscriptions.lock()[index].request.template.clone()
    }

    fn push(&self, index: usize, rendered: &str) {
        let (push, open) = {
            let subs = self.subscriptions.lock();
            (subs[index].push.clone(), subs[index].open.clone())
        };
        if open.load(AtomicOrdering::SeqCst) {
            push(rendered.to_string());
        }
    }
}

impl TemplateChannel for MockTemplates {
    fn subscribe(
        &self,
        request: TemplateRequest,
        on_push: horizon_roster::host::template::TemplatePush,
    ) -> TemplateSubscription {
        let open = Arc::new(AtomicBool::new(true));
        self.subscriptions.lock().push(SubscriptionRecord {
            request,
            push: on_push,
            open: open.clone(),
        });
        let closer = open.clone();
        TemplateSubscription::new(move || closer.store(false, AtomicOrdering::SeqCst))
    }
}

/// Holds metadata callbacks until the test resolves them.
#[derive(Default)]
struct ManualMetadata {
    pending: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl ManualMetadata {
    fn resolve_all(&self) {
        let callbacks: Vec<_> = self.pending.lock().drain(..).collect();
        for callback in callbacks {
            callback();
        }
    }

    fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl MetadataLoader for ManualMetadata {
    fn load(&self, on_ready: Box<dyn FnOnce() + Send>) {
        self.pending.lock().push(on_ready);
    }
}

struct Harness {
    states: Arc<MockStates>,
    widgets: Arc<ProbeFactory>,
    templates: Arc<MockTemplates>,
    metadata: Arc<ManualMetadata>,
    queue: Arc<DeferredQueue>,
    card: RosterCard,
    /// The host-side connection forwarding snapshot changes into the card.
    forward_conn: ConnectionId,
}

fn harness(ids: &[&str], widget_size: Option<u32>) -> Harness {
    init_tracing();
    let states = MockStates::new(ids);
    let widgets = ProbeFactory::reporting(widget_size);
    let templates = Arc::new(MockTemplates::default());
    let metadata = Arc::new(ManualMetadata::default());
    let queue = Arc::new(DeferredQueue::new());

    let card = RosterCard::new(HostServices {
        states: states.clone(),
        predicates: Arc::new(DomainPredicates),
        comparators: Arc::new(IdComparators),
        widgets: widgets.clone(),
        templates: templates.clone(),
        metadata: metadata.clone(),
        queue: queue.clone(),
    });

    // The host forwards snapshot replacements into the card.
    let forwarded = card.clone();
    let forward_conn = states.changed.connect(move |snapshot| {
        forwarded.set_state(snapshot.clone());
    });

    Harness {
        states,
        widgets,
        templates,
        metadata,
        queue,
        card,
        forward_conn,
    }
}

fn entity_ids(entries: &[RosterEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|e| e.entity_id().map(String::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn static_entities_resolve_in_order() {
    let h = harness(&[], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "entities": ["light.a", "light.b"]
        }))
        .unwrap();

    assert_eq!(entity_ids(&h.card.entries()), vec!["light.a", "light.b"]);
    assert_eq!(h.widgets.created(), 1);
    assert_eq!(
        h.widgets.probe(0).initial_config.lock()["entities"],
        json!([{"entity": "light.a"}, {"entity": "light.b"}])
    );
}

#[test]
fn include_matches_only_requested_domain() {
    let h = harness(&["light.a", "switch.b"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "light"}]}
        }))
        .unwrap();

    assert_eq!(entity_ids(&h.card.entries()), vec!["light.a"]);
}

#[test]
fn exclude_cancels_include_and_hides_empty_container() {
    let h = harness(&["light.a", "switch.b"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {
                "include": [{"domain": "light"}],
                "exclude": [{"domain": "light"}]
            },
            "show_empty": false
        }))
        .unwrap();

    assert!(h.card.entries().is_empty());
    assert_eq!(h.card.visibility(), Visibility::Hidden);
}

#[test]
fn unique_collapses_duplicate_static_entries() {
    let h = harness(&[], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "entities": ["light.a", "light.a"],
            "unique": true
        }))
        .unwrap();

    assert_eq!(entity_ids(&h.card.entries()), vec!["light.a"]);
}

#[test]
fn sort_window_keeps_second_and_third_ranked() {
    let h = harness(
        &["light.d", "light.b", "light.e", "light.a", "light.c"],
        None,
    );
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "light"}]},
            "sort": {"method": "name", "first": 1, "count": 2}
        }))
        .unwrap();

    assert_eq!(entity_ids(&h.card.entries()), vec!["light.b", "light.c"]);
}

#[test]
fn rule_options_merge_with_placeholder_substitution() {
    let h = harness(&["light.kitchen"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{
                "domain": "light",
                "options": {"name": "this.entity_id"}
            }]}
        }))
        .unwrap();

    assert_eq!(
        h.widgets.probe(0).initial_config.lock()["entities"],
        json!([{"entity": "light.kitchen", "name": "light.kitchen"}])
    );
}

#[test]
fn directive_rows_survive_exclusion_untouched() {
    let h = harness(&["light.a"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {
                "include": [
                    {"type": "section", "label": "All"},
                    {"domain": "light"}
                ],
                "exclude": [{"domain": "light"}]
            }
        }))
        .unwrap();

    let entries = h.card.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0],
        RosterEntry::Directive(DirectiveEntry(
            json!({"type": "section", "label": "All"})
                .as_object()
                .unwrap()
                .clone()
        ))
    );
}

// ---------------------------------------------------------------------------
// Reactive behavior
// ---------------------------------------------------------------------------

#[test]
fn shared_mode_patches_child_in_place_on_state_change() {
    let h = harness(&["light.a"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "light"}]}
        }))
        .unwrap();
    assert_eq!(h.widgets.created(), 1);

    h.states.replace(&["light.a", "light.b"]);
    // Shared mode defers to the next tick; nothing happened yet.
    assert_eq!(entity_ids(&h.card.entries()), vec!["light.a"]);
    h.queue.run_pending();

    assert_eq!(entity_ids(&h.card.entries()), vec!["light.a", "light.b"]);
    // Same instance, reconfigured; not recreated.
    assert_eq!(h.widgets.created(), 1);
    let reconfigs = h.widgets.probe(0).reconfigs.lock().clone();
    assert_eq!(reconfigs.len(), 1);
    assert_eq!(
        reconfigs[0]["entities"],
        json!([{"entity": "light.a"}, {"entity": "light.b"}])
    );
}

#[test]
fn per_entity_mode_rebuilds_all_children_on_change() {
    let h = harness(&["light.a"], None);
    h.card
        .configure(json!({
            "card": {"type": "button"},
            "filter": {"include": [{"domain": "light"}]},
            "auto_cards": true
        }))
        .unwrap();
    assert_eq!(h.card.child_count(), 1);
    assert_eq!(h.widgets.created(), 1);

    h.states.replace(&["light.a", "light.b"]);
    // Per-entity mode is synchronous.
    assert_eq!(h.card.child_count(), 2);
    assert_eq!(h.widgets.created(), 3);
    assert_eq!(
        h.widgets.probe(2).initial_config.lock()["entity"],
        json!("light.b")
    );
}

#[test]
fn unchanged_roster_propagates_nothing() {
    let h = harness(&["light.a"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "light"}]}
        }))
        .unwrap();

    // Replace the snapshot with identical content; the roster diff gates the
    // downstream patch.
    h.states.replace(&["light.a"]);
    h.queue.run_pending();

    assert_eq!(h.widgets.created(), 1);
    assert!(h.widgets.probe(0).reconfigs.lock().is_empty());
}

#[test]
fn state_bursts_coalesce_into_one_shared_refresh() {
    let h = harness(&["light.a"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "light"}]}
        }))
        .unwrap();

    h.states.replace(&["light.a", "light.b"]);
    h.states.replace(&["light.a", "light.b", "light.c"]);
    h.states.replace(&["light.a", "light.b", "light.c", "light.d"]);
    assert_eq!(h.queue.pending_count(), 1);

    h.queue.run_pending();
    assert_eq!(h.card.entries().len(), 4);
    // One coalesced refresh, one patch.
    assert_eq!(h.widgets.probe(0).reconfigs.lock().len(), 1);
}

#[test]
fn snapshot_forwarded_to_children() {
    let h = harness(&["light.a"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "light"}]}
        }))
        .unwrap();
    let seeded = h.widgets.probe(0).states_seen.load(AtomicOrdering::SeqCst);

    h.states.replace(&["light.a"]);
    h.queue.run_pending();

    assert_eq!(
        h.widgets.probe(0).states_seen.load(AtomicOrdering::SeqCst),
        seeded + 1
    );
}

#[test]
fn metadata_resolution_triggers_reresolve() {
    // An `area` criterion can only match once the area metadata has loaded;
    // the re-resolve after the load must pick up the late matches.
    struct AreaPredicates {
        ready: Arc<AtomicBool>,
    }

    impl PredicateFactory for AreaPredicates {
        fn build(&self, rule: &MatchRule, _snapshot: &StateSnapshot) -> EntityPredicate {
            if rule.criteria.contains_key("area") && self.ready.load(AtomicOrdering::SeqCst) {
                Box::new(|id| id.starts_with("light."))
            } else {
                Box::new(|_| false)
            }
        }
    }

    let ready = Arc::new(AtomicBool::new(false));
    let states = MockStates::new(&["light.a", "switch.b"]);
    let metadata = Arc::new(ManualMetadata::default());
    let card = RosterCard::new(HostServices {
        states: states.clone(),
        predicates: Arc::new(AreaPredicates {
            ready: ready.clone(),
        }),
        comparators: Arc::new(IdComparators),
        widgets: ProbeFactory::reporting(None),
        templates: Arc::new(MockTemplates::default()),
        metadata: metadata.clone(),
        queue: Arc::new(DeferredQueue::new()),
    });

    card.configure(json!({
        "card": {"type": "entities"},
        "filter": {"include": [{"area": "kitchen"}]}
    }))
    .unwrap();
    assert_eq!(metadata.pending_count(), 1);
    assert!(card.entries().is_empty());

    ready.store(true, AtomicOrdering::SeqCst);
    metadata.resolve_all();

    assert_eq!(entity_ids(&card.entries()), vec!["light.a"]);
}

// ---------------------------------------------------------------------------
// Template subscription lifecycle
// ---------------------------------------------------------------------------

#[test]
fn template_with_markers_opens_subscription_and_pushes_resolve() {
    let h = harness(&[], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {
                "template": "{{ expand('group.lights') }}",
                "entity_ids": ["group.lights"]
            }
        }))
        .unwrap();

    assert_eq!(h.templates.subscription_count(), 1);
    assert_eq!(
        h.templates.template_of(0),
        "{{ expand('group.lights') }}"
    );

    h.templates.push(0, "light.a, light.b light.c");
    assert_eq!(
        entity_ids(&h.card.entries()),
        vec!["light.a", "light.b", "light.c"]
    );

    // A later push replaces the previous template contribution wholesale.
    h.templates.push(0, "light.z");
    assert_eq!(entity_ids(&h.card.entries()), vec!["light.z"]);
}

#[test]
fn markerless_template_opens_no_subscription() {
    let h = harness(&[], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"template": "light.a light.b"}
        }))
        .unwrap();

    assert_eq!(h.templates.subscription_count(), 0);
    // Without markers there is nothing live to render; the template
    // contributes nothing.
    assert!(h.card.entries().is_empty());
}

#[test]
fn reconfiguration_closes_previous_subscription() {
    let h = harness(&[], None);
    let with_template = |t: &str| {
        json!({
            "card": {"type": "entities"},
            "filter": {"template": t}
        })
    };

    h.card.configure(with_template("{{ one }}")).unwrap();
    assert_eq!(h.templates.subscription_count(), 1);
    assert!(h.templates.is_open(0));

    h.card.configure(with_template("{{ two }}")).unwrap();
    assert_eq!(h.templates.subscription_count(), 2);
    assert!(!h.templates.is_open(0));
    assert!(h.templates.is_open(1));

    // A stale push from the superseded subscription is dropped by the
    // channel and never mutates the card.
    h.templates.push(0, "light.stale");
    assert!(h.card.entries().is_empty());

    h.templates.push(1, "light.fresh");
    assert_eq!(entity_ids(&h.card.entries()), vec!["light.fresh"]);
}

#[test]
fn dropping_the_card_closes_its_subscription() {
    let h = harness(&[], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"template": "{{ anything }}"}
        }))
        .unwrap();
    assert!(h.templates.is_open(0));

    // Release the host's forwarding connection (the only other strong
    // reference), then drop the card itself.
    h.states.changed.disconnect(h.forward_conn);
    drop(h.card);
    assert!(!h.templates.is_open(0));
}

// ---------------------------------------------------------------------------
// Reconfiguration
// ---------------------------------------------------------------------------

#[test]
fn reconfiguration_replaces_config_wholesale() {
    let h = harness(&["light.a", "switch.b"], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "light"}]}
        }))
        .unwrap();
    assert_eq!(entity_ids(&h.card.entries()), vec!["light.a"]);
    h.metadata.resolve_all();

    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "switch"}]}
        }))
        .unwrap();

    // Replacement alone does not re-run the pipeline; the metadata load
    // requested by the reconfiguration provides the re-resolve.
    assert_eq!(entity_ids(&h.card.entries()), vec!["light.a"]);
    h.metadata.resolve_all();
    assert_eq!(entity_ids(&h.card.entries()), vec!["switch.b"]);
}

#[test]
fn mode_is_fixed_at_first_configuration() {
    let h = harness(&[], None);
    h.card
        .configure(json!({"card": {"type": "entities"}, "entities": ["light.a"]}))
        .unwrap();
    assert_eq!(h.card.mode(), Some(LifecycleMode::Shared));

    // A reconfiguration flipping auto_cards does not switch modes mid-life.
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "entities": ["light.a"],
            "auto_cards": true
        }))
        .unwrap();
    assert_eq!(h.card.mode(), Some(LifecycleMode::Shared));
}

// ---------------------------------------------------------------------------
// Size reporting
// ---------------------------------------------------------------------------

#[test]
fn size_expands_single_report_to_roster_length() {
    let h = harness(&[], Some(1));
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "entities": ["light.a", "light.b", "light.c"]
        }))
        .unwrap();
    assert_eq!(h.card.card_size(), 3);
}

#[test]
fn size_of_unreporting_children_falls_back_to_include_count() {
    let h = harness(&[], None);
    h.card
        .configure(json!({
            "card": {"type": "entities"},
            "filter": {"include": [{"domain": "light"}, {"domain": "switch"}, {"domain": "fan"}]}
        }))
        .unwrap();
    assert_eq!(h.card.card_size(), 3);
}
