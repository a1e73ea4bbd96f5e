//! The entity-resolution pipeline.
//!
//! One call to [`resolve`] runs the whole pipeline: candidate assembly,
//! include rules, exclude rules, global sort with windowing, deduplication.
//! The result is recomputed from scratch on every trigger - never patched
//! incrementally - and is deterministic for a fixed configuration, snapshot,
//! and template result. Whether a recomputed roster propagates downstream is
//! the card's decision, not the pipeline's.

use crate::config::CardConfig;
use crate::entry::RosterEntry;
use crate::host::matcher::{ComparatorFactory, PredicateFactory};
use crate::host::state::StateSnapshot;
use crate::{dedup, filter, sort, source};

/// The collaborators one pipeline run needs.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    /// The current state snapshot.
    pub snapshot: &'a StateSnapshot,
    /// Builds include/exclude predicates.
    pub predicates: &'a dyn PredicateFactory,
    /// Builds sort comparators.
    pub comparators: &'a dyn ComparatorFactory,
}

/// Resolve the roster for one configuration, snapshot, and template result.
pub fn resolve(
    config: &CardConfig,
    template: Option<&str>,
    ctx: &PipelineContext<'_>,
) -> Vec<RosterEntry> {
    let mut entries = source::assemble(config, template);

    if let Some(filter_config) = &config.filter {
        filter::apply_includes(
            &mut entries,
            &filter_config.include,
            ctx.snapshot,
            ctx.predicates,
            ctx.comparators,
        );
        filter::apply_excludes(
            &mut entries,
            &filter_config.exclude,
            ctx.snapshot,
            ctx.predicates,
        );
    }

    if let Some(spec) = &config.sort {
        entries = sort::apply_global(entries, spec, ctx.snapshot, ctx.comparators);
    }

    if config.unique {
        entries = dedup::unique(entries);
    }

    tracing::debug!(
        target: "horizon_roster::pipeline",
        resolved = entries.len(),
        "pipeline run complete"
    );
    entries
}
