//! The host's auxiliary metadata loader.

/// Loads area/device metadata that some matching criteria depend on.
///
/// The load is a one-shot push: `on_ready` is invoked exactly once, when the
/// metadata becomes available (immediately, if it already is). The card
/// requests a load on every configuration event and re-resolves when it
/// completes, catching criteria that could not match on the first pass.
pub trait MetadataLoader: Send + Sync {
    /// Request the metadata load.
    fn load(&self, on_ready: Box<dyn FnOnce() + Send>);
}
