//! The host's global event bus.

/// Events the roster fires at the host, fire-and-forget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// Ask the host to rebuild its card catalog. Carries no payload; the
    /// signal itself is the message.
    RebuildCardCatalog,
}

/// Fire-and-forget delivery into the host's event system.
pub trait HostBus: Send + Sync {
    /// Deliver an event. Must not block.
    fn fire(&self, event: HostEvent);
}

/// Announce the roster card type to the host.
///
/// Hosts call this once when registering the card type so the dashboard
/// refreshes its catalog.
pub fn request_catalog_rebuild(bus: &dyn HostBus) {
    tracing::debug!(target: "horizon_roster::host", "requesting card catalog rebuild");
    bus.fire(HostEvent::RebuildCardCatalog);
}
