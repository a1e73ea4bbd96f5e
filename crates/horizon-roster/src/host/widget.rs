//! The host's widget factory and child widget contract.

use std::sync::Arc;

use serde_json::Value;

use crate::host::state::StateSnapshot;

/// A live child widget owned by the roster card.
pub trait WidgetInstance: Send + Sync {
    /// Forward a replaced state snapshot to the widget.
    fn set_state(&self, snapshot: &Arc<StateSnapshot>);

    /// Reconfigure the widget in place.
    fn set_config(&self, config: &Value);

    /// The widget's self-reported layout size, when it reports one.
    fn size_hint(&self) -> Option<u32> {
        None
    }
}

/// Turns a widget configuration into a live widget instance.
///
/// Creation is infallible by contract: the host convention is to return an
/// error-rendering instance for a bad configuration rather than fail the
/// caller, so widget failure modes stay on the host's side of the boundary.
pub trait WidgetFactory: Send + Sync {
    /// Create a widget for the given configuration.
    fn create(&self, config: &Value) -> Box<dyn WidgetInstance>;
}
