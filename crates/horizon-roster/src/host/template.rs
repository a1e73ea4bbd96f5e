//! The host's template rendering channel.
//!
//! A template subscription is a push channel: the host re-renders the
//! template whenever its inputs change and pushes each rendered string to the
//! callback, an unbounded number of times over the subscription's life.
//!
//! Teardown is explicit. [`TemplateSubscription`] closes on
//! [`close`](TemplateSubscription::close) or on drop, and a closed
//! subscription must not deliver further pushes; the card replaces its
//! subscription on every reconfiguration, so stale pushes from superseded
//! template criteria never reach it.

use std::sync::Arc;

use serde_json::Value;

/// Everything the channel needs to render and watch one template.
#[derive(Clone, Debug)]
pub struct TemplateRequest {
    /// The template source text.
    pub template: String,
    /// Variables made available to the template (the card passes its own
    /// configuration).
    pub variables: Value,
    /// Hint: the entities whose updates should trigger re-evaluation.
    pub entity_ids: Option<Vec<String>>,
}

/// The callback invoked with each rendered result.
pub type TemplatePush = Arc<dyn Fn(String) + Send + Sync>;

/// Subscribes to live template rendering.
pub trait TemplateChannel: Send + Sync {
    /// Open a subscription. `on_push` receives every rendered result until
    /// the returned handle is closed.
    fn subscribe(&self, request: TemplateRequest, on_push: TemplatePush) -> TemplateSubscription;
}

/// RAII handle for one template subscription.
///
/// Closing runs the channel-supplied teardown exactly once, whether via
/// [`close`](Self::close) or drop.
pub struct TemplateSubscription {
    closer: Option<Box<dyn FnOnce() + Send>>,
}

impl TemplateSubscription {
    /// Wrap a teardown closure supplied by the channel implementation.
    pub fn new<F>(closer: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            closer: Some(Box::new(closer)),
        }
    }

    /// A subscription with no teardown (for channels without server-side
    /// state).
    pub fn detached() -> Self {
        Self { closer: None }
    }

    /// Close the subscription now.
    pub fn close(mut self) {
        self.close_inner();
    }

    fn close_inner(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }
}

impl Drop for TemplateSubscription {
    fn drop(&mut self) {
        self.close_inner();
    }
}
