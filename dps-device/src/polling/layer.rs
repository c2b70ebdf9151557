use super::{PollingStateMachine, DEFAULT_POLLING_INTERVAL};
use std::time::Duration;
use tower_layer::Layer;

/// Drives registrations through the wrapped transport with a
/// [`PollingStateMachine`].
#[derive(Debug, Clone)]
pub struct PollingLayer {
    default_interval: Duration,
}

impl PollingLayer {
    /// Polls at `default_interval` when the service gives no hint.
    pub fn new(default_interval: Duration) -> Self {
        PollingLayer { default_interval }
    }
}

impl Default for PollingLayer {
    fn default() -> Self {
        PollingLayer::new(DEFAULT_POLLING_INTERVAL)
    }
}

impl<T> Layer<T> for PollingLayer {
    type Service = PollingStateMachine<T>;

    fn layer(&self, transport: T) -> Self::Service {
        PollingStateMachine::with_default_interval(transport, self.default_interval)
    }
}
