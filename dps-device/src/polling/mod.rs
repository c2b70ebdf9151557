//! The state machine driving a registration to its outcome.
//!
//! Registering a device is asynchronous on the service side. The first
//! request either finishes the registration or returns an operation id with
//! status `assigning`; the client then waits (for the service's
//! `Retry-After` hint, or a default interval) and asks for the status of
//! that operation, repeating until the status is terminal:
//!
//! ```text
//!              register                 assigning
//!   Idle ─────────────────▶ Called ─────────────────▶ Waiting
//!                             │  ▲                      │
//!          assigned / failed  │  └──── status query ────┘
//!          / transport error  ▼         (timer fired)
//!                            Done ◀──── cancel (from Called or Waiting)
//! ```
//!
//! There is never more than one request in flight or one timer pending, and
//! each status query uses the operation id from the latest response.
//! Transport errors are not retried: they end the registration. Once the
//! registration has an outcome, or its future is dropped before having one,
//! the transport is [disconnected].
//!
//! [disconnected]: crate::transport::Transport::disconnect

mod cancel;
pub mod future;
mod layer;

pub use self::cancel::CancelHandle;
pub use self::layer::PollingLayer;

use self::future::ResponseFuture;
use crate::transport::Transport;
use crate::types::{RegistrationRequest, RegistrationResult};
use crate::BoxError;
use std::mem;
use std::task::{Context, Poll};
use std::time::Duration;
use tower_service::Service;

/// Interval between status queries when the service gives no hint.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(2);

/// Registers devices through a [`Transport`], polling until the service
/// reaches a verdict.
///
/// # Clone
///
/// Each registration owns its own clone of the transport, so the transport
/// must implement [`Clone`].
#[derive(Clone, Debug)]
pub struct PollingStateMachine<T> {
    transport: T,
    default_interval: Duration,
}

// ===== impl PollingStateMachine =====

impl<T> PollingStateMachine<T> {
    /// Creates a state machine polling at [`DEFAULT_POLLING_INTERVAL`] when
    /// the service gives no hint.
    pub fn new(transport: T) -> Self {
        Self::with_default_interval(transport, DEFAULT_POLLING_INTERVAL)
    }

    /// Creates a state machine polling at `default_interval` when the
    /// service gives no hint.
    pub fn with_default_interval(transport: T, default_interval: Duration) -> Self {
        PollingStateMachine {
            transport,
            default_interval,
        }
    }

    /// The interval used when the service gives no hint.
    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Get a reference to the inner transport
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the inner transport
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume `self`, returning the inner transport
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T> PollingStateMachine<T>
where
    T: Transport + Clone,
{
    /// Starts a registration without first waiting for readiness.
    ///
    /// The returned future drives the transport to readiness itself. Use
    /// [`ResponseFuture::cancel_handle`] to be able to cancel it.
    pub fn register(&self, request: RegistrationRequest) -> ResponseFuture<T> {
        ResponseFuture::new(self.transport.clone(), request, self.default_interval)
    }
}

impl<T> Service<RegistrationRequest> for PollingStateMachine<T>
where
    T: Transport + Clone,
{
    type Response = RegistrationResult;
    type Error = BoxError;
    type Future = ResponseFuture<T>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.transport.poll_ready(cx)
    }

    fn call(&mut self, request: RegistrationRequest) -> Self::Future {
        // the ready transport goes with the registration, a fresh clone stays
        let clone = self.transport.clone();
        let transport = mem::replace(&mut self.transport, clone);

        ResponseFuture::new(transport, request, self.default_interval)
    }
}
