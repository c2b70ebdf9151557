//! The seam between the polling state machine and the wire.
//!
//! A [`Transport`] is a [`Service`] that sends one [`TransportRequest`] to the
//! provisioning service and resolves with the decoded [`TransportResponse`].
//! It does not interpret statuses and never retries; that is left to the
//! [polling state machine].
//!
//! [polling state machine]: crate::polling::PollingStateMachine

mod http;

pub use self::http::{HttpTransport, ResponseFuture as HttpResponseFuture, API_VERSION};

use crate::types::{OperationStatus, RegistrationRequest};
use crate::BoxError;
use std::time::Duration;
use tower::timeout::Timeout;
use tower_service::Service;

/// A request sent through a [`Transport`].
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// The registration this request belongs to.
    pub registration: RegistrationRequest,
    /// What to ask the service.
    pub operation: Operation,
}

/// The operations a transport performs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Start (or restart) the registration.
    Register,
    /// Ask for the status of a pending registration.
    QueryStatus {
        /// The operation id returned by the service's latest response.
        operation_id: String,
    },
}

/// The service's answer to a [`TransportRequest`].
#[derive(Clone, Debug, PartialEq)]
pub struct TransportResponse {
    /// The decoded response body.
    pub status: OperationStatus,
    /// How long the service asked to wait before polling again.
    pub retry_after: Option<Duration>,
}

/// A connection to the provisioning service.
///
/// Stateless transports, such as HTTP, have nothing to tear down and can
/// rely on the default [`disconnect`]. Session-based transports close their
/// session there; it is called once the registration has an outcome.
///
/// [`disconnect`]: Transport::disconnect
pub trait Transport:
    Service<TransportRequest, Response = TransportResponse, Error = BoxError>
{
    /// Releases any session held with the service.
    fn disconnect(&mut self) {}
}

impl<T> Transport for Timeout<T>
where
    T: Transport,
{
    fn disconnect(&mut self) {
        self.get_mut().disconnect()
    }
}
