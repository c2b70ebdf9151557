#![allow(dead_code)]

use dps_device::transport::{Transport, TransportRequest, TransportResponse};
use dps_device::{
    Authentication, BoxError, OperationStatus, RegistrationRequest, RegistrationResult,
    RegistrationStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower_service::Service;
use tower_test::mock;

pub(crate) fn trace_init() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

pub(crate) type Handle = mock::Handle<TransportRequest, TransportResponse>;

/// A mock transport that counts how often it was disconnected.
#[derive(Clone)]
pub(crate) struct MockTransport {
    inner: mock::Mock<TransportRequest, TransportResponse>,
    disconnects: Arc<AtomicUsize>,
}

impl MockTransport {
    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl Service<TransportRequest> for MockTransport {
    type Response = TransportResponse;
    type Error = BoxError;
    type Future = mock::future::ResponseFuture<TransportResponse>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        self.inner.call(request)
    }
}

impl Transport for MockTransport {
    fn disconnect(&mut self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn new_transport() -> (MockTransport, Handle) {
    let (inner, handle) = mock::pair();
    let transport = MockTransport {
        inner,
        disconnects: Arc::new(AtomicUsize::new(0)),
    };
    (transport, handle)
}

/// Panics if the transport received a request.
pub(crate) fn assert_no_request(handle: &mut Handle) {
    if let Poll::Ready(Some((request, _))) = handle.poll_request() {
        panic!("unexpected request: {:?}", request);
    }
}

pub(crate) fn request() -> RegistrationRequest {
    RegistrationRequest::new(
        "global.azure-devices-provisioning.net",
        "0ne00000001",
        "dev-1",
        Authentication::SharedAccessSignature("SharedAccessSignature sr=test".into()),
    )
}

pub(crate) fn registration_state(status: RegistrationStatus) -> RegistrationResult {
    RegistrationResult {
        registration_id: "dev-1".into(),
        created_date_time_utc: None,
        assigned_hub: None,
        device_id: None,
        status,
        substatus: None,
        generation_id: None,
        last_updated_date_time_utc: None,
        etag: None,
        error_code: None,
        error_message: None,
        payload: None,
    }
}

pub(crate) fn assigned(hub: &str) -> TransportResponse {
    let mut state = registration_state(RegistrationStatus::Assigned);
    state.assigned_hub = Some(hub.into());
    state.device_id = Some("dev-1".into());

    TransportResponse {
        status: OperationStatus {
            operation_id: Some("op-final".into()),
            status: RegistrationStatus::Assigned,
            registration_state: Some(state),
        },
        retry_after: None,
    }
}

pub(crate) fn assigning(operation_id: &str, retry_after: Option<u64>) -> TransportResponse {
    TransportResponse {
        status: OperationStatus {
            operation_id: Some(operation_id.into()),
            status: RegistrationStatus::Assigning,
            registration_state: None,
        },
        retry_after: retry_after.map(Duration::from_secs),
    }
}

pub(crate) fn failed(message: &str) -> TransportResponse {
    let mut state = registration_state(RegistrationStatus::Failed);
    state.error_code = Some(400_207);
    state.error_message = Some(message.into());

    TransportResponse {
        status: OperationStatus {
            operation_id: Some("op-final".into()),
            status: RegistrationStatus::Failed,
            registration_state: Some(state),
        },
        retry_after: None,
    }
}

pub(crate) fn with_status(status: RegistrationStatus) -> TransportResponse {
    TransportResponse {
        status: OperationStatus {
            operation_id: Some("op-final".into()),
            status,
            registration_state: None,
        },
        retry_after: None,
    }
}
