use super::{Operation, TransportRequest, TransportResponse};
use crate::error::MalformedResponse;
use crate::types::{Authentication, OperationStatus};
use crate::BoxError;
use dps_common::client::{encode_component, HttpRequest, HttpResponse};
use dps_common::error::{retry_after, ServiceError};
use dps_common::user_agent::device_user_agent;
use futures_core::ready;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use http::Method;
use pin_project_lite::pin_project;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower_service::Service;
use tracing::trace;

/// The device API version spoken by [`HttpTransport`].
pub const API_VERSION: &str = "2019-03-31";

/// A [`Transport`] speaking the provisioning service's HTTPS API through an
/// HTTP backend.
///
/// Registration is a `PUT` to
/// `https://{host}/{id_scope}/registrations/{registration_id}/register`;
/// status queries are `GET`s of
/// `https://{host}/{id_scope}/registrations/{registration_id}/operations/{operation_id}`.
/// The `Retry-After` response header becomes the retry hint.
///
/// Shared access signatures are sent in the `Authorization` header. X.509
/// identities are attached to the request's extensions for the backend to
/// present during the TLS handshake.
///
/// [`Transport`]: super::Transport
#[derive(Clone, Debug)]
pub struct HttpTransport<S> {
    inner: S,
}

impl<S> HttpTransport<S> {
    /// Creates a transport sending requests through `inner`.
    pub fn new(inner: S) -> Self {
        HttpTransport { inner }
    }

    /// Get a reference to the inner service
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume `self`, returning the inner service
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Service<TransportRequest> for HttpTransport<S>
where
    S: Service<HttpRequest, Response = HttpResponse>,
    S::Error: Into<BoxError>,
{
    type Response = TransportResponse;
    type Error = BoxError;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        match to_http(&request) {
            Ok(request) => {
                trace!(method = %request.method(), uri = %request.uri(), "sending request");
                ResponseFuture::called(self.inner.call(request))
            }
            Err(error) => ResponseFuture::failed(error),
        }
    }
}

impl<S> super::Transport for HttpTransport<S>
where
    S: Service<HttpRequest, Response = HttpResponse>,
    S::Error: Into<BoxError>,
{
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    registration_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
}

fn to_http(request: &TransportRequest) -> Result<HttpRequest, BoxError> {
    let registration = &request.registration;
    let base = format!(
        "https://{}/{}/registrations/{}",
        registration.provisioning_host,
        encode_component(&registration.id_scope),
        encode_component(&registration.registration_id),
    );

    let (method, uri, body) = match &request.operation {
        Operation::Register => {
            let body = serde_json::to_string(&RegisterBody {
                registration_id: &registration.registration_id,
                payload: registration.payload.as_ref(),
            })?;
            let uri = format!("{}/register?api-version={}", base, API_VERSION);
            (Method::PUT, uri, body)
        }
        Operation::QueryStatus { operation_id } => {
            let uri = format!(
                "{}/operations/{}?api-version={}",
                base,
                encode_component(operation_id),
                API_VERSION
            );
            (Method::GET, uri, String::new())
        }
    };

    let builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .header(
            USER_AGENT,
            device_user_agent(env!("CARGO_PKG_VERSION"), registration.product_info.as_deref()),
        );
    let builder = match &registration.authentication {
        Authentication::SharedAccessSignature(token) => builder.header(AUTHORIZATION, token.as_str()),
        Authentication::X509(identity) => builder.extension(identity.clone()),
    };

    Ok(builder.body(body)?)
}

fn from_http(response: HttpResponse) -> Result<TransportResponse, BoxError> {
    let (parts, body) = response.into_parts();
    trace!(status = %parts.status, "received response");

    if !parts.status.is_success() {
        return Err(ServiceError::from_response(parts.status, &parts.headers, &body).into());
    }

    let status = serde_json::from_str::<OperationStatus>(&body)
        .map_err(|error| MalformedResponse::new(error.to_string()))?;

    Ok(TransportResponse {
        status,
        retry_after: retry_after(&parts.headers),
    })
}

pin_project! {
    /// Response future from [`HttpTransport`] services.
    #[derive(Debug)]
    pub struct ResponseFuture<F> {
        #[pin]
        state: State<F>,
    }
}

pin_project! {
    #[project = StateProj]
    #[derive(Debug)]
    enum State<F> {
        Called {
            #[pin]
            future: F,
        },
        Failed {
            error: Option<BoxError>,
        },
    }
}

impl<F> ResponseFuture<F> {
    fn called(future: F) -> Self {
        ResponseFuture {
            state: State::Called { future },
        }
    }

    fn failed(error: BoxError) -> Self {
        ResponseFuture {
            state: State::Failed { error: Some(error) },
        }
    }
}

impl<F, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<HttpResponse, E>>,
    E: Into<BoxError>,
{
    type Output = Result<TransportResponse, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            StateProj::Called { future } => {
                let response = ready!(future.poll(cx)).map_err(Into::into)?;
                Poll::Ready(from_http(response))
            }
            StateProj::Failed { error } => {
                Poll::Ready(Err(error.take().expect("polled after error")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RegistrationRequest, RegistrationStatus};
    use dps_common::ClientIdentity;
    use http::StatusCode;
    use std::time::Duration;

    fn request(authentication: Authentication, operation: Operation) -> TransportRequest {
        TransportRequest {
            registration: RegistrationRequest::new(
                "global.azure-devices-provisioning.net",
                "0ne00000001",
                "dev-1",
                authentication,
            ),
            operation,
        }
    }

    #[test]
    fn register_request() {
        let mut req = request(
            Authentication::SharedAccessSignature("SharedAccessSignature sr=x".into()),
            Operation::Register,
        );
        req.registration.payload = Some(serde_json::json!({ "site": "lab" }));

        let http = to_http(&req).unwrap();

        assert_eq!(http.method(), Method::PUT);
        assert_eq!(
            http.uri(),
            "https://global.azure-devices-provisioning.net/0ne00000001/registrations/dev-1/register?api-version=2019-03-31"
        );
        assert_eq!(http.headers()[AUTHORIZATION], "SharedAccessSignature sr=x");
        assert_eq!(http.headers()[ACCEPT], "application/json");
        assert!(http.headers()[USER_AGENT]
            .to_str()
            .unwrap()
            .starts_with("dps-device/"));
        assert_eq!(
            http.body(),
            r#"{"registrationId":"dev-1","payload":{"site":"lab"}}"#
        );
    }

    #[test]
    fn status_query_with_certificate() {
        let identity = ClientIdentity::from_pem("cert", "key");
        let req = request(
            Authentication::X509(identity.clone()),
            Operation::QueryStatus {
                operation_id: "4.abc.def".into(),
            },
        );

        let http = to_http(&req).unwrap();

        assert_eq!(http.method(), Method::GET);
        assert_eq!(
            http.uri(),
            "https://global.azure-devices-provisioning.net/0ne00000001/registrations/dev-1/operations/4.abc.def?api-version=2019-03-31"
        );
        assert!(http.headers().get(AUTHORIZATION).is_none());
        assert_eq!(http.extensions().get::<ClientIdentity>(), Some(&identity));
        assert_eq!(http.body(), "");
    }

    #[test]
    fn decodes_accepted_response() {
        let response = http::Response::builder()
            .status(StatusCode::ACCEPTED)
            .header("retry-after", "3")
            .body(r#"{"operationId":"op-1","status":"assigning"}"#.to_owned())
            .unwrap();

        let decoded = from_http(response).unwrap();

        assert_eq!(decoded.status.status, RegistrationStatus::Assigning);
        assert_eq!(decoded.status.operation_id.as_deref(), Some("op-1"));
        assert_eq!(decoded.retry_after, Some(Duration::from_secs(3)));
    }

    #[test]
    fn error_statuses_become_service_errors() {
        let response = http::Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .body(r#"{"errorCode":401002,"message":"unauthorized"}"#.to_owned())
            .unwrap();

        let error = from_http(response).unwrap_err();
        let error = error.downcast_ref::<ServiceError>().unwrap();

        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.error_code(), Some(401002));
    }

    #[test]
    fn undecodable_body_is_malformed() {
        let response = http::Response::builder()
            .status(StatusCode::OK)
            .body("<html>".to_owned())
            .unwrap();

        let error = from_http(response).unwrap_err();
        assert!(error.is::<MalformedResponse>());
    }
}
