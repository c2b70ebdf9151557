mod support;

use dps_common::error::{ErrorKind, ServiceError};
use dps_common::{ClientIdentity, HttpRequest, HttpResponse};
use dps_device::security::{SymmetricKeySecurity, X509Security};
use dps_device::transport::HttpTransport;
use dps_device::{RegistrationStatus, SymmetricKeyRegistration, X509Registration};
use http::header::{AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use http::{Method, StatusCode};
use std::time::Duration;
use support::trace_init;
use tokio_test::{assert_pending, assert_ready_err, assert_ready_ok, task};
use tower_test::mock;

const HOST: &str = "dps.example.net";
const SCOPE: &str = "0ne00000001";

fn response(status: StatusCode, body: &str) -> HttpResponse {
    http::Response::builder()
        .status(status)
        .body(body.to_owned())
        .unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn registers_over_http() {
    let _t = trace_init();
    tokio::time::pause();
    let (service, mut handle) = mock::pair::<HttpRequest, HttpResponse>();
    let security = SymmetricKeySecurity::new("dev-1", "ZGV2aWNlLWtleQ==");
    let mut client = SymmetricKeyRegistration::new(HOST, SCOPE, HttpTransport::new(service), security);
    client.set_product_info("contoso/1.0");

    let mut fut = task::spawn(client.register());
    assert_pending!(fut.poll());

    let (req, send_response) = handle.next_request().await.unwrap();
    assert_eq!(req.method(), Method::PUT);
    assert_eq!(
        req.uri(),
        "https://dps.example.net/0ne00000001/registrations/dev-1/register?api-version=2019-03-31"
    );
    let auth = req.headers()[AUTHORIZATION].to_str().unwrap();
    assert!(auth.starts_with("SharedAccessSignature sr=0ne00000001%2Fregistrations%2Fdev-1&"));
    let user_agent = req.headers()[USER_AGENT].to_str().unwrap();
    assert!(user_agent.starts_with(&format!("dps-device/{} (", env!("CARGO_PKG_VERSION"))));
    assert!(user_agent.ends_with(" contoso/1.0"));
    let body: serde_json::Value = serde_json::from_str(req.body()).unwrap();
    assert_eq!(body, serde_json::json!({ "registrationId": "dev-1" }));

    let mut accepted = response(
        StatusCode::ACCEPTED,
        r#"{"operationId":"4.abc.def","status":"assigning"}"#,
    );
    accepted
        .headers_mut()
        .insert(RETRY_AFTER, "3".parse().unwrap());
    send_response.send_response(accepted);
    assert_pending!(fut.poll());

    tokio::time::advance(Duration::from_secs(3)).await;
    assert_pending!(fut.poll());

    let (req, send_response) = handle.next_request().await.unwrap();
    assert_eq!(req.method(), Method::GET);
    assert_eq!(
        req.uri(),
        "https://dps.example.net/0ne00000001/registrations/dev-1/operations/4.abc.def?api-version=2019-03-31"
    );
    send_response.send_response(response(
        StatusCode::OK,
        r#"{
            "operationId": "4.abc.def",
            "status": "assigned",
            "registrationState": {
                "registrationId": "dev-1",
                "assignedHub": "hub-1.example.net",
                "deviceId": "dev-1",
                "status": "assigned",
                "substatus": "initialAssignment",
                "etag": "\"1a00\"",
                "payload": { "firmware": "2.1" }
            }
        }"#,
    ));

    let result = assert_ready_ok!(fut.poll());
    assert_eq!(result.status, RegistrationStatus::Assigned);
    assert_eq!(result.assigned_hub.as_deref(), Some("hub-1.example.net"));
    assert_eq!(result.substatus.as_deref(), Some("initialAssignment"));
    assert_eq!(result.payload, Some(serde_json::json!({ "firmware": "2.1" })));
}

#[tokio::test(flavor = "current_thread")]
async fn x509_identity_travels_in_extensions() {
    let _t = trace_init();
    let (service, mut handle) = mock::pair::<HttpRequest, HttpResponse>();
    let identity = ClientIdentity::from_pem("chain", "key");
    let security = X509Security::new("dev-x509", identity);
    let mut client = X509Registration::new(HOST, SCOPE, HttpTransport::new(service), security);

    let mut fut = task::spawn(client.register());
    assert_pending!(fut.poll());

    let (req, send_response) = handle.next_request().await.unwrap();
    assert!(req.headers().get(AUTHORIZATION).is_none());
    let identity = req.extensions().get::<ClientIdentity>().unwrap();
    assert_eq!(identity.certificate_chain(), "chain");

    send_response.send_response(response(
        StatusCode::OK,
        r#"{"operationId":"1","status":"assigned","registrationState":{"registrationId":"dev-x509","status":"assigned"}}"#,
    ));
    assert_ready_ok!(fut.poll());
}

#[tokio::test(flavor = "current_thread")]
async fn service_error_ends_registration() {
    let _t = trace_init();
    let (service, mut handle) = mock::pair::<HttpRequest, HttpResponse>();
    let security = SymmetricKeySecurity::new("dev-1", "ZGV2aWNlLWtleQ==");
    let mut client = SymmetricKeyRegistration::new(HOST, SCOPE, HttpTransport::new(service), security);

    let mut fut = task::spawn(client.register());
    assert_pending!(fut.poll());

    let (_, send_response) = handle.next_request().await.unwrap();
    send_response.send_response(response(
        StatusCode::UNAUTHORIZED,
        r#"{"errorCode":401002,"trackingId":"t-1","message":"Unauthorized"}"#,
    ));

    let error = assert_ready_err!(fut.poll());
    let error = error.downcast_ref::<ServiceError>().unwrap();
    assert_eq!(error.kind(), ErrorKind::Unauthorized);
    assert_eq!(error.message(), "Unauthorized");
    assert_eq!(error.tracking_id(), Some("t-1"));
}
