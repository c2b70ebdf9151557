//! The enrollment management client.

pub mod future;

use self::future::{Decode, ResponseFuture};
use crate::model::{
    AttestationMechanism, BulkEnrollmentOperation, BulkEnrollmentOperationResult,
    DeviceRegistrationState, EnrollmentGroup, IndividualEnrollment, QueryResult,
    QuerySpecification,
};
use crate::query::Query;
use dps_common::client::{encode_component, HttpRequest, HttpResponse};
use dps_common::connection_string::{
    ConnectionString, ConnectionStringError, HOST_NAME, SHARED_ACCESS_KEY, SHARED_ACCESS_KEY_NAME,
};
use dps_common::error::{ArgumentError, BoxError};
use dps_common::sas::{expiry_from_now, SharedAccessSignature, DEFAULT_LIFETIME};
use dps_common::user_agent::service_user_agent;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, IF_MATCH, USER_AGENT};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tower::ServiceExt;
use tower_service::Service;
use tracing::debug;

/// The service API version spoken by [`ProvisioningServiceClient`].
pub const API_VERSION: &str = "2021-10-01";

/// Request header limiting the number of items in a query page.
pub const MAX_ITEM_COUNT: &str = "x-ms-max-item-count";

/// Request and response header carrying the query continuation token.
pub const CONTINUATION: &str = "x-ms-continuation";

/// A shared access policy of the provisioning service.
#[derive(Clone)]
pub struct Credentials {
    key_name: String,
    key: String,
}

impl Credentials {
    /// Uses the base64-encoded `key` of the policy named `key_name`.
    pub fn new(key_name: impl Into<String>, key: impl Into<String>) -> Self {
        Credentials {
            key_name: key_name.into(),
            key: key.into(),
        }
    }

    /// The policy name.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_name", &self.key_name)
            .finish()
    }
}

/// Manages enrollments, enrollment groups and registration states of a
/// provisioning service.
///
/// Requests go through `S`, any HTTP backend service. Every request is
/// signed with a fresh shared access signature for the service host.
///
/// # Clone
///
/// Each request drives its own clone of the backend to readiness, so the
/// backend must implement [`Clone`].
#[derive(Clone, Debug)]
pub struct ProvisioningServiceClient<S> {
    inner: S,
    host_name: String,
    credentials: Credentials,
    token_lifetime: Duration,
}

// ===== impl ProvisioningServiceClient =====

impl<S> ProvisioningServiceClient<S> {
    /// Creates a client for the service at `host_name`.
    pub fn new(host_name: impl Into<String>, credentials: Credentials, inner: S) -> Self {
        ProvisioningServiceClient {
            inner,
            host_name: host_name.into(),
            credentials,
            token_lifetime: DEFAULT_LIFETIME,
        }
    }

    /// Creates a client from a service connection string of the form
    /// `HostName=...;SharedAccessKeyName=...;SharedAccessKey=...`.
    pub fn from_connection_string(
        connection_string: &str,
        inner: S,
    ) -> Result<Self, ConnectionStringError> {
        let conn = ConnectionString::parse_with(
            connection_string,
            &[HOST_NAME, SHARED_ACCESS_KEY_NAME, SHARED_ACCESS_KEY],
        )?;
        let field = |name: &str| {
            conn.get(name)
                .map(str::to_owned)
                .ok_or_else(|| ConnectionStringError::Missing(name.to_owned()))
        };

        let credentials = Credentials::new(field(SHARED_ACCESS_KEY_NAME)?, field(SHARED_ACCESS_KEY)?);
        Ok(Self::new(field(HOST_NAME)?, credentials, inner))
    }

    /// Sets how long the signature of each request stays valid. Defaults to
    /// one hour.
    pub fn token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// The service host.
    pub fn host_name(&self) -> &str {
        &self.host_name
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

    fn builder(
        &self,
        method: Method,
        path: &str,
        etag: Option<&str>,
    ) -> Result<http::request::Builder, BoxError> {
        let sas = SharedAccessSignature::create(
            &self.host_name,
            Some(&self.credentials.key_name),
            &self.credentials.key,
            expiry_from_now(self.token_lifetime),
        )?;
        let uri = format!(
            "https://{}/{}?api-version={}",
            self.host_name, path, API_VERSION
        );

        let builder = http::Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, sas.to_string())
            .header(USER_AGENT, service_user_agent(env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json; charset=utf-8");
        Ok(match etag {
            Some(etag) => builder.header(IF_MATCH, etag),
            None => builder,
        })
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        etag: Option<&str>,
        body: String,
    ) -> Result<HttpRequest, BoxError> {
        Ok(self.builder(method, path, etag)?.body(body)?)
    }
}

impl<S> ProvisioningServiceClient<S>
where
    S: Service<HttpRequest, Response = HttpResponse> + Clone,
    S::Error: Into<BoxError>,
{
    /// Creates an individual enrollment, or replaces it.
    ///
    /// When the enrollment carries an etag the update only succeeds if it
    /// still matches the service's copy.
    pub fn create_or_update_individual_enrollment(
        &self,
        enrollment: &IndividualEnrollment,
    ) -> ResponseFuture<S, IndividualEnrollment> {
        let id = &enrollment.registration_id;
        let request = require("registration id", id)
            .and_then(|()| to_json(enrollment))
            .and_then(|body| {
                self.request(
                    Method::PUT,
                    &item_path("enrollments", id),
                    enrollment.etag.as_deref(),
                    body,
                )
            });
        self.send(request, decode_json)
    }

    /// Retrieves an individual enrollment.
    pub fn get_individual_enrollment(
        &self,
        registration_id: &str,
    ) -> ResponseFuture<S, IndividualEnrollment> {
        let request = require("registration id", registration_id).and_then(|()| {
            self.request(
                Method::GET,
                &item_path("enrollments", registration_id),
                None,
                String::new(),
            )
        });
        self.send(request, decode_json)
    }

    /// Retrieves the attestation of an individual enrollment, including the
    /// keys that reads of the enrollment leave out.
    pub fn get_individual_enrollment_attestation_mechanism(
        &self,
        registration_id: &str,
    ) -> ResponseFuture<S, AttestationMechanism> {
        let request = require("registration id", registration_id).and_then(|()| {
            let path = format!("{}/attestationmechanism", item_path("enrollments", registration_id));
            self.request(Method::POST, &path, None, String::new())
        });
        self.send(request, decode_json)
    }

    /// Deletes an individual enrollment, only if `etag` still matches when
    /// given.
    pub fn delete_individual_enrollment(
        &self,
        registration_id: &str,
        etag: Option<&str>,
    ) -> ResponseFuture<S, ()> {
        let request = require("registration id", registration_id).and_then(|()| {
            self.request(
                Method::DELETE,
                &item_path("enrollments", registration_id),
                etag,
                String::new(),
            )
        });
        self.send(request, decode_empty)
    }

    /// Creates an enrollment group, or replaces it.
    pub fn create_or_update_enrollment_group(
        &self,
        group: &EnrollmentGroup,
    ) -> ResponseFuture<S, EnrollmentGroup> {
        let id = &group.enrollment_group_id;
        let request = require("enrollment group id", id)
            .and_then(|()| to_json(group))
            .and_then(|body| {
                self.request(
                    Method::PUT,
                    &item_path("enrollmentGroups", id),
                    group.etag.as_deref(),
                    body,
                )
            });
        self.send(request, decode_json)
    }

    /// Retrieves an enrollment group.
    pub fn get_enrollment_group(
        &self,
        enrollment_group_id: &str,
    ) -> ResponseFuture<S, EnrollmentGroup> {
        let request = require("enrollment group id", enrollment_group_id).and_then(|()| {
            self.request(
                Method::GET,
                &item_path("enrollmentGroups", enrollment_group_id),
                None,
                String::new(),
            )
        });
        self.send(request, decode_json)
    }

    /// Retrieves the attestation of an enrollment group, including its keys.
    pub fn get_enrollment_group_attestation_mechanism(
        &self,
        enrollment_group_id: &str,
    ) -> ResponseFuture<S, AttestationMechanism> {
        let request = require("enrollment group id", enrollment_group_id).and_then(|()| {
            let path = format!(
                "{}/attestationmechanism",
                item_path("enrollmentGroups", enrollment_group_id)
            );
            self.request(Method::POST, &path, None, String::new())
        });
        self.send(request, decode_json)
    }

    /// Deletes an enrollment group, only if `etag` still matches when given.
    pub fn delete_enrollment_group(
        &self,
        enrollment_group_id: &str,
        etag: Option<&str>,
    ) -> ResponseFuture<S, ()> {
        let request = require("enrollment group id", enrollment_group_id).and_then(|()| {
            self.request(
                Method::DELETE,
                &item_path("enrollmentGroups", enrollment_group_id),
                etag,
                String::new(),
            )
        });
        self.send(request, decode_empty)
    }

    /// Retrieves the registration state of a device.
    pub fn get_device_registration_state(
        &self,
        registration_id: &str,
    ) -> ResponseFuture<S, DeviceRegistrationState> {
        let request = require("registration id", registration_id).and_then(|()| {
            self.request(
                Method::GET,
                &item_path("registrations", registration_id),
                None,
                String::new(),
            )
        });
        self.send(request, decode_json)
    }

    /// Deletes the registration state of a device, which lets it register
    /// from scratch.
    pub fn delete_device_registration_state(
        &self,
        registration_id: &str,
        etag: Option<&str>,
    ) -> ResponseFuture<S, ()> {
        let request = require("registration id", registration_id).and_then(|()| {
            self.request(
                Method::DELETE,
                &item_path("registrations", registration_id),
                etag,
                String::new(),
            )
        });
        self.send(request, decode_empty)
    }

    /// Creates, updates or deletes several individual enrollments at once.
    pub fn run_bulk_enrollment_operation(
        &self,
        operation: &BulkEnrollmentOperation,
    ) -> ResponseFuture<S, BulkEnrollmentOperationResult> {
        let request = operation
            .enrollments
            .iter()
            .try_for_each(|enrollment| require("registration id", &enrollment.registration_id))
            .and_then(|()| to_json(operation))
            .and_then(|body| self.request(Method::POST, "enrollments", None, body));
        self.send(request, decode_json)
    }

    /// Queries individual enrollments.
    pub fn query_individual_enrollments(
        &self,
        specification: QuerySpecification,
    ) -> Query<IndividualEnrollment> {
        Query::new("enrollments/query".to_owned(), specification)
    }

    /// Queries enrollment groups.
    pub fn query_enrollment_groups(
        &self,
        specification: QuerySpecification,
    ) -> Query<EnrollmentGroup> {
        Query::new("enrollmentGroups/query".to_owned(), specification)
    }

    /// Queries the registration states of the devices in an enrollment
    /// group.
    pub fn query_device_registration_states(
        &self,
        enrollment_group_id: &str,
        specification: QuerySpecification,
    ) -> Result<Query<DeviceRegistrationState>, ArgumentError> {
        ArgumentError::require_non_empty("enrollment group id", enrollment_group_id)?;
        let path = format!("{}/query", item_path("registrations", enrollment_group_id));
        Ok(Query::new(path, specification))
    }

    pub(crate) fn query_page<T>(
        &self,
        path: &str,
        specification: &QuerySpecification,
        page_size: Option<u32>,
        continuation_token: Option<&str>,
    ) -> ResponseFuture<S, QueryResult<T>>
    where
        T: DeserializeOwned,
    {
        let request = to_json(specification).and_then(|body| {
            let mut builder = self.builder(Method::POST, path, None)?;
            if let Some(page_size) = page_size.filter(|size| *size > 0) {
                builder = builder.header(MAX_ITEM_COUNT, page_size.to_string());
            }
            if let Some(token) = continuation_token {
                builder = builder.header(CONTINUATION, token);
            }
            Ok(builder.body(body)?)
        });
        self.send(request, decode_page)
    }

    fn send<T>(&self, request: Result<HttpRequest, BoxError>, decode: Decode<T>) -> ResponseFuture<S, T> {
        match request {
            Ok(request) => {
                debug!(method = %request.method(), uri = %request.uri(), "sending request");
                ResponseFuture::called(self.inner.clone().oneshot(request), decode)
            }
            Err(error) => {
                debug!(%error, "request rejected");
                ResponseFuture::failed(error)
            }
        }
    }
}

fn item_path(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, encode_component(id))
}

fn require(name: &str, value: &str) -> Result<(), BoxError> {
    ArgumentError::require_non_empty(name, value).map_err(Into::into)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, BoxError> {
    Ok(serde_json::to_string(value)?)
}

fn decode_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, BoxError> {
    Ok(serde_json::from_str(response.body())?)
}

fn decode_empty(_: HttpResponse) -> Result<(), BoxError> {
    Ok(())
}

fn decode_page<T: DeserializeOwned>(response: HttpResponse) -> Result<QueryResult<T>, BoxError> {
    let continuation_token = response
        .headers()
        .get(CONTINUATION)
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
        .map(str::to_owned);
    let items = serde_json::from_str(response.body())?;

    Ok(QueryResult {
        items,
        continuation_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_encode_ids() {
        assert_eq!(item_path("enrollments", "dev-1"), "enrollments/dev-1");
        assert_eq!(item_path("enrollments", "a/b"), "enrollments/a%2Fb");
    }

    #[test]
    fn connection_string_requires_every_field() {
        let err = ProvisioningServiceClient::from_connection_string(
            "HostName=dps.example.net;SharedAccessKeyName=owner",
            (),
        )
        .unwrap_err();
        assert_eq!(err, ConnectionStringError::Missing(SHARED_ACCESS_KEY.into()));

        let client = ProvisioningServiceClient::from_connection_string(
            "HostName=dps.example.net;SharedAccessKeyName=owner;SharedAccessKey=a2V5",
            (),
        )
        .unwrap();
        assert_eq!(client.host_name(), "dps.example.net");
        assert_eq!(client.credentials.key_name(), "owner");
    }

    #[test]
    fn credentials_debug_hides_key() {
        let credentials = Credentials::new("owner", "c2VjcmV0");
        assert!(!format!("{:?}", credentials).contains("c2VjcmV0"));
    }

    #[test]
    fn empty_page_has_no_continuation() {
        let response = http::Response::builder()
            .header(CONTINUATION, "")
            .body("[]".to_owned())
            .unwrap();
        let page: QueryResult<serde_json::Value> = decode_page(response).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.continuation_token, None);
    }
}
