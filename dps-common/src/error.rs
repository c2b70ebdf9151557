//! Error types shared by the device and service clients.

use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of an error response returned by the provisioning service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// `400`: the request was malformed or an argument was invalid.
    BadRequest,
    /// `401`: the credentials were rejected.
    Unauthorized,
    /// `403`: the caller may not perform this operation.
    Forbidden,
    /// `404`: the enrollment, registration or operation does not exist.
    NotFound,
    /// `409`: the resource conflicts with an existing one.
    Conflict,
    /// `412`: the supplied etag does not match the current resource.
    PreconditionFailed,
    /// `429`: the caller is being throttled.
    Throttled,
    /// `500`: the service failed internally.
    InternalServerError,
    /// `502`, `503` or `504`: the service is temporarily unavailable.
    ServiceUnavailable,
    /// Any other non-success status.
    Other,
}

impl ErrorKind {
    /// Classifies an HTTP status code.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            412 => ErrorKind::PreconditionFailed,
            429 => ErrorKind::Throttled,
            500 => ErrorKind::InternalServerError,
            502..=504 => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::Other,
        }
    }
}

/// An error response returned by the provisioning service.
#[derive(Clone, Debug)]
pub struct ServiceError {
    status: StatusCode,
    kind: ErrorKind,
    message: String,
    error_code: Option<u64>,
    tracking_id: Option<String>,
    retry_after: Option<Duration>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message")]
    message: Option<String>,
    #[serde(rename = "errorCode", alias = "ErrorCode")]
    error_code: Option<u64>,
    #[serde(rename = "trackingId", alias = "TrackingId")]
    tracking_id: Option<String>,
}

// ===== impl ServiceError =====

impl ServiceError {
    /// Builds an error from a non-success response.
    ///
    /// The body is expected to be the service's JSON error document. When it
    /// is not, the raw body (or the status' reason phrase if the body is
    /// empty) becomes the message.
    pub fn from_response(status: StatusCode, headers: &HeaderMap, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let (message, error_code, tracking_id) = match parsed {
            Some(ErrorBody {
                message: Some(message),
                error_code,
                tracking_id,
            }) => (message, error_code, tracking_id),
            Some(ErrorBody {
                message: None,
                error_code,
                tracking_id,
            }) => (fallback_message(status, body), error_code, tracking_id),
            None => (fallback_message(status, body), None, None),
        };

        ServiceError {
            status,
            kind: ErrorKind::from_status(status),
            message,
            error_code,
            tracking_id,
            retry_after: retry_after(headers),
        }
    }

    /// The HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The classification of the response status.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message reported by the service.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The service's numeric error code, if one was reported.
    pub fn error_code(&self) -> Option<u64> {
        self.error_code
    }

    /// The service's tracking id, useful when contacting support.
    pub fn tracking_id(&self) -> Option<&str> {
        self.tracking_id.as_deref()
    }

    /// The `Retry-After` hint sent with the response, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown service error")
            .to_owned()
    } else {
        body.to_owned()
    }
}

/// Reads a `Retry-After` header expressed in whole seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(http::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service returned {}: {}", self.status, self.message)?;
        if let Some(code) = self.error_code {
            write!(f, " (error code {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

/// An invalid argument was passed to an SDK operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentError {
    message: String,
}

// ===== impl ArgumentError =====

impl ArgumentError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        ArgumentError {
            message: message.into(),
        }
    }

    /// Fails with "`name` must not be empty" when `value` is empty.
    pub fn require_non_empty(name: &str, value: &str) -> Result<(), ArgumentError> {
        if value.is_empty() {
            Err(ArgumentError::new(format!("{} must not be empty", name)))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ArgumentError {}
