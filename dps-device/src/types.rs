//! Registration requests and the service's answers to them.

use dps_common::ClientIdentity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Everything needed to register one device.
#[derive(Clone, Debug)]
pub struct RegistrationRequest {
    /// The id the device registers under.
    pub registration_id: String,
    /// The host name of the provisioning service endpoint.
    pub provisioning_host: String,
    /// The id scope of the provisioning service instance.
    pub id_scope: String,
    /// Custom data forwarded to the allocation logic, if any.
    pub payload: Option<Value>,
    /// How the device proves its identity.
    pub authentication: Authentication,
    /// Appended to the user agent of every request.
    pub product_info: Option<String>,
}

impl RegistrationRequest {
    /// Creates a request without payload or product info.
    pub fn new(
        provisioning_host: impl Into<String>,
        id_scope: impl Into<String>,
        registration_id: impl Into<String>,
        authentication: Authentication,
    ) -> Self {
        RegistrationRequest {
            registration_id: registration_id.into(),
            provisioning_host: provisioning_host.into(),
            id_scope: id_scope.into(),
            payload: None,
            authentication,
            product_info: None,
        }
    }

    /// Attaches a custom payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Credentials presented with a registration request.
#[derive(Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Mutual TLS with the device's certificate.
    X509(ClientIdentity),
    /// A shared access signature token, sent in the `Authorization` header.
    SharedAccessSignature(String),
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authentication::X509(identity) => f.debug_tuple("X509").field(identity).finish(),
            Authentication::SharedAccessSignature(_) => f
                .debug_tuple("SharedAccessSignature")
                .field(&"<redacted>")
                .finish(),
        }
    }
}

/// The state of a registration as reported by the service.
///
/// Parsing is case-insensitive. Statuses this crate does not know about are
/// preserved in [`RegistrationStatus::Unknown`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegistrationStatus {
    /// The device is not assigned to a hub.
    Unassigned,
    /// Assignment is in progress; poll again later.
    Assigning,
    /// The device was assigned to a hub.
    Assigned,
    /// Assignment failed.
    Failed,
    /// The enrollment is disabled.
    Disabled,
    /// A status this crate does not recognise.
    Unknown(String),
}

impl RegistrationStatus {
    /// Returns `false` only for statuses that call for another poll.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RegistrationStatus::Assigning)
    }

    /// The wire representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            RegistrationStatus::Unassigned => "unassigned",
            RegistrationStatus::Assigning => "assigning",
            RegistrationStatus::Assigned => "assigned",
            RegistrationStatus::Failed => "failed",
            RegistrationStatus::Disabled => "disabled",
            RegistrationStatus::Unknown(status) => status,
        }
    }
}

impl From<String> for RegistrationStatus {
    fn from(status: String) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "unassigned" => RegistrationStatus::Unassigned,
            "assigning" => RegistrationStatus::Assigning,
            "assigned" => RegistrationStatus::Assigned,
            "failed" => RegistrationStatus::Failed,
            "disabled" => RegistrationStatus::Disabled,
            _ => RegistrationStatus::Unknown(status),
        }
    }
}

impl From<RegistrationStatus> for String {
    fn from(status: RegistrationStatus) -> Self {
        match status {
            RegistrationStatus::Unknown(status) => status,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The registration state of a device, returned once assignment finishes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    /// The id the device registered under.
    pub registration_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// When the registration was first created.
    pub created_date_time_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// The hub the device was assigned to.
    pub assigned_hub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// The device id within the assigned hub.
    pub device_id: Option<String>,
    /// The registration status.
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Why the device ended up where it did, e.g. `initialAssignment`.
    pub substatus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[allow(missing_docs)]
    pub generation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// When the registration last changed.
    pub last_updated_date_time_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Version of the registration record.
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Set when assignment failed.
    pub error_code: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Set when assignment failed.
    pub error_message: Option<String>,
    /// Data returned by custom allocation logic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// The body of a registration or operation status response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    /// Identifies the operation for later status queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// The operation status.
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Present once the operation reached a terminal state.
    pub registration_state: Option<RegistrationResult>,
}
