//! Wire types of the enrollment management API.
//!
//! Fields the service fills in (timestamps, etags, registration state) are
//! optional so that locally built values serialize without them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether an enrollment accepts registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProvisioningStatus {
    /// Devices may register.
    Enabled,
    /// Registrations are refused.
    Disabled,
}

/// How the service picks a hub for a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllocationPolicy {
    /// Evenly distributed across the linked hubs.
    Hashed,
    /// The hub with the lowest latency to the device.
    GeoLatency,
    /// The single hub named by the enrollment.
    Static,
    /// Decided by an Azure Function, see [`CustomAllocationDefinition`].
    Custom,
}

/// The webhook consulted by the [`Custom`](AllocationPolicy::Custom)
/// allocation policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAllocationDefinition {
    /// URL of the function deciding the hub.
    pub webhook_url: String,
    /// API version of the request sent to the webhook.
    pub api_version: String,
}

/// What happens to a device's hub assignment when it registers again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprovisionPolicy {
    /// Re-evaluate the hub assignment on every registration.
    pub update_hub_assignment: bool,
    /// Move the device's twin to the new hub.
    pub migrate_device_data: bool,
}

/// Capabilities a device is provisioned with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    /// The device is an IoT Edge device.
    pub iot_edge: bool,
}

/// The twin a device starts out with on its hub.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialTwin {
    /// Tags of the twin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Value>,
    /// Desired properties of the twin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<InitialTwinProperties>,
}

/// Properties section of an [`InitialTwin`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialTwinProperties {
    /// Desired properties as a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<Value>,
}

// ===== attestation =====

/// The kind of attestation an enrollment uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationType {
    /// No attestation.
    #[serde(rename = "none")]
    None,
    /// TPM endorsement key.
    #[serde(rename = "tpm")]
    Tpm,
    /// X.509 certificates.
    #[serde(rename = "x509")]
    X509,
    /// Shared symmetric keys.
    #[serde(rename = "symmetricKey")]
    SymmetricKey,
}

/// How devices of an enrollment prove their identity.
///
/// Exactly one of the payload fields matches [`kind`](Self::kind); use the
/// constructors to keep them consistent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationMechanism {
    /// Which of the payload fields is set.
    #[serde(rename = "type")]
    pub kind: AttestationType,
    /// Set for TPM attestation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm: Option<TpmAttestation>,
    /// Set for X.509 attestation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x509: Option<X509Attestation>,
    /// Set for symmetric key attestation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric_key: Option<SymmetricKeyAttestation>,
}

impl AttestationMechanism {
    /// TPM attestation.
    pub fn tpm(attestation: TpmAttestation) -> Self {
        AttestationMechanism {
            kind: AttestationType::Tpm,
            tpm: Some(attestation),
            x509: None,
            symmetric_key: None,
        }
    }

    /// X.509 attestation.
    pub fn x509(attestation: X509Attestation) -> Self {
        AttestationMechanism {
            kind: AttestationType::X509,
            tpm: None,
            x509: Some(attestation),
            symmetric_key: None,
        }
    }

    /// Symmetric key attestation.
    pub fn symmetric_key(attestation: SymmetricKeyAttestation) -> Self {
        AttestationMechanism {
            kind: AttestationType::SymmetricKey,
            tpm: None,
            x509: None,
            symmetric_key: Some(attestation),
        }
    }
}

/// A TPM endorsement key, and optionally its storage root key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TpmAttestation {
    /// Base64 encoded endorsement key.
    pub endorsement_key: String,
    /// Base64 encoded storage root key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_root_key: Option<String>,
}

/// Symmetric keys shared with the devices. The service generates them when
/// they are left out.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetricKeyAttestation {
    /// Base64 encoded primary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    /// Base64 encoded secondary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_key: Option<String>,
}

impl std::fmt::Debug for SymmetricKeyAttestation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKeyAttestation")
            .field("primary_key", &self.primary_key.as_ref().map(|_| "<redacted>"))
            .field("secondary_key", &self.secondary_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// X.509 attestation: device certificates for individual enrollments, or
/// signing certificates / CA references for groups.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509Attestation {
    /// Certificates of an individual device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificates: Option<X509Certificates>,
    /// Certificates signing the devices of a group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_certificates: Option<X509Certificates>,
    /// CA certificates already uploaded to the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_references: Option<X509CaReferences>,
}

impl X509Attestation {
    /// Attests an individual device with its PEM certificate.
    pub fn from_client_certificate(primary: impl Into<String>) -> Self {
        X509Attestation {
            client_certificates: Some(X509Certificates::new(primary)),
            ..Default::default()
        }
    }

    /// Attests every device whose chain includes the PEM certificate.
    pub fn from_signing_certificate(primary: impl Into<String>) -> Self {
        X509Attestation {
            signing_certificates: Some(X509Certificates::new(primary)),
            ..Default::default()
        }
    }

    /// Attests devices against a CA certificate already uploaded to the
    /// service.
    pub fn from_ca_reference(primary: impl Into<String>) -> Self {
        X509Attestation {
            ca_references: Some(X509CaReferences {
                primary: Some(primary.into()),
                secondary: None,
            }),
            ..Default::default()
        }
    }
}

/// A primary and an optional secondary certificate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509Certificates {
    /// The primary certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<X509CertificateWithInfo>,
    /// The secondary certificate, used while rolling the primary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<X509CertificateWithInfo>,
}

impl X509Certificates {
    fn new(primary: impl Into<String>) -> Self {
        X509Certificates {
            primary: Some(X509CertificateWithInfo {
                certificate: Some(primary.into()),
                info: None,
            }),
            secondary: None,
        }
    }
}

/// A certificate as uploaded (`certificate`) or as reported back by the
/// service (`info`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509CertificateWithInfo {
    /// PEM or base64 encoded certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// Details reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<X509CertificateInfo>,
}

/// Details of a certificate, filled in by the service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509CertificateInfo {
    /// Subject distinguished name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    /// SHA-1 thumbprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1_thumbprint: Option<String>,
    /// SHA-256 thumbprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_thumbprint: Option<String>,
    /// Issuer distinguished name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_name: Option<String>,
    /// Start of the validity period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before_utc: Option<String>,
    /// End of the validity period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after_utc: Option<String>,
    /// Serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// X.509 version of the certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

/// Names of CA certificates registered with the service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509CaReferences {
    /// Name of the primary CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    /// Name of the secondary CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

// ===== enrollments =====

/// Registration status of a device, as seen by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrollmentStatus {
    /// Not registered yet.
    Unassigned,
    /// A registration is in progress.
    Assigning,
    /// Assigned to a hub.
    Assigned,
    /// The latest registration failed.
    Failed,
    /// The enrollment is disabled.
    Disabled,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

/// The outcome of a device's latest registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationState {
    /// Registration id of the device.
    pub registration_id: String,
    /// Time of the first registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time_utc: Option<String>,
    /// Hub the device was assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_hub: Option<String>,
    /// Device id on the assigned hub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Status of the latest registration.
    pub status: EnrollmentStatus,
    /// How the device data was handled on reassignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substatus: Option<String>,
    /// Service error code of a failed registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    /// Error message of a failed registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Time of the latest registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_date_time_utc: Option<String>,
    /// Sent as `If-Match` on delete when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Enrollment of a single device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualEnrollment {
    /// Registration id the device registers with.
    pub registration_id: String,
    /// Hub device id, defaults to the registration id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Outcome of the latest registration, set by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_state: Option<DeviceRegistrationState>,
    /// How devices prove their identity.
    pub attestation: AttestationMechanism,
    /// Capabilities of the provisioned device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<DeviceCapabilities>,
    /// Hub the device was last assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iot_hub_host_name: Option<String>,
    /// Twin the device starts out with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_twin: Option<InitialTwin>,
    /// Sent as `If-Match` on update and delete when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Whether registrations are accepted. The service defaults to enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_status: Option<ProvisioningStatus>,
    /// Behaviour when a registered device registers again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprovision_policy: Option<ReprovisionPolicy>,
    /// Creation time, set by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time_utc: Option<String>,
    /// Time of the last update, set by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_date_time_utc: Option<String>,
    /// Overrides the service-wide allocation policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_policy: Option<AllocationPolicy>,
    /// Host names of the hubs devices may be assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iot_hubs: Option<Vec<String>>,
    /// Webhook for the custom allocation policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_allocation_definition: Option<CustomAllocationDefinition>,
}

impl IndividualEnrollment {
    /// An enrollment with only the required fields set.
    pub fn new(registration_id: impl Into<String>, attestation: AttestationMechanism) -> Self {
        IndividualEnrollment {
            registration_id: registration_id.into(),
            device_id: None,
            registration_state: None,
            attestation,
            capabilities: None,
            iot_hub_host_name: None,
            initial_twin: None,
            etag: None,
            provisioning_status: None,
            reprovision_policy: None,
            created_date_time_utc: None,
            last_updated_date_time_utc: None,
            allocation_policy: None,
            iot_hubs: None,
            custom_allocation_definition: None,
        }
    }
}

/// Enrollment of every device sharing an attestation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentGroup {
    /// Identifies the group.
    pub enrollment_group_id: String,
    /// How devices prove their identity.
    pub attestation: AttestationMechanism,
    /// Capabilities of the provisioned device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<DeviceCapabilities>,
    /// Hub the device was last assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iot_hub_host_name: Option<String>,
    /// Twin the device starts out with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_twin: Option<InitialTwin>,
    /// Sent as `If-Match` on update when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Whether registrations are accepted. The service defaults to enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_status: Option<ProvisioningStatus>,
    /// Behaviour when a registered device registers again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprovision_policy: Option<ReprovisionPolicy>,
    /// Creation time, set by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time_utc: Option<String>,
    /// Time of the last update, set by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_date_time_utc: Option<String>,
    /// Overrides the service-wide allocation policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_policy: Option<AllocationPolicy>,
    /// Host names of the hubs devices may be assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iot_hubs: Option<Vec<String>>,
    /// Webhook for the custom allocation policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_allocation_definition: Option<CustomAllocationDefinition>,
}

impl EnrollmentGroup {
    /// A group with only the required fields set.
    pub fn new(enrollment_group_id: impl Into<String>, attestation: AttestationMechanism) -> Self {
        EnrollmentGroup {
            enrollment_group_id: enrollment_group_id.into(),
            attestation,
            capabilities: None,
            iot_hub_host_name: None,
            initial_twin: None,
            etag: None,
            provisioning_status: None,
            reprovision_policy: None,
            created_date_time_utc: None,
            last_updated_date_time_utc: None,
            allocation_policy: None,
            iot_hubs: None,
            custom_allocation_definition: None,
        }
    }
}

// ===== bulk operations =====

/// What a [`BulkEnrollmentOperation`] does to its enrollments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkEnrollmentMode {
    /// Create enrollments, failing for existing ones.
    #[serde(rename = "create")]
    Create,
    /// Create or replace enrollments.
    #[serde(rename = "update")]
    Update,
    /// Replace enrollments whose etag matches.
    #[serde(rename = "updateIfMatchETag")]
    UpdateIfMatchEtag,
    /// Delete enrollments.
    #[serde(rename = "delete")]
    Delete,
}

/// Several individual enrollments created, updated or deleted at once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnrollmentOperation {
    /// What to do with the enrollments.
    pub mode: BulkEnrollmentMode,
    /// Enrollments to apply `mode` to.
    pub enrollments: Vec<IndividualEnrollment>,
}

/// Outcome of a [`BulkEnrollmentOperation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnrollmentOperationResult {
    /// `true` if every enrollment succeeded.
    pub is_successful: bool,
    /// One entry per failed enrollment.
    #[serde(default)]
    pub errors: Vec<BulkEnrollmentOperationError>,
}

/// Why one enrollment of a bulk operation failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnrollmentOperationError {
    /// Registration id of the failed enrollment.
    pub registration_id: String,
    /// Service error code.
    pub error_code: i64,
    /// Description of the error.
    pub error_status: String,
}

// ===== queries =====

/// A query in the service's SQL dialect, e.g. `SELECT * FROM enrollments`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpecification {
    /// The query text.
    pub query: String,
}

impl QuerySpecification {
    /// Wraps `query`.
    pub fn new(query: impl Into<String>) -> Self {
        QuerySpecification {
            query: query.into(),
        }
    }
}

/// One page of query results.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult<T> {
    /// Items of this page.
    pub items: Vec<T>,
    /// Token for the next page, `None` on the last one.
    pub continuation_token: Option<String>,
}
