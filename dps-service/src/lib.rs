#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![forbid(unsafe_code)]
#![allow(elided_lifetimes_in_paths, clippy::type_complexity)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Enrollment management for the device provisioning service.
//!
//! Operators decide which devices may register, and how they are assigned
//! to hubs, by managing *enrollments*: individual enrollments for single
//! devices and enrollment groups for devices sharing an attestation. The
//! [`ProvisioningServiceClient`] creates, reads, updates and deletes them,
//! runs bulk operations, and queries enrollments and registration states a
//! page at a time through [`Query`].
//!
//! Like the device crate, the client is generic over its HTTP backend: any
//! `Service<HttpRequest, Response = HttpResponse> + Clone` will do.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest")]
//! # async fn doc() -> Result<(), dps_service::BoxError> {
//! use dps_common::client::ReqwestClient;
//! use dps_service::model::{
//!     AttestationMechanism, IndividualEnrollment, QuerySpecification, SymmetricKeyAttestation,
//! };
//! use dps_service::ProvisioningServiceClient;
//!
//! let client = ProvisioningServiceClient::from_connection_string(
//!     "HostName=my-dps.azure-devices-provisioning.net;SharedAccessKeyName=provisioningserviceowner;SharedAccessKey=a2V5",
//!     ReqwestClient::new(),
//! )?;
//!
//! let attestation = AttestationMechanism::symmetric_key(SymmetricKeyAttestation::default());
//! let enrollment = client
//!     .create_or_update_individual_enrollment(&IndividualEnrollment::new("my-device", attestation))
//!     .await?;
//! println!("created {} ({:?})", enrollment.registration_id, enrollment.etag);
//!
//! let mut query = client
//!     .query_individual_enrollments(QuerySpecification::new("SELECT * FROM enrollments"))
//!     .with_page_size(50);
//! while let Some(page) = query.next(&client).await? {
//!     for enrollment in page.items {
//!         println!("{}", enrollment.registration_id);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod model;
pub mod query;

pub use crate::client::{Credentials, ProvisioningServiceClient};
pub use crate::query::Query;
pub use dps_common::error::{ArgumentError, ErrorKind, ServiceError};

/// Alias for a type-erased error type.
pub type BoxError = dps_common::BoxError;
