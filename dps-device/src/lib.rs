#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![forbid(unsafe_code)]
#![allow(elided_lifetimes_in_paths, clippy::type_complexity)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Device registration with the device provisioning service.
//!
//! A device registers once, or whenever it needs to learn which hub it
//! belongs to. Registration is asynchronous on the service side: the device
//! sends a registration request and then polls the operation it started
//! until the service assigns it to a hub, or refuses to.
//!
//! The crate is organised around the [`Service`] trait:
//!
//! - A [`Transport`] carries single requests to the service.
//!   [`HttpTransport`] does so over HTTPS through any HTTP backend service.
//! - A [`PollingStateMachine`] turns a transport into a
//!   `Service<RegistrationRequest>` whose futures resolve with the final
//!   [`RegistrationResult`]. [`PollingLayer`] builds one as a [`Layer`].
//! - [`X509Registration`] and [`SymmetricKeyRegistration`] gather the
//!   device's credentials from a [security client] and start registrations.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest")]
//! # async fn doc() -> Result<(), dps_device::BoxError> {
//! use dps_common::client::ReqwestClient;
//! use dps_device::security::SymmetricKeySecurity;
//! use dps_device::transport::HttpTransport;
//! use dps_device::SymmetricKeyRegistration;
//!
//! let transport = HttpTransport::new(ReqwestClient::new());
//! let security = SymmetricKeySecurity::new("my-device", "c2VjcmV0LWtleQ==");
//! let mut client = SymmetricKeyRegistration::new(
//!     "global.azure-devices-provisioning.net",
//!     "0ne00000001",
//!     transport,
//!     security,
//! );
//!
//! let result = client.register().await?;
//! println!("assigned to {:?}", result.assigned_hub);
//! # Ok(())
//! # }
//! ```
//!
//! [`Service`]: tower_service::Service
//! [`Layer`]: tower_layer::Layer
//! [`Transport`]: crate::transport::Transport
//! [`HttpTransport`]: crate::transport::HttpTransport
//! [security client]: crate::security

pub mod error;
pub mod polling;
pub mod registration;
pub mod security;
pub mod transport;
pub mod types;

pub use crate::polling::{CancelHandle, PollingLayer, PollingStateMachine};
pub use crate::registration::{Registration, SymmetricKeyRegistration, X509Registration};
pub use crate::types::{
    Authentication, OperationStatus, RegistrationRequest, RegistrationResult, RegistrationStatus,
};

/// Alias for a type-erased error type.
pub type BoxError = dps_common::BoxError;
