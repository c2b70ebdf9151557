#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![forbid(unsafe_code)]
#![allow(elided_lifetimes_in_paths, clippy::type_complexity)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Shared building blocks for the device provisioning SDK.
//!
//! Both the device-side registration clients and the operator-side
//! enrollment client talk to the same provisioning service. This crate holds
//! the pieces they have in common:
//!
//! - [`error`]: the boxed error alias and translation of service error
//!   responses into [`ServiceError`]s.
//! - [`sas`]: creation and parsing of shared access signatures.
//! - [`connection_string`]: parsing of `key=value;...` connection strings.
//! - [`user_agent`]: the `User-Agent` strings sent with every request.
//! - [`client`]: the HTTP request and response types that transports are
//!   built on, plus the client identity used for X.509 authentication.
//!
//! [`ServiceError`]: crate::error::ServiceError

pub mod client;
pub mod connection_string;
pub mod error;
pub mod sas;
pub mod user_agent;

pub use crate::client::{ClientIdentity, HttpRequest, HttpResponse};
pub use crate::connection_string::ConnectionString;
pub use crate::error::{BoxError, ServiceError};
pub use crate::sas::SharedAccessSignature;
