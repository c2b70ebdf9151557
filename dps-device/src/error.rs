//! Error types for device registration.
//!
//! Registration futures fail with a [`BoxError`]; the types in this module
//! can be recovered from it with [`downcast_ref`].
//!
//! [`BoxError`]: crate::BoxError
//! [`downcast_ref`]: std::error::Error::downcast_ref

use crate::types::{RegistrationResult, RegistrationStatus};
use std::fmt;

/// The registration was canceled before it completed.
pub struct Canceled {
    _p: (),
}

impl Canceled {
    pub(crate) fn new() -> Self {
        Canceled { _p: () }
    }
}

impl fmt::Debug for Canceled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Canceled")
    }
}

impl fmt::Display for Canceled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("registration canceled")
    }
}

impl std::error::Error for Canceled {}

/// The service finished the registration with a failure status.
#[derive(Debug)]
pub struct RegistrationFailed {
    status: RegistrationStatus,
    result: Option<RegistrationResult>,
}

impl RegistrationFailed {
    pub(crate) fn new(status: RegistrationStatus, result: Option<RegistrationResult>) -> Self {
        RegistrationFailed { status, result }
    }

    /// The terminal status, `failed` or `disabled`.
    pub fn status(&self) -> &RegistrationStatus {
        &self.status
    }

    /// The registration state the service reported alongside the failure.
    pub fn result(&self) -> Option<&RegistrationResult> {
        self.result.as_ref()
    }
}

impl fmt::Display for RegistrationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registration {}", self.status)?;
        if let Some(message) = self.result.as_ref().and_then(|r| r.error_message.as_ref()) {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for RegistrationFailed {}

/// The service answered with a status that neither completes the
/// registration nor asks for another poll.
#[derive(Debug)]
pub struct UnexpectedStatus {
    status: RegistrationStatus,
}

impl UnexpectedStatus {
    pub(crate) fn new(status: RegistrationStatus) -> Self {
        UnexpectedStatus { status }
    }

    /// The status that was received.
    pub fn status(&self) -> &RegistrationStatus {
        &self.status
    }
}

impl fmt::Display for UnexpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected registration status '{}'", self.status)
    }
}

impl std::error::Error for UnexpectedStatus {}

/// A response could not be understood.
#[derive(Debug)]
pub struct MalformedResponse {
    reason: String,
}

impl MalformedResponse {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        MalformedResponse {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MalformedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed response: {}", self.reason)
    }
}

impl std::error::Error for MalformedResponse {}
