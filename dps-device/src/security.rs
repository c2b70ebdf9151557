//! Sources of device credentials.
//!
//! Registration clients ask a security client for the registration id and
//! for the credentials to present. The concrete types here keep the
//! credentials in memory; implement the traits to fetch them from an HSM or
//! secure element instead.

use crate::BoxError;
use dps_common::sas::{derive_device_key, SharedAccessSignature, SignatureError};
use dps_common::ClientIdentity;
use std::fmt;

/// Key name used in device shared access signatures.
pub const REGISTRATION_KEY_NAME: &str = "registration";

/// Provides an X.509 identity.
pub trait X509SecurityClient {
    /// The id the device registers under.
    fn registration_id(&self) -> Result<String, BoxError>;

    /// The certificate chain and key to authenticate with.
    fn certificate(&self) -> Result<ClientIdentity, BoxError>;
}

/// Provides shared access signatures signed with a symmetric key.
pub trait SymmetricKeySecurityClient {
    /// The id the device registers under.
    fn registration_id(&self) -> Result<String, BoxError>;

    /// Signs a token for `{id_scope}/registrations/{registration_id}`,
    /// valid until `expiry` (seconds since the UNIX epoch).
    fn create_shared_access_signature(&self, id_scope: &str, expiry: u64) -> Result<String, BoxError>;
}

/// An X.509 identity held in memory.
#[derive(Clone, Debug)]
pub struct X509Security {
    registration_id: String,
    identity: ClientIdentity,
}

impl X509Security {
    /// Registers as `registration_id`, which must match the common name of
    /// the device certificate.
    pub fn new(registration_id: impl Into<String>, identity: ClientIdentity) -> Self {
        X509Security {
            registration_id: registration_id.into(),
            identity,
        }
    }
}

impl X509SecurityClient for X509Security {
    fn registration_id(&self) -> Result<String, BoxError> {
        Ok(self.registration_id.clone())
    }

    fn certificate(&self) -> Result<ClientIdentity, BoxError> {
        Ok(self.identity.clone())
    }
}

/// A symmetric key held in memory.
#[derive(Clone)]
pub struct SymmetricKeySecurity {
    registration_id: String,
    key: String,
}

impl SymmetricKeySecurity {
    /// Uses the base64-encoded `key` of an individual enrollment.
    pub fn new(registration_id: impl Into<String>, key: impl Into<String>) -> Self {
        SymmetricKeySecurity {
            registration_id: registration_id.into(),
            key: key.into(),
        }
    }

    /// Derives the device key from the base64-encoded key of its enrollment
    /// group.
    pub fn from_group_key(
        registration_id: impl Into<String>,
        group_key: &str,
    ) -> Result<Self, SignatureError> {
        let registration_id = registration_id.into();
        let key = derive_device_key(group_key, &registration_id)?;
        Ok(SymmetricKeySecurity {
            registration_id,
            key,
        })
    }
}

impl SymmetricKeySecurityClient for SymmetricKeySecurity {
    fn registration_id(&self) -> Result<String, BoxError> {
        Ok(self.registration_id.clone())
    }

    fn create_shared_access_signature(&self, id_scope: &str, expiry: u64) -> Result<String, BoxError> {
        let resource = format!("{}/registrations/{}", id_scope, self.registration_id);
        let sas = SharedAccessSignature::create(&resource, Some(REGISTRATION_KEY_NAME), &self.key, expiry)?;
        Ok(sas.to_string())
    }
}

impl fmt::Debug for SymmetricKeySecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKeySecurity")
            .field("registration_id", &self.registration_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP_KEY: &str = "Z3JvdXAta2V5LWZvci10ZXN0cw==";

    #[test]
    fn device_sas() {
        let security = SymmetricKeySecurity::new("dev-1", GROUP_KEY);
        let token = security
            .create_shared_access_signature("0ne00000001", 1_700_000_000)
            .unwrap();
        let sas: SharedAccessSignature = token.parse().unwrap();

        assert_eq!(sas.resource(), "0ne00000001%2Fregistrations%2Fdev-1");
        assert_eq!(sas.key_name(), Some(REGISTRATION_KEY_NAME));
        assert_eq!(sas.expiry(), 1_700_000_000);
    }

    #[test]
    fn group_key_is_derived_per_device() {
        let a = SymmetricKeySecurity::from_group_key("dev-a", GROUP_KEY).unwrap();
        let b = SymmetricKeySecurity::from_group_key("dev-b", GROUP_KEY).unwrap();

        assert_ne!(a.key, b.key);
        assert_ne!(a.key, GROUP_KEY);
        assert!(SymmetricKeySecurity::from_group_key("dev-a", "%%%").is_err());
    }

    #[test]
    fn invalid_key_fails_to_sign() {
        let security = SymmetricKeySecurity::new("dev-1", "not base64");
        assert!(security.create_shared_access_signature("scope", 1).is_err());
    }
}
