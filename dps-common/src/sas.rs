//! Shared access signatures.
//!
//! A shared access signature (SAS) proves possession of a symmetric key
//! without sending the key itself. The token has the form
//!
//! ```text
//! SharedAccessSignature sr=<resource>&sig=<signature>&se=<expiry>[&skn=<key name>]
//! ```
//!
//! where `resource` is the URL-encoded resource URI, `expiry` is a UNIX
//! timestamp in seconds, and `signature` is the URL-encoded base64 of
//! `HMAC-SHA256(key, "<resource>\n<expiry>")`.

use crate::client::encode_component as encode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "SharedAccessSignature ";

/// Lifetime given to tokens when the caller does not pick one.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// A shared access signature token.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedAccessSignature {
    sr: String,
    sig: String,
    se: u64,
    skn: Option<String>,
}

// ===== impl SharedAccessSignature =====

impl SharedAccessSignature {
    /// Signs `resource_uri` with the base64-encoded `key`, valid until
    /// `expiry` (seconds since the UNIX epoch).
    pub fn create(
        resource_uri: &str,
        key_name: Option<&str>,
        key: &str,
        expiry: u64,
    ) -> Result<Self, SignatureError> {
        let sr = encode(resource_uri);
        let to_sign = format!("{}\n{}", sr, expiry);
        let sig = encode(&sign(key, to_sign.as_bytes())?);

        Ok(SharedAccessSignature {
            sr,
            sig,
            se: expiry,
            skn: key_name.map(encode),
        })
    }

    /// The URL-encoded resource URI this token grants access to.
    pub fn resource(&self) -> &str {
        &self.sr
    }

    /// The URL-encoded signature.
    pub fn signature(&self) -> &str {
        &self.sig
    }

    /// The expiry time in seconds since the UNIX epoch.
    pub fn expiry(&self) -> u64 {
        self.se
    }

    /// The name of the policy key used to sign, if any.
    pub fn key_name(&self) -> Option<&str> {
        self.skn.as_deref()
    }

    /// Returns `true` if the token is expired at `now` (seconds since the
    /// UNIX epoch).
    pub fn is_expired(&self, now: u64) -> bool {
        self.se <= now
    }
}

impl fmt::Display for SharedAccessSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}sr={}&sig={}&se={}", PREFIX, self.sr, self.sig, self.se)?;
        if let Some(skn) = &self.skn {
            write!(f, "&skn={}", skn)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SharedAccessSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the signature is a credential until it expires
        f.debug_struct("SharedAccessSignature")
            .field("sr", &self.sr)
            .field("se", &self.se)
            .field("skn", &self.skn)
            .finish()
    }
}

impl FromStr for SharedAccessSignature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| SignatureError::new("token must start with 'SharedAccessSignature '"))?;

        let (mut sr, mut sig, mut se, mut skn) = (None, None, None, None);
        for pair in fields.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| SignatureError::new(format!("malformed field '{}'", pair)))?;
            match name {
                "sr" => sr = Some(value.to_owned()),
                "sig" => sig = Some(value.to_owned()),
                "se" => {
                    let expiry = value
                        .parse::<u64>()
                        .map_err(|_| SignatureError::new("'se' must be an integer"))?;
                    se = Some(expiry);
                }
                "skn" => skn = Some(value.to_owned()),
                // unknown fields are tolerated, the service ignores them too
                _ => {}
            }
        }

        Ok(SharedAccessSignature {
            sr: sr.ok_or_else(|| SignatureError::new("missing 'sr'"))?,
            sig: sig.ok_or_else(|| SignatureError::new("missing 'sig'"))?,
            se: se.ok_or_else(|| SignatureError::new("missing 'se'"))?,
            skn,
        })
    }
}

/// Returns the UNIX timestamp `lifetime` from now.
pub fn expiry_from_now(lifetime: Duration) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    now.saturating_add(lifetime.as_secs())
}

/// Derives the symmetric key of a single device from the key of its
/// enrollment group.
pub fn derive_device_key(group_key: &str, registration_id: &str) -> Result<String, SignatureError> {
    sign(group_key, registration_id.as_bytes())
}

fn sign(key: &str, data: &[u8]) -> Result<String, SignatureError> {
    let key = STANDARD
        .decode(key)
        .map_err(|_| SignatureError::new("key is not valid base64"))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|_| SignatureError::new("key has an invalid length"))?;
    mac.update(data);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// A signature could not be created or parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureError {
    reason: String,
}

impl SignatureError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        SignatureError {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid shared access signature: {}", self.reason)
    }
}

impl std::error::Error for SignatureError {}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "c2VjcmV0LWtleQ==";

    #[test]
    fn token_format() {
        let sas =
            SharedAccessSignature::create("scope/registrations/dev-1", Some("registration"), KEY, 1700000000)
                .unwrap();
        let token = sas.to_string();

        assert!(token.starts_with("SharedAccessSignature sr=scope%2Fregistrations%2Fdev-1&sig="));
        assert!(token.ends_with("&se=1700000000&skn=registration"));
        assert!(!sas.signature().contains('+'));
        assert!(!sas.signature().contains('/'));
    }

    #[test]
    fn signature_is_deterministic_and_key_dependent() {
        let a = SharedAccessSignature::create("host", None, KEY, 10).unwrap();
        let b = SharedAccessSignature::create("host", None, KEY, 10).unwrap();
        let c = SharedAccessSignature::create("host", None, "b3RoZXIta2V5", 10).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.signature(), c.signature());
        assert!(!a.to_string().contains("skn="));
    }

    #[test]
    fn parses_what_it_prints() {
        let sas = SharedAccessSignature::create("my-hub.example.net", Some("owner"), KEY, 42).unwrap();
        let parsed: SharedAccessSignature = sas.to_string().parse().unwrap();

        assert_eq!(parsed, sas);
        assert_eq!(parsed.key_name(), Some("owner"));
        assert!(parsed.is_expired(42));
        assert!(!parsed.is_expired(41));
    }

    #[test]
    fn rejects_incomplete_tokens() {
        assert!("sr=a&sig=b&se=1".parse::<SharedAccessSignature>().is_err());
        assert!("SharedAccessSignature sr=a&se=1"
            .parse::<SharedAccessSignature>()
            .is_err());
        assert!("SharedAccessSignature sr=a&sig=b&se=soon"
            .parse::<SharedAccessSignature>()
            .is_err());
    }

    #[test]
    fn rejects_invalid_key() {
        let err = SharedAccessSignature::create("host", None, "not base64!", 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid shared access signature: key is not valid base64"
        );
    }

    #[test]
    fn device_key_derivation() {
        let first = derive_device_key(KEY, "dev-1").unwrap();
        let second = derive_device_key(KEY, "dev-2").unwrap();

        assert_ne!(first, second);
        assert_eq!(STANDARD.decode(&first).unwrap().len(), 32);
    }

    #[test]
    fn expiry_is_in_the_future() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        assert!(expiry_from_now(DEFAULT_LIFETIME) >= now + 3600);
    }
}
