//! Connection strings of the form `HostName=...;SharedAccessKeyName=...;SharedAccessKey=...`.

use std::fmt;
use std::str::FromStr;

/// Field holding the host name of the service.
pub const HOST_NAME: &str = "HostName";
/// Field holding the name of the shared access policy.
pub const SHARED_ACCESS_KEY_NAME: &str = "SharedAccessKeyName";
/// Field holding the base64-encoded shared access key.
pub const SHARED_ACCESS_KEY: &str = "SharedAccessKey";

/// A parsed connection string.
///
/// Fields keep the order they were written in. Values may themselves contain
/// `=` (base64 keys usually do); only the first `=` of a segment separates
/// the name from the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    fields: Vec<(String, String)>,
}

impl ConnectionString {
    /// Parses a connection string.
    pub fn parse(s: &str) -> Result<Self, ConnectionStringError> {
        let mut fields = Vec::new();
        for segment in s.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::Malformed(segment.to_owned()))?;
            if name.is_empty() {
                return Err(ConnectionStringError::Malformed(segment.to_owned()));
            }
            fields.push((name.to_owned(), value.to_owned()));
        }
        Ok(ConnectionString { fields })
    }

    /// Parses a connection string and checks that every field in `required`
    /// is present and non-empty.
    pub fn parse_with(s: &str, required: &[&str]) -> Result<Self, ConnectionStringError> {
        let parsed = Self::parse(s)?;
        parsed.require(required)?;
        Ok(parsed)
    }

    /// Checks that every field in `required` is present and non-empty.
    pub fn require(&self, required: &[&str]) -> Result<(), ConnectionStringError> {
        match required
            .iter()
            .find(|name| self.get(name).map_or(true, str::is_empty))
        {
            Some(name) => Err(ConnectionStringError::Missing((*name).to_owned())),
            None => Ok(()),
        }
    }

    /// Looks a field up by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The `HostName` field.
    pub fn host_name(&self) -> Option<&str> {
        self.get(HOST_NAME)
    }

    /// The `SharedAccessKeyName` field.
    pub fn shared_access_key_name(&self) -> Option<&str> {
        self.get(SHARED_ACCESS_KEY_NAME)
    }

    /// The `SharedAccessKey` field.
    pub fn shared_access_key(&self) -> Option<&str> {
        self.get(SHARED_ACCESS_KEY)
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.fields {
            if name == SHARED_ACCESS_KEY {
                map.entry(name, &"<redacted>");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

/// A connection string could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStringError {
    /// A segment is not a `name=value` pair.
    Malformed(String),
    /// A required field is absent or empty.
    Missing(String),
}

impl fmt::Display for ConnectionStringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStringError::Malformed(segment) => {
                write!(f, "malformed connection string segment '{}'", segment)
            }
            ConnectionStringError::Missing(name) => {
                write!(f, "connection string is missing the '{}' field", name)
            }
        }
    }
}

impl std::error::Error for ConnectionStringError {}
