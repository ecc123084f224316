//! Record identity.
//!
//! A record created on the client has no server identity yet, so it is
//! addressed by a random client-minted token until the remote store
//! confirms it. The wire form keeps the two shapes apart: Local keys carry
//! the [`LOCAL_KEY_PREFIX`], Remote keys are the server id verbatim.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix that marks a key string as client-minted.
pub const LOCAL_KEY_PREFIX: &str = "local:";

/// Identity of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Client-generated temporary identity, not yet confirmed by the server.
    Local(String),
    /// Server-issued identity.
    Remote(String),
}

impl Key {
    /// Mints a fresh Local key with a random token.
    #[must_use]
    pub fn new_local() -> Self {
        Self::Local(Uuid::new_v4().simple().to_string())
    }

    /// Creates a Local key from an existing token.
    #[must_use]
    pub fn local(token: impl Into<String>) -> Self {
        Self::Local(token.into())
    }

    /// Creates a Remote key from a server id.
    #[must_use]
    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote(id.into())
    }

    /// Classifies a wire-form key string.
    ///
    /// Anything carrying [`LOCAL_KEY_PREFIX`] is Local; every other string is
    /// taken as a server id.
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix(LOCAL_KEY_PREFIX) {
            Some(token) => Self::Local(token.to_string()),
            None => Self::Remote(s.to_string()),
        }
    }

    /// Reads a key out of a JSON value. Numbers are accepted as server ids.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(Self::parse(s)),
            serde_json::Value::Number(n) => Some(Self::Remote(n.to_string())),
            _ => None,
        }
    }

    /// Returns true for a client-minted key.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Returns the server id, if this key is Remote.
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Self::Remote(id) => Some(id),
            Self::Local(_) => None,
        }
    }

    /// The wire form as a JSON string value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::String(self.to_string())
    }
}

/// Returns true when a JSON value is a reference to a not-yet-persisted
/// record.
pub fn is_local_key(value: &serde_json::Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.starts_with(LOCAL_KEY_PREFIX))
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(token) => write!(f, "{LOCAL_KEY_PREFIX}{token}"),
            Self::Remote(id) => f.write_str(id),
        }
    }
}

impl FromStr for Key {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid key: {value}")))
    }
}
