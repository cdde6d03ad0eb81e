//! Strongly-typed identifiers used across the engine.

use core::str::FromStr;
use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AccessError;

/// Identifier of an authenticated session (key of the freshness gate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for SessionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for SessionId {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| AccessError::validation(format!("SessionId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 64;

/// Unique, case-sensitive name of a user account.
///
/// Naming policy: non-empty, at most [`MAX_USERNAME_LEN`] characters, made of
/// ASCII letters, digits and `_`, `-`, `.`, `@`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn parse(name: impl Into<String>) -> Result<Self, AccessError> {
        let name = name.into();

        if name.is_empty() {
            return Err(AccessError::InvalidUsername("username cannot be empty".into()));
        }
        if name.len() > MAX_USERNAME_LEN {
            return Err(AccessError::InvalidUsername(format!(
                "username exceeds {MAX_USERNAME_LEN} characters"
            )));
        }
        if let Some(bad) = name.chars().find(|c| !is_username_char(*c)) {
            return Err(AccessError::InvalidUsername(format!(
                "character {bad:?} is not allowed in '{name}'"
            )));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@')
}

impl TryFrom<String> for Username {
    type Error = AccessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl FromStr for Username {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Borrow<str> for Username {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Username {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of a group (distinct from its display name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GroupKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for GroupKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_usernames() {
        for name in ["alice", "bob_2", "ops-bot", "first.last", "me@example.org"] {
            assert!(Username::parse(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_invalid_usernames() {
        for name in ["", "bad name!", "tab\there", "ünïcode", "semi;colon"] {
            let err = Username::parse(name).unwrap_err();
            assert_eq!(err.code(), "invalid_username", "{name:?}");
        }
        assert!(Username::parse("a".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn usernames_are_case_sensitive() {
        let lower = Username::parse("admin").unwrap();
        let upper = Username::parse("Admin").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn username_deserialization_validates() {
        let ok: Username = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(ok.as_str(), "alice");
        assert!(serde_json::from_str::<Username>("\"bad name!\"").is_err());
    }

    #[test]
    fn session_id_parses_from_string() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
