//! Strongly typed project names, revisions, and group references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ConfigError;

/// Name of a project.
///
/// Names are path-like (`plugins/avatars-external`) and are validated so they
/// can be used as directory names by storage backends.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    /// Validate and wrap a project name.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.trim() != name {
            Some("name has surrounding whitespace")
        } else if name.starts_with('/') || name.ends_with('/') {
            Some("name starts or ends with '/'")
        } else if name.chars().any(char::is_control) {
            Some("name contains control characters")
        } else if name
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
        {
            Some("name contains an empty, '.' or '..' path component")
        } else if name.split('/').any(|part| part.ends_with(".git")) {
            // Storage backends reserve the suffix for project directories.
            Some("name has a path component ending in '.git'")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConfigError::InvalidProjectName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProjectName> for String {
    fn from(value: ProjectName) -> Self {
        value.0
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of one immutable version of a stored document.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision([u8; 32]);

impl Revision {
    /// Wrap raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Content identifier of `data`.
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Decode a 64-character hex identifier.
    pub fn from_hex(value: &str) -> Result<Self, ConfigError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(value, &mut bytes).map_err(|_| ConfigError::InvalidRevision {
            value: value.to_string(),
        })?;
        Ok(Self(bytes))
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex form used in log output.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Raw identifier bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.short())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Revision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

/// Opaque reference to a group that a permission applies to.
///
/// Membership is resolved elsewhere; the engine only stores the identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupReference(String);

impl GroupReference {
    /// Create a group reference from its identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Every signed-in user.
    pub fn registered_users() -> Self {
        Self::new("global:Registered-Users")
    }

    /// Owners of the project the rule is stored in.
    pub fn project_owners() -> Self {
        Self::new("global:Project-Owners")
    }

    /// Every caller, signed in or not.
    pub fn anonymous_users() -> Self {
        Self::new("global:Anonymous-Users")
    }

    /// Server administrators.
    pub fn administrators() -> Self {
        Self::new("global:Administrators")
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GroupReference {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_names_accept_nested_paths() {
        let name = ProjectName::new("plugins/avatars-external").unwrap();
        assert_eq!(name.as_str(), "plugins/avatars-external");
    }

    #[test]
    fn project_names_reject_traversal_and_git_suffix() {
        for bad in ["", " padded", "/abs", "a/../b", "a//b", "repo.git", "foo.git/bar", "tab\tname"] {
            assert!(ProjectName::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn revision_hex_round_trips() {
        let rev = Revision::digest(b"hello");
        let parsed: Revision = rev.to_hex().parse().unwrap();
        assert_eq!(parsed, rev);
        assert_eq!(rev.short().len(), 8);
    }

    #[test]
    fn revision_rejects_short_hex() {
        assert!(Revision::from_hex("abcd").is_err());
    }
}
