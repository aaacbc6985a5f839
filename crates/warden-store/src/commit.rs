//! Immutable commit objects referenced by revisions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_config::Revision;

/// One immutable version of a reference's payload.
///
/// The nonce makes every write a distinct revision, even when the payload
/// and parent repeat (e.g. re-creating a deleted reference with the same
/// content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit this one was written on top of.
    pub parent: Option<Revision>,
    /// Stored payload.
    #[serde(with = "hex_bytes")]
    pub content: Vec<u8>,
    /// Write-unique salt.
    pub nonce: Uuid,
}

impl Commit {
    /// New commit with a fresh nonce.
    pub fn new(parent: Option<Revision>, content: Vec<u8>) -> Self {
        Self {
            parent,
            content,
            nonce: Uuid::new_v4(),
        }
    }

    /// Content identifier of this commit.
    pub fn id(&self) -> Revision {
        let mut buf = Vec::with_capacity(8 + 33 + 16 + self.content.len());
        buf.extend_from_slice(b"commit\0");
        match &self.parent {
            Some(parent) => {
                buf.push(1);
                buf.extend_from_slice(parent.as_bytes());
            }
            None => buf.push(0),
        }
        buf.extend_from_slice(self.nonce.as_bytes());
        buf.extend_from_slice(&self.content);
        Revision::digest(&buf)
    }

    /// JSON object form.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Parse the JSON object form.
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_payloads_get_distinct_ids() {
        let a = Commit::new(None, b"same".to_vec());
        let b = Commit::new(None, b"same".to_vec());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn id_survives_encoding() {
        let parent = Commit::new(None, Vec::new());
        let commit = Commit::new(Some(parent.id()), b"[project]\n".to_vec());
        let decoded = Commit::decode(&commit.encode().unwrap()).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(decoded.id(), commit.id());
    }
}
