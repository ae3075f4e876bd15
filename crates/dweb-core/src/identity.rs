//! Node identity.
//!
//! A node id is the hex BLAKE3 digest of its creation time and display name:
//!
//!   id = hex(BLAKE3(nanos_since_epoch || name))
//!
//! The same (name, time) pair always yields the same id. Uniqueness across
//! the network comes from the creation time; the topology registry refuses
//! any id it has already admitted.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Hash a byte slice, returning a 32-byte BLAKE3 digest.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Process-wide unique node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an already-derived id, e.g. one received over the API.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 characters, for log lines and CLI output.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(16) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Derive a node id from a display name and a creation time.
///
/// Times before the Unix epoch are clamped to it.
pub fn node_id(name: &str, at: SystemTime) -> NodeId {
    let nanos = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let mut hasher = blake3::Hasher::new();
    hasher.update(nanos.to_string().as_bytes());
    hasher.update(name.as_bytes());
    NodeId(hex::encode(hasher.finalize().as_bytes()))
}

/// Derive a node id stamped with the current time.
pub fn node_id_now(name: &str) -> NodeId {
    node_id(name, SystemTime::now())
}
