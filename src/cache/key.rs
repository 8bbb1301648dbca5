//! Input-derived cache keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Bumped whenever the encoding of keys changes.
const KEY_VERSION: &str = "v1";

/// Key of a memoized call: hex SHA-256 of the operation name and its
/// parameters.
///
/// Parameters are hashed in the order given, JSON-encoded so that no pair of
/// distinct inputs can produce the same preimage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_call(operation: &str, params: &[(&str, &str)]) -> Self {
        let preimage = serde_json::json!([KEY_VERSION, operation, params]).to_string();
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an already computed key, e.g. one read back from storage.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
