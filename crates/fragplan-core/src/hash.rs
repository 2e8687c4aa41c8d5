//! Plan fingerprints: blake3 over canonical JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// blake3 digest of a plan document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl From<blake3::Hash> for Hash256 {
    fn from(h: blake3::Hash) -> Self {
        Hash256(*h.as_bytes())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&blake3::Hash::from(self.0).to_hex())
    }
}

/// Fingerprint of `value`'s JSON encoding. Field order follows the struct
/// declarations, so equal plans hash equally.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<Hash256> {
    let bytes = serde_json::to_vec(value).map_err(|e| Error::Hash(e.to_string()))?;
    Ok(blake3::hash(&bytes).into())
}
