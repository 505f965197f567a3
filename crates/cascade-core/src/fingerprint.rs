//! Stable content fingerprints
//!
//! fingerprint = SHA-256 hex digest of JCS(document) (RFC 8785), so key
//! order in the source document never changes the result.

use crate::error::CascadeError;
use crate::result::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 content hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint any serializable document
    pub fn of<T: Serialize>(document: &T) -> Result<Self> {
        let jcs_bytes = serde_json_canonicalizer::to_vec(document)
            .map_err(|e| CascadeError::internal_error(format!("JCS encoding failed: {e}")))?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Combine an ordered list of parts into one fingerprint
    ///
    /// Parts are length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn combine<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            let part = part.as_ref();
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_matter() {
        let a = json!({"rules": {"no-var": "error", "eqeqeq": "warn"}, "env": {"node": true}});
        let b = json!({"env": {"node": true}, "rules": {"eqeqeq": "warn", "no-var": "error"}});
        assert_eq!(Fingerprint::of(&a).unwrap(), Fingerprint::of(&b).unwrap());
    }

    #[test]
    fn test_content_change_changes_fingerprint() {
        let a = json!({"rules": {"no-var": "warn"}});
        let b = json!({"rules": {"no-var": "error"}});
        assert_ne!(Fingerprint::of(&a).unwrap(), Fingerprint::of(&b).unwrap());
    }

    #[test]
    fn test_combine_is_length_prefixed() {
        assert_ne!(Fingerprint::combine(["ab", "c"]), Fingerprint::combine(["a", "bc"]));
        assert_eq!(Fingerprint::combine(["a", "b"]), Fingerprint::combine(["a", "b"]));
        assert_eq!(Fingerprint::combine(["a"]).as_str().len(), 64);
    }
}
