//! Stable hashing helpers for trace fingerprints.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

/// Incremental hasher over a sequence of serializable items.
///
/// Each item is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub struct Fingerprint {
    inner: Hasher,
}

impl Fingerprint {
    pub fn new(domain: &str) -> Self {
        let mut inner = Hasher::new();
        inner.update(domain.as_bytes());
        Self { inner }
    }

    pub fn push<T: Serialize>(&mut self, v: &T) -> Result<(), crate::error::Error> {
        let bytes = serde_json::to_vec(v)?;
        self.inner.update(&(bytes.len() as u64).to_le_bytes());
        self.inner.update(&bytes);
        Ok(())
    }

    pub fn finish(self) -> Hash256 {
        Hash256(self.inner.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_and_boundary_sensitive() {
        let mut a = Fingerprint::new("t");
        a.push(&"ab").unwrap();
        a.push(&"c").unwrap();
        let mut b = Fingerprint::new("t");
        b.push(&"a").unwrap();
        b.push(&"bc").unwrap();
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn hex_is_64_chars() {
        assert_eq!(hash_bytes(b"flour").to_hex().len(), 64);
    }
}
