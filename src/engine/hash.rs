use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 digest of a normalized domain.
///
/// Used as the lookup key for persisted block-lists so raw domains never need
/// to be stored. Input is trimmed and lowercased before hashing, so equal
/// domains always produce equal hashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainHash(String);

impl DomainHash {
    pub const HEX_LEN: usize = 64;

    pub fn of(domain: &str) -> Self {
        let canonical = domain.trim().to_lowercase();
        let digest = Sha256::digest(canonical.as_bytes());
        Self(hex::encode(digest))
    }

    /// Wraps a digest read back from storage.
    pub fn from_hex(hex: impl Into<String>) -> Option<Self> {
        let hex = hex.into();
        if hex.len() == Self::HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(hex.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-bit FNV-1a over the lowercased domain.
///
/// Only used for membership in the embedded fallback list, which is advisory.
/// Never use it for anything security relevant.
pub fn fingerprint32(domain: &str) -> u32 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    domain
        .trim()
        .to_lowercase()
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ byte as u32).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            DomainHash::of("example.com").as_str(),
            "a379a6f6eeafb9a55e378c118034e2751e682fab9f2d30ab13d2125586ce1947"
        );
    }

    #[test]
    fn test_hash_is_case_and_whitespace_insensitive() {
        assert_eq!(DomainHash::of("Example.com"), DomainHash::of("example.com "));
    }

    #[test]
    fn test_fixed_length_output() {
        let long = "a".repeat(4096);
        assert_eq!(DomainHash::of("x").as_str().len(), DomainHash::HEX_LEN);
        assert_eq!(DomainHash::of(&long).as_str().len(), DomainHash::HEX_LEN);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(DomainHash::from_hex("not-a-hash").is_none());
        let h = DomainHash::of("example.com");
        assert_eq!(DomainHash::from_hex(h.as_str().to_uppercase()), Some(h));
    }

    #[test]
    fn test_fingerprint_matches_fnv1a() {
        assert_eq!(fingerprint32(""), 0x811c_9dc5);
        assert_eq!(fingerprint32("a"), 0xe40c_292c);
        assert_eq!(fingerprint32("A "), fingerprint32("a"));
    }
}
