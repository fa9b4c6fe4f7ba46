//! Content fingerprinting for submitted files.
//!
//! A fingerprint is the set of digests identifying file content. SHA-256 is
//! the primary digest: it is the sole key for deduplication and for the
//! content-addressed storage layout. MD5 and SHA-1 are carried for
//! compatibility with external reputation consumers that index by them.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::io::Read;

/// Computes the SHA-256 digest of the given data and returns it as a hex string.
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes the SHA-1 digest of the given data and returns it as a hex string.
pub fn sha1_digest(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes the MD5 digest of the given data and returns it as a hex string.
pub fn md5_digest(data: &[u8]) -> String {
    hex::encode(*md5::compute(data))
}

/// The digest triple identifying one file's content.
///
/// Immutable once computed. Equality and hashing consider only the primary
/// digest; the secondary digests are along for the ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFingerprint {
    /// Primary digest: dedup and storage key.
    pub sha256: String,
    /// Secondary digest for external consumers.
    pub sha1: String,
    /// Secondary digest for external consumers.
    pub md5: String,
}

impl FileFingerprint {
    /// Fingerprint a byte slice. Deterministic and pure.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self {
            sha256: sha256_digest(data),
            sha1: sha1_digest(data),
            md5: md5_digest(data),
        }
    }

    /// Fingerprint the full contents of a reader.
    pub fn of_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::of_bytes(&data))
    }

    /// The canonical identity key.
    pub fn primary(&self) -> &str {
        &self.sha256
    }

    /// Short form of the primary digest for log lines.
    pub fn short(&self) -> &str {
        &self.sha256[..self.sha256.len().min(10)]
    }
}

impl PartialEq for FileFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.sha256 == other.sha256
    }
}

impl Eq for FileFingerprint {}

impl std::hash::Hash for FileFingerprint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sha256.hash(state);
    }
}

impl std::fmt::Display for FileFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sha256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DATA: &[u8] = b"vigil-test-string";

    #[test]
    fn test_digests_of_empty_input() {
        assert_eq!(
            sha256_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha1_digest(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(md5_digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = FileFingerprint::of_bytes(TEST_DATA);
        let b = FileFingerprint::of_bytes(TEST_DATA);
        assert_eq!(a, b);
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.sha1, b.sha1);
        assert_eq!(a.md5, b.md5);
    }

    #[test]
    fn test_fingerprint_algorithms_distinct() {
        // Three genuinely different algorithms, not one digest relabeled.
        let fp = FileFingerprint::of_bytes(TEST_DATA);
        assert_ne!(fp.sha256, fp.sha1);
        assert_ne!(fp.sha1, fp.md5);
        assert_eq!(fp.sha256.len(), 64);
        assert_eq!(fp.sha1.len(), 40);
        assert_eq!(fp.md5.len(), 32);
    }

    #[test]
    fn test_fingerprint_from_reader() {
        let fp = FileFingerprint::of_reader(std::io::Cursor::new(TEST_DATA)).unwrap();
        assert_eq!(fp, FileFingerprint::of_bytes(TEST_DATA));
    }

    #[test]
    fn test_primary_and_short() {
        let fp = FileFingerprint::of_bytes(b"hello");
        assert_eq!(fp.primary(), fp.sha256);
        assert_eq!(fp.short(), &fp.sha256[..10]);
    }
}
