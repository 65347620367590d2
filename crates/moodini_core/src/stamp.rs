//! Content fingerprints used as optimistic-lock versions.

use crate::model::Entity;
use crate::types::Version;
use sha2::{Digest, Sha256};

/// Feeds entity content into a fingerprint.
///
/// Every field is length- or width-prefixed, so `("ab", "c")` and
/// `("a", "bc")` hash differently.
pub struct StampHasher {
    digest: Sha256,
}

impl StampHasher {
    fn new() -> Self {
        Self {
            digest: Sha256::new(),
        }
    }

    /// Writes a string field.
    pub fn write_str(&mut self, value: &str) {
        self.digest.update((value.len() as u64).to_le_bytes());
        self.digest.update(value.as_bytes());
    }

    /// Writes an integer field.
    pub fn write_i64(&mut self, value: i64) {
        self.digest.update(value.to_le_bytes());
    }

    fn finish(self) -> Version {
        let hash = self.digest.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash[..8]);
        Version::new(i64::from_le_bytes(head))
    }
}

/// Computes version tokens for entities.
///
/// Collisions are possible in principle (64 bits of SHA-256); [`advance`]
/// chains the previous version in so that rewriting identical content still
/// produces a fresh token.
///
/// [`advance`]: VersionStamp::advance
pub struct VersionStamp;

impl VersionStamp {
    /// Fingerprint of the entity's content, ignoring its id and version.
    #[must_use]
    pub fn compute<E: Entity>(entity: &E) -> Version {
        let mut hasher = StampHasher::new();
        hasher.write_str(E::COLLECTION);
        entity.write_content(&mut hasher);
        hasher.finish()
    }

    /// Fingerprint of `previous` followed by the entity's content.
    ///
    /// Used on update: the result differs from `previous` even when the
    /// content did not change.
    #[must_use]
    pub fn advance<E: Entity>(previous: Version, entity: &E) -> Version {
        let mut hasher = StampHasher::new();
        hasher.write_str(E::COLLECTION);
        hasher.write_i64(previous.as_i64());
        entity.write_content(&mut hasher);
        hasher.finish()
    }
}
