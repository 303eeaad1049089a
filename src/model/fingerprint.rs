//! Request fingerprinting.
//!
//! A fingerprint identifies one `(previous, desired)` pair so that progress
//! recorded in a callback context is only replayed for the request that
//! produced it.

use sha2::{Digest, Sha256};

use super::snapshot::ResourceSnapshot;

/// Hasher for request fingerprints.
#[derive(Debug, Default)]
pub struct RequestFingerprint;

impl RequestFingerprint {
    /// Creates a new fingerprint hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of an update request.
    #[must_use]
    pub fn of_request(&self, previous: &ResourceSnapshot, desired: &ResourceSnapshot) -> String {
        let mut hasher = Sha256::new();

        hasher.update(b"previous");
        Self::update_snapshot(&mut hasher, previous);
        hasher.update(b"desired");
        Self::update_snapshot(&mut hasher, desired);

        hex::encode(hasher.finalize())
    }

    /// Computes a hash of a single snapshot.
    #[must_use]
    pub fn of_snapshot(&self, snapshot: &ResourceSnapshot) -> String {
        let mut hasher = Sha256::new();
        Self::update_snapshot(&mut hasher, snapshot);
        hex::encode(hasher.finalize())
    }

    /// Feeds snapshot fields into the hasher in a fixed order.
    fn update_snapshot(hasher: &mut Sha256, snapshot: &ResourceSnapshot) {
        for field in [
            snapshot.group_arn(),
            snapshot.instance(),
            snapshot.display_name(),
            snapshot.parent(),
        ] {
            // Length prefix keeps ("ab", "c") distinct from ("a", "bc")
            let value = field.unwrap_or_default();
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        }

        // TagSet iterates in key order
        let tags = snapshot.tag_set();
        hasher.update((tags.len() as u64).to_be_bytes());
        for (key, value) in tags.iter() {
            hasher.update((key.len() as u64).to_be_bytes());
            hasher.update(key.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        }
    }

    /// Computes a short fingerprint (first 8 characters) for display purposes.
    #[must_use]
    pub fn short(&self, fingerprint: &str) -> String {
        fingerprint.chars().take(8).collect()
    }
}
