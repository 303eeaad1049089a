//! Per-resource locks for stored callback contexts.
//!
//! Two drivers reconciling the same group at once would race on its identity,
//! so a stored context is only written under a lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lock expiry duration in seconds.
pub const LOCK_EXPIRY_SECS: i64 = 300;

/// Information about a context lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// Resource key the lock guards.
    pub resource: String,
    /// Who holds the lock.
    pub holder: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// Creates a new lock for a resource.
    #[must_use]
    pub fn new(resource: &str, holder: &str) -> Self {
        let now = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            resource: resource.to_string(),
            holder: holder.to_string(),
            acquired_at: now,
            expires_at: now + chrono::Duration::seconds(LOCK_EXPIRY_SECS),
        }
    }

    /// Checks if the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns the remaining time until expiry in seconds.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }

    /// Error reported to a second caller while this lock is live.
    #[must_use]
    pub fn conflict(&self) -> crate::error::ContextError {
        crate::error::ContextError::LockedByOther {
            resource: self.resource.clone(),
            holder: self.holder.clone(),
            since: self.acquired_at.to_rfc3339(),
        }
    }
}

/// Generates a holder identifier for the current process.
#[must_use]
pub fn generate_holder_id() -> String {
    let hostname = hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());
    let pid = std::process::id();
    let uuid = Uuid::new_v4().simple().to_string();

    format!("{hostname}-{pid}-{}", &uuid[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContextError;

    #[test]
    fn test_new_lock_is_live() {
        let lock = LockInfo::new("group-1", "holder");
        assert_eq!(lock.resource, "group-1");
        assert!(!lock.is_expired());
        assert!(lock.remaining_secs() > 0);
        assert!(lock.remaining_secs() <= LOCK_EXPIRY_SECS);
    }

    #[test]
    fn test_expired_lock() {
        let mut lock = LockInfo::new("group-1", "holder");
        lock.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(lock.is_expired());
        assert_eq!(lock.remaining_secs(), 0);
    }

    #[test]
    fn test_conflict_names_holder() {
        let lock = LockInfo::new("group-1", "ci-runner");
        match lock.conflict() {
            ContextError::LockedByOther { resource, holder, .. } => {
                assert_eq!(resource, "group-1");
                assert_eq!(holder, "ci-runner");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_holder_id_generation() {
        let id1 = generate_holder_id();
        let id2 = generate_holder_id();

        assert_ne!(id1, id2);
        assert!(id1.contains(&std::process::id().to_string()));
        assert_eq!(id1.rsplit('-').next().map(str::len), Some(8));
    }
}
