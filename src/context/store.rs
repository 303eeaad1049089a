//! Context store trait definition.
//!
//! The workflow engine owns callback context persistence. This trait is what
//! the command-line driver uses in its place, one stored context per resource.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::lock::LockInfo;
use super::types::CallbackContext;

/// A stored callback context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Resource key the context belongs to.
    pub resource: String,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// The context itself.
    pub context: CallbackContext,
}

impl ContextRecord {
    /// Wraps a context for storage.
    #[must_use]
    pub fn new(resource: &str, context: CallbackContext) -> Self {
        Self {
            resource: resource.to_string(),
            updated_at: Utc::now(),
            context,
        }
    }
}

/// Trait for callback context storage backends.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Loads the context stored for a resource.
    ///
    /// Returns `None` if nothing is stored yet.
    async fn load(&self, resource: &str) -> Result<Option<ContextRecord>>;

    /// Stores the context for a resource, replacing any previous one.
    async fn save(&self, resource: &str, context: &CallbackContext) -> Result<()>;

    /// Deletes the stored context and any lock for a resource.
    async fn delete(&self, resource: &str) -> Result<()>;

    /// Acquires the lock for a resource.
    ///
    /// An empty holder is replaced by a generated one.
    async fn acquire_lock(&self, resource: &str, holder: &str) -> Result<LockInfo>;

    /// Releases a lock if `lock_id` still owns it.
    async fn release_lock(&self, resource: &str, lock_id: &str) -> Result<()>;

    /// Gets the current lock for a resource, expired or not.
    async fn get_lock_info(&self, resource: &str) -> Result<Option<LockInfo>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl ContextStore for Box<dyn ContextStore> {
    async fn load(&self, resource: &str) -> Result<Option<ContextRecord>> {
        (**self).load(resource).await
    }

    async fn save(&self, resource: &str, context: &CallbackContext) -> Result<()> {
        (**self).save(resource, context).await
    }

    async fn delete(&self, resource: &str) -> Result<()> {
        (**self).delete(resource).await
    }

    async fn acquire_lock(&self, resource: &str, holder: &str) -> Result<LockInfo> {
        (**self).acquire_lock(resource, holder).await
    }

    async fn release_lock(&self, resource: &str, lock_id: &str) -> Result<()> {
        (**self).release_lock(resource, lock_id).await
    }

    async fn get_lock_info(&self, resource: &str) -> Result<Option<LockInfo>> {
        (**self).get_lock_info(resource).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
