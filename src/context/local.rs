//! Local file-based context storage backend.
//!
//! One JSON file per resource under `contexts/`, one lock file per resource
//! under `locks/`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ContextError, ReconcilerError, Result};

use super::lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
use super::store::{ContextRecord, ContextStore};
use super::types::CallbackContext;

/// Default context directory name.
pub const CONTEXT_DIR: &str = ".hgroup";

/// Local file-based context store.
#[derive(Debug)]
pub struct LocalContextStore {
    /// Base directory for context and lock files.
    base_dir: PathBuf,
}

impl LocalContextStore {
    /// Creates a store under `.hgroup` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let base_dir = std::env::current_dir()
            .map_err(|e| ReconcilerError::internal(format!("Cannot determine current directory: {e}")))?
            .join(CONTEXT_DIR);

        Ok(Self::with_base_dir(base_dir))
    }

    /// Creates a store with a custom base directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Base directory of this store.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn context_path(&self, resource: &str) -> PathBuf {
        self.base_dir.join("contexts").join(format!("{resource}.json"))
    }

    fn lock_path(&self, resource: &str) -> PathBuf {
        self.base_dir.join("locks").join(format!("{resource}.lock"))
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            debug!("Creating context directory: {}", parent.display());
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ContextError::storage(format!("Failed to create {}: {e}", parent.display())))?;
        }
        Ok(())
    }

    /// Writes to a temporary file, syncs, then renames into place.
    async fn write_atomic(path: &Path, content: &str) -> Result<()> {
        Self::ensure_parent(path).await?;
        let temp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| ContextError::storage(format!("Failed to create {}: {e}", temp_path.display())))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| ContextError::storage(format!("Failed to write {}: {e}", temp_path.display())))?;
        file.sync_all()
            .await
            .map_err(|e| ContextError::storage(format!("Failed to sync {}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| ContextError::storage(format!("Failed to rename into {}: {e}", path.display())))?;
        Ok(())
    }

    /// Creates the lock file only if none exists. Returns false if one does.
    ///
    /// The content is written to a private file first and hard-linked into
    /// place, so readers never see a partial lock.
    async fn create_lock_file(path: &Path, lock_info: &LockInfo, content: &str) -> Result<bool> {
        let staged = path.with_extension(format!("{}.staged", lock_info.lock_id));
        Self::write_atomic(&staged, content).await?;

        let linked = fs::hard_link(&staged, path).await;
        Self::remove_if_exists(&staged).await?;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(ContextError::LockFailed {
                message: format!("Failed to create {}: {e}", path.display()),
            }
            .into()),
        }
    }

    async fn remove_if_exists(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)
                .await
                .map_err(|e| ContextError::storage(format!("Failed to delete {}: {e}", path.display())))?;
        }
        Ok(())
    }

    async fn read_lock_file(&self, resource: &str) -> Result<Option<LockInfo>> {
        let path = self.lock_path(resource);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await.map_err(|e| ContextError::Corrupted {
            message: format!("Failed to read lock file: {e}"),
        })?;
        let lock_info = serde_json::from_str(&content).map_err(|e| ContextError::Corrupted {
            message: format!("Failed to parse lock file: {e}"),
        })?;

        Ok(Some(lock_info))
    }
}

#[async_trait]
impl ContextStore for LocalContextStore {
    async fn load(&self, resource: &str) -> Result<Option<ContextRecord>> {
        let path = self.context_path(resource);
        if !path.exists() {
            debug!("No stored context at {}", path.display());
            return Ok(None);
        }

        info!("Loading callback context from: {}", path.display());

        let content = fs::read_to_string(&path).await.map_err(|e| ContextError::Corrupted {
            message: format!("Failed to read context file: {e}"),
        })?;
        let record = serde_json::from_str(&content).map_err(|e| ContextError::Corrupted {
            message: format!("Failed to parse context file: {e}"),
        })?;

        Ok(Some(record))
    }

    async fn save(&self, resource: &str, context: &CallbackContext) -> Result<()> {
        let path = self.context_path(resource);
        info!("Saving callback context to: {}", path.display());

        let record = ContextRecord::new(resource, context.clone());
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| ContextError::serialization(format!("Failed to serialize context: {e}")))?;

        Self::write_atomic(&path, &content).await?;
        debug!("Callback context saved");
        Ok(())
    }

    async fn delete(&self, resource: &str) -> Result<()> {
        info!("Deleting callback context for {resource}");
        Self::remove_if_exists(&self.context_path(resource)).await?;
        Self::remove_if_exists(&self.lock_path(resource)).await
    }

    async fn acquire_lock(&self, resource: &str, holder: &str) -> Result<LockInfo> {
        let holder_id = if holder.is_empty() {
            generate_holder_id()
        } else {
            holder.to_string()
        };

        let lock_info = LockInfo::new(resource, &holder_id);
        let content = serde_json::to_string_pretty(&lock_info)
            .map_err(|e| ContextError::serialization(format!("Failed to serialize lock: {e}")))?;
        let path = self.lock_path(resource);

        // The first link wins; an expired lock gets one takeover attempt
        let mut acquired = Self::create_lock_file(&path, &lock_info, &content).await?;
        if !acquired {
            match self.read_lock_file(resource).await? {
                Some(existing) if !existing.is_expired() => return Err(existing.conflict().into()),
                Some(existing) => {
                    debug!("Expired lock on {resource} held by {}, taking over", existing.holder);
                    Self::remove_if_exists(&path).await?;
                }
                None => {}
            }
            acquired = Self::create_lock_file(&path, &lock_info, &content).await?;
        }

        if !acquired {
            return Err(match self.read_lock_file(resource).await? {
                Some(existing) => existing.conflict().into(),
                None => ContextError::LockFailed {
                    message: format!("Lock on {resource} changed hands while acquiring"),
                }
                .into(),
            });
        }

        info!(
            "Acquired context lock on {resource}: {} (expires in {}s)",
            lock_info.lock_id, LOCK_EXPIRY_SECS
        );
        Ok(lock_info)
    }

    async fn release_lock(&self, resource: &str, lock_id: &str) -> Result<()> {
        if let Some(existing) = self.read_lock_file(resource).await? {
            if existing.lock_id == lock_id {
                Self::remove_if_exists(&self.lock_path(resource)).await?;
                info!("Released context lock on {resource}: {lock_id}");
            } else {
                debug!("Lock ID mismatch: expected {lock_id}, found {}", existing.lock_id);
            }
        }
        Ok(())
    }

    async fn get_lock_info(&self, resource: &str) -> Result<Option<LockInfo>> {
        self.read_lock_file(resource).await
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ReconcileProgress;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalContextStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalContextStore::with_base_dir(temp_dir.path());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let mut context = CallbackContext::new();
        let mut progress = ReconcileProgress::fresh("fp-1");
        progress.mark_completed("rename");
        progress.store(&mut context).unwrap();

        store.save("group-1", &context).await.expect("Failed to save context");

        let record = store
            .load("group-1")
            .await
            .expect("Failed to load context")
            .expect("Context should exist");
        assert_eq!(record.resource, "group-1");
        assert_eq!(record.context, context);
        assert!(store.base_dir().join("contexts/group-1.json").exists());
        assert!(!store.base_dir().join("contexts/group-1.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();
        assert!(store.load("missing").await.expect("Load should not fail").is_none());
    }

    #[tokio::test]
    async fn test_contexts_are_per_resource() {
        let (store, _temp) = create_test_store();
        let mut context = CallbackContext::new();
        context.set("marker", &1_u8).unwrap();
        store.save("group-1", &context).await.unwrap();

        assert!(store.load("group-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_context_and_lock() {
        let (store, _temp) = create_test_store();
        store.save("group-1", &CallbackContext::new()).await.unwrap();
        store.acquire_lock("group-1", "holder").await.unwrap();

        store.delete("group-1").await.unwrap();

        assert!(store.load("group-1").await.unwrap().is_none());
        assert!(store.get_lock_info("group-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lock_acquire_release() {
        let (store, _temp) = create_test_store();

        let lock = store
            .acquire_lock("group-1", "test-holder")
            .await
            .expect("Failed to acquire lock");
        assert_eq!(lock.holder, "test-holder");
        assert!(store.get_lock_info("group-1").await.unwrap().is_some());

        store
            .release_lock("group-1", &lock.lock_id)
            .await
            .expect("Failed to release lock");
        assert!(store.get_lock_info("group-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lock_conflict() {
        let (store, _temp) = create_test_store();

        let _lock = store.acquire_lock("group-1", "holder-1").await.unwrap();
        let err = store.acquire_lock("group-1", "holder-2").await.unwrap_err();
        assert!(matches!(
            err,
            ReconcilerError::Context(ContextError::LockedByOther { ref holder, .. }) if holder == "holder-1"
        ));
        assert!(err.is_retryable());

        // Other resources are unaffected
        assert!(store.acquire_lock("group-2", "holder-2").await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_acquire_has_one_winner() {
        let (store, _temp) = create_test_store();
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move { store.acquire_lock("group-1", &format!("holder-{i}")).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert!(e.is_retryable()),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_expired_lock_is_taken_over() {
        let (store, _temp) = create_test_store();

        let mut stale = LockInfo::new("group-1", "crashed-holder");
        stale.expires_at = stale.acquired_at - chrono::Duration::seconds(1);
        LocalContextStore::write_atomic(
            &store.lock_path("group-1"),
            &serde_json::to_string(&stale).unwrap(),
        )
        .await
        .unwrap();

        let lock = store.acquire_lock("group-1", "new-holder").await.unwrap();
        let info = store.get_lock_info("group-1").await.unwrap().unwrap();
        assert_eq!(info.lock_id, lock.lock_id);
        assert_eq!(info.holder, "new-holder");
    }

    #[tokio::test]
    async fn test_release_with_wrong_id_keeps_lock() {
        let (store, _temp) = create_test_store();
        let _lock = store.acquire_lock("group-1", "").await.unwrap();

        store.release_lock("group-1", "not-the-lock").await.unwrap();
        let info = store.get_lock_info("group-1").await.unwrap().unwrap();
        assert!(info.holder.contains(&std::process::id().to_string()));
    }
}
