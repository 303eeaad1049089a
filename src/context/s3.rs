//! S3-based context storage backend.
//!
//! Lets several operators or CI runners share in-flight progress for the same
//! groups. Objects live under `<prefix>contexts/<resource>.json` and
//! `<prefix>locks/<resource>.lock`.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{ContextError, Result};

use super::lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
use super::store::{ContextRecord, ContextStore};
use super::types::CallbackContext;

/// S3-based context store.
#[derive(Debug)]
pub struct S3ContextStore {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix, empty or ending in `/`.
    prefix: String,
}

impl S3ContextStore {
    /// Creates a new S3 context store from the default credential chain.
    pub async fn new(bucket: &str, prefix: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;

        Self::with_client(Client::new(&config), bucket, prefix)
    }

    /// Creates a new S3 context store with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, prefix: Option<&str>) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: normalize_prefix(prefix),
        }
    }

    fn context_key(&self, resource: &str) -> String {
        format!("{}contexts/{resource}.json", self.prefix)
    }

    fn lock_key(&self, resource: &str) -> String {
        format!("{}locks/{resource}.lock", self.prefix)
    }

    async fn get_object(&self, key: &str) -> Result<Option<String>> {
        let result = self.client.get_object().bucket(&self.bucket).key(key).send().await;

        match result {
            Ok(response) => {
                let bytes = response
                    .body
                    .collect()
                    .await
                    .map_err(|e| ContextError::s3(format!("Failed to read S3 object: {e}")))?;

                let content = String::from_utf8(bytes.to_vec()).map_err(|e| ContextError::Corrupted {
                    message: format!("Invalid UTF-8 in S3 object: {e}"),
                })?;

                Ok(Some(content))
            }
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(ContextError::s3(format!("S3 get error: {service_err}")).into())
                }
            }
        }
    }

    async fn put_object(&self, key: &str, content: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(content.as_bytes().to_vec().into())
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| ContextError::s3(format!("S3 put error: {e}")))?;

        Ok(())
    }

    /// Puts an object only if the key is free. Returns false if it is taken.
    async fn put_object_if_absent(&self, key: &str, content: &str) -> Result<bool> {
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .if_none_match("*")
            .body(content.as_bytes().to_vec().into())
            .content_type("application/json")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.raw_response().is_some_and(|r| is_precondition_conflict(r.status().as_u16())) => {
                Ok(false)
            }
            Err(e) => Err(ContextError::s3(format!("S3 conditional put error: {e}")).into()),
        }
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ContextError::s3(format!("S3 delete error: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ContextStore for S3ContextStore {
    async fn load(&self, resource: &str) -> Result<Option<ContextRecord>> {
        let key = self.context_key(resource);
        debug!("Loading callback context from s3://{}/{key}", self.bucket);

        let Some(json) = self.get_object(&key).await? else {
            debug!("No callback context stored in S3 for {resource}");
            return Ok(None);
        };

        let record: ContextRecord = serde_json::from_str(&json).map_err(|e| ContextError::Corrupted {
            message: format!("Failed to parse context: {e}"),
        })?;

        info!("Loaded callback context for {resource} ({})", record.updated_at.to_rfc3339());
        Ok(Some(record))
    }

    async fn save(&self, resource: &str, context: &CallbackContext) -> Result<()> {
        let key = self.context_key(resource);
        info!("Saving callback context to s3://{}/{key}", self.bucket);

        let record = ContextRecord::new(resource, context.clone());
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| ContextError::serialization(format!("Failed to serialize context: {e}")))?;

        self.put_object(&key, &content).await
    }

    async fn delete(&self, resource: &str) -> Result<()> {
        let context_key = self.context_key(resource);
        info!("Deleting callback context from s3://{}/{context_key}", self.bucket);

        self.delete_object(&context_key).await?;
        self.delete_object(&self.lock_key(resource)).await
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
        let key = self.lock_key(resource);

        // Conditional put: the first writer wins; an expired lock gets one takeover attempt
        let mut acquired = self.put_object_if_absent(&key, &content).await?;
        if !acquired {
            match self.get_lock_info(resource).await? {
                Some(existing) if !existing.is_expired() => return Err(existing.conflict().into()),
                Some(existing) => {
                    debug!("Expired lock on {resource} held by {}, taking over", existing.holder);
                    self.delete_object(&key).await?;
                }
                None => {}
            }
            acquired = self.put_object_if_absent(&key, &content).await?;
        }

        if !acquired {
            return Err(match self.get_lock_info(resource).await? {
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
        if let Some(existing) = self.get_lock_info(resource).await? {
            if existing.lock_id == lock_id {
                self.delete_object(&self.lock_key(resource)).await?;
                info!("Released context lock on {resource}: {lock_id}");
            } else {
                debug!("Lock ID mismatch: expected {lock_id}, found {}", existing.lock_id);
            }
        }
        Ok(())
    }

    async fn get_lock_info(&self, resource: &str) -> Result<Option<LockInfo>> {
        let Some(content) = self.get_object(&self.lock_key(resource)).await? else {
            return Ok(None);
        };

        let lock_info = serde_json::from_str(&content).map_err(|e| ContextError::Corrupted {
            message: format!("Failed to parse lock: {e}"),
        })?;
        Ok(Some(lock_info))
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}

/// 412 means the key exists; 409 means a concurrent conditional write won.
const fn is_precondition_conflict(status: u16) -> bool {
    matches!(status, 409 | 412)
}

/// Trims slashes and appends one, or returns an empty prefix.
fn normalize_prefix(prefix: Option<&str>) -> String {
    prefix
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .map(|p| format!("{p}/"))
        .unwrap_or_default()
}
