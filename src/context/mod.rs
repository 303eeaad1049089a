//! Callback context module.
//!
//! This module provides the context bag threaded through an update, the
//! typed progress slots the sequencer reads and writes, and stores the
//! command-line driver uses to persist contexts between runs:
//! - Local file storage
//! - S3 remote storage
//! - Per-resource locking

mod types;
mod progress;
mod store;
mod local;
mod s3;
mod lock;

pub use types::CallbackContext;
pub use progress::{
    ReconcileProgress, SLOT_COMPLETED_STEPS, SLOT_LAST_PROGRESS_AT, SLOT_REPLACEMENT_GROUP_ARN,
    SLOT_REQUEST_FINGERPRINT,
};
pub use store::{ContextRecord, ContextStore};
pub use local::{LocalContextStore, CONTEXT_DIR};
pub use s3::S3ContextStore;
pub use lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
