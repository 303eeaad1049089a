//! Resource model for user hierarchy groups.
//!
//! This module handles everything about the data an update operates on:
//! - Snapshot and tag types with null-safe field comparison
//! - Parsing update request documents
//! - Pre-flight validation of requests
//! - Request fingerprints for resumable progress

mod snapshot;
mod document;
mod validator;
mod fingerprint;

pub use snapshot::{fields_equal, non_empty, ResourceSnapshot, Tag, TagSet};
pub use document::RequestDocument;
pub use validator::{SnapshotValidator, ValidationError, ValidationResult};
pub use fingerprint::RequestFingerprint;
