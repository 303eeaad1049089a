//! Settings file types.
//!
//! This module defines the structs that map to `hgroup.yaml`. Every section
//! is optional; an absent file means all defaults.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::handler::HandlerOptions;
use crate::planner::TagReconciliation;

/// Root settings structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// AWS client settings.
    #[serde(default)]
    pub aws: AwsSettings,
    /// Reconciliation behaviour.
    #[serde(default)]
    pub reconcile: ReconcileSettings,
    /// Callback context storage.
    #[serde(default)]
    pub context: ContextSettings,
}

/// AWS client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwsSettings {
    /// Region for Amazon Connect calls; the default chain applies if unset.
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override, for local emulators.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

/// Reconciliation behaviour.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Tag reconciliation position.
    #[serde(default)]
    pub tags: TagReconciliation,
    /// Maximum remote calls per invocation.
    #[serde(default)]
    pub step_budget: Option<usize>,
}

/// Callback context storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextSettings {
    /// Backend type.
    #[serde(default)]
    pub backend: ContextBackend,
    /// Base directory for the local backend.
    #[serde(default)]
    pub path: Option<String>,
    /// S3 bucket name (required for the s3 backend).
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 key prefix.
    #[serde(default)]
    pub prefix: Option<String>,
    /// S3 region, if different from the Connect region.
    #[serde(default)]
    pub region: Option<String>,
}

/// Context storage backend types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContextBackend {
    /// Local JSON files.
    #[default]
    Local,
    /// AWS S3 objects.
    S3,
}

impl ReconcilerSettings {
    /// Checks values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.backend == ContextBackend::S3
            && self.context.bucket.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::InvalidValue {
                field: String::from("context.bucket"),
                message: String::from("required when context.backend is s3"),
            });
        }

        if self.reconcile.step_budget == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: String::from("reconcile.step_budget"),
                message: String::from("must be at least 1, omit it to run every step"),
            });
        }

        if let Some(url) = &self.aws.endpoint_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                field: String::from("aws.endpoint_url"),
                message: format!("'{url}' is not an http(s) URL"),
            });
        }

        Ok(())
    }

    /// Handler options derived from these settings.
    #[must_use]
    pub const fn handler_options(&self) -> HandlerOptions {
        HandlerOptions {
            tag_reconciliation: self.reconcile.tags,
            step_budget: self.reconcile.step_budget,
        }
    }
}

impl std::fmt::Display for ContextBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::S3 => write!(f, "s3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ReconcilerSettings::default();
        assert_eq!(settings.reconcile.tags, TagReconciliation::Disabled);
        assert_eq!(settings.context.backend, ContextBackend::Local);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.handler_options(), HandlerOptions::default());
    }

    #[test]
    fn test_s3_requires_bucket() {
        let mut settings = ReconcilerSettings::default();
        settings.context.backend = ContextBackend::S3;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("context.bucket"));

        settings.context.bucket = Some(String::from("hgroup-contexts"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_step_budget_rejected() {
        let mut settings = ReconcilerSettings::default();
        settings.reconcile.step_budget = Some(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_endpoint_must_be_url() {
        let mut settings = ReconcilerSettings::default();
        settings.aws.endpoint_url = Some(String::from("localhost:4566"));
        assert!(settings.validate().is_err());

        settings.aws.endpoint_url = Some(String::from("http://localhost:4566"));
        assert!(settings.validate().is_ok());
    }
}
