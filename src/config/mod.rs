//! Configuration module for the reconciler.
//!
//! This module handles all settings-related functionality:
//! - Parsing `hgroup.yaml`
//! - Environment and `.env` overrides
//! - Validation of setting values

mod settings;
mod loader;

pub use settings::{AwsSettings, ContextBackend, ContextSettings, ReconcileSettings, ReconcilerSettings};
pub use loader::{find_config_file, SettingsLoader, DEFAULT_CONFIG_FILES};
