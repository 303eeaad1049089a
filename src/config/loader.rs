//! Settings loader.
//!
//! Settings come from `hgroup.yaml` (found by walking up from the working
//! directory), then `HGROUP_*` environment variables, then a `.env` file
//! loaded into the environment beforehand.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, ReconcilerError, Result};

use super::settings::{ContextBackend, ReconcilerSettings};

/// Default settings file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["hgroup.yaml", "hgroup.yml", ".hgroup.yaml"];

/// Loader for reconciler settings.
#[derive(Debug, Default)]
pub struct SettingsLoader {
    /// Base path for `.env` lookup.
    base_path: Option<PathBuf>,
}

impl SettingsLoader {
    /// Creates a new settings loader.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for `.env` lookup.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ReconcilerSettings> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        if !path.exists() {
            return Err(ReconcilerError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ReconcilerError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ReconcilerSettings> {
        debug!("Parsing YAML settings");

        // An empty file is a valid "all defaults" file
        if content.trim().is_empty() {
            return Ok(ReconcilerSettings::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            ReconcilerError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })
    }

    /// Resolves the effective settings.
    ///
    /// Uses `explicit` if given, otherwise searches from the working
    /// directory; defaults apply when no file exists. Environment overrides
    /// are applied last and the result is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be parsed, an override is malformed,
    /// or the result is invalid.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<ReconcilerSettings> {
        let mut settings = match explicit {
            Some(path) => self.load_file(path)?,
            None => {
                let cwd = std::env::current_dir()?;
                match find_config_file(&cwd) {
                    Ok(path) => self.load_file(path)?,
                    Err(_) => {
                        debug!("No settings file found, using defaults");
                        ReconcilerSettings::default()
                    }
                }
            }
        };

        Self::apply_overrides(&mut settings, |name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies `HGROUP_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `HGROUP_TAGS` is not a known mode.
    pub fn apply_overrides(
        settings: &mut ReconcilerSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(region) = lookup("HGROUP_REGION") {
            debug!("Overriding aws.region from environment");
            settings.aws.region = Some(region);
        }

        if let Some(url) = lookup("HGROUP_ENDPOINT_URL") {
            debug!("Overriding aws.endpoint_url from environment");
            settings.aws.endpoint_url = Some(url);
        }

        if let Some(mode) = lookup("HGROUP_TAGS") {
            debug!("Overriding reconcile.tags from environment");
            settings.reconcile.tags = mode.parse().map_err(|message| ConfigError::InvalidValue {
                field: String::from("HGROUP_TAGS"),
                message,
            })?;
        }

        if let Some(bucket) = lookup("HGROUP_CONTEXT_BUCKET") {
            debug!("Overriding context.bucket from environment, using the s3 backend");
            settings.context.bucket = Some(bucket);
            settings.context.backend = ContextBackend::S3;
        }

        if let Some(prefix) = lookup("HGROUP_CONTEXT_PREFIX") {
            debug!("Overriding context.prefix from environment");
            settings.context.prefix = Some(prefix);
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ReconcilerError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Finds the settings file in a directory or its parents.
///
/// # Errors
///
/// Returns an error if no settings file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found settings file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ReconcilerError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
