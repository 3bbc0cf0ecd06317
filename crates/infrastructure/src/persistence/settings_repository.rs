//! Engine settings persistence.
//!
//! Settings live in the platform-specific config directory unless a path is
//! given:
//! - Linux/macOS: ~/.config/stencil/settings.json
//! - Windows: %APPDATA%/stencil/settings.json
//!
//! `STENCIL_*` environment variables override individual fields.

use std::path::{Path, PathBuf};

use stencil_domain::EngineSettings;
use tokio::fs;
use tracing::debug;

use crate::serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Could not determine config directory.
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// An environment override holds an unusable value.
    #[error("Invalid value for {key}: {value}")]
    InvalidOverride {
        /// Environment variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Repository for [`EngineSettings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsRepository {
    path: Option<PathBuf>,
}

impl SettingsRepository {
    /// Creates a repository using the default settings path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Creates a repository reading `path`.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns the default settings path, if a config directory exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stencil").join("settings.json"))
    }

    /// Returns the path settings are read from.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads settings with overrides from the process environment.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or an override is invalid.
    pub async fn load(&self) -> Result<EngineSettings, SettingsError> {
        self.load_with_env(|key| std::env::var(key).ok()).await
    }

    /// Loads settings with overrides looked up through `env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or an override is invalid.
    pub async fn load_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<EngineSettings, SettingsError> {
        let settings = match &self.path {
            Some(path) if fs::try_exists(path).await? => {
                debug!(path = %path.display(), "loading settings");
                from_json_bytes(&fs::read(path).await?)?
            }
            _ => EngineSettings::default(),
        };
        apply_env_overrides(settings, env)
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is known or the file cannot be written.
    pub async fn save(&self, settings: &EngineSettings) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Err(SettingsError::NoConfigDir);
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, to_json_stable_bytes(settings)?).await?;
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidOverride { key, value })
}

/// Applies `STENCIL_*` overrides to `settings`.
///
/// # Errors
///
/// Returns [`SettingsError::InvalidOverride`] when a numeric override does not parse.
pub fn apply_env_overrides(
    mut settings: EngineSettings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<EngineSettings, SettingsError> {
    if let Some(value) = env("STENCIL_DEFAULT_FORMAT") {
        settings.default_format = value;
    }
    if let Some(value) = env("STENCIL_URL_PARAM_PREFIX") {
        settings.url_param_prefix = value;
    }
    if let Some(value) = env("STENCIL_TIMEZONE") {
        settings.timezone = value;
    }
    if let Some(value) = env("STENCIL_MAX_INTERPOLATION_DEPTH") {
        settings.max_interpolation_depth = parse_number("STENCIL_MAX_INTERPOLATION_DEPTH", value)?;
    }
    if let Some(value) = env("STENCIL_MAX_URL_LENGTH") {
        settings.max_url_length = parse_number("STENCIL_MAX_URL_LENGTH", value)?;
    }
    if let Some(value) = env("STENCIL_INTERVAL_RESOLUTION") {
        settings.interval_resolution = parse_number("STENCIL_INTERVAL_RESOLUTION", value)?;
    }
    Ok(settings)
}
