//! Configuration documents.
//!
//! Two documents cross this subsystem's boundary: the installation
//! config (`~/.envault/config.toml`, owned by envault) and the
//! application config (owned by the calling CLI, handed in already
//! parsed). Neither is cached across invocations; the CLI is a
//! short-lived process per command.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::codec::EncryptionKey;
use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Installation configuration stored in `~/.envault/config.toml`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Metadata about the installation.
    pub envault: Meta,
    /// Base64 form of the installation encryption key, if configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

/// Metadata section of the installation configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    /// Configuration version.
    pub version: String,
}

impl InstallConfig {
    /// Create a new empty configuration with the current version.
    pub fn new() -> Self {
        Self {
            envault: Meta {
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            encryption_key: None,
        }
    }

    /// Well-known path of the configuration file (`~/.envault/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(constants::ENVAULT_DIR)
            .join(constants::CONFIG_FILE)
    }

    /// Load configuration from the well-known path.
    ///
    /// A missing file yields a fresh default config rather than an
    /// error: first-run users have nothing on disk yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the TOML is malformed.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading install config");

        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Save configuration to an explicit path, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the file write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "saving install config");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::WriteFile)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::WriteFile)?;

        Ok(())
    }

    /// Save configuration to the well-known path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// The configured encryption key, parsed and validated.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKey` if a key is present but not a
    /// valid base64-encoded 32-byte value.
    pub fn encryption_key(&self) -> Result<Option<EncryptionKey>> {
        match &self.encryption_key {
            Some(encoded) => Ok(Some(EncryptionKey::from_base64(encoded)?)),
            None => Ok(None),
        }
    }

    /// Record an encryption key in its base64 storage form.
    pub fn set_encryption_key(&mut self, key: &EncryptionKey) {
        self.encryption_key = Some(key.to_base64());
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Application configuration document, as declared by the project the
/// CLI operates on. Only the fields this subsystem consumes are typed;
/// everything else in the document is the caller's business.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Application name, used for deterministic secret synthesis.
    #[serde(default)]
    pub name: String,
    /// Build-time declarations.
    #[serde(default)]
    pub build: BuildConfig,
}

/// The `build` section of an application config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Path to an additional secret store declared by the application.
    #[serde(default)]
    pub secrets: Option<PathBuf>,
    /// Extra destination the resolved environment file is copied to.
    #[serde(default)]
    pub env_output_path: Option<PathBuf>,
}

impl AppConfig {
    /// Build an `AppConfig` from an already-parsed configuration
    /// document, as handed in by the calling CLI.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidAppConfig` if the document does not
    /// have the expected shape.
    pub fn from_value(document: &serde_json::Value) -> Result<Self> {
        serde_json::from_value(document.clone())
            .map_err(|e| ConfigError::InvalidAppConfig(e.to_string()).into())
    }
}
