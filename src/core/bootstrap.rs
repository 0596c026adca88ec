//! Encryption key bootstrap.
//!
//! Guarantees the installation has a symmetric key before anything
//! needs to decrypt. Runs once from the CLI's startup sequence; the key
//! is then threaded explicitly through loader and codec calls rather
//! than fetched from ambient state. The key value itself never reaches
//! a log line, an error message, or process output, only the paths it
//! was found at or written to.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::core::codec::EncryptionKey;
use crate::core::config::{AppConfig, InstallConfig};
use crate::core::constants;
use crate::core::store::{self, StoreLocations};
use crate::error::{CryptoError, Result};

/// Ensure the installation config records an encryption key. Idempotent.
///
/// Discovery order:
/// 1. a key already recorded in `config`: immediate no-op;
/// 2. the reserved entry in the per-user store;
/// 3. the reserved entry in the application-declared store, if any;
/// 4. a freshly generated key, persisted into the per-user store under
///    the reserved name and recorded in `config`.
///
/// Adopted keys are validated before being recorded; a malformed stored
/// key fails here rather than at first decryption.
///
/// # Errors
///
/// Returns error if a probed store is malformed, a found key is
/// invalid, or persisting the key fails.
pub fn ensure_key(
    config: &mut InstallConfig,
    config_path: &Path,
    locations: &StoreLocations,
    app: Option<&AppConfig>,
) -> Result<()> {
    if config.encryption_key.is_some() {
        return Ok(());
    }

    if let Some(encoded) = probe_store(&locations.user)? {
        adopt(config, config_path, &encoded)?;
        debug!(store = %locations.user.display(), "encryption key adopted from user store");
        return Ok(());
    }

    if let Some(declared) = app.and_then(|a| a.build.secrets.as_deref()) {
        let path = store::resolve_explicit(declared)?;
        if let Some(encoded) = probe_store(&path)? {
            adopt(config, config_path, &encoded)?;
            debug!(store = %path.display(), "encryption key adopted from application store");
            return Ok(());
        }
    }

    let key = EncryptionKey::generate();
    persist_reserved(&locations.user, &key)?;
    config.set_encryption_key(&key);
    config.save_to(config_path)?;
    debug!(store = %locations.user.display(), "generated new encryption key");

    Ok(())
}

/// Read the reserved key entry from a store, if the store and entry
/// exist.
fn probe_store(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let document = store::read_document(path)?;
    match document.get(constants::RESERVED_KEY) {
        Some(Value::String(encoded)) if !encoded.is_empty() => Ok(Some(encoded.clone())),
        _ => Ok(None),
    }
}

fn adopt(config: &mut InstallConfig, config_path: &Path, encoded: &str) -> Result<()> {
    // Validate now so a corrupt stored key fails at bootstrap, not at
    // first decryption.
    let key = EncryptionKey::from_base64(encoded)
        .map_err(|_| CryptoError::InvalidKey("stored key is not a valid 32-byte key".into()))?;
    config.set_encryption_key(&key);
    config.save_to(config_path)?;
    Ok(())
}

/// Write the key into a store under the reserved name, preserving any
/// existing entries.
fn persist_reserved(store_path: &Path, key: &EncryptionKey) -> Result<()> {
    let mut document = if store_path.exists() {
        store::read_document(store_path)?
    } else {
        serde_json::Map::new()
    };

    document.insert(
        constants::RESERVED_KEY.to_string(),
        Value::String(key.to_base64()),
    );
    store::write_document(store_path, &document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StoreLocations, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let locations = StoreLocations::under(tmp.path());
        let config_path = tmp.path().join("config.toml");
        (tmp, locations, config_path)
    }

    #[test]
    fn configured_key_is_a_noop() {
        let (_tmp, locations, config_path) = setup();

        let mut config = InstallConfig::new();
        let key = EncryptionKey::generate();
        config.set_encryption_key(&key);
        let before = config.encryption_key.clone();

        ensure_key(&mut config, &config_path, &locations, None).unwrap();

        assert_eq!(config.encryption_key, before);
        // Nothing was persisted: no store, no config file.
        assert!(!locations.user.exists());
        assert!(!config_path.exists());
    }

    #[test]
    fn generates_and_persists_when_nothing_found() {
        let (_tmp, locations, config_path) = setup();

        let mut config = InstallConfig::new();
        ensure_key(&mut config, &config_path, &locations, None).unwrap();

        assert!(config.encryption_key.is_some());
        assert!(config_path.exists());

        let document = store::read_document(&locations.user).unwrap();
        assert_eq!(
            document.get(constants::RESERVED_KEY).unwrap().as_str(),
            config.encryption_key.as_deref()
        );
    }

    #[test]
    fn adopts_key_from_user_store() {
        let (_tmp, locations, config_path) = setup();

        let key = EncryptionKey::generate();
        let mut document = serde_json::Map::new();
        document.insert(
            constants::RESERVED_KEY.to_string(),
            Value::String(key.to_base64()),
        );
        store::write_document(&locations.user, &document).unwrap();

        let mut config = InstallConfig::new();
        ensure_key(&mut config, &config_path, &locations, None).unwrap();

        assert_eq!(config.encryption_key.as_deref(), Some(key.to_base64().as_str()));
    }

    #[test]
    fn invalid_stored_key_fails_at_bootstrap() {
        let (_tmp, locations, config_path) = setup();

        let mut document = serde_json::Map::new();
        document.insert(
            constants::RESERVED_KEY.to_string(),
            Value::String("not-a-key".into()),
        );
        store::write_document(&locations.user, &document).unwrap();

        let mut config = InstallConfig::new();
        let err = ensure_key(&mut config, &config_path, &locations, None).unwrap_err();
        assert!(!err.to_string().contains("not-a-key"));
        assert!(config.encryption_key.is_none());
    }

    #[test]
    fn is_idempotent_across_calls() {
        let (_tmp, locations, config_path) = setup();

        let mut config = InstallConfig::new();
        ensure_key(&mut config, &config_path, &locations, None).unwrap();
        let first = config.encryption_key.clone();

        ensure_key(&mut config, &config_path, &locations, None).unwrap();
        assert_eq!(config.encryption_key, first);
    }
}
