//! Secret store loading with cascading lookup.
//!
//! A secret store is a flat JSON object mapping opaque key names to
//! string values; values may be plaintext or tagged-encrypted. Stores
//! are resolved from a prioritized list of locations, merged with
//! user-overrides-win semantics, and decrypted before anything else
//! consumes them. Stores are re-read from disk on every call; the CLI
//! is a short-lived process and caching across commands would go stale.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::core::codec::{self, EncryptionKey};
use crate::core::config::AppConfig;
use crate::core::constants;
use crate::error::{CryptoError, Result, StoreError};

/// Well-known store locations for one installation.
///
/// Threaded explicitly through loader and bootstrapper calls so tests
/// and embedding CLIs can point the subsystem anywhere.
#[derive(Debug, Clone)]
pub struct StoreLocations {
    /// Per-user store (`~/.envault/secrets.json`).
    pub user: PathBuf,
    /// Installation-default store (`~/.envault/defaults.json`).
    pub install_default: PathBuf,
}

impl StoreLocations {
    /// Discover the locations under the user's home profile.
    pub fn discover() -> Self {
        let base = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(constants::ENVAULT_DIR);
        Self::under(&base)
    }

    /// Locations rooted at an explicit directory.
    pub fn under(dir: &Path) -> Self {
        Self {
            user: dir.join(constants::USER_STORE_FILE),
            install_default: dir.join(constants::DEFAULT_STORE_FILE),
        }
    }
}

/// A fully decrypted secret map plus the store paths it came from.
///
/// `sources` feeds resolver error messages, so a missing-secret report
/// can say where the values were expected to live.
#[derive(Debug, Clone)]
pub struct LoadedSecrets {
    pub values: BTreeMap<String, String>,
    pub sources: Vec<PathBuf>,
}

impl LoadedSecrets {
    /// Whether a secret with this key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Look up a secret value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Load and decrypt the secret map for a resolution call.
///
/// Resolution order when `explicit` is absent:
/// 1. the per-user store;
/// 2. a store declared by the application config (`build.secrets`),
///    merged with the per-user store's keys winning on conflict;
/// 3. the installation-default store, if neither of the above existed;
/// 4. `StoreError::NoneFound` naming both candidate paths.
///
/// An explicit path must exist (`StoreError::FileNotFound` otherwise)
/// and is used alone. Relative explicit paths, including `..` forms,
/// resolve against the current working directory.
///
/// Every tagged-encrypted value is decrypted; if any is present and no
/// key is configured the call fails with `CryptoError::MissingKey`
/// rather than returning ciphertext. The reserved encryption-key entry
/// is stripped from the returned map.
pub fn load(
    explicit: Option<&Path>,
    app: Option<&AppConfig>,
    locations: &StoreLocations,
    key: Option<&EncryptionKey>,
) -> Result<LoadedSecrets> {
    let (raw, sources) = match explicit {
        Some(path) => {
            let path = resolve_explicit(path)?;
            if !path.exists() {
                return Err(StoreError::FileNotFound { path }.into());
            }
            let map = read_map(&path)?;
            (map, vec![path])
        }
        None => load_cascade(app, locations)?,
    };

    debug!(
        entries = raw.len(),
        sources = sources.len(),
        "loaded secret stores"
    );

    let mut values = decrypt_all(raw, key)?;
    values.remove(constants::RESERVED_KEY);

    Ok(LoadedSecrets { values, sources })
}

fn load_cascade(
    app: Option<&AppConfig>,
    locations: &StoreLocations,
) -> Result<(BTreeMap<String, String>, Vec<PathBuf>)> {
    let mut merged = BTreeMap::new();
    let mut sources = Vec::new();

    let app_store = app.and_then(|a| a.build.secrets.as_deref());
    if let Some(declared) = app_store {
        let path = resolve_explicit(declared)?;
        if path.exists() {
            merged.extend(read_map(&path)?);
            sources.push(path);
        }
    }

    if locations.user.exists() {
        // User entries override application-declared ones.
        merged.extend(read_map(&locations.user)?);
        sources.insert(0, locations.user.clone());
    }

    if sources.is_empty() {
        if locations.install_default.exists() {
            merged.extend(read_map(&locations.install_default)?);
            sources.push(locations.install_default.clone());
        } else {
            return Err(StoreError::NoneFound {
                user: locations.user.clone(),
                install_default: locations.install_default.clone(),
            }
            .into());
        }
    }

    Ok((merged, sources))
}

/// Resolve a caller-supplied path: absolute paths pass through,
/// relative ones (including `..` forms) resolve against the current
/// working directory.
pub(crate) fn resolve_explicit(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn decrypt_all(
    raw: BTreeMap<String, String>,
    key: Option<&EncryptionKey>,
) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    for (name, value) in raw {
        let plaintext = if codec::is_encrypted(&value) {
            let key = key.ok_or(CryptoError::MissingKey)?;
            codec::decrypt(&value, key, &name)?
        } else {
            value
        };
        values.insert(name, plaintext);
    }
    Ok(values)
}

/// Read a store file into a coerced string map.
fn read_map(path: &Path) -> Result<BTreeMap<String, String>> {
    let document = read_document(path)?;
    let mut map = BTreeMap::new();
    for (key, value) in &document {
        map.insert(key.clone(), coerce_value(path, key, value)?);
    }
    Ok(map)
}

/// Read a store file as a raw JSON object.
///
/// Used where the document must be persisted back unchanged (the
/// synthesizer's read-merge-write, the bootstrapper's key probe, a
/// CLI's secret-editing commands), so encrypted entries survive
/// byte-for-byte.
pub fn read_document(path: &Path) -> Result<serde_json::Map<String, Value>> {
    let contents = std::fs::read_to_string(path).map_err(|source| StoreError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let document: Value =
        serde_json::from_str(&contents).map_err(|e| StoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    match document {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("expected a flat object, got {}", json_kind(&other)),
        }
        .into()),
    }
}

/// Write a store document with owner-only permissions, creating parent
/// directories as needed.
pub fn write_document(path: &Path, document: &serde_json::Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let mut contents = serde_json::to_string_pretty(document)
        .map_err(|e| crate::error::Error::Internal(format!("store serialization failed: {}", e)))?;
    contents.push('\n');

    std::fs::write(path, contents).map_err(|source| StoreError::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;

    restrict_permissions(path)?;
    Ok(())
}

/// Restrict a secret-bearing file to owner read/write (Unix only).
pub(crate) fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(
            path,
            std::fs::Permissions::from_mode(constants::SECRET_FILE_MODE),
        )
        .map_err(|source| StoreError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Coerce a raw store value to its string form.
///
/// Strings pass through; numbers and booleans take their display form;
/// null becomes the empty string. Nested objects and arrays violate the
/// flat-store contract.
fn coerce_value(path: &Path, key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        nested => Err(StoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("value for '{}' is {}, stores are flat", key, json_kind(nested)),
        }
        .into()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
