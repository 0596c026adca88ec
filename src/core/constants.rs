//! Constants used throughout envault.
//!
//! Centralizes magic strings and configuration values.

/// Installation configuration file name, under [`ENVAULT_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Per-user secret store file name, under [`ENVAULT_DIR`].
pub const USER_STORE_FILE: &str = "secrets.json";

/// Installation-default secret store file name, under [`ENVAULT_DIR`].
pub const DEFAULT_STORE_FILE: &str = "defaults.json";

/// Directory relative to HOME holding config and stores (~/.envault).
pub const ENVAULT_DIR: &str = ".envault";

/// Prefix tagging an encrypted secret value.
///
/// Detecting ciphertext is a prefix check on this marker, never a parse
/// attempt, so plaintext and ciphertext can coexist in one store.
pub const ENCRYPTED_PREFIX: &str = "enc::";

/// Reserved store key holding the installation encryption key.
///
/// Stored like any other entry but stripped from every loaded map, so it
/// is never a candidate for template resolution.
pub const RESERVED_KEY: &str = "envault-encryption-key";

/// Name of the environment context used for inter-container networking.
///
/// Resolving for this context enables the service port remapping pass.
pub const DOCKER_CONTEXT: &str = "docker";

/// Name of the stock local-development context, the fallback for
/// unknown context names.
pub const LOCAL_CONTEXT: &str = "local";

/// Deployment manifest field stripped before canonical hashing, so the
/// hash is never a function of itself.
pub const DEPLOYMENT_KEY_FIELD: &str = "deploymentKey";

/// Owner-only permission mode applied to secret stores and resolved
/// environment files at creation time (Unix).
#[cfg(unix)]
pub const SECRET_FILE_MODE: u32 = 0o600;
