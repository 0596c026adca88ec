//! Error types for envault operations.
//!
//! Errors are grouped by domain into sub-enums and wrapped by the
//! top-level [`Error`]. Every user-facing message is actionable: it
//! names the missing keys, the expected file path, and the command to
//! run, since the calling CLI surfaces these messages verbatim.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error wrapping all domain errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation inside envault itself, not a configuration
    /// problem the user can fix.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is fixable by the user (bad config, missing
    /// files, missing keys) as opposed to an internal or environmental
    /// failure. Callers map this to exit codes.
    pub fn user_facing(&self) -> bool {
        !matches!(self, Error::Io(_) | Error::Internal(_))
    }
}

/// Installation configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    ReadFile(std::io::Error),

    #[error("failed to write config: {0}")]
    WriteFile(std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid application config: {0}")]
    InvalidAppConfig(String),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Secret store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An explicitly requested store path does not exist.
    #[error("secrets file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// No store existed at any candidate location.
    #[error(
        "no secret store found\n  looked for: {}\n  looked for: {}\n  create one of them with: envault secrets set <key> <value>",
        .user.display(),
        .install_default.display()
    )]
    NoneFound {
        user: PathBuf,
        install_default: PathBuf,
    },

    /// A store document was readable but not a flat key/value object.
    #[error("invalid secrets format in {}: {reason}", .path.display())]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("failed to read secrets file {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write secrets file {}: {source}", .path.display())]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Encryption and key-management errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A tagged-encrypted value was found but no key is configured.
    #[error(
        "store contains encrypted values but no encryption key is configured\n  set one with: envault key init"
    )]
    MissingKey,

    /// Decryption failed for one named secret: wrong key, missing tag,
    /// or a malformed payload.
    #[error("failed to decrypt secret '{name}': {reason}")]
    DecryptionFailed { name: String, reason: String },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("invalid encryption key: {0}")]
    InvalidKey(String),
}

/// Template resolution errors.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The template references secrets absent from every loaded store.
    /// `refs` is deduplicated, in first-seen order.
    #[error("{}", missing_secrets_message(.refs, .searched))]
    MissingSecrets {
        refs: Vec<String>,
        searched: Vec<PathBuf>,
    },
}

fn missing_secrets_message(refs: &[String], searched: &[PathBuf]) -> String {
    let mut msg = format!("missing secret values for: {}", refs.join(", "));
    for path in searched {
        msg.push_str(&format!("\n  searched: {}", path.display()));
    }
    msg.push_str("\n  add them to your secret store, or run: envault secrets sync --generate");
    msg
}
