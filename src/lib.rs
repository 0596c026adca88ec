//! Envault - secrets and environment resolution for containerized
//! app development.
//!
//! Turns a symbolic environment template plus one or more
//! partially-overlapping secret stores into a concrete,
//! environment-specific `.env` payload, keeping sensitive values
//! encrypted at rest and verifiable for deployment integrity.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── error            # Error taxonomy (user-facing vs internal)
//! └── core/            # Core library components
//!     ├── codec        # Symmetric encryption of secret values
//!     ├── hash         # Canonical SHA-256 content fingerprints
//!     ├── config       # Installation + application config documents
//!     ├── context      # Environment contexts (local vs docker)
//!     ├── store        # Cascading secret store loading
//!     ├── resolve      # ${VAR} and kv:// template resolution
//!     ├── synth        # Synthesis of missing secret values
//!     └── bootstrap    # Encryption key discovery/generation
//! ```
//!
//! # Typical flow
//!
//! The calling CLI bootstraps the encryption key once at startup, loads
//! the decrypted secret map, then resolves a template for a named
//! environment context:
//!
//! ```no_run
//! use envault::core::{bootstrap, config::InstallConfig, context::EnvContexts,
//!     resolve, store::{self, StoreLocations}};
//!
//! # fn main() -> envault::error::Result<()> {
//! let locations = StoreLocations::discover();
//! let config_path = InstallConfig::default_path();
//! let mut config = InstallConfig::load()?;
//! bootstrap::ensure_key(&mut config, &config_path, &locations, None)?;
//!
//! let key = config.encryption_key()?;
//! let secrets = store::load(None, None, &locations, key.as_ref())?;
//! let resolved = resolve::resolve(
//!     "DATABASE_URL=kv://myapp-postgres-urlKeyVault\n",
//!     &secrets,
//!     &EnvContexts::builtin(),
//!     "local",
//! )?;
//! # let _ = resolved;
//! # Ok(())
//! # }
//! ```
//!
//! Resolution is all-or-nothing: either the fully resolved text comes
//! back, or an actionable error is raised before any output is written.

pub mod core;
pub mod error;
