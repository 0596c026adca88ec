//! Synthesis of missing secret values.
//!
//! A first-run developer should never be blocked on hand-writing every
//! secret a template references. When asked, this pass fabricates
//! policy-appropriate values for undeclared `kv://` keys and persists
//! the merged store. Policies are an ordered rule table keyed on the
//! secret's name: database credentials get deterministic values so
//! local environments are reproducible, anything credential-shaped gets
//! a random value, and anything unrecognized gets an explicit blank for
//! manual entry.
//!
//! The store update is a read-merge-write over the raw document, so
//! pre-existing entries (encrypted ones included) are preserved exactly.
//! Concurrent CLI invocations can race that cycle; store files are
//! single-writer-by-convention, not locked.

use std::path::Path;

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng, RngCore};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::resolve::scan_refs;
use crate::core::store::{self, LoadedSecrets};
use crate::error::Result;

/// Length of random passwords, in alphanumeric characters.
const PASSWORD_LEN: usize = 24;

/// Length of random tokens, in bytes before hex encoding.
const TOKEN_BYTES: usize = 32;

/// What to generate for one missing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    /// Deterministic password derived from the application name.
    DbPassword,
    /// Cryptographically random password.
    RandomPassword,
    /// Deterministic connection string; `${DB_HOST}` stays symbolic for
    /// the resolver to fill per context.
    DbUrl,
    /// Explicit blank, to be filled in by hand.
    BlankUrl,
    /// Cryptographically random token.
    RandomToken,
    /// Explicit blank for anything unrecognized.
    Blank,
}

type Predicate = fn(&str) -> bool;

/// Classification rules, evaluated in priority order against the
/// lowercased key name. First match wins.
const RULES: &[(Predicate, Policy)] = &[
    (is_db_password, Policy::DbPassword),
    (is_password, Policy::RandomPassword),
    (is_db_url, Policy::DbUrl),
    (is_url, Policy::BlankUrl),
    (is_credential, Policy::RandomToken),
];

fn is_db_password(key: &str) -> bool {
    key.contains("postgres") && key.contains("password")
}

fn is_password(key: &str) -> bool {
    key.contains("password")
}

fn is_db_url(key: &str) -> bool {
    key.contains("postgres") && (key.contains("url") || key.contains("uri"))
}

fn is_url(key: &str) -> bool {
    key.contains("url") || key.contains("uri")
}

fn is_credential(key: &str) -> bool {
    key.contains("key") || key.contains("secret") || key.contains("token")
}

fn classify(key: &str) -> Policy {
    let lowered = key.to_ascii_lowercase();
    RULES
        .iter()
        .find(|(matches, _)| matches(&lowered))
        .map(|(_, policy)| *policy)
        .unwrap_or(Policy::Blank)
}

impl Policy {
    fn generate(self, app_name: &str) -> String {
        match self {
            Policy::DbPassword => derived_db_password(app_name),
            Policy::RandomPassword => random_password(),
            Policy::DbUrl => format!(
                "postgresql://pgadmin:{}@${{DB_HOST}}:5432/{}",
                derived_db_password(app_name),
                app_name
            ),
            Policy::BlankUrl | Policy::Blank => String::new(),
            Policy::RandomToken => random_token(),
        }
    }
}

/// Deterministic development password for an application's database.
///
/// Stable across runs for the same application name, so repeated
/// scaffolds and teammates' machines agree on local credentials.
fn derived_db_password(app_name: &str) -> String {
    let digest = hex::encode(Sha256::digest(format!("{}:postgres", app_name).as_bytes()));
    format!("{}-{}", app_name, &digest[..12])
}

fn random_password() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Detect `kv://` keys the template references but the store lacks,
/// synthesize values for them, and persist the merged store.
///
/// Existing entries are never modified. The store file is created on
/// first run, always with owner-only permissions. Returns the newly
/// added key names in template order; generated values are not logged
/// or returned.
///
/// # Errors
///
/// Returns error if the store document is malformed or the write fails.
pub fn synthesize_missing(
    template: &str,
    existing: &LoadedSecrets,
    store_path: &Path,
    app_name: &str,
) -> Result<Vec<String>> {
    let missing: Vec<String> = scan_refs(template)
        .into_iter()
        .filter(|name| !existing.contains(name))
        .collect();

    if missing.is_empty() {
        return Ok(missing);
    }

    let mut document = if store_path.exists() {
        store::read_document(store_path)?
    } else {
        serde_json::Map::new()
    };

    for name in &missing {
        if !document.contains_key(name) {
            let value = classify(name).generate(app_name);
            document.insert(name.clone(), serde_json::Value::String(value));
        }
    }

    store::write_document(store_path, &document)?;

    debug!(
        added = missing.len(),
        store = %store_path.display(),
        "synthesized missing secrets"
    );

    Ok(missing)
}
