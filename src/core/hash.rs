//! Canonical content hashing for deployment integrity.
//!
//! The canonical hash is a SHA-256 fingerprint of a document's
//! structure and values: object keys are sorted recursively and the
//! result is serialized without whitespace before hashing, so two
//! documents that differ only in key order or textual formatting hash
//! identically. Used for deployment-key generation and integrity
//! checks.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::constants;

/// Hash a document canonically: recursive key sort, compact
/// serialization, SHA-256 over the UTF-8 bytes.
///
/// Returns 64 lowercase hex characters.
pub fn canonical_hash(document: &Value) -> String {
    let mut serialized = String::new();
    canonicalize(document, &mut serialized);
    content_hash(&serialized)
}

/// Hash raw textual content directly, without any canonicalization.
///
/// Used when the structural guarantee is not needed, e.g. fingerprinting
/// a whole file's bytes. Returns 64 lowercase hex characters.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Hash a deployment manifest, ignoring its own integrity field.
///
/// The `deploymentKey` field is removed from a shallow copy before
/// canonicalization so the hash is never self-referential. The caller's
/// document is left untouched.
pub fn manifest_hash(manifest: &Value) -> String {
    match manifest {
        Value::Object(map) => {
            let mut copy = map.clone();
            copy.remove(constants::DEPLOYMENT_KEY_FIELD);
            canonical_hash(&Value::Object(copy))
        }
        other => canonical_hash(other),
    }
}

/// Serialize a value canonically: object keys sorted, arrays in order,
/// scalars in compact JSON form.
fn canonicalize(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                canonicalize(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canonicalize(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
