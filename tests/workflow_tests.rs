//! End-to-end workflows across bootstrap, stores, and resolution.

mod support;

use envault::core::bootstrap;
use envault::core::codec::{self, EncryptionKey};
use envault::core::config::InstallConfig;
use envault::core::context::EnvContexts;
use envault::core::hash;
use envault::core::resolve;
use envault::core::store;
use support::*;

#[test]
fn first_run_bootstrap_then_resolve() {
    let env = TestEnv::new();

    // Startup: no config, no stores. Bootstrap generates and persists a key.
    let mut config = InstallConfig::load_from(&env.config_path).unwrap();
    bootstrap::ensure_key(&mut config, &env.config_path, &env.locations, None).unwrap();
    let key = config.encryption_key().unwrap().expect("key bootstrapped");

    // The developer stores an encrypted secret next to the reserved entry.
    let sealed = codec::encrypt("tok-123", &key).unwrap();
    let mut document = store::read_document(&env.locations.user).unwrap();
    document.insert("api-token".into(), serde_json::Value::String(sealed));
    store::write_document(&env.locations.user, &document).unwrap();

    // A later invocation reloads everything from disk.
    let config = InstallConfig::load_from(&env.config_path).unwrap();
    let key = config.encryption_key().unwrap().unwrap();
    let loaded = store::load(None, None, &env.locations, Some(&key)).unwrap();

    let resolved = resolve::resolve(
        "API_TOKEN=kv://api-token\n",
        &loaded,
        &EnvContexts::builtin(),
        "docker",
    )
    .unwrap();
    assert_eq!(resolved, "API_TOKEN=tok-123\n");

    // Write the artifact where the build pipeline expects it.
    let out = env.path("build/.env");
    resolve::write_env_file(&out, &resolved, None).unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap(), resolved);
}

#[test]
fn bootstrap_adopts_key_from_app_declared_store() {
    let env = TestEnv::new();
    let key = EncryptionKey::generate();
    let app_store = env.write_file(
        "app/secrets.json",
        &format!(r#"{{"envault-encryption-key": "{}"}}"#, key.to_base64()),
    );
    let app = app_config("myapp", Some(&app_store), None);

    let mut config = InstallConfig::load_from(&env.config_path).unwrap();
    bootstrap::ensure_key(&mut config, &env.config_path, &env.locations, Some(&app)).unwrap();

    assert_eq!(
        config.encryption_key.as_deref(),
        Some(key.to_base64().as_str())
    );

    // Adopted, not regenerated: values encrypted under the original key
    // stay readable.
    let adopted = config.encryption_key().unwrap().unwrap();
    let sealed = codec::encrypt("check", &key).unwrap();
    assert_eq!(codec::decrypt(&sealed, &adopted, "check").unwrap(), "check");
}

#[test]
fn user_store_key_wins_over_app_store_key() {
    let env = TestEnv::new();
    let user_key = EncryptionKey::generate();
    let app_key = EncryptionKey::generate();

    env.write_user_store(&format!(
        r#"{{"envault-encryption-key": "{}"}}"#,
        user_key.to_base64()
    ));
    let app_store = env.write_file(
        "app/secrets.json",
        &format!(r#"{{"envault-encryption-key": "{}"}}"#, app_key.to_base64()),
    );
    let app = app_config("myapp", Some(&app_store), None);

    let mut config = InstallConfig::load_from(&env.config_path).unwrap();
    bootstrap::ensure_key(&mut config, &env.config_path, &env.locations, Some(&app)).unwrap();

    assert_eq!(
        config.encryption_key.as_deref(),
        Some(user_key.to_base64().as_str())
    );
}

#[test]
fn deployment_key_comes_from_the_manifest_not_the_env_text() {
    // The hasher fingerprints the configuration document; formatting
    // and key order of the on-disk representation must not matter.
    let manifest_a: serde_json::Value = serde_json::from_str(
        r#"{"name": "myapp", "services": {"web": {"image": "myapp:1.2"}}, "deploymentKey": "stale"}"#,
    )
    .unwrap();
    let manifest_b: serde_json::Value = serde_json::from_str(
        "{\n  \"services\": {\"web\": {\"image\": \"myapp:1.2\"}},\n  \"name\": \"myapp\"\n}",
    )
    .unwrap();

    let a = hash::manifest_hash(&manifest_a);
    let b = hash::manifest_hash(&manifest_b);
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
}
