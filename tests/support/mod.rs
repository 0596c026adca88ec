//! Test support utilities for envault integration tests.
//!
//! Provides an isolated installation layout per test: temp home-style
//! directory with its own store locations and config path. No
//! process-global state is mutated, so tests run in parallel safely.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use envault::core::config::AppConfig;
use envault::core::store::StoreLocations;

/// Standard secrets used across multiple tests.
pub const STANDARD_STORE: &str = r#"{
  "myapp-postgres-passwordKeyVault": "local-dev-pw",
  "jwt-signing-secret": "super-secret-jwt-token",
  "redis-connection": "redis://${REDIS_HOST}:6379"
}"#;

/// Isolated test installation.
pub struct TestEnv {
    pub dir: TempDir,
    pub locations: StoreLocations,
    pub config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let locations = StoreLocations::under(dir.path());
        let config_path = dir.path().join("config.toml");
        Self {
            dir,
            locations,
            config_path,
        }
    }

    /// Write the per-user store document.
    pub fn write_user_store(&self, json: &str) {
        write_file(&self.locations.user, json);
    }

    /// Write the installation-default store document.
    pub fn write_default_store(&self, json: &str) {
        write_file(&self.locations.install_default, json);
    }

    /// Write an arbitrary file under the test dir, returning its path.
    pub fn write_file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        write_file(&path, contents);
        path
    }

    /// Path under the test dir without creating anything.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Build an application config document the way the calling CLI hands
/// it in.
pub fn app_config(name: &str, secrets: Option<&Path>, env_output: Option<&Path>) -> AppConfig {
    let mut build = serde_json::Map::new();
    if let Some(path) = secrets {
        build.insert("secrets".into(), serde_json::json!(path));
    }
    if let Some(path) = env_output {
        build.insert("envOutputPath".into(), serde_json::json!(path));
    }
    let doc = serde_json::json!({"name": name, "build": build});
    AppConfig::from_value(&doc).unwrap()
}

/// Unix file mode bits, for permission assertions.
#[cfg(unix)]
pub fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}
