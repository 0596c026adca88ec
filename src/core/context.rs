//! Environment contexts: named variable sets per deployment target.
//!
//! A context is a flat `VAR -> value` substitution table scoped to a
//! deployment target (`local` development vs `docker` inter-container
//! networking). Contexts come from a static configuration document; an
//! unknown context name falls back to the designated default.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// All environment contexts plus the service port table.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvContexts {
    /// Name of the context used when the requested one is unknown.
    #[serde(default = "default_context_name")]
    pub default: String,
    /// Context name -> substitution variables.
    pub contexts: BTreeMap<String, BTreeMap<String, String>>,
    /// Service name -> container-internal port, for the docker-context
    /// URL remapping pass.
    #[serde(default)]
    pub service_ports: BTreeMap<String, u16>,
}

fn default_context_name() -> String {
    constants::LOCAL_CONTEXT.to_string()
}

impl EnvContexts {
    /// Load contexts from a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML, or
    /// `ConfigError::InvalidValue` if the default context is not
    /// declared.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading environment contexts");

        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let contexts: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        contexts.validate()?;
        Ok(contexts)
    }

    /// The stock contexts shipped with the installation.
    ///
    /// `local` targets processes on the developer machine; `docker`
    /// targets inter-container networking where services are reachable
    /// by their compose service name.
    pub fn builtin() -> Self {
        let mut contexts = BTreeMap::new();

        contexts.insert(
            constants::LOCAL_CONTEXT.to_string(),
            vars(&[
                ("DB_HOST", "localhost"),
                ("DB_PORT", "5432"),
                ("REDIS_HOST", "localhost"),
                ("REDIS_PORT", "6379"),
                ("APP_HOST", "localhost"),
                ("APP_PORT", "3000"),
            ]),
        );
        contexts.insert(
            constants::DOCKER_CONTEXT.to_string(),
            vars(&[
                ("DB_HOST", "postgres"),
                ("DB_PORT", "5432"),
                ("REDIS_HOST", "redis"),
                ("REDIS_PORT", "6379"),
                ("APP_HOST", "app"),
                ("APP_PORT", "3000"),
            ]),
        );

        let mut service_ports = BTreeMap::new();
        service_ports.insert("postgres".to_string(), 5432);
        service_ports.insert("redis".to_string(), 6379);
        service_ports.insert("app".to_string(), 3000);

        Self {
            default: constants::LOCAL_CONTEXT.to_string(),
            contexts,
            service_ports,
        }
    }

    /// Substitution variables for a named context.
    ///
    /// Unknown names fall back to the default context; a missing
    /// default yields an empty table rather than a failure.
    pub fn vars(&self, name: &str) -> &BTreeMap<String, String> {
        static EMPTY: BTreeMap<String, String> = BTreeMap::new();

        self.contexts
            .get(name)
            .or_else(|| self.contexts.get(&self.default))
            .unwrap_or(&EMPTY)
    }

    /// The effective context name after default fallback.
    pub fn effective_name<'a>(&'a self, name: &'a str) -> &'a str {
        if self.contexts.contains_key(name) {
            name
        } else {
            &self.default
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.contexts.contains_key(&self.default) {
            return Err(ConfigError::InvalidValue {
                field: "default",
                reason: format!("default context '{}' is not declared", self.default),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for EnvContexts {
    fn default() -> Self {
        Self::builtin()
    }
}

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn unknown_context_falls_back_to_default() {
        let contexts = EnvContexts::builtin();
        let fallback = contexts.vars("staging");
        assert_eq!(fallback.get("DB_HOST").unwrap(), "localhost");
        assert_eq!(contexts.effective_name("staging"), "local");
        assert_eq!(contexts.effective_name("docker"), "docker");
    }

    #[test]
    fn builtin_contexts_differ_per_target() {
        let contexts = EnvContexts::builtin();
        assert_eq!(contexts.vars("local").get("DB_HOST").unwrap(), "localhost");
        assert_eq!(contexts.vars("docker").get("DB_HOST").unwrap(), "postgres");
    }

    #[test]
    fn load_from_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("contexts.toml");
        std::fs::write(
            &path,
            r#"
default = "local"

[contexts.local]
DB_HOST = "127.0.0.1"

[contexts.ci]
DB_HOST = "db.internal"

[service_ports]
postgres = 5432
"#,
        )
        .unwrap();

        let contexts = EnvContexts::load_from(&path).unwrap();
        assert_eq!(contexts.vars("ci").get("DB_HOST").unwrap(), "db.internal");
        assert_eq!(contexts.service_ports.get("postgres"), Some(&5432));
    }

    #[test]
    fn undeclared_default_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("contexts.toml");
        std::fs::write(
            &path,
            r#"
default = "missing"

[contexts.local]
DB_HOST = "localhost"
"#,
        )
        .unwrap();

        assert!(EnvContexts::load_from(&path).is_err());
    }
}
