//! Template resolution: `${VAR}` and `kv://` expansion.
//!
//! Turns a symbolic environment template into concrete text against a
//! decrypted secret map and an environment context. Resolution is
//! stateless: the same inputs always produce byte-identical output, and
//! nothing is cached between calls.
//!
//! Expansion order is fixed. Context variables in the template expand
//! first; then every `kv://` reference is checked against the secret
//! map (all misses reported at once, never a partial resolution); then
//! references are substituted, with `${VAR}` inside a substituted
//! secret value expanded in one additional pass. That single extra pass
//! is a hard termination bound; a fixed-point loop here would let a
//! malformed or malicious secret value create resolution cycles.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::core::config::AppConfig;
use crate::core::constants;
use crate::core::context::EnvContexts;
use crate::core::store::{self, LoadedSecrets};
use crate::error::{ResolveError, Result};

fn var_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

fn kv_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"kv://([A-Za-z0-9][A-Za-z0-9_.-]*)").unwrap())
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(https?)://([A-Za-z0-9][A-Za-z0-9_.-]*):(\d+)").unwrap())
}

/// Resolve a template against a secret map and an environment context.
///
/// Unknown `${VAR}` markers stay in place; callers may intentionally
/// leave them for another consumer. Unknown `kv://` references are an
/// error: the full deduplicated list, in first-seen order, is reported
/// together with the store paths that were searched.
///
/// For the docker context, `http(s)://host:port` URLs whose host is a
/// known service name are rewritten to the service's container-internal
/// port, so one template serves local and inter-container targets.
///
/// # Errors
///
/// Returns `ResolveError::MissingSecrets` if any referenced secret is
/// absent from the map.
pub fn resolve(
    template: &str,
    secrets: &LoadedSecrets,
    contexts: &EnvContexts,
    context_name: &str,
) -> Result<String> {
    let vars = contexts.vars(context_name);
    let effective = contexts.effective_name(context_name);

    let expanded = expand_vars(template, vars);

    let missing = missing_refs(&expanded, &secrets.values);
    if !missing.is_empty() {
        return Err(ResolveError::MissingSecrets {
            refs: missing,
            searched: secrets.sources.clone(),
        }
        .into());
    }

    // One extra pass over each substituted value, nothing deeper.
    let substituted = kv_pattern()
        .replace_all(&expanded, |caps: &Captures| {
            match secrets.values.get(&caps[1]) {
                Some(value) => expand_vars(value, vars),
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    let resolved = if effective == constants::DOCKER_CONTEXT {
        remap_service_ports(&substituted, &contexts.service_ports)
    } else {
        substituted
    };

    debug!(
        context = effective,
        bytes = resolved.len(),
        "resolved environment template"
    );

    Ok(resolved)
}

/// Expand `${VAR}` markers from a substitution table, leaving unknown
/// markers untouched.
fn expand_vars(text: &str, vars: &BTreeMap<String, String>) -> String {
    var_pattern()
        .replace_all(text, |caps: &Captures| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// All `kv://` key names in a text, deduplicated, first-seen order.
pub(crate) fn scan_refs(text: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for caps in kv_pattern().captures_iter(text) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

fn missing_refs(text: &str, values: &BTreeMap<String, String>) -> Vec<String> {
    scan_refs(text)
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .map(|name| format!("kv://{}", name))
        .collect()
}

/// Rewrite `http(s)://host:port` to a service's container-internal port.
///
/// Only HTTP and HTTPS URLs are considered, and only the single
/// declared port per service; other schemes and multi-port services
/// pass through unchanged.
fn remap_service_ports(text: &str, ports: &BTreeMap<String, u16>) -> String {
    url_pattern()
        .replace_all(text, |caps: &Captures| match ports.get(&caps[2]) {
            Some(port) => format!("{}://{}:{}", &caps[1], &caps[2], port),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Write the resolved environment file with owner-only permissions,
/// copying it to the application's declared `envOutputPath` as well
/// when one is configured.
///
/// # Errors
///
/// Returns error if any file write fails. Nothing is written unless
/// resolution already succeeded: callers resolve first, then write.
pub fn write_env_file(path: &Path, contents: &str, app: Option<&AppConfig>) -> Result<()> {
    write_restricted(path, contents)?;

    if let Some(extra) = app.and_then(|a| a.build.env_output_path.as_deref()) {
        write_restricted(extra, contents)?;
        debug!(path = %extra.display(), "copied resolved environment");
    }

    Ok(())
}

fn write_restricted(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    store::restrict_permissions(path)?;
    Ok(())
}
