#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use reqwest::Client;

use crate::ai::{ProviderDescriptor, ProviderKind};

/// Upper bound on `${var}` resolution passes, to stop reference cycles.
const MAX_SUBSTITUTION_PASSES: usize = 10;

/// Fallback order used when `ai_provider_order` is not configured.
const DEFAULT_PROVIDER_ORDER: &[&str] = &["gemini", "anthropic", "openai"];

/// Request timeout applied to the shared HTTP client when
/// `request_timeout_secs` is not configured.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Configuration loaded from a `.properties` file.
///
/// The format matches the original grading setup: `key=value` lines, `#`
/// comments, and `${name}` references resolved against other keys. Provider
/// credentials may come from the file or from the conventional environment
/// variables (`GEMINI_API_KEY`, `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`).
#[derive(Debug)]
pub struct Config {
    /// Where the configuration was loaded from.
    path:        PathBuf,
    /// Fully resolved key-value pairs.
    values:      HashMap<String, String>,
    /// Shared reqwest client, reused by every provider that speaks raw HTTP.
    http_client: Client,
}

impl Config {
    /// Loads and resolves configuration from the given properties file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;

        let raw = parse_properties(&contents);
        let values = resolve_variables(raw);
        let http_client = build_http_client(&values)?;

        Ok(Self {
            path,
            values,
            http_client,
        })
    }

    /// Builds a configuration directly from resolved key-value pairs.
    /// Primarily for tests and embedding; no file is touched.
    pub fn from_map(values: HashMap<String, String>) -> Result<Self> {
        let http_client = build_http_client(&values)?;
        Ok(Self {
            path: PathBuf::new(),
            values,
            http_client,
        })
    }

    /// Returns the path the configuration was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the value for `key`, if present and non-empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns the value for `key`, or `default` when absent.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_owned()
    }

    /// Returns the value for `key` parsed as an integer, or `default` when
    /// absent or unparseable.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(default)
    }

    /// Returns the value for `key` as a path, if present.
    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    /// Returns the configured provider fallback order as written, without
    /// validating the names; the client factory rejects unknown ones.
    pub fn provider_order(&self) -> Vec<String> {
        match self.get("ai_provider_order") {
            Some(order) => order
                .split(',')
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty())
                .collect(),
            None => DEFAULT_PROVIDER_ORDER.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Builds the descriptor for one provider: credential from the file or
    /// the conventional environment variable, model from the file or the
    /// vendor default.
    pub fn provider_descriptor(&self, kind: ProviderKind, position: usize) -> ProviderDescriptor {
        let name = kind.name();
        let credential = self
            .get(&format!("{name}_api_key"))
            .map(str::to_owned)
            .or_else(|| {
                std::env::var(format!("{}_API_KEY", name.to_ascii_uppercase()))
                    .ok()
                    .filter(|v| !v.trim().is_empty())
            });
        let model = self.get_or(&format!("{name}_model"), kind.default_model());

        ProviderDescriptor {
            kind,
            credential,
            model,
            position,
        }
    }

    /// Returns a clone of the shared reqwest HTTP client.
    pub fn http_client(&self) -> Client {
        self.http_client.clone()
    }
}

/// Parses `key=value` lines, skipping comments and blanks. Later occurrences
/// of a key win, as in the original properties loader.
fn parse_properties(contents: &str) -> HashMap<String, String> {
    let mut raw = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            raw.insert(key.trim().to_owned(), value.trim().to_owned());
        }
    }
    raw
}

/// Resolves `${name}` references against the other keys, iterating until a
/// fixed point or the pass bound. Unresolvable references are left verbatim.
fn resolve_variables(mut raw: HashMap<String, String>) -> HashMap<String, String> {
    for _ in 0..MAX_SUBSTITUTION_PASSES {
        let mut changed = false;
        let snapshot = raw.clone();

        for value in raw.values_mut() {
            let mut search_from = 0;
            while let Some(offset) = value[search_from..].find("${") {
                let start = search_from + offset;
                let Some(len) = value[start..].find('}') else {
                    break;
                };
                let name = value[start + 2..start + len].to_owned();
                match snapshot.get(&name) {
                    Some(replacement) => {
                        value.replace_range(start..start + len + 1, replacement);
                        changed = true;
                        // Skip past the inserted text so a value that expands
                        // to itself cannot pin the scan in place; references
                        // inside the replacement are picked up on a later pass.
                        search_from = start + replacement.len();
                    }
                    None => {
                        // Unknown reference stays verbatim; keep scanning.
                        search_from = start + len + 1;
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }
    raw
}

/// Builds the shared HTTP client with the configured request timeout.
fn build_http_client(values: &HashMap<String, String>) -> Result<Client> {
    let timeout_secs = values
        .get("request_timeout_secs")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

    Client::builder()
        // Avoid macOS dynamic store lookups that fail in sandboxed environments.
        .no_proxy()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to construct shared HTTP client")
}
