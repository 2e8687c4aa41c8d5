//! Validator configuration that downstream crates can serialize/deserialize.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Worker ids the cluster actually has. When set, every fragment's worker
    /// list must be a subset of it.
    pub known_workers: Option<Vec<i32>>,

    /// Run per-fragment phases on a thread pool (needs the `parallel` feature
    /// of `fragplan-validate`; ignored otherwise).
    pub parallel: bool,

    /// Check that an append-mode insert matches the schema the catalog already
    /// holds for its target relation.
    pub check_append_schema: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            known_workers: None,
            parallel: false,
            check_append_schema: true,
        }
    }
}

impl ValidatorConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `FRAGPLAN_KNOWN_WORKERS`: comma-separated worker ids
    /// - `FRAGPLAN_PARALLEL`: `1`/`true` to validate fragments in parallel
    /// - `FRAGPLAN_CHECK_APPEND_SCHEMA`: `0`/`false` to skip the append check
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Overlay environment variables onto `self`. Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Ok(s) = std::env::var("FRAGPLAN_KNOWN_WORKERS") {
            if let Ok(v) = parse_worker_list(&s) {
                self.known_workers = Some(v);
            }
        }

        if let Ok(s) = std::env::var("FRAGPLAN_PARALLEL") {
            if let Some(v) = parse_flag(&s) {
                self.parallel = v;
            }
        }

        if let Ok(s) = std::env::var("FRAGPLAN_CHECK_APPEND_SCHEMA") {
            if let Some(v) = parse_flag(&s) {
                self.check_append_schema = v;
            }
        }
    }

    /// Load a config file; `.json` files are read as JSON, anything else as YAML.
    /// Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&text)?),
            _ => Ok(serde_yaml::from_str(&text)?),
        }
    }

    pub fn is_known_worker(&self, worker: i32) -> bool {
        self.known_workers
            .as_ref()
            .map_or(true, |known| known.contains(&worker))
    }
}

/// Parse `"1, 2,3"` into worker ids.
pub fn parse_worker_list(s: &str) -> Result<Vec<i32>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<i32>()
                .map_err(|e| Error::Config(format!("bad worker id '{p}': {e}")))
        })
        .collect()
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
