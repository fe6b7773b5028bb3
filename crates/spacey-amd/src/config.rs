// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration management for samd.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::loader::DEFAULT_EXTENSION;

/// Environment prefix for configuration overrides.
const ENV_PREFIX: &str = "SAMD_CONFIG_";

/// Name of the rc file.
const RC_FILE: &str = ".samdrc";

/// Configuration for samd.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL relative locators are fetched from
    pub base_url: Option<String>,

    /// Directory modules are read from when no base URL is set
    pub root: Option<PathBuf>,

    /// Extension appended to locators without one
    pub default_extension: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Whether to verify TLS certificates
    pub strict_ssl: bool,

    /// Log level
    pub loglevel: String,

    /// Custom config values
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            root: None,
            default_extension: DEFAULT_EXTENSION.to_string(),
            timeout: 30,
            strict_ssl: true,
            loglevel: "info".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        for path in [Some(global_config_path()), user_config_path(), Some(PathBuf::from(RC_FILE))]
            .into_iter()
            .flatten()
        {
            if path.exists() {
                config.merge_from_file(&path)?;
            }
        }

        config.load_from_env(std::env::vars());

        Ok(config)
    }

    /// Merge configuration from a file.
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.merge_str(&content);
        Ok(())
    }

    /// Merge `key=value` lines.
    pub fn merge_str(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                self.set(key.trim(), value.trim());
            }
        }
    }

    /// Apply `SAMD_CONFIG_*` variables.
    pub fn load_from_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                let config_key = config_key.to_lowercase().replace('_', "-");
                self.set(&config_key, &value);
            }
        }
    }

    /// Set a configuration value.
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "base-url" => self.base_url = Some(value.to_string()).filter(|v| !v.is_empty()),
            "root" => self.root = Some(PathBuf::from(value)),
            "default-extension" => {
                self.default_extension = value.trim_start_matches('.').to_string();
            }
            "timeout" => {
                if let Ok(n) = value.parse() {
                    self.timeout = n;
                }
            }
            "strict-ssl" => self.strict_ssl = value == "true",
            "loglevel" => self.loglevel = value.to_string(),
            _ => {
                self.extra.insert(
                    key.to_string(),
                    serde_json::Value::String(value.to_string()),
                );
            }
        }
    }

    /// Get a configuration value.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "base-url" => self.base_url.clone(),
            "root" => self.root.as_ref().map(|p| p.display().to_string()),
            "default-extension" => Some(self.default_extension.clone()),
            "timeout" => Some(self.timeout.to_string()),
            "strict-ssl" => Some(self.strict_ssl.to_string()),
            "loglevel" => Some(self.loglevel.clone()),
            _ => self.extra.get(key).and_then(|v| v.as_str().map(String::from)),
        }
    }

    /// All known keys with their values, for listing.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = [
            "base-url",
            "root",
            "default-extension",
            "timeout",
            "strict-ssl",
            "loglevel",
        ]
        .into_iter()
        .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
        .collect();

        entries.extend(
            self.extra
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string()))),
        );
        entries
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Directory modules are read from.
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Get the global config path.
fn global_config_path() -> PathBuf {
    PathBuf::from("/etc/samdrc")
}

/// Get the user config path.
fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(RC_FILE))
}
