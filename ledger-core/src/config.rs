//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "cacheTtlSecs": 600,
//!   "storeTimeoutMs": 5000,
//!   "cacheTimeoutMs": 250,
//!   "statementsDir": "/home/me/.ledger/statements"
//! }
//! ```
//! Every field is optional. Keys this crate doesn't know are kept on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::services::Timeouts;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 250;

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cache_ttl_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    store_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cache_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    statements_dir: Option<PathBuf>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cache_ttl: Duration,
    pub store_timeout: Duration,
    pub cache_timeout: Duration,
    /// Where rendered statements are written
    pub statements_dir: PathBuf,
}

impl Config {
    /// Defaults for a ledger rooted at `data_dir`
    pub fn defaults_for(data_dir: &Path) -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            cache_timeout: Duration::from_millis(DEFAULT_CACHE_TIMEOUT_MS),
            statements_dir: data_dir.join("statements"),
        }
    }

    /// Load config from the data directory
    ///
    /// A missing or unreadable settings file yields the defaults. Values can
    /// be overridden with `LEDGER_CACHE_TTL_SECS`, `LEDGER_STORE_TIMEOUT_MS`
    /// and `LEDGER_CACHE_TIMEOUT_MS`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let mut config = Self::from_settings(data_dir, &raw);
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Save config to the data directory, preserving unmanaged keys
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.cache_ttl_secs = Some(self.cache_ttl.as_secs());
        settings.store_timeout_ms = Some(self.store_timeout.as_millis() as u64);
        settings.cache_timeout_ms = Some(self.cache_timeout.as_millis() as u64);
        settings.statements_dir = if self.statements_dir == data_dir.join("statements") {
            None
        } else {
            Some(self.statements_dir.clone())
        };

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Timeouts handed to the movement service
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            store: self.store_timeout,
            cache: self.cache_timeout,
        }
    }

    fn from_settings(data_dir: &Path, raw: &SettingsFile) -> Self {
        let defaults = Self::defaults_for(data_dir);
        Self {
            cache_ttl: raw
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            store_timeout: raw
                .store_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            cache_timeout: raw
                .cache_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_timeout),
            statements_dir: raw
                .statements_dir
                .clone()
                .unwrap_or(defaults.statements_dir),
        }
    }

    /// Apply overrides from a variable lookup; unparsable values are ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(secs) = number("LEDGER_CACHE_TTL_SECS") {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = number("LEDGER_STORE_TIMEOUT_MS") {
            self.store_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = number("LEDGER_CACHE_TIMEOUT_MS") {
            self.cache_timeout = Duration::from_millis(ms);
        }
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
