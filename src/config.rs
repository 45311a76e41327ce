//! Configuration module for OnlyPaws

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ads::{AdCacheConfig, MAX_AD_AGE, MAX_CACHE_SIZE};
use crate::api::DEFAULT_BASE_URL;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the REST API, without a trailing slash
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Number of items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Ad preloading limits
    #[serde(default)]
    pub ad_cache: AdCacheSettings,
}

/// Ad cache section of the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdCacheSettings {
    /// Maximum number of preloaded ads
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Seconds before a preloaded ad goes stale
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_max_entries() -> usize {
    MAX_CACHE_SIZE
}

fn default_max_age_secs() -> u64 {
    MAX_AD_AGE.as_secs()
}

impl Default for AdCacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            page_size: default_page_size(),
            ad_cache: AdCacheSettings::default(),
        }
    }
}

/// OnlyPaws directory under `home`. Config and credentials live side by side
/// in it on every platform.
fn data_dir_in(home: &Path) -> PathBuf {
    home.join(".config").join("onlypaws")
}

/// Get the OnlyPaws data directory (~/.config/onlypaws/), creating it if needed
pub fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = data_dir_in(&home);
    std::fs::create_dir_all(&dir).context("Failed to create onlypaws directory")?;
    Ok(dir)
}

impl Config {
    /// Get the default config file path (~/.config/onlypaws/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Limits for an [`AdPreloadCache`](crate::ads::AdPreloadCache)
    pub fn ad_cache_config(&self) -> AdCacheConfig {
        AdCacheConfig {
            max_entries: self.ad_cache.max_entries,
            max_age: Duration::from_secs(self.ad_cache.max_age_secs),
        }
    }
}
