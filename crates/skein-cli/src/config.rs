//! CLI configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use skein_core::limits::DEFAULT_MAX_NESTING_DEPTH;
use skein_core::DecodeOptions;

/// Get default config file path
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skein")
        .join("config.toml")
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deepest bracket nesting accepted in input files
    pub max_nesting_depth: usize,
    /// Render `fmt` output indented unless `--compact` is given
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            pretty: false,
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &["max_nesting_depth", "pretty"]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "max_nesting_depth" => Some(self.max_nesting_depth.to_string()),
            "pretty" => Some(self.pretty.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "max_nesting_depth" => {
                self.max_nesting_depth = value
                    .parse()
                    .with_context(|| format!("max_nesting_depth must be a positive integer, got {:?}", value))?;
            }
            "pretty" => {
                self.pretty = value
                    .parse()
                    .with_context(|| format!("pretty must be true or false, got {:?}", value))?;
            }
            _ => anyhow::bail!(
                "Unknown config key: {}. Available keys: {}",
                key,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::default().with_max_nesting_depth(self.max_nesting_depth)
    }
}
