//! Configuration module for Loftly

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Platforms to post to when none are selected explicitly
    #[serde(default)]
    pub default_platforms: Vec<String>,

    /// Maximum message length accepted by the composer
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    /// Maximum number of images per post
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Maximum size of a single image in megabytes
    #[serde(default = "default_max_image_mb")]
    pub max_image_mb: u64,

    /// Default number of history entries to show
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_max_message_len() -> usize {
    2000
}

fn default_max_images() -> usize {
    10
}

fn default_max_image_mb() -> u64 {
    10
}

fn default_history_limit() -> usize {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_platforms: Vec::new(),
            max_message_len: default_max_message_len(),
            max_images: default_max_images(),
            max_image_mb: default_max_image_mb(),
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        crate::paths::config_path()
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
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
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.default_platforms = vec!["mastodon".to_string(), "bluesky".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_platforms, config.default_platforms);
        assert_eq!(loaded.max_message_len, 2000);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.max_images, 10);
    }
}
