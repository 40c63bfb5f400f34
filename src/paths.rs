//! Common paths for Loftly data storage
//!
//! All Loftly data is stored under ~/.config/loftly/ on all platforms:
//! - config.toml - User configuration
//! - credentials.enc - Encrypted credentials
//! - loftly.sqlite - Database

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the Loftly data directory (~/.config/loftly/)
///
/// This is consistent across all platforms for simplicity.
pub fn loftly_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let loftly_dir = home.join(".config").join("loftly");
    fs::create_dir_all(&loftly_dir).context("Failed to create loftly directory")?;
    Ok(loftly_dir)
}

/// Get the config file path (~/.config/loftly/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(loftly_dir()?.join("config.toml"))
}

/// Get the database file path (~/.config/loftly/loftly.sqlite)
pub fn database_path() -> Result<PathBuf> {
    Ok(loftly_dir()?.join("loftly.sqlite"))
}

/// Get the credentials file path (~/.config/loftly/credentials.enc)
pub fn credentials_path() -> Result<PathBuf> {
    Ok(loftly_dir()?.join("credentials.enc"))
}
