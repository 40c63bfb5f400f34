//! Secret vault (encrypted file-based credential storage)
//!
//! Stores account secrets (OAuth access tokens, Lemmy JWTs, Bluesky app
//! passwords) encrypted with AES-256-GCM in ~/.config/loftly/credentials.enc.
//! The encryption key is derived from machine-specific identifiers.
//! OAuth client registrations are not kept here; they live in the
//! `instances` database table.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::LinkedAccount;
use crate::paths;

const NONCE_SIZE: usize = 12;

/// Get the credentials file path
fn credentials_path() -> Result<PathBuf> {
    paths::credentials_path()
}

/// Get machine ID for key derivation (cross-platform)
fn get_machine_id() -> String {
    // Linux: /etc/machine-id or /var/lib/dbus/machine-id
    #[cfg(target_os = "linux")]
    {
        if let Ok(id) = fs::read_to_string("/etc/machine-id") {
            return id.trim().to_string();
        }
        if let Ok(id) = fs::read_to_string("/var/lib/dbus/machine-id") {
            return id.trim().to_string();
        }
    }

    // macOS: IOPlatformUUID via ioreg
    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("IOPlatformUUID") {
                    if let Some(uuid) = line.split('"').nth(3) {
                        return uuid.to_string();
                    }
                }
            }
        }
    }

    // Windows: MachineGuid from registry
    #[cfg(target_os = "windows")]
    {
        if let Ok(output) = std::process::Command::new("reg")
            .args([
                "query",
                r"HKLM\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("MachineGuid") {
                    if let Some(guid) = line.split_whitespace().last() {
                        return guid.to_string();
                    }
                }
            }
        }
    }

    // Fallback: use home directory path (always available via dirs crate)
    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "loftly-fallback-key".to_string())
}

/// Derive encryption key from machine-specific data
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();

    hasher.update(get_machine_id().as_bytes());

    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }

    if let Some(data) = dirs::data_dir() {
        hasher.update(data.to_string_lossy().as_bytes());
    }

    // Fixed salt for this app
    hasher.update(b"loftly-crossposter-v1");

    hasher.finalize().into()
}

/// Load all secrets from an encrypted file
fn load_secrets_at(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let encrypted = fs::read(path).context("Failed to read credentials file")?;

    if encrypted.len() < NONCE_SIZE {
        return Ok(HashMap::new());
    }

    let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let key = derive_key();
    let cipher = Aes256Gcm::new_from_slice(&key).expect("Invalid key length");

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| anyhow::anyhow!("Failed to decrypt credentials"))?;

    let json = String::from_utf8(plaintext).context("Invalid UTF-8 in credentials")?;
    let secrets: HashMap<String, String> = serde_json::from_str(&json)?;

    Ok(secrets)
}

/// Save all secrets to an encrypted file
fn save_secrets_at(path: &Path, secrets: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string(secrets)?;

    let key = derive_key();
    let cipher = Aes256Gcm::new_from_slice(&key).expect("Invalid key length");

    let mut rng = rand::rng();
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rng.fill(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, json.as_bytes())
        .map_err(|_| anyhow::anyhow!("Failed to encrypt credentials"))?;

    let mut output = nonce_bytes.to_vec();
    output.extend(ciphertext);

    fs::write(path, output).context("Failed to write credentials file")?;

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

fn load_secrets() -> Result<HashMap<String, String>> {
    load_secrets_at(&credentials_path()?)
}

fn save_secrets(secrets: &HashMap<String, String>) -> Result<()> {
    save_secrets_at(&credentials_path()?, secrets)
}

/// Store the secret for a linked account
pub fn store_secret(account: &LinkedAccount, secret: &str) -> Result<()> {
    let mut secrets = load_secrets().unwrap_or_default();
    secrets.insert(account.vault_key(), secret.to_string());
    save_secrets(&secrets)
}

/// Get the secret for a linked account
pub fn get_secret(account: &LinkedAccount) -> Result<Option<String>> {
    let secrets = load_secrets()?;
    Ok(secrets.get(&account.vault_key()).cloned())
}

/// Delete the secret for a linked account
pub fn delete_secret(account: &LinkedAccount) -> Result<()> {
    let mut secrets = load_secrets().unwrap_or_default();
    secrets.remove(&account.vault_key());
    save_secrets(&secrets)
}

/// Check whether a secret exists for an account
pub fn has_secret(account: &LinkedAccount) -> bool {
    get_secret(account).map(|s| s.is_some()).unwrap_or(false)
}

/// Get all stored vault keys (for debugging)
pub fn list_vault_keys() -> Vec<String> {
    load_secrets()
        .map(|s| s.keys().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");

        let mut secrets = HashMap::new();
        secrets.insert("loftly:mastodon:abc".to_string(), "token-1".to_string());
        secrets.insert("loftly:lemmy:def".to_string(), "jwt-2".to_string());
        save_secrets_at(&path, &secrets).unwrap();

        // Ciphertext on disk, not plaintext
        let raw = fs::read(&path).unwrap();
        assert!(!raw.windows(7).any(|w| w == b"token-1"));

        let loaded = load_secrets_at(&path).unwrap();
        assert_eq!(loaded, secrets);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.enc");
        assert!(load_secrets_at(&path).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.enc");
        fs::write(&path, [0u8; 4]).unwrap();
        assert!(load_secrets_at(&path).unwrap().is_empty());
    }
}
