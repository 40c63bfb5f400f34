//! Linked account model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Platform;

/// An account on an external platform linked to this installation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAccount {
    /// Unique identifier
    pub id: Uuid,
    /// Which platform this account belongs to
    pub platform: Platform,
    /// Federated host (e.g. mastodon.social) or PDS URL for Bluesky
    pub instance: String,
    /// Handle/username on the platform
    pub handle: String,
    /// URL of the account's public profile
    pub account_url: Option<String>,
    /// Decentralized identifier (Bluesky only)
    pub did: Option<String>,
    /// Whether cross-posting targets this account
    pub enabled: bool,
    /// When the account was linked
    pub created_at: DateTime<Utc>,
    /// Last time a post was delivered through this account
    pub last_used_at: Option<DateTime<Utc>>,
}

impl LinkedAccount {
    /// Create a new linked account for a platform and host
    pub fn new(platform: Platform, instance: &str, handle: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform,
            instance: instance.to_string(),
            handle: handle.to_string(),
            account_url: None,
            did: None,
            enabled: true,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Get the full fediverse-style handle (e.g. @user@mastodon.social)
    pub fn full_handle(&self) -> String {
        match self.platform {
            Platform::Mastodon | Platform::Pixelfed | Platform::Lemmy => {
                if self.handle.contains('@') {
                    format!("@{}", self.handle.trim_start_matches('@'))
                } else {
                    let domain = self
                        .instance
                        .trim_start_matches("https://")
                        .trim_start_matches("http://")
                        .trim_end_matches('/');
                    format!("@{}@{}", self.handle, domain)
                }
            }
            Platform::Bluesky => format!("@{}", self.handle),
        }
    }

    /// Key under which this account's secret is stored in the vault
    pub fn vault_key(&self) -> String {
        format!("loftly:{}:{}", self.platform.name().to_lowercase(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_handle_federated() {
        let account = LinkedAccount::new(Platform::Mastodon, "https://mastodon.social", "alice");
        assert_eq!(account.full_handle(), "@alice@mastodon.social");
    }

    #[test]
    fn test_full_handle_bluesky() {
        let account =
            LinkedAccount::new(Platform::Bluesky, "https://bsky.social", "alice.bsky.social");
        assert_eq!(account.full_handle(), "@alice.bsky.social");
    }

    #[test]
    fn test_vault_key_is_per_account() {
        let a = LinkedAccount::new(Platform::Lemmy, "lemmy.world", "alice");
        let b = LinkedAccount::new(Platform::Lemmy, "lemmy.world", "alice");
        assert_ne!(a.vault_key(), b.vault_key());
        assert!(a.vault_key().starts_with("loftly:lemmy:"));
    }
}
