//! API clients for publishing platforms

pub mod bluesky;
pub mod lemmy;
pub mod mastodon;
pub mod pixelfed;

use anyhow::Result;

use crate::compose::Draft;
use crate::models::{LinkedAccount, Platform};

/// Result of delivering a draft to one platform
#[derive(Debug, Clone)]
pub struct PublishedPost {
    /// Platform-assigned id of the created status/post
    pub remote_id: Option<String>,
    /// URL of the created status/post
    pub url: Option<String>,
}

/// Unified API trait for publishing platforms
#[allow(async_fn_in_trait)]
pub trait PublishApi {
    /// Verify credentials and get account info
    async fn verify_credentials(&self) -> Result<LinkedAccount>;

    /// Publish a draft
    async fn publish(&self, draft: &Draft) -> Result<PublishedPost>;
}

/// Unified client that wraps platform-specific implementations
pub enum Client {
    /// Mastodon API client
    Mastodon(mastodon::MastodonClient),
    /// Pixelfed API client
    Pixelfed(pixelfed::PixelfedClient),
    /// Lemmy API client
    Lemmy(lemmy::LemmyClient),
    /// Bluesky AT Protocol client
    Bluesky(bluesky::BlueskyClient),
}

impl Client {
    /// Verify credentials and get account info
    pub async fn verify_credentials(&self) -> Result<LinkedAccount> {
        match self {
            Client::Mastodon(c) => c.verify_credentials().await,
            Client::Pixelfed(c) => c.verify_credentials().await,
            Client::Lemmy(c) => c.verify_credentials().await,
            Client::Bluesky(c) => c.verify_credentials().await,
        }
    }

    /// Publish a draft
    pub async fn publish(&self, draft: &Draft) -> Result<PublishedPost> {
        match self {
            Client::Mastodon(c) => c.publish(draft).await,
            Client::Pixelfed(c) => c.publish(draft).await,
            Client::Lemmy(c) => c.publish(draft).await,
            Client::Bluesky(c) => c.publish(draft).await,
        }
    }
}

/// Normalize a user-entered host into a base URL with scheme and no
/// trailing slash
pub fn ensure_scheme(instance: &str) -> String {
    let trimmed = instance.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Get the appropriate API client for a linked account
///
/// The secret is whatever the vault holds for the account: an OAuth
/// access token (Mastodon/Pixelfed), a login JWT (Lemmy) or an app
/// password (Bluesky, which needs a fresh session per use).
pub async fn get_client(account: &LinkedAccount, secret: &str) -> Result<Client> {
    match account.platform {
        Platform::Mastodon => {
            let client = mastodon::MastodonClient::new(&account.instance, secret);
            Ok(Client::Mastodon(client))
        }
        Platform::Pixelfed => {
            let client = pixelfed::PixelfedClient::new(&account.instance, secret);
            Ok(Client::Pixelfed(client))
        }
        Platform::Lemmy => {
            let client = lemmy::LemmyClient::new(&account.instance, secret);
            Ok(Client::Lemmy(client))
        }
        Platform::Bluesky => {
            // For Bluesky, the secret is the app password, instance is the PDS URL
            let pds_url = if account.instance.is_empty() {
                bluesky::DEFAULT_PDS_URL
            } else {
                &account.instance
            };
            let client =
                bluesky::BlueskyClient::login_with_pds(&account.handle, secret, pds_url).await?;
            Ok(Client::Bluesky(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(ensure_scheme("mastodon.social"), "https://mastodon.social");
        assert_eq!(
            ensure_scheme("https://pixelfed.social/"),
            "https://pixelfed.social"
        );
        assert_eq!(ensure_scheme("http://localhost:8080"), "http://localhost:8080");
    }
}
