//! Instance app registration model
//!
//! Each federated host needs its own OAuth client registration. The
//! registration is performed once per (platform, domain) and cached so
//! later login flows reuse the same client key/secret.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Platform;

/// OAuth client credentials registered with a federated host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceApp {
    /// Unique identifier
    pub id: Uuid,
    /// Platform the host runs
    pub platform: Platform,
    /// Host domain (e.g. mastodon.social), no scheme
    pub domain: String,
    /// OAuth client id
    pub client_key: String,
    /// OAuth client secret
    pub client_secret: String,
    /// When the app was registered
    pub created_at: DateTime<Utc>,
}

impl InstanceApp {
    /// Create a registration record for a host
    pub fn new(platform: Platform, domain: &str, client_key: &str, client_secret: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform,
            domain: normalize_domain(domain),
            client_key: client_key.to_string(),
            client_secret: client_secret.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Base URL of the host
    pub fn base_url(&self) -> String {
        format!("https://{}", self.domain)
    }
}

/// Strip scheme and trailing slash from a user-entered host
pub fn normalize_domain(input: &str) -> String {
    input
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("https://pixelfed.social/"), "pixelfed.social");
        assert_eq!(normalize_domain("mastodon.social"), "mastodon.social");
        assert_eq!(normalize_domain(" http://lemmy.world "), "lemmy.world");
    }

    #[test]
    fn test_base_url() {
        let app = InstanceApp::new(Platform::Pixelfed, "https://pixelfed.social", "key", "secret");
        assert_eq!(app.base_url(), "https://pixelfed.social");
    }
}
