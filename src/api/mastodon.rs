//! Mastodon API client

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::compose::Draft;
use crate::errors;
use crate::models::{LinkedAccount, Platform};

use super::{PublishApi, PublishedPost};

/// Mastodon API client
pub struct MastodonClient {
    client: Client,
    instance: String,
    access_token: String,
}

impl MastodonClient {
    /// Create a new Mastodon client
    pub fn new(instance: &str, access_token: &str) -> Self {
        Self {
            client: Client::new(),
            instance: super::ensure_scheme(instance),
            access_token: access_token.to_string(),
        }
    }

    /// Build API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/v1{}", self.instance, endpoint)
    }

    /// Upload one image, returning the media attachment id
    pub async fn upload_media(&self, path: &Path) -> Result<String> {
        let url = self.api_url("/media");

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .multipart(form)
            .send()
            .await
            .context("Failed to upload media")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let media: MediaResponse = response
            .json()
            .await
            .context("Failed to parse media response")?;

        Ok(media.id)
    }
}

impl PublishApi for MastodonClient {
    async fn verify_credentials(&self) -> Result<LinkedAccount> {
        let url = self.api_url("/accounts/verify_credentials");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await
            .context("Failed to verify credentials")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let profile: ApiAccount = response
            .json()
            .await
            .context("Failed to parse account response")?;

        let mut account = LinkedAccount::new(Platform::Mastodon, &self.instance, &profile.username);
        account.account_url = Some(profile.url);
        Ok(account)
    }

    async fn publish(&self, draft: &Draft) -> Result<PublishedPost> {
        let mut media_ids = Vec::new();
        for image in &draft.images {
            media_ids.push(self.upload_media(image).await?);
        }

        let url = self.api_url("/statuses");

        let request = PostStatusRequest {
            status: draft.message.clone(),
            visibility: Some("public".to_string()),
            media_ids,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(&request)
            .send()
            .await
            .context("Failed to post status")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let status: StatusResponse = response
            .json()
            .await
            .context("Failed to parse post response")?;

        Ok(PublishedPost {
            remote_id: Some(status.id),
            url: status.url,
        })
    }
}

// ==================== API Types ====================

#[derive(Debug, Serialize, Default)]
struct PostStatusRequest {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    media_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiAccount {
    username: String,
    url: String,
}

/// OAuth authentication flow for Mastodon
pub mod oauth {
    use super::{Client, Context, Deserialize, Result};

    /// Redirect URI for the out-of-band (pasted code) flow
    pub const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

    /// Scopes requested when registering and authorizing
    pub const SCOPES: &str = "read write";

    /// Registered OAuth application credentials
    #[derive(Debug, Deserialize)]
    pub struct OAuthApp {
        /// OAuth client ID
        pub client_id: String,
        /// OAuth client secret
        pub client_secret: String,
    }

    /// OAuth access token response
    #[derive(Debug, Deserialize)]
    pub struct OAuthToken {
        /// Access token for API requests
        pub access_token: String,
        /// Token type (usually "Bearer")
        pub token_type: String,
    }

    /// Register an OAuth application with an instance
    pub async fn register_app(instance: &str) -> Result<OAuthApp> {
        let client = Client::new();
        let url = format!("{}/api/v1/apps", instance.trim_end_matches('/'));

        let params = [
            ("client_name", "Loftly"),
            ("redirect_uris", REDIRECT_URI),
            ("scopes", SCOPES),
            ("website", "https://github.com/loftly-app/loftly"),
        ];

        let response = client
            .post(&url)
            .form(&params)
            .send()
            .await
            .context("Failed to register app")?;

        response
            .json()
            .await
            .context("Failed to parse app registration response")
    }

    /// Get the authorization URL for the user to visit
    pub fn get_auth_url(instance: &str, client_id: &str) -> String {
        format!(
            "{}/oauth/authorize?client_id={}&redirect_uri={}&response_type=code&scope={}",
            instance.trim_end_matches('/'),
            client_id,
            urlencoding::encode(REDIRECT_URI),
            urlencoding::encode(SCOPES),
        )
    }

    /// Exchange authorization code for access token
    pub async fn get_token(
        instance: &str,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<OAuthToken> {
        let client = Client::new();
        let url = format!("{}/oauth/token", instance.trim_end_matches('/'));

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", REDIRECT_URI),
            ("code", code),
            ("scope", SCOPES),
        ];

        let response = client
            .post(&url)
            .form(&params)
            .send()
            .await
            .context("Failed to get access token")?;

        response
            .json()
            .await
            .context("Failed to parse token response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_strips_trailing_slash() {
        let client = MastodonClient::new("https://mastodon.social/", "token");
        assert_eq!(
            client.api_url("/statuses"),
            "https://mastodon.social/api/v1/statuses"
        );
    }

    #[test]
    fn test_auth_url_encodes_redirect() {
        let url = oauth::get_auth_url("https://mastodon.social", "abc");
        assert!(url.starts_with("https://mastodon.social/oauth/authorize?client_id=abc"));
        assert!(url.contains("urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"));
        assert!(url.contains("scope=read%20write"));
    }

    #[test]
    fn test_status_request_skips_empty_media() {
        let request = PostStatusRequest {
            status: "hi".to_string(),
            visibility: Some("public".to_string()),
            media_ids: Vec::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("media_ids"));
    }
}
