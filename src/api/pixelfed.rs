//! Pixelfed API client
//!
//! Pixelfed speaks a Mastodon-compatible API but is photo-first: a
//! status without media is rejected, so `publish` refuses image-less
//! drafts before making any request.

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::compose::Draft;
use crate::errors;
use crate::models::{LinkedAccount, Platform};

use super::{PublishApi, PublishedPost};

/// Pixelfed API client
pub struct PixelfedClient {
    client: Client,
    instance: String,
    access_token: String,
}

impl PixelfedClient {
    /// Create a new Pixelfed client
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

impl PublishApi for PixelfedClient {
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

        let mut account = LinkedAccount::new(Platform::Pixelfed, &self.instance, &profile.username);
        account.account_url = Some(profile.url);
        Ok(account)
    }

    async fn publish(&self, draft: &Draft) -> Result<PublishedPost> {
        if draft.images.is_empty() {
            bail!("Pixelfed posts need at least one image");
        }

        let mut media_ids = Vec::new();
        for image in &draft.images {
            media_ids.push(self.upload_media(image).await?);
        }

        let url = self.api_url("/statuses");

        let request = PostStatusRequest {
            status: draft.message.clone(),
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

#[derive(Debug, Serialize)]
struct PostStatusRequest {
    status: String,
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

/// OAuth authentication flow for Pixelfed
///
/// Pixelfed app registration takes a JSON body rather than the form
/// encoding Mastodon accepts; the rest of the flow is identical.
pub mod oauth {
    use super::{Client, Context, Deserialize, Result, Serialize};

    pub use super::super::mastodon::oauth::{OAuthToken, REDIRECT_URI, SCOPES};

    /// Registered OAuth application credentials
    #[derive(Debug, Deserialize)]
    pub struct OAuthApp {
        /// OAuth client ID
        pub client_id: String,
        /// OAuth client secret
        pub client_secret: String,
    }

    #[derive(Debug, Serialize)]
    struct RegisterAppRequest<'a> {
        client_name: &'a str,
        redirect_uris: &'a str,
        scopes: &'a str,
        website: &'a str,
    }

    /// Register an OAuth application with an instance
    pub async fn register_app(instance: &str) -> Result<OAuthApp> {
        let client = Client::new();
        let url = format!("{}/api/v1/apps", instance.trim_end_matches('/'));

        let request = RegisterAppRequest {
            client_name: "Loftly",
            redirect_uris: REDIRECT_URI,
            scopes: SCOPES,
            website: "https://github.com/loftly-app/loftly",
        };

        let response = client
            .post(&url)
            .json(&request)
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

    #[tokio::test]
    async fn test_publish_rejects_empty_images() {
        let client = PixelfedClient::new("pixelfed.social", "token");
        let draft = Draft::new("no pictures");
        let result = client.publish(&draft).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_api_url() {
        let client = PixelfedClient::new("pixelfed.social", "token");
        assert_eq!(client.api_url("/media"), "https://pixelfed.social/api/v1/media");
    }
}
