//! Bluesky (AT Protocol) API client

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::compose::Draft;
use crate::errors;
use crate::models::{LinkedAccount, Platform};

use super::{PublishApi, PublishedPost};

/// Default PDS URL for Bluesky
pub const DEFAULT_PDS_URL: &str = "https://bsky.social";

/// Bluesky API client
pub struct BlueskyClient {
    client: Client,
    pds_url: String,
    access_jwt: String,
    did: String,
}

impl BlueskyClient {
    /// Login to Bluesky using the default PDS
    pub async fn login(handle: &str, app_password: &str) -> Result<Self> {
        Self::login_with_pds(handle, app_password, DEFAULT_PDS_URL).await
    }

    /// Login to Bluesky with a custom PDS URL
    pub async fn login_with_pds(handle: &str, app_password: &str, pds_url: &str) -> Result<Self> {
        let client = Client::new();
        let pds_url = pds_url.trim_end_matches('/').to_string();

        let url = format!("{pds_url}/xrpc/com.atproto.server.createSession");

        let request = CreateSessionRequest {
            identifier: handle.to_string(),
            password: app_password.to_string(),
        };

        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to login to Bluesky")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let session: CreateSessionResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        Ok(Self {
            client,
            pds_url,
            access_jwt: session.access_jwt,
            did: session.did,
        })
    }

}

impl PublishApi for BlueskyClient {
    async fn verify_credentials(&self) -> Result<LinkedAccount> {
        let url = format!(
            "{}/xrpc/app.bsky.actor.getProfile?actor={}",
            self.pds_url, self.did
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.access_jwt))
            .send()
            .await
            .context("Failed to get profile")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let profile: ProfileResponse = response
            .json()
            .await
            .context("Failed to parse profile response")?;

        let mut account = LinkedAccount::new(Platform::Bluesky, &self.pds_url, &profile.handle);
        account.did = Some(self.did.clone());
        account.account_url = Some(format!("https://bsky.app/profile/{}", profile.handle));
        Ok(account)
    }

    async fn publish(&self, draft: &Draft) -> Result<PublishedPost> {
        let url = format!("{}/xrpc/com.atproto.repo.createRecord", self.pds_url);

        let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

        let record = PostRecord {
            text: draft.message.clone(),
            created_at: now,
            r#type: "app.bsky.feed.post".to_string(),
        };

        let request = CreateRecordRequest {
            repo: self.did.clone(),
            collection: "app.bsky.feed.post".to_string(),
            record,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_jwt))
            .json(&request)
            .send()
            .await
            .context("Failed to post")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let result: CreateRecordResponse = response
            .json()
            .await
            .context("Failed to parse post response")?;

        let rkey = result
            .uri
            .split('/')
            .next_back()
            .unwrap_or(&result.uri)
            .to_string();

        Ok(PublishedPost {
            url: Some(format!(
                "https://bsky.app/profile/{}/post/{rkey}",
                self.did
            )),
            remote_id: Some(result.uri),
        })
    }
}

// ==================== API Types ====================

#[derive(Debug, Serialize)]
struct CreateSessionRequest {
    identifier: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
    #[allow(dead_code)]
    handle: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PostRecord {
    text: String,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(rename = "$type")]
    r#type: String,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<T> {
    repo: String,
    collection: String,
    record: T,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    uri: String,
    #[allow(dead_code)]
    cid: String,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    handle: String,
    #[allow(dead_code)]
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_record_serializes_at_proto_fields() {
        let record = PostRecord {
            text: "hi".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            r#type: "app.bsky.feed.post".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"$type\":\"app.bsky.feed.post\""));
    }

    #[test]
    fn test_session_response_parses() {
        let json = r#"{"accessJwt":"jwt","did":"did:plc:abc","handle":"alice.bsky.social"}"#;
        let session: CreateSessionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(session.did, "did:plc:abc");
        assert_eq!(session.access_jwt, "jwt");
    }
}
