//! Lemmy API client

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::compose::Draft;
use crate::errors;
use crate::models::{LinkedAccount, Platform};

use super::{PublishApi, PublishedPost};

/// Lemmy API client
pub struct LemmyClient {
    client: Client,
    instance: String,
    jwt: String,
}

impl LemmyClient {
    /// Create a new Lemmy client with an existing login JWT
    pub fn new(instance: &str, jwt: &str) -> Self {
        Self {
            client: Client::new(),
            instance: super::ensure_scheme(instance),
            jwt: jwt.to_string(),
        }
    }

    /// Build API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/v3{}", self.instance, endpoint)
    }

    /// Log in with username/password (and an optional TOTP token),
    /// returning the session JWT
    pub async fn login(
        instance: &str,
        username: &str,
        password: &str,
        totp: Option<&str>,
    ) -> Result<String> {
        let client = Client::new();
        let instance = super::ensure_scheme(instance);
        let url = format!("{instance}/api/v3/user/login");

        let request = LoginRequest {
            username_or_email: username.to_string(),
            password: password.to_string(),
            totp_2fa_token: totp.map(str::to_string),
        };

        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to login to Lemmy")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        login
            .jwt
            .context("Login failed: no JWT token received")
    }

    /// Search communities on the instance
    pub async fn search_communities(&self, query: &str) -> Result<Vec<CommunitySummary>> {
        let url = self.api_url(&format!(
            "/search?q={}&type_=Communities&sort=TopAll&limit=50&page=1",
            urlencoding::encode(query)
        ));

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.jwt))
            .send()
            .await
            .context("Failed to search communities")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let results: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(results
            .communities
            .into_iter()
            .map(|view| CommunitySummary {
                id: view.community.id,
                name: view.community.name,
                title: view.community.title,
            })
            .collect())
    }

    /// Resolve a community name to its id
    async fn resolve_community(&self, name: &str) -> Result<u64> {
        let url = self.api_url(&format!("/community?name={}", urlencoding::encode(name)));

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.jwt))
            .send()
            .await
            .context("Failed to resolve community")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let result: GetCommunityResponse = response
            .json()
            .await
            .context("Failed to parse community response")?;

        Ok(result.community_view.community.id)
    }
}

impl PublishApi for LemmyClient {
    async fn verify_credentials(&self) -> Result<LinkedAccount> {
        let url = self.api_url("/site");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.jwt))
            .send()
            .await
            .context("Failed to fetch site info")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let site: SiteResponse = response
            .json()
            .await
            .context("Failed to parse site response")?;

        let person = site
            .my_user
            .context("Not logged in on this instance")?
            .local_user_view
            .person;

        let mut account = LinkedAccount::new(Platform::Lemmy, &self.instance, &person.name);
        account.account_url = person.actor_id;
        Ok(account)
    }

    async fn publish(&self, draft: &Draft) -> Result<PublishedPost> {
        let Some(title) = draft.title.as_deref() else {
            bail!("Lemmy posts need a title");
        };
        let Some(community) = draft.community.as_deref() else {
            bail!("Lemmy posts need a community");
        };

        let community_id = self.resolve_community(community).await?;

        let url = self.api_url("/post");

        let request = CreatePostRequest {
            name: title.to_string(),
            body: if draft.message.is_empty() {
                None
            } else {
                Some(draft.message.clone())
            },
            community_id,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.jwt))
            .json(&request)
            .send()
            .await
            .context("Failed to create post")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(errors::from_response(status, &body).into());
        }

        let created: CreatePostResponse = response
            .json()
            .await
            .context("Failed to parse post response")?;

        Ok(PublishedPost {
            remote_id: Some(created.post_view.post.id.to_string()),
            url: created.post_view.post.ap_id,
        })
    }
}

/// A community returned by search
#[derive(Debug, Clone)]
pub struct CommunitySummary {
    /// Community id on the instance
    pub id: u64,
    /// Machine name (used in URLs and post creation)
    pub name: String,
    /// Human-readable title
    pub title: String,
}

// ==================== API Types ====================

#[derive(Debug, Serialize)]
struct LoginRequest {
    username_or_email: String,
    password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    totp_2fa_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    jwt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    communities: Vec<CommunityView>,
}

#[derive(Debug, Deserialize)]
struct GetCommunityResponse {
    community_view: CommunityView,
}

#[derive(Debug, Deserialize)]
struct CommunityView {
    community: Community,
}

#[derive(Debug, Deserialize)]
struct Community {
    id: u64,
    name: String,
    title: String,
}

#[derive(Debug, Serialize)]
struct CreatePostRequest {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    community_id: u64,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    post_view: PostView,
}

#[derive(Debug, Deserialize)]
struct PostView {
    post: ApiPost,
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    id: u64,
    ap_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SiteResponse {
    my_user: Option<MyUser>,
}

#[derive(Debug, Deserialize)]
struct MyUser {
    local_user_view: LocalUserView,
}

#[derive(Debug, Deserialize)]
struct LocalUserView {
    person: Person,
}

#[derive(Debug, Deserialize)]
struct Person {
    name: String,
    actor_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let client = LemmyClient::new("lemmy.world", "jwt");
        assert_eq!(client.api_url("/site"), "https://lemmy.world/api/v3/site");
    }

    #[test]
    fn test_login_request_omits_missing_totp() {
        let request = LoginRequest {
            username_or_email: "alice".to_string(),
            password: "hunter2".to_string(),
            totp_2fa_token: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("totp_2fa_token"));

        let request = LoginRequest {
            totp_2fa_token: Some("123456".to_string()),
            ..request
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("totp_2fa_token"));
    }

    #[tokio::test]
    async fn test_publish_requires_title_and_community() {
        let client = LemmyClient::new("lemmy.world", "jwt");

        let draft = Draft::new("body only");
        assert!(client.publish(&draft).await.is_err());

        let mut draft = Draft::new("body");
        draft.title = Some("a title".to_string());
        // Still missing a community
        assert!(client.publish(&draft).await.is_err());
    }
}
