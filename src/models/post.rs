//! Post and per-account delivery models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Platform;

/// Outcome of delivering a post to one linked account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum DeliveryStatus {
    /// Not yet attempted
    #[default]
    Pending,
    /// Accepted by the platform
    Delivered,
    /// The platform rejected the post or the request failed
    Failed,
}

impl DeliveryStatus {
    /// Get status as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "delivered" => Some(Self::Delivered),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Get emoji for status
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::Delivered => "✅",
            Self::Failed => "❌",
        }
    }
}

/// A composed post, independent of any platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: Uuid,
    /// Post body
    pub content: String,
    /// Title (used by Lemmy, ignored elsewhere)
    pub title: Option<String>,
    /// File names of attached media
    pub media: Vec<String>,
    /// When the post was composed
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            title: None,
            media: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Get a short preview of the content (for list display)
    pub fn preview(&self, max_len: usize) -> String {
        let content = self.content.replace('\n', " ");
        if content.len() <= max_len {
            content
        } else {
            format!("{}...", &content[..max_len.saturating_sub(3)])
        }
    }

    /// Get relative time string (e.g., "5m", "2h", "3d")
    pub fn relative_time(&self) -> String {
        let now = Utc::now();
        let duration = now.signed_duration_since(self.created_at);

        if duration.num_seconds() < 60 {
            format!("{}s", duration.num_seconds())
        } else if duration.num_minutes() < 60 {
            format!("{}m", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h", duration.num_hours())
        } else if duration.num_days() < 7 {
            format!("{}d", duration.num_days())
        } else {
            self.created_at.format("%b %d").to_string()
        }
    }
}

/// A per-account delivery record for a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Unique identifier
    pub id: Uuid,
    /// The post that was delivered
    pub post_id: Uuid,
    /// The linked account it was delivered through
    pub account_id: Uuid,
    /// Platform of that account
    pub platform: Platform,
    /// Delivery outcome
    pub status: DeliveryStatus,
    /// Platform-assigned id of the created status/post
    pub remote_id: Option<String>,
    /// URL of the created status/post
    pub remote_url: Option<String>,
    /// Error message if delivery failed
    pub error: Option<String>,
    /// When the delivery was attempted
    pub created_at: DateTime<Utc>,
}

impl DeliveryRecord {
    /// Record a successful delivery
    pub fn delivered(
        post_id: Uuid,
        account_id: Uuid,
        platform: Platform,
        remote_id: Option<String>,
        remote_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            account_id,
            platform,
            status: DeliveryStatus::Delivered,
            remote_id,
            remote_url,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Record a failed delivery
    pub fn failed(post_id: Uuid, account_id: Uuid, platform: Platform, error: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            account_id,
            platform,
            status: DeliveryStatus::Failed,
            remote_id: None,
            remote_url: None,
            error: Some(error.to_string()),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Delivered,
            DeliveryStatus::Failed,
        ] {
            assert_eq!(DeliveryStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DeliveryStatus::from_str("queued"), None);
    }

    #[test]
    fn test_preview_truncates() {
        let post = Post::new("a".repeat(100));
        let preview = post.preview(20);
        assert_eq!(preview.len(), 20);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_failed_record_keeps_error() {
        let post = Post::new("hello");
        let record = DeliveryRecord::failed(post.id, Uuid::new_v4(), Platform::Lemmy, "boom");
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }
}
