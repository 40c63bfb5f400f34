//! Cross-posting fan-out
//!
//! One draft goes out to every selected linked account sequentially.
//! A failed delivery is recorded and logged but does not stop the
//! remaining deliveries.

use anyhow::{Result, bail};

use crate::api::get_client;
use crate::auth;
use crate::billing;
use crate::compose::{ComposeLimits, Draft};
use crate::db::Database;
use crate::models::{DeliveryRecord, DeliveryStatus, LinkedAccount, Post};

/// Outcome of one cross-posting run
#[derive(Debug)]
pub struct PublishReport {
    /// The post that was composed
    pub post: Post,
    /// One delivery record per target account
    pub records: Vec<DeliveryRecord>,
}

impl PublishReport {
    /// Number of successful deliveries
    pub fn delivered(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == DeliveryStatus::Delivered)
            .count()
    }

    /// Number of failed deliveries
    pub fn failed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == DeliveryStatus::Failed)
            .count()
    }
}

/// Publish a draft to every given account
///
/// Validates the draft and checks the plan quota before any network
/// call, then delivers account by account, recording each outcome.
pub async fn cross_post(
    db: &Database,
    draft: &Draft,
    accounts: &[LinkedAccount],
    limits: &ComposeLimits,
) -> Result<PublishReport> {
    if accounts.is_empty() {
        bail!("No accounts selected. Link one with: loftly link <platform>");
    }

    let targets: Vec<_> = accounts.iter().map(|a| a.platform).collect();
    let violations = draft.validate(limits, &targets);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|e| e.user_message.clone()).collect();
        bail!("{}", messages.join("\n"));
    }

    billing::check_post_quota(db)?;

    let mut post = Post::new(draft.message.clone());
    post.title = draft.title.clone();
    post.media = draft
        .images
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    db.insert_post(&post)?;

    let mut records = Vec::new();

    for account in accounts {
        let record = deliver(db, draft, &post, account).await;

        if let Err(e) = db.insert_delivery(&record) {
            tracing::warn!("Failed to store delivery record: {e}");
        }
        records.push(record);
    }

    let report = PublishReport { post, records };

    let delivered = report.delivered() as u32;
    if delivered > 0 {
        db.record_usage(1, draft.images.len() as u32)?;
    }

    Ok(report)
}

/// Deliver one post to one account, producing its delivery record
async fn deliver(
    db: &Database,
    draft: &Draft,
    post: &Post,
    account: &LinkedAccount,
) -> DeliveryRecord {
    let secret = match auth::get_secret(account) {
        Ok(Some(secret)) => secret,
        Ok(None) => {
            tracing::warn!("No credentials for {}", account.full_handle());
            return DeliveryRecord::failed(
                post.id,
                account.id,
                account.platform,
                "No stored credentials; link this account again",
            );
        }
        Err(e) => {
            tracing::warn!("Vault error for {}: {e}", account.full_handle());
            return DeliveryRecord::failed(post.id, account.id, account.platform, &e.to_string());
        }
    };

    let result = async {
        let client = get_client(account, &secret).await?;
        client.publish(draft).await
    }
    .await;

    match result {
        Ok(published) => {
            if let Err(e) = db.update_account_last_used(account.id) {
                tracing::warn!("Failed to update last-used for {}: {e}", account.full_handle());
            }
            DeliveryRecord::delivered(
                post.id,
                account.id,
                account.platform,
                published.remote_id,
                published.url,
            )
        }
        Err(e) => {
            // Classified platform errors carry a friendlier message for
            // the record; transport errors get the network category
            let message = if let Some(app) = e.downcast_ref::<crate::errors::AppError>() {
                tracing::warn!(
                    "Delivery to {} failed ({}): {}",
                    account.full_handle(),
                    app.kind.label(),
                    app.message
                );
                app.user_message.clone()
            } else if let Some(transport) = e.downcast_ref::<reqwest::Error>() {
                let kind = crate::errors::classify_transport(transport);
                tracing::warn!(
                    "Delivery to {} failed ({}): {e}",
                    account.full_handle(),
                    kind.label()
                );
                crate::errors::AppError::new(kind, transport.to_string())
                    .user_message
            } else {
                tracing::warn!("Failed to deliver to {}: {e}", account.full_handle());
                e.to_string()
            };
            DeliveryRecord::failed(post.id, account.id, account.platform, &message)
        }
    }
}

/// Fetch the post history visible under the active plan
///
/// Returns each post with its delivery records, newest first.
pub fn history(db: &Database, limit: usize) -> Result<Vec<(Post, Vec<DeliveryRecord>)>> {
    let plan = billing::active_plan(db)?;
    let posts = db.get_posts(plan.history_days, limit)?;

    let mut entries = Vec::with_capacity(posts.len());
    for post in posts {
        let records = db.get_deliveries_for_post(post.id)?;
        entries.push((post, records));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use tempfile::tempdir;

    fn open_test_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("test.sqlite");
        Database::open_path(&path).unwrap()
    }

    #[tokio::test]
    async fn test_cross_post_rejects_empty_target_list() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let draft = Draft::new("hello");
        let result = cross_post(&db, &draft, &[], &ComposeLimits::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cross_post_rejects_invalid_draft() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let account = LinkedAccount::new(Platform::Mastodon, "mastodon.social", "alice");
        db.insert_account(&account).unwrap();

        let draft = Draft::new("");
        let result = cross_post(&db, &draft, &[account], &ComposeLimits::default()).await;
        assert!(result.is_err());
        // Nothing persisted for a rejected draft
        assert!(db.get_posts(365, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cross_post_rejects_over_quota() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);
        db.record_usage(50, 0).unwrap();

        let account = LinkedAccount::new(Platform::Mastodon, "mastodon.social", "alice");
        db.insert_account(&account).unwrap();

        let draft = Draft::new("over quota");
        let result = cross_post(&db, &draft, &[account], &ComposeLimits::default()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_history_windowed_by_plan() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let mut fresh = Post::new("recent");
        fresh.created_at = chrono::Utc::now() - chrono::Duration::days(1);
        let mut old = Post::new("ancient");
        old.created_at = chrono::Utc::now() - chrono::Duration::days(30);
        db.insert_post(&fresh).unwrap();
        db.insert_post(&old).unwrap();

        // Free plan: 7 days of history
        let entries = history(&db, 50).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.content, "recent");
    }

    #[test]
    fn test_report_counts() {
        let post = Post::new("x");
        let account = LinkedAccount::new(Platform::Bluesky, "https://bsky.social", "a.bsky.social");
        let report = PublishReport {
            records: vec![
                DeliveryRecord::delivered(post.id, account.id, Platform::Bluesky, None, None),
                DeliveryRecord::failed(post.id, account.id, Platform::Mastodon, "nope"),
            ],
            post,
        };
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.failed(), 1);
    }
}
