//! Database module for `SQLite` storage (accounts, instances, post history, billing)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::PathBuf;
use uuid::Uuid;

use crate::models::{
    DeliveryRecord, DeliveryStatus, InstanceApp, LinkedAccount, Plan, Platform, Post,
    Subscription, Usage,
};
use crate::paths;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database at the default location
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        Self::open_path(&path)
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;

        let db = Self { conn };
        db.init()?;

        Ok(db)
    }

    /// Get the default database path
    pub fn default_path() -> Result<PathBuf> {
        paths::database_path()
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            -- Linked accounts table
            CREATE TABLE IF NOT EXISTS linked_accounts (
                id TEXT PRIMARY KEY,
                platform TEXT NOT NULL,
                instance TEXT NOT NULL,
                handle TEXT NOT NULL,
                account_url TEXT,
                did TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                last_used_at TEXT,
                UNIQUE(platform, handle, instance)
            );

            -- Per-host OAuth app registrations
            CREATE TABLE IF NOT EXISTS instances (
                id TEXT PRIMARY KEY,
                platform TEXT NOT NULL,
                domain TEXT NOT NULL,
                client_key TEXT NOT NULL,
                client_secret TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(platform, domain)
            );

            -- Composed posts
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                title TEXT,
                media_json TEXT DEFAULT '[]',
                created_at TEXT NOT NULL
            );

            -- Per-account delivery records
            CREATE TABLE IF NOT EXISTS account_posts (
                id TEXT PRIMARY KEY,
                post_id TEXT NOT NULL,
                account_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                remote_id TEXT,
                remote_url TEXT,
                error TEXT,
                created_at TEXT NOT NULL
            );

            -- Billing: active subscription (single row)
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                plan_name TEXT NOT NULL,
                started_at TEXT NOT NULL
            );

            -- Billing: plan tiers
            CREATE TABLE IF NOT EXISTS plans (
                name TEXT PRIMARY KEY,
                max_accounts INTEGER NOT NULL,
                history_days INTEGER NOT NULL,
                monthly_posts INTEGER NOT NULL
            );

            -- Billing: consumption counters (single row)
            CREATE TABLE IF NOT EXISTS usage_tracking (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                posts_this_month INTEGER NOT NULL DEFAULT 0,
                media_this_month INTEGER NOT NULL DEFAULT 0,
                period_start TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_linked_accounts_platform ON linked_accounts(platform);
            CREATE INDEX IF NOT EXISTS idx_account_posts_post ON account_posts(post_id);
            CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);
            ",
        )?;

        self.seed_plans()?;

        Ok(())
    }

    /// Seed the plan tiers (no-op when already present)
    fn seed_plans(&self) -> Result<()> {
        for plan in [Plan::free(), Plan::pro()] {
            self.conn.execute(
                r"INSERT OR IGNORE INTO plans (name, max_accounts, history_days, monthly_posts)
                   VALUES (?1, ?2, ?3, ?4)",
                params![
                    plan.name,
                    plan.max_accounts,
                    plan.history_days,
                    plan.monthly_posts
                ],
            )?;
        }
        Ok(())
    }

    // ==================== Linked accounts ====================

    /// Insert a new linked account
    pub fn insert_account(&self, account: &LinkedAccount) -> Result<()> {
        self.conn.execute(
            r"INSERT INTO linked_accounts (id, platform, instance, handle, account_url, did, enabled, created_at, last_used_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                account.id.to_string(),
                account.platform.name().to_lowercase(),
                account.instance,
                account.handle,
                account.account_url,
                account.did,
                i32::from(account.enabled),
                account.created_at.to_rfc3339(),
                account.last_used_at.map(|dt| dt.to_rfc3339()),
            ],
        ).context("Failed to insert linked account (already linked?)")?;
        Ok(())
    }

    /// Get all linked accounts
    pub fn get_accounts(&self) -> Result<Vec<LinkedAccount>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, instance, handle, account_url, did, enabled, created_at, last_used_at
             FROM linked_accounts ORDER BY platform, handle",
        )?;

        let accounts = stmt.query_map([], Self::row_to_account)?;
        accounts.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get linked accounts for a specific platform
    pub fn get_accounts_for_platform(&self, platform: Platform) -> Result<Vec<LinkedAccount>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, instance, handle, account_url, did, enabled, created_at, last_used_at
             FROM linked_accounts WHERE platform = ?1 ORDER BY handle",
        )?;

        let accounts =
            stmt.query_map(params![platform.name().to_lowercase()], Self::row_to_account)?;
        accounts.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get the accounts cross-posting currently targets
    pub fn get_enabled_accounts(&self) -> Result<Vec<LinkedAccount>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, instance, handle, account_url, did, enabled, created_at, last_used_at
             FROM linked_accounts WHERE enabled = 1 ORDER BY platform, handle",
        )?;

        let accounts = stmt.query_map([], Self::row_to_account)?;
        accounts.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Find an account by handle (exact match, any platform)
    pub fn get_account_by_handle(&self, handle: &str) -> Result<Option<LinkedAccount>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, instance, handle, account_url, did, enabled, created_at, last_used_at
             FROM linked_accounts WHERE handle = ?1",
        )?;

        stmt.query_row(params![handle], Self::row_to_account)
            .optional()
            .map_err(Into::into)
    }

    /// Number of linked accounts (for plan gating)
    pub fn count_accounts(&self) -> Result<u32> {
        let count: u32 =
            self.conn
                .query_row("SELECT COUNT(*) FROM linked_accounts", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Toggle whether cross-posting targets an account
    pub fn set_account_enabled(&self, id: Uuid, enabled: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE linked_accounts SET enabled = ?2 WHERE id = ?1",
            params![id.to_string(), i32::from(enabled)],
        )?;
        Ok(())
    }

    /// Delete a linked account
    pub fn delete_account(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM linked_accounts WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// Update last used timestamp
    pub fn update_account_last_used(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE linked_accounts SET last_used_at = ?2 WHERE id = ?1",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Helper to convert a row to `LinkedAccount`
    fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkedAccount> {
        let platform_str: String = row.get(1)?;
        let platform = Platform::from_str(&platform_str).unwrap_or_default();

        Ok(LinkedAccount {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
            platform,
            instance: row.get(2)?,
            handle: row.get(3)?,
            account_url: row.get(4)?,
            did: row.get(5)?,
            enabled: row.get::<_, i32>(6)? != 0,
            created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(7)?)
                .unwrap()
                .with_timezone(&Utc),
            last_used_at: row
                .get::<_, Option<String>>(8)?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    // ==================== Instance registrations ====================

    /// Persist a per-host OAuth app registration
    pub fn insert_instance_app(&self, app: &InstanceApp) -> Result<()> {
        self.conn.execute(
            r"INSERT INTO instances (id, platform, domain, client_key, client_secret, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                app.id.to_string(),
                app.platform.name().to_lowercase(),
                app.domain,
                app.client_key,
                app.client_secret,
                app.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up the cached registration for a host, if any
    pub fn get_instance_app(&self, platform: Platform, domain: &str) -> Result<Option<InstanceApp>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, domain, client_key, client_secret, created_at
             FROM instances WHERE platform = ?1 AND domain = ?2",
        )?;

        stmt.query_row(
            params![platform.name().to_lowercase(), domain],
            Self::row_to_instance_app,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Get all registered instance apps
    pub fn get_instance_apps(&self) -> Result<Vec<InstanceApp>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, domain, client_key, client_secret, created_at
             FROM instances ORDER BY platform, domain",
        )?;

        let apps = stmt.query_map([], Self::row_to_instance_app)?;
        apps.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn row_to_instance_app(row: &rusqlite::Row<'_>) -> rusqlite::Result<InstanceApp> {
        let platform_str: String = row.get(1)?;

        Ok(InstanceApp {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
            platform: Platform::from_str(&platform_str).unwrap_or_default(),
            domain: row.get(2)?,
            client_key: row.get(3)?,
            client_secret: row.get(4)?,
            created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(5)?)
                .unwrap()
                .with_timezone(&Utc),
        })
    }

    // ==================== Posts and deliveries ====================

    /// Save a composed post
    pub fn insert_post(&self, post: &Post) -> Result<()> {
        let media_json = serde_json::to_string(&post.media).unwrap_or_else(|_| "[]".to_string());

        self.conn.execute(
            r"INSERT INTO posts (id, content, title, media_json, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                post.id.to_string(),
                post.content,
                post.title,
                media_json,
                post.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Save a per-account delivery record
    pub fn insert_delivery(&self, record: &DeliveryRecord) -> Result<()> {
        self.conn.execute(
            r"INSERT INTO account_posts (id, post_id, account_id, platform, status, remote_id, remote_url, error, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id.to_string(),
                record.post_id.to_string(),
                record.account_id.to_string(),
                record.platform.name().to_lowercase(),
                record.status.as_str(),
                record.remote_id,
                record.remote_url,
                record.error,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get posts within a history window (most recent first)
    pub fn get_posts(&self, window_days: u32, limit: usize) -> Result<Vec<Post>> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(window_days));
        let mut stmt = self.conn.prepare(
            "SELECT id, content, title, media_json, created_at
             FROM posts WHERE created_at >= ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;

        let posts = stmt.query_map(params![cutoff.to_rfc3339(), limit as i64], |row| {
            let media_json: String = row
                .get::<_, Option<String>>(3)?
                .unwrap_or_else(|| "[]".to_string());
            let media: Vec<String> = serde_json::from_str(&media_json).unwrap_or_default();

            Ok(Post {
                id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                content: row.get(1)?,
                title: row.get(2)?,
                media,
                created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(4)?)
                    .unwrap()
                    .with_timezone(&Utc),
            })
        })?;

        posts.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get the delivery records for a post
    pub fn get_deliveries_for_post(&self, post_id: Uuid) -> Result<Vec<DeliveryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, post_id, account_id, platform, status, remote_id, remote_url, error, created_at
             FROM account_posts WHERE post_id = ?1 ORDER BY created_at ASC",
        )?;

        let records = stmt.query_map(params![post_id.to_string()], |row| {
            let platform_str: String = row.get(3)?;
            let status_str: String = row.get(4)?;

            Ok(DeliveryRecord {
                id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
                post_id: Uuid::parse_str(&row.get::<_, String>(1)?).unwrap(),
                account_id: Uuid::parse_str(&row.get::<_, String>(2)?).unwrap(),
                platform: Platform::from_str(&platform_str).unwrap_or_default(),
                status: DeliveryStatus::from_str(&status_str).unwrap_or_default(),
                remote_id: row.get(5)?,
                remote_url: row.get(6)?,
                error: row.get(7)?,
                created_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(8)?)
                    .unwrap()
                    .with_timezone(&Utc),
            })
        })?;

        records.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ==================== Billing ====================

    /// Get a plan tier by name
    pub fn get_plan(&self, name: &str) -> Result<Option<Plan>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, max_accounts, history_days, monthly_posts FROM plans WHERE name = ?1",
        )?;

        stmt.query_row(params![name], |row| {
            Ok(Plan {
                name: row.get(0)?,
                max_accounts: row.get(1)?,
                history_days: row.get(2)?,
                monthly_posts: row.get(3)?,
            })
        })
        .optional()
        .map_err(Into::into)
    }

    /// Get the active subscription, if one exists
    pub fn get_subscription(&self) -> Result<Option<Subscription>> {
        let mut stmt = self
            .conn
            .prepare("SELECT plan_name, started_at FROM subscriptions WHERE id = 1")?;

        stmt.query_row([], |row| {
            Ok(Subscription {
                plan_name: row.get(0)?,
                started_at: DateTime::parse_from_rfc3339(&row.get::<_, String>(1)?)
                    .unwrap()
                    .with_timezone(&Utc),
            })
        })
        .optional()
        .map_err(Into::into)
    }

    /// Store the subscription (replacing any existing one)
    pub fn insert_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.conn.execute(
            r"INSERT OR REPLACE INTO subscriptions (id, plan_name, started_at)
               VALUES (1, ?1, ?2)",
            params![
                subscription.plan_name,
                subscription.started_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Get the current usage counters, creating or rolling them over as needed
    pub fn get_usage(&self) -> Result<Usage> {
        let existing = self
            .conn
            .prepare(
                "SELECT posts_this_month, media_this_month, period_start
                 FROM usage_tracking WHERE id = 1",
            )?
            .query_row([], |row| {
                Ok(Usage {
                    posts_this_month: row.get(0)?,
                    media_this_month: row.get(1)?,
                    period_start: DateTime::parse_from_rfc3339(&row.get::<_, String>(2)?)
                        .unwrap()
                        .with_timezone(&Utc),
                })
            })
            .optional()?;

        let now = Utc::now();
        match existing {
            Some(mut usage) => {
                if usage.is_stale(now) {
                    usage.roll_over(now);
                    self.write_usage(&usage)?;
                }
                Ok(usage)
            }
            None => {
                let usage = Usage::new();
                self.write_usage(&usage)?;
                Ok(usage)
            }
        }
    }

    /// Increment the usage counters
    pub fn record_usage(&self, posts: u32, media: u32) -> Result<Usage> {
        let mut usage = self.get_usage()?;
        usage.posts_this_month += posts;
        usage.media_this_month += media;
        self.write_usage(&usage)?;
        Ok(usage)
    }

    fn write_usage(&self, usage: &Usage) -> Result<()> {
        self.conn.execute(
            r"INSERT OR REPLACE INTO usage_tracking (id, posts_this_month, media_this_month, period_start)
               VALUES (1, ?1, ?2, ?3)",
            params![
                usage.posts_this_month,
                usage.media_this_month,
                usage.period_start.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_test_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("test.sqlite");
        Database::open_path(&path).unwrap()
    }

    #[test]
    fn test_database_init() {
        let dir = tempdir().unwrap();
        let _db = open_test_db(&dir);
        // Should create without error
    }

    #[test]
    fn test_account_crud() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let account = LinkedAccount::new(Platform::Mastodon, "mastodon.social", "alice");
        db.insert_account(&account).unwrap();

        let accounts = db.get_accounts().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].handle, "alice");
        assert!(accounts[0].enabled);

        db.set_account_enabled(account.id, false).unwrap();
        assert!(db.get_enabled_accounts().unwrap().is_empty());

        db.delete_account(account.id).unwrap();
        assert!(db.get_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let first = LinkedAccount::new(Platform::Pixelfed, "pixelfed.social", "alice");
        let second = LinkedAccount::new(Platform::Pixelfed, "pixelfed.social", "alice");

        db.insert_account(&first).unwrap();
        assert!(db.insert_account(&second).is_err());
    }

    #[test]
    fn test_instance_app_cache() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        assert!(db
            .get_instance_app(Platform::Mastodon, "mastodon.social")
            .unwrap()
            .is_none());

        let app = InstanceApp::new(Platform::Mastodon, "mastodon.social", "key", "secret");
        db.insert_instance_app(&app).unwrap();

        let cached = db
            .get_instance_app(Platform::Mastodon, "mastodon.social")
            .unwrap()
            .unwrap();
        assert_eq!(cached.client_key, "key");

        // Same domain on a different platform is a separate registration
        assert!(db
            .get_instance_app(Platform::Pixelfed, "mastodon.social")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_post_with_deliveries() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let account = LinkedAccount::new(Platform::Bluesky, "https://bsky.social", "a.bsky.social");
        db.insert_account(&account).unwrap();

        let post = Post::new("hello fediverse");
        db.insert_post(&post).unwrap();

        let ok = DeliveryRecord::delivered(
            post.id,
            account.id,
            Platform::Bluesky,
            Some("abc123".to_string()),
            None,
        );
        let bad = DeliveryRecord::failed(post.id, account.id, Platform::Mastodon, "timeout");
        db.insert_delivery(&ok).unwrap();
        db.insert_delivery(&bad).unwrap();

        let posts = db.get_posts(7, 50).unwrap();
        assert_eq!(posts.len(), 1);

        let deliveries = db.get_deliveries_for_post(post.id).unwrap();
        assert_eq!(deliveries.len(), 2);
        assert!(deliveries.iter().any(|d| d.status == DeliveryStatus::Failed));
    }

    #[test]
    fn test_plans_seeded() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let free = db.get_plan("free").unwrap().unwrap();
        assert_eq!(free.max_accounts, 3);

        let pro = db.get_plan("pro").unwrap().unwrap();
        assert_eq!(pro.history_days, 90);

        assert!(db.get_plan("enterprise").unwrap().is_none());
    }

    #[test]
    fn test_subscription_and_usage() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        assert!(db.get_subscription().unwrap().is_none());
        db.insert_subscription(&Subscription::free()).unwrap();
        let sub = db.get_subscription().unwrap().unwrap();
        assert_eq!(sub.plan_name, "free");

        let usage = db.get_usage().unwrap();
        assert_eq!(usage.posts_this_month, 0);

        let usage = db.record_usage(3, 1).unwrap();
        assert_eq!(usage.posts_this_month, 3);
        assert_eq!(usage.media_this_month, 1);
    }
}
