//! Plan gating and subscription bootstrap
//!
//! The subscription decides which plan row applies; the plan's limits
//! gate account linking, history depth and the monthly post quota.

use anyhow::{Context, Result, bail};

use crate::db::Database;
use crate::models::{Plan, Subscription, Usage};

/// Get the active subscription, creating a free one when none exists
pub fn ensure_subscription(db: &Database) -> Result<Subscription> {
    if let Some(subscription) = db.get_subscription()? {
        return Ok(subscription);
    }

    let subscription = Subscription::free();
    db.insert_subscription(&subscription)?;
    Ok(subscription)
}

/// Get the plan the active subscription grants
///
/// Falls back to the free tier when the subscription names an unknown
/// plan.
pub fn active_plan(db: &Database) -> Result<Plan> {
    let subscription = ensure_subscription(db)?;
    match db.get_plan(&subscription.plan_name)? {
        Some(plan) => Ok(plan),
        None => {
            tracing::warn!(
                "Subscription references unknown plan '{}', using free",
                subscription.plan_name
            );
            db.get_plan("free")?.context("Free plan missing from database")
        }
    }
}

/// Check that another account can be linked under the active plan
pub fn check_account_limit(db: &Database) -> Result<()> {
    let plan = active_plan(db)?;
    let count = db.count_accounts()?;

    if count >= plan.max_accounts {
        bail!(
            "The {} plan allows {} linked accounts. Unlink one or upgrade to link more.",
            plan.name,
            plan.max_accounts
        );
    }

    Ok(())
}

/// Check that another post fits in this month's quota
pub fn check_post_quota(db: &Database) -> Result<Usage> {
    let plan = active_plan(db)?;
    let usage = db.get_usage()?;

    if usage.posts_remaining(&plan) == 0 {
        bail!(
            "You have used all {} posts on the {} plan this month.",
            plan.monthly_posts,
            plan.name
        );
    }

    Ok(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkedAccount, Platform};
    use tempfile::tempdir;

    fn open_test_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("test.sqlite");
        Database::open_path(&path).unwrap()
    }

    #[test]
    fn test_subscription_bootstraps_free() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let subscription = ensure_subscription(&db).unwrap();
        assert_eq!(subscription.plan_name, "free");

        // Idempotent
        let again = ensure_subscription(&db).unwrap();
        assert_eq!(again.plan_name, "free");
    }

    #[test]
    fn test_account_limit_enforced() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        for i in 0..3 {
            let account =
                LinkedAccount::new(Platform::Mastodon, "mastodon.social", &format!("user{i}"));
            db.insert_account(&account).unwrap();
        }

        // Free plan caps at 3
        assert!(check_account_limit(&db).is_err());
    }

    #[test]
    fn test_post_quota_enforced() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        assert!(check_post_quota(&db).is_ok());

        db.record_usage(50, 0).unwrap();
        assert!(check_post_quota(&db).is_err());
    }

    #[test]
    fn test_unknown_plan_falls_back_to_free() {
        let dir = tempdir().unwrap();
        let db = open_test_db(&dir);

        let mut subscription = Subscription::free();
        subscription.plan_name = "legacy".to_string();
        db.insert_subscription(&subscription).unwrap();

        let plan = active_plan(&db).unwrap();
        assert_eq!(plan.name, "free");
    }
}
