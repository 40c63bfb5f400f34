//! Subscription, plan and usage models
//!
//! Plans gate feature limits: how many accounts can be linked, how far
//! back post history reaches, and how many posts a month can be
//! published. There is no payment processing here; plans are seeded
//! rows and the subscription records which one is active.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// A billing tier with its feature limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan name (e.g. "free", "pro")
    pub name: String,
    /// Maximum number of linked accounts
    pub max_accounts: u32,
    /// How many days of post history are visible
    pub history_days: u32,
    /// Monthly post quota
    pub monthly_posts: u32,
}

impl Plan {
    /// The default free tier
    pub fn free() -> Self {
        Self {
            name: "free".to_string(),
            max_accounts: 3,
            history_days: 7,
            monthly_posts: 50,
        }
    }

    /// The paid tier
    pub fn pro() -> Self {
        Self {
            name: "pro".to_string(),
            max_accounts: 10,
            history_days: 90,
            monthly_posts: 1000,
        }
    }
}

/// The active subscription (a single row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Name of the active plan
    pub plan_name: String,
    /// When the subscription was created
    pub started_at: DateTime<Utc>,
}

impl Subscription {
    /// Create a free-tier subscription
    pub fn free() -> Self {
        Self {
            plan_name: "free".to_string(),
            started_at: Utc::now(),
        }
    }
}

/// Consumption counters for the current period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Posts published this period
    pub posts_this_month: u32,
    /// Media files uploaded this period
    pub media_this_month: u32,
    /// First day of the period the counters cover
    pub period_start: DateTime<Utc>,
}

impl Usage {
    /// Fresh counters for the current month
    pub fn new() -> Self {
        Self {
            posts_this_month: 0,
            media_this_month: 0,
            period_start: Utc::now(),
        }
    }

    /// Whether the counters belong to an earlier month than `now`
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.period_start.year() != now.year() || self.period_start.month() != now.month()
    }

    /// Reset the counters for a new period
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        self.posts_this_month = 0;
        self.media_this_month = 0;
        self.period_start = now;
    }

    /// Remaining posts under the plan's quota
    pub fn posts_remaining(&self, plan: &Plan) -> u32 {
        plan.monthly_posts.saturating_sub(self.posts_this_month)
    }
}

impl Default for Usage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stale_usage_rolls_over() {
        let mut usage = Usage {
            posts_this_month: 12,
            media_this_month: 4,
            period_start: Utc.with_ymd_and_hms(2026, 6, 3, 0, 0, 0).unwrap(),
        };
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap();
        assert!(usage.is_stale(now));

        usage.roll_over(now);
        assert_eq!(usage.posts_this_month, 0);
        assert_eq!(usage.period_start, now);
    }

    #[test]
    fn test_same_month_not_stale() {
        let usage = Usage {
            posts_this_month: 1,
            media_this_month: 0,
            period_start: Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap(),
        };
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 23, 0, 0).unwrap();
        assert!(!usage.is_stale(now));
    }

    #[test]
    fn test_posts_remaining_saturates() {
        let plan = Plan::free();
        let usage = Usage {
            posts_this_month: 60,
            media_this_month: 0,
            period_start: Utc::now(),
        };
        assert_eq!(usage.posts_remaining(&plan), 0);
    }
}
