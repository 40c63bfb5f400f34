//! # Loftly 📣
//!
//! Cross-post to Mastodon, Pixelfed, Lemmy and Bluesky from one place.
//!
//! ## Overview
//!
//! Loftly links accounts on several federated/social platforms and
//! publishes one draft to all of them. Write once, post everywhere.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          CLI                                │
//! │   Link flows, compose, history — drives the library         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │     Compose     │ │       API       │ │     Publish     │
//! │                 │ │                 │ │                 │
//! │ • Draft         │ │ • Mastodon      │ │ • Fan-out       │
//! │ • Validation    │ │ • Pixelfed      │ │ • Deliveries    │
//! │ • Limits        │ │ • Lemmy         │ │ • Quota gates   │
//! │                 │ │ • Bluesky       │ │                 │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │                   │
//!          └───────────────────┴───────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │    Database     │ │      Auth       │ │     Models      │
//! │                 │ │                 │ │                 │
//! │ • Accounts      │ │ • Secret vault  │ │ • LinkedAccount │
//! │ • Instances     │ │ • OAuth flows   │ │ • Post/Delivery │
//! │ • History       │ │ • Credentials   │ │ • Plan/Usage    │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] — Platform API clients (Mastodon, Pixelfed, Lemmy, Bluesky)
//! - [`auth`] — Encrypted on-disk secret vault
//! - [`billing`] — Subscription, plan limits and usage gating
//! - [`compose`] — Draft model and validation
//! - [`config`] — Configuration management
//! - [`db`] — `SQLite` database for accounts, instances, history, billing
//! - [`errors`] — Failure classification with user-facing messages
//! - [`models`] — Data models (`LinkedAccount`, `Post`, `Platform`, ...)
//! - [`publish`] — Cross-posting fan-out and post history
//!
//! ## Features
//!
//! - **Multi-Platform** — Mastodon, Pixelfed, Lemmy and Bluesky in one place
//! - **Cross-Post** — Write once, deliver to every linked account
//! - **Instance Cache** — OAuth app registrations reused per federated host
//! - **History** — Every post and its per-account delivery outcomes
//! - **Secure** — Secrets encrypted at rest, never stored in the database
//! - **Fast** — Async networking with Tokio

#![doc(html_root_url = "https://docs.rs/loftly/0.2.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::similar_names)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod auth;
pub mod billing;
pub mod compose;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod paths;
pub mod publish;

// Re-export main types for convenience
pub use compose::{ComposeLimits, Draft};
pub use config::Config;
pub use db::Database;
pub use errors::{AppError, ErrorKind};
pub use models::{
    DeliveryRecord, DeliveryStatus, InstanceApp, LinkedAccount, Plan, Platform, Post,
    Subscription, Usage,
};
pub use publish::PublishReport;

/// ASCII logo for the application
pub const LOGO: &str = r"
   __       ______  __
  / /  ___ / _/ /_/ /_ __
 / /__/ _ \ _/ __/ / // /
/____/\___/_/ \__/_/\_, /
                   /___/
";

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Repository URL
pub const REPO_URL: &str = "https://github.com/loftly-app/loftly";
