//! Data models for Loftly

pub mod account;
pub mod billing;
pub mod instance;
pub mod platform;
pub mod post;

pub use account::LinkedAccount;
pub use billing::{Plan, Subscription, Usage};
pub use instance::InstanceApp;
pub use platform::Platform;
pub use post::{DeliveryRecord, DeliveryStatus, Post};
