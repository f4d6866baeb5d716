//! Web push notification demo server.
//!
//! Issues VAPID keys, keeps the one browser push subscription that most
//! recently registered, and pushes a notification to it on demand.
//!
//! # Architecture
//!
//! - **Key store** - VAPID keypair generated once and kept in a JSON file
//! - **Subscription slot** - single in-memory slot, last registration wins
//! - **Push dispatcher** - encrypts, signs and sends one push per request
//! - **Server** - axum routes plus static file fallback
//!
//! # Modules
//!
//! - [`notifications`] - VAPID keys, subscriptions and push delivery
//! - [`server`] - HTTP routes and listener
//! - [`config`] - startup configuration

// Rust guideline compliant 2026-02

pub mod config;
pub mod notifications;
pub mod server;

pub use config::{Args, Config, TlsFiles};
pub use notifications::{
    DeliveryError, NotificationPayload, PushDispatcher, PushSubscription, SubscriptionSlot,
    VapidKeys, WebPushDispatcher,
};
pub use server::{router, AppState};
