//! Web push notification infrastructure.
//!
//! Manages the server's VAPID keys and the registered browser push
//! subscription, and delivers notifications to the browser's push service.
//!
//! # Architecture
//!
//! ```text
//! POST /notification
//!     ↓
//! Server encrypts + VAPID-signs payload, sends web push (RFC 8030)
//!     ↓
//! Push service delivers to service worker
//!     ↓
//! Service worker shows browser notification
//! ```
//!
//! # VAPID Keys
//!
//! One P-256 ECDSA keypair (VAPID, RFC 8292) per server, kept in a JSON key
//! file. The public key is handed to browsers so they can subscribe.
//!
//! # Push Subscriptions
//!
//! Browsers post their push subscription (endpoint + keys) to `/register`.
//! Only the most recent one is kept.

// Rust guideline compliant 2026-02

pub mod push;
pub mod vapid;

pub use push::{
    DeliveryError, NotificationPayload, PushDispatcher, PushSubscription, SubscriptionSlot,
    WebPushDispatcher,
};
pub use vapid::{KeyMaterialError, KeyStoreError, VapidKeys};
