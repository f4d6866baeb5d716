//! Web push message sending and subscription holding.
//!
//! Holds the single registered browser push subscription and sends
//! encrypted web push messages (RFC 8030) using VAPID authentication
//! (RFC 8292) and aes128gcm payload encryption (RFC 8291).

// Rust guideline compliant 2026-02

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushError, WebPushMessageBuilder,
};

use super::vapid::VapidKeys;

/// Default time-to-live the push service should keep an undelivered message.
pub const DEFAULT_TTL_SECS: u32 = 86400;

/// Default VAPID `sub` claim.
pub const DEFAULT_SUBJECT: &str = "mailto:your-email@example.com";

/// A browser's push subscription, as posted by the page after
/// `pushManager.subscribe()`.
///
/// Kept as the JSON the browser sent. Browsers send
/// `{endpoint, expirationTime, keys: {p256dh, auth}}`, but nothing is checked
/// on registration; the dispatcher interprets it when a push is sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushSubscription(serde_json::Value);

impl PushSubscription {
    /// Wrap a subscription JSON document.
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The raw JSON document.
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Whether the document counts as a registration at all.
    ///
    /// Pages that post `null` (or another falsy JSON scalar) have not
    /// subscribed; holding one of those is the same as holding nothing.
    pub fn is_present(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null | serde_json::Value::Bool(false) => false,
            serde_json::Value::Number(n) => n.as_f64() != Some(0.0),
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Push service endpoint, if the document has one. Used for logging.
    pub fn endpoint(&self) -> Option<&str> {
        self.0.get("endpoint").and_then(serde_json::Value::as_str)
    }

    /// Interpret the document as a Web Push subscription.
    pub fn subscription_info(&self) -> Result<SubscriptionInfo, DeliveryError> {
        SubscriptionInfo::deserialize(&self.0).map_err(DeliveryError::InvalidSubscription)
    }
}

impl From<serde_json::Value> for PushSubscription {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Holds the most recently registered subscription.
///
/// There is one slot for the whole process. Registering replaces whatever
/// was there before; there is no way to remove it short of a restart.
#[derive(Debug, Default)]
pub struct SubscriptionSlot {
    current: Mutex<Option<PushSubscription>>,
}

impl SubscriptionSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `subscription`, replacing any previous one. Last writer wins.
    pub fn set(&self, subscription: PushSubscription) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.as_ref() {
            log::debug!(
                "[WebPush] Replacing subscription for {}",
                previous.endpoint().unwrap_or("<no endpoint>")
            );
        }
        *current = Some(subscription);
    }

    /// The current subscription, if one has been registered.
    pub fn get(&self) -> Option<PushSubscription> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Notification content the service worker turns into a system notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub body: String,
}

impl NotificationPayload {
    /// Build a payload.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// The fixed payload sent by `POST /notification`.
    pub fn server_demo() -> Self {
        Self::new(
            "Server Notification",
            "This notification was sent from the server!",
        )
    }
}

/// Why a push could not be delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The stored subscription is not `{endpoint, keys: {p256dh, auth}}`.
    #[error("subscription is not a valid push subscription: {0}")]
    InvalidSubscription(#[source] serde_json::Error),
    /// The payload could not be serialized.
    #[error("failed to serialize notification payload: {0}")]
    Payload(#[source] serde_json::Error),
    /// VAPID signing or payload encryption failed.
    #[error("failed to build web push message: {0}")]
    Encoding(#[from] WebPushError),
    /// The push service could not be reached.
    #[error("web push HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The push service answered with a non-2xx status.
    #[error("web push send failed (HTTP {status}): {detail}")]
    Rejected {
        /// HTTP status from the push service.
        status: u16,
        /// Response body.
        detail: String,
    },
}

impl DeliveryError {
    /// HTTP status returned by the push service, when it returned one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Sends one notification to one subscription.
///
/// Implementations make a single attempt; retrying is the caller's call.
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    /// Deliver `payload` to `subscription`, signed with `keys`.
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        keys: &VapidKeys,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError>;
}

/// [`PushDispatcher`] that talks to real browser push services.
///
/// Uses the `web-push` crate for RFC 8291 payload encryption and VAPID
/// signing, then sends the HTTP request via reqwest. One `reqwest::Client`
/// is shared across deliveries for connection pooling.
#[derive(Debug, Clone)]
pub struct WebPushDispatcher {
    client: reqwest::Client,
    subject: String,
    ttl: u32,
}

impl WebPushDispatcher {
    /// Dispatcher with a default client, the given VAPID subject and a 24h TTL.
    pub fn new(subject: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), subject)
    }

    /// Dispatcher using an existing client.
    pub fn with_client(client: reqwest::Client, subject: impl Into<String>) -> Self {
        Self {
            client,
            subject: subject.into(),
            ttl: DEFAULT_TTL_SECS,
        }
    }

    /// Override the message TTL.
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl PushDispatcher for WebPushDispatcher {
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        keys: &VapidKeys,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        let sub_info = subscription.subscription_info()?;
        let body = serde_json::to_vec(payload).map_err(DeliveryError::Payload)?;

        let mut sig_builder =
            VapidSignatureBuilder::from_base64(keys.private_key_base64url(), &sub_info)?;
        sig_builder.add_claim("sub", self.subject.as_str());
        let sig = sig_builder.build()?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, &body);
        builder.set_vapid_signature(sig);
        builder.set_ttl(self.ttl);

        let message = builder.build()?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }

        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }

        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");

            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }

            request = request.body(push_payload.content);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            log::debug!("[WebPush] Delivered to {} ({})", sub_info.endpoint, status);
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
    use p256::elliptic_curve::rand_core::{OsRng, RngCore};
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A subscription whose keys are a real browser-style P-256 key and auth secret.
    fn browser_subscription(endpoint: &str) -> PushSubscription {
        let ua_key = p256::SecretKey::random(&mut OsRng);
        let p256dh = BASE64URL.encode(ua_key.public_key().to_encoded_point(false).as_bytes());
        let mut auth = [0u8; 16];
        OsRng.fill_bytes(&mut auth);

        PushSubscription::new(json!({
            "endpoint": endpoint,
            "expirationTime": null,
            "keys": { "p256dh": p256dh, "auth": BASE64URL.encode(auth) }
        }))
    }

    #[test]
    fn test_slot_starts_empty() {
        let slot = SubscriptionSlot::new();
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_slot_last_write_wins() {
        let slot = SubscriptionSlot::new();
        let a = PushSubscription::new(json!({ "endpoint": "https://push.example.com/a" }));
        let b = PushSubscription::new(json!({ "endpoint": "https://push.example.com/b" }));

        slot.set(a);
        slot.set(b.clone());

        assert_eq!(slot.get(), Some(b));
    }

    #[test]
    fn test_slot_accepts_any_shape() {
        let slot = SubscriptionSlot::new();
        slot.set(PushSubscription::new(json!("not even an object")));
        assert!(slot.get().is_some());
    }

    #[test]
    fn test_falsy_documents_are_not_present() {
        for value in [json!(null), json!(false), json!(0), json!(""), json!(0.0)] {
            assert!(!PushSubscription::new(value.clone()).is_present(), "{value}");
        }
        for value in [json!({}), json!([]), json!(true), json!(1), json!("x")] {
            assert!(PushSubscription::new(value.clone()).is_present(), "{value}");
        }
    }

    #[test]
    fn test_subscription_info_from_browser_json() {
        let sub = PushSubscription::new(json!({
            "endpoint": "https://push.example.com/1",
            "expirationTime": null,
            "keys": { "p256dh": "key1", "auth": "auth1" }
        }));

        let info = sub.subscription_info().expect("valid shape");
        assert_eq!(info.endpoint, "https://push.example.com/1");
        assert_eq!(info.keys.p256dh, "key1");
        assert_eq!(info.keys.auth, "auth1");
        assert_eq!(sub.endpoint(), Some("https://push.example.com/1"));
    }

    #[test]
    fn test_subscription_info_rejects_missing_keys() {
        let sub = PushSubscription::new(json!({ "endpoint": "https://push.example.com/1" }));
        assert!(matches!(
            sub.subscription_info(),
            Err(DeliveryError::InvalidSubscription(_))
        ));
    }

    #[test]
    fn test_server_demo_payload_json() {
        let json = serde_json::to_value(NotificationPayload::server_demo()).expect("serialize");
        assert_eq!(
            json,
            json!({
                "title": "Server Notification",
                "body": "This notification was sent from the server!"
            })
        );
    }

    #[tokio::test]
    async fn test_deliver_sends_encrypted_vapid_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push/abc"))
            .and(header("TTL", "86400"))
            .and(header("Content-Encoding", "aes128gcm"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let keys = VapidKeys::generate();
        let sub = browser_subscription(&format!("{}/push/abc", server.uri()));
        let dispatcher = WebPushDispatcher::new(DEFAULT_SUBJECT);

        dispatcher
            .deliver(&sub, &keys, &NotificationPayload::server_demo())
            .await
            .expect("delivery should succeed");

        let requests = server.received_requests().await.expect("recording enabled");
        let plaintext = serde_json::to_vec(&NotificationPayload::server_demo()).expect("json");
        assert!(
            requests[0].body.len() > plaintext.len(),
            "body should be ciphertext with aes128gcm header, not the plaintext"
        );
        assert!(!requests[0]
            .body
            .windows(plaintext.len())
            .any(|w| w == plaintext.as_slice()));
    }

    #[tokio::test]
    async fn test_deliver_uses_configured_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("TTL", "60"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let keys = VapidKeys::generate();
        let sub = browser_subscription(&format!("{}/push/ttl", server.uri()));
        let dispatcher = WebPushDispatcher::new(DEFAULT_SUBJECT).with_ttl(60);

        dispatcher
            .deliver(&sub, &keys, &NotificationPayload::new("t", "b"))
            .await
            .expect("delivery should succeed");
    }

    #[tokio::test]
    async fn test_deliver_reports_gone_subscription() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410).set_body_string("push subscription has unsubscribed or expired"))
            .expect(1)
            .mount(&server)
            .await;

        let keys = VapidKeys::generate();
        let sub = browser_subscription(&format!("{}/push/gone", server.uri()));
        let dispatcher = WebPushDispatcher::new(DEFAULT_SUBJECT);

        let err = dispatcher
            .deliver(&sub, &keys, &NotificationPayload::server_demo())
            .await
            .expect_err("410 should fail");

        assert_eq!(err.status(), Some(410));
        match err {
            DeliveryError::Rejected { detail, .. } => {
                assert!(detail.contains("expired"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deliver_rejects_malformed_subscription_without_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let keys = VapidKeys::generate();
        let sub = PushSubscription::new(json!({ "endpoint": format!("{}/push/x", server.uri()) }));
        let dispatcher = WebPushDispatcher::new(DEFAULT_SUBJECT);

        let err = dispatcher
            .deliver(&sub, &keys, &NotificationPayload::server_demo())
            .await
            .expect_err("missing keys should fail");
        assert!(matches!(err, DeliveryError::InvalidSubscription(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_deliver_reports_unreachable_push_service() {
        // Bind then drop a listener so nothing is listening on the port.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let keys = VapidKeys::generate();
        let sub = browser_subscription(&format!("http://{addr}/push/down"));
        let dispatcher = WebPushDispatcher::new(DEFAULT_SUBJECT);

        let err = dispatcher
            .deliver(&sub, &keys, &NotificationPayload::server_demo())
            .await
            .expect_err("connection refused should fail");
        assert!(matches!(err, DeliveryError::Transport(_)));
    }
}
