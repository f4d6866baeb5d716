//! HTTP endpoint layer.
//!
//! Exposes the push demo operations over HTTP:
//!
//! | Route | Method | Purpose |
//! |---|---|---|
//! | `/` | GET | demo page |
//! | `/vapidPublicKey` | GET | server VAPID public key (text) |
//! | `/register` | POST | store the browser's push subscription |
//! | `/notification` | POST | push the demo notification to it |
//!
//! Anything else is looked up under the static document root.
//!
//! # Modules
//!
//! - [`error`] - handler errors and their JSON shape
//! - [`tls`] - TLS listener for `LOCAL_TLS_ENABLED`

// Rust guideline compliant 2026-02

pub mod error;
mod handlers;
pub mod tls;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::notifications::{PushDispatcher, SubscriptionSlot, VapidKeys};

pub use error::ApiError;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server VAPID keypair, fixed for the process lifetime.
    pub keys: Arc<VapidKeys>,
    /// The single registered subscription.
    pub subscription: Arc<SubscriptionSlot>,
    /// How notifications reach the push service.
    pub dispatcher: Arc<dyn PushDispatcher>,
}

impl AppState {
    /// State with an empty subscription slot.
    pub fn new(keys: VapidKeys, dispatcher: Arc<dyn PushDispatcher>) -> Self {
        Self {
            keys: Arc::new(keys),
            subscription: Arc::new(SubscriptionSlot::new()),
            dispatcher,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("keys", &self.keys)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

/// Build the application router. Unknown paths, and known paths requested
/// with another method, are served from `public_dir`.
pub fn router(state: AppState, public_dir: &Path) -> Router {
    let static_files = ServeDir::new(public_dir);

    Router::new()
        .route(
            "/",
            get(handlers::index).fallback_service(static_files.clone()),
        )
        .route(
            "/vapidPublicKey",
            get(handlers::vapid_public_key).fallback_service(static_files.clone()),
        )
        .route(
            "/register",
            post(handlers::register).fallback_service(static_files.clone()),
        )
        .route(
            "/notification",
            post(handlers::notification).fallback_service(static_files.clone()),
        )
        .fallback_service(static_files)
        .with_state(state)
}

/// Bind the configured address and serve until `shutdown` completes.
///
/// Serves HTTPS when `config.tls` is set, plain HTTP otherwise.
pub async fn run<F>(config: Config, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let acceptor = config.tls.as_ref().map(tls::load_acceptor).transpose()?;
    let app = router(state, &config.public_dir);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("bind {}", config.listen_addr))?;

    log::info!("Server running at {}", config.local_url());
    log::info!(
        "Static files will be served from the '{}' directory",
        config.public_dir.display()
    );
    log::info!("LOCAL_TLS_ENABLED: {}", config.tls.is_some());

    match acceptor {
        Some(acceptor) => tls::serve_tls(listener, acceptor, app, shutdown).await,
        None => axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed"),
    }
}
