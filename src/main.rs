//! Web push demo server binary.
//!
//! Loads (or creates) the VAPID keys, then serves the demo until Ctrl-C.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use std::sync::Arc;
use webpush_demo::{server, AppState, Args, Config, VapidKeys, WebPushDispatcher};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down...");
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = Config::from_args_and_env(Args::parse());
    log::info!("Starting webpush-demo v{}", env!("CARGO_PKG_VERSION"));

    let keys = VapidKeys::load_or_generate(&config.keys_file)
        .context("Failed to load VAPID keys")?;
    log::info!("VAPID public key: {}", keys.public_key_base64url());

    let dispatcher = Arc::new(WebPushDispatcher::new(config.vapid_subject.clone()));
    let state = AppState::new(keys, dispatcher);

    server::run(config, state, shutdown_signal()).await
}
