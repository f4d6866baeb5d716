//! TLS termination for the local HTTPS listener.
//!
//! Browsers only expose the Push API on secure origins. `localhost` counts as
//! secure, but testing from another device on the LAN needs a real TLS
//! listener, which is what `LOCAL_TLS_ENABLED=true` turns on.

// Rust guideline compliant 2026-02

use anyhow::{Context, Result};
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::config::TlsFiles;

/// Pause after a failed `accept`, same as `axum::serve`.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Build a TLS acceptor from a PEM certificate chain and private key.
pub fn load_acceptor(files: &TlsFiles) -> Result<TlsAcceptor> {
    let cert_file = std::fs::File::open(&files.cert)
        .with_context(|| format!("open cert {}", files.cert.display()))?;
    let key_file = std::fs::File::open(&files.key)
        .with_context(|| format!("open key {}", files.key.display()))?;

    let mut cert_reader = std::io::BufReader::new(cert_file);
    let mut key_reader = std::io::BufReader::new(key_file);

    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("read certs")?;
    anyhow::ensure!(!certs.is_empty(), "no certificate found in {}", files.cert.display());
    let key = rustls_pemfile::private_key(&mut key_reader)
        .context("read private key")?
        .context("no private key found")?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("select TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("invalid cert or key")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Log a failed `accept` and wait before the next one. Persistent errors
/// such as EMFILE would otherwise spin the accept loop.
async fn pause_after_accept_error(err: &std::io::Error) {
    log::warn!("TLS listener accept failed: {err}");
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

/// Accept TLS connections on `listener` and serve `app` on each until
/// `shutdown` completes.
///
/// A failed handshake or broken connection only affects that connection.
pub async fn serve_tls<F>(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    app: Router,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    pause_after_accept_error(&e).await;
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        let acceptor = acceptor.clone();
        let service = TowerToHyperService::new(app.clone());
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    log::debug!("TLS handshake with {peer} failed: {e}");
                    return;
                }
            };

            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                log::debug!("Connection from {peer} ended with error: {e}");
            }
        });
    }

    Ok(())
}
