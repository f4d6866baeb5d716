//! Startup configuration.
//!
//! Command-line arguments and the `LOCAL_TLS_ENABLED` environment flag are
//! resolved once into a [`Config`], which is then handed by value to the
//! listener. Nothing reads the environment after startup.

// Rust guideline compliant 2026-02

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::notifications::push::DEFAULT_SUBJECT;

/// Port the demo listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 4200;
/// VAPID key file, relative to the working directory.
pub const DEFAULT_KEYS_FILE: &str = "vapid_keys.json";
/// Document root for static assets.
pub const DEFAULT_PUBLIC_DIR: &str = "public";
/// Certificate chain used when TLS is enabled.
pub const DEFAULT_TLS_CERT: &str = "localhost.pem";
/// Private key used when TLS is enabled.
pub const DEFAULT_TLS_KEY: &str = "localhost-key.pem";
/// Environment variable that switches the listener to TLS.
pub const TLS_ENV_VAR: &str = "LOCAL_TLS_ENABLED";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "webpush-demo")]
#[command(version)]
#[command(about = "Web push notification demo server")]
pub struct Args {
    /// Address to bind.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
    /// Port to listen on.
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// VAPID key file (created on first start).
    #[arg(long, default_value = DEFAULT_KEYS_FILE)]
    pub keys_file: PathBuf,
    /// Directory static assets are served from.
    #[arg(long, default_value = DEFAULT_PUBLIC_DIR)]
    pub public_dir: PathBuf,
    /// TLS certificate chain (PEM), used when LOCAL_TLS_ENABLED=true.
    #[arg(long, default_value = DEFAULT_TLS_CERT)]
    pub cert: PathBuf,
    /// TLS private key (PEM), used when LOCAL_TLS_ENABLED=true.
    #[arg(long, default_value = DEFAULT_TLS_KEY)]
    pub key: PathBuf,
    /// VAPID `sub` claim (a mailto: or https: URL identifying the sender).
    #[arg(long, default_value = DEFAULT_SUBJECT)]
    pub subject: String,
}

/// Certificate and key files for the TLS listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsFiles {
    /// PEM certificate chain.
    pub cert: PathBuf,
    /// PEM private key.
    pub key: PathBuf,
}

/// Resolved server configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Socket address to listen on.
    pub listen_addr: SocketAddr,
    /// VAPID key file.
    pub keys_file: PathBuf,
    /// Static asset root.
    pub public_dir: PathBuf,
    /// TLS files when the listener terminates TLS, `None` for plain HTTP.
    pub tls: Option<TlsFiles>,
    /// VAPID `sub` claim.
    pub vapid_subject: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            keys_file: PathBuf::from(DEFAULT_KEYS_FILE),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            tls: None,
            vapid_subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

impl Config {
    /// Resolve configuration from parsed arguments and the process environment.
    pub fn from_args_and_env(args: Args) -> Self {
        let tls_flag = std::env::var(TLS_ENV_VAR).ok();
        Self::resolve(args, tls_flag.as_deref())
    }

    /// Resolve configuration from parsed arguments and the raw value of
    /// `LOCAL_TLS_ENABLED`.
    ///
    /// Only the exact string `"true"` enables TLS.
    pub fn resolve(args: Args, tls_flag: Option<&str>) -> Self {
        let tls = (tls_flag == Some("true")).then(|| TlsFiles {
            cert: args.cert,
            key: args.key,
        });

        Self {
            listen_addr: SocketAddr::new(args.host, args.port),
            keys_file: args.keys_file,
            public_dir: args.public_dir,
            tls,
            vapid_subject: args.subject,
        }
    }

    /// `"https"` when TLS is on, `"http"` otherwise.
    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() {
            "https"
        } else {
            "http"
        }
    }

    /// URL to open in a browser on this machine.
    pub fn local_url(&self) -> String {
        format!("{}://localhost:{}", self.scheme(), self.listen_addr.port())
    }
}
