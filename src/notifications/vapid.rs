//! VAPID key generation and persistence for Web Push (RFC 8292).
//!
//! The server owns exactly one P-256 ECDSA keypair. It is generated on first
//! start, written to a JSON key file and reused on every later start.

// Rust guideline compliant 2026-02

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::io::Write;
use std::{fmt, fs, io, path::Path, path::PathBuf};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of an uncompressed SEC1 P-256 point (`0x04 || x || y`).
const PUBLIC_KEY_LEN: usize = 65;
/// Length of a raw P-256 private scalar.
const PRIVATE_KEY_LEN: usize = 32;

/// Problems with the key material itself, independent of where it came from.
#[derive(Debug, Error)]
pub enum KeyMaterialError {
    /// A key is not valid base64url.
    #[error("invalid base64url for VAPID {which} key: {source}")]
    Base64 {
        /// `"public"` or `"private"`.
        which: &'static str,
        /// Decoder error.
        #[source]
        source: base64::DecodeError,
    },
    /// The public key is not a 65-byte uncompressed point.
    #[error("VAPID public key must be 65-byte uncompressed P-256 point, got {0} bytes")]
    PublicKeyFormat(usize),
    /// The private key is not a 32-byte scalar.
    #[error("VAPID private key must be 32-byte P-256 scalar, got {0} bytes")]
    PrivateKeyLength(usize),
    /// The private scalar is zero or not below the curve order.
    #[error("VAPID private key is not a valid P-256 scalar")]
    InvalidScalar,
    /// The public key does not belong to the private key.
    #[error("VAPID public key does not match private key")]
    Mismatch,
}

/// Errors from [`VapidKeys::load_or_generate`].
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The key file exists but does not hold a usable keypair.
    #[error("corrupt VAPID key file {}: {reason}", path.display())]
    CorruptKeyFile {
        /// Key file location.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
    /// The key file could not be read or written.
    #[error("VAPID key file I/O error at {}: {source}", path.display())]
    Io {
        /// Key file location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// VAPID keypair for web push authentication.
///
/// On disk this is `{"publicKey": "...", "privateKey": "..."}`, the same
/// shape the browser-side tooling uses. The private key is the raw 32-byte
/// scalar (base64url) because `web-push`'s `VapidSignatureBuilder::from_base64()`
/// expects exactly that. The public key is the uncompressed SEC1 point.
#[derive(PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeys {
    /// Uncompressed public key bytes (base64url, 65 bytes decoded).
    #[zeroize(skip)]
    public_key: String,
    /// Raw 32-byte P-256 private key scalar (base64url).
    private_key: String,
}

impl fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl VapidKeys {
    /// Generate a fresh VAPID keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        // SEC1 uncompressed public key (65 bytes: 0x04 || x || y)
        let public_bytes = verifying_key.to_encoded_point(false);
        let public_key = BASE64URL.encode(public_bytes.as_bytes());

        let private_key = BASE64URL.encode(signing_key.to_bytes().as_slice());

        Self {
            public_key,
            private_key,
        }
    }

    /// Load the keypair stored at `path`, or generate one and store it there.
    ///
    /// Writes the file at most once, on first run. An existing file is never
    /// overwritten, even when it turns out to be unusable.
    pub fn load_or_generate(path: &Path) -> Result<Self, KeyStoreError> {
        if path.exists() {
            log::info!("Reading VAPID keys from {}", path.display());
            let content = fs::read_to_string(path).map_err(|source| KeyStoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            return Self::parse_key_file(&content).map_err(|reason| {
                KeyStoreError::CorruptKeyFile {
                    path: path.to_path_buf(),
                    reason,
                }
            });
        }

        log::info!("Generating new VAPID keys at {}", path.display());
        let keys = Self::generate();
        keys.write_key_file(path).map_err(|source| KeyStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(keys)
    }

    fn parse_key_file(content: &str) -> Result<Self, String> {
        let stored: Self = serde_json::from_str(content).map_err(|e| e.to_string())?;
        Self::from_base64url(&stored.public_key, &stored.private_key).map_err(|e| e.to_string())
    }

    /// Create the key file owner-only from the start. `create_new` refuses
    /// an existing path, including a symlink, instead of writing through it.
    fn write_key_file(&self, path: &Path) -> io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path)?;
        let mut json = serde_json::to_string(self)?;
        let written = file.write_all(json.as_bytes()).and_then(|()| file.sync_all());
        json.zeroize();
        written
    }

    /// Reconstruct from base64url-encoded strings.
    ///
    /// Validates the public key format, the private key scalar, and that the
    /// two belong together.
    pub fn from_base64url(public_key_b64: &str, private_key_b64: &str) -> Result<Self, KeyMaterialError> {
        let pub_bytes = BASE64URL
            .decode(public_key_b64)
            .map_err(|source| KeyMaterialError::Base64 { which: "public", source })?;
        if pub_bytes.len() != PUBLIC_KEY_LEN || pub_bytes[0] != 0x04 {
            return Err(KeyMaterialError::PublicKeyFormat(pub_bytes.len()));
        }

        let mut priv_bytes = BASE64URL
            .decode(private_key_b64)
            .map_err(|source| KeyMaterialError::Base64 { which: "private", source })?;
        if priv_bytes.len() != PRIVATE_KEY_LEN {
            let len = priv_bytes.len();
            priv_bytes.zeroize();
            return Err(KeyMaterialError::PrivateKeyLength(len));
        }
        let signing_key = SigningKey::from_bytes(priv_bytes.as_slice().into());
        priv_bytes.zeroize();
        let signing_key = signing_key.map_err(|_| KeyMaterialError::InvalidScalar)?;

        let derived = signing_key.verifying_key().to_encoded_point(false);
        if derived.as_bytes() != pub_bytes.as_slice() {
            return Err(KeyMaterialError::Mismatch);
        }

        Ok(Self {
            public_key: public_key_b64.to_string(),
            private_key: private_key_b64.to_string(),
        })
    }

    /// Base64url-encoded uncompressed public key (65 bytes decoded).
    ///
    /// This is sent to browsers as the VAPID `applicationServerKey`.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key
    }

    /// Base64url-encoded raw 32-byte private key scalar.
    pub fn private_key_base64url(&self) -> &str {
        &self.private_key
    }

    /// Uncompressed public key bytes (65 bytes).
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, KeyMaterialError> {
        BASE64URL
            .decode(&self.public_key)
            .map_err(|source| KeyMaterialError::Base64 { which: "public", source })
    }
}
