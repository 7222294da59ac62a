//! HMAC-SHA256 request signing.
//!
//! GET requests sign the request path including its literal query string;
//! requests with a body sign the exact body bytes that go on the wire.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `payload` keyed with `secret`.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac = keyed(secret);
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

// HMAC hashes keys longer than the block size and pads shorter ones, so
// `new_from_slice` has no failing input.
fn keyed(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts keys of any length")
}

/// Owns the signing secret for the lifetime of a client.
#[derive(Clone)]
pub struct Signer {
    secret: String,
}

impl Signer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signature for a GET request: `path` must include the query string.
    pub fn sign_path(&self, path: &str) -> String {
        sign(path.as_bytes(), &self.secret)
    }

    /// Signature for a request body, over the exact bytes sent.
    pub fn sign_body(&self, body: &str) -> String {
        sign(body.as_bytes(), &self.secret)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("secret", &"<redacted>").finish()
    }
}
