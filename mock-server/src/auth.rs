//! Bearer token + `X-Signature` verification.
//!
//! GET requests are verified against the literal path and query of the
//! request target; every other method against the raw body bytes.

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::{header::AUTHORIZATION, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use crate::{error::ApiError, Db};

pub const SIGNATURE_HEADER: &str = "x-signature";
const MAX_BODY: usize = 1024 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// The bot that signed the current request.
#[derive(Clone, Copy, Debug)]
pub struct Caller {
    pub id: Uuid,
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn signature(secret: &str, payload: &[u8]) -> String {
    let mac = keyed(secret, payload).expect("HMAC accepts any key length");
    hex::encode(mac.finalize().into_bytes())
}

fn keyed(secret: &str, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(mac)
}

fn verify(secret: &str, payload: &[u8], signature: &str) -> bool {
    let (Ok(expected), Some(mac)) = (hex::decode(signature), keyed(secret, payload)) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

pub async fn authenticate(State(db): State<Db>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(bytes) = body::to_bytes(body, MAX_BODY).await else {
        return ApiError::BadRequest("request body too large".to_string()).into_response();
    };

    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let bot = match token {
        Some(token) => db.read().await.bot_by_key(token).cloned(),
        None => None,
    };
    let Some(bot) = bot else {
        debug!(uri = %parts.uri, "rejected request with unknown api key");
        return ApiError::Unauthorized("invalid api key").into_response();
    };

    let payload: &[u8] = if parts.method == Method::GET {
        parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| parts.uri.path())
            .as_bytes()
    } else {
        &bytes[..]
    };
    let signed = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|sig| verify(&bot.secret, payload, sig));
    if !signed {
        debug!(uri = %parts.uri, bot = %bot.id, "rejected request with invalid signature");
        return ApiError::Unauthorized("invalid signature").into_response();
    }

    let mut request = Request::from_parts(parts, Body::from(bytes));
    request.extensions_mut().insert(Caller { id: bot.id });
    next.run(request).await
}
