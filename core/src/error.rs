//! Error types for the Zenzap API client.
//!
//! # Design
//! Only failures that happen on *our* side of the wire are errors here.
//! A non-2xx answer from the API is a normal `ApiResponse` with
//! `success == false`; callers that prefer `?` can opt in through
//! `ApiResponse::error_for_status`, which produces `ZenzapError::Api`.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by `ZenzapClient` and its helpers.
#[derive(Debug, Error)]
pub enum ZenzapError {
    /// Missing or invalid credentials, base URL or timeout.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A parameter failed local validation; no request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A request body could not be encoded or a payload could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API answered with a non-2xx status.
    #[error("API error (HTTP {status}): {data}")]
    Api {
        status: u16,
        data: serde_json::Value,
    },

    /// A 2xx payload did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ZenzapError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ZenzapError::Validation(message.into())
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        ZenzapError::Configuration(message.into())
    }

    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ZenzapError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the request was rejected before reaching the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ZenzapError::Configuration(_) | ZenzapError::Validation(_) | ZenzapError::Serialization(_)
        )
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ZenzapError>;
