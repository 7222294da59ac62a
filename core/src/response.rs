//! Uniform result of an API call.
//!
//! # Design
//! `ApiResponse::from_http` is the only place that looks at status codes.
//! Every endpoint returns the same `success` / `status` / `data` triple, so
//! callers branch on expected API failures (401, 404, ...) without error
//! handling.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, ZenzapError};
use crate::http::HttpResponse;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub status: u16,
    /// Parsed JSON body; raw text as a JSON string when the body is not JSON;
    /// `null` when the body is empty.
    pub data: Value,
}

impl ApiResponse {
    pub fn from_http(response: HttpResponse) -> Self {
        Self::new(response.status, &response.body)
    }

    pub fn new(status: u16, body: &str) -> Self {
        let data = match serde_json::from_str::<Value>(body) {
            Ok(value) => value,
            Err(_) => {
                let text = body.trim();
                if text.is_empty() {
                    Value::Null
                } else {
                    Value::String(text.to_string())
                }
            }
        };
        Self {
            success: (200..=299).contains(&status),
            status,
            data,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Error text from an `{"error": ..}` or `{"message": ..}` body, or the raw
    /// text body.
    pub fn error_message(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        match &self.data {
            Value::Object(map) => map
                .get("error")
                .or_else(|| map.get("message"))
                .and_then(Value::as_str),
            Value::String(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// String field of an object payload, e.g. `response.str_field("id")`.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Decode `data` into a typed model.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Turn a non-2xx response into `ZenzapError::Api`.
    pub fn error_for_status(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ZenzapError::Api {
                status: self.status,
                data: self.data,
            })
        }
    }
}
