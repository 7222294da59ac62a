//! Signed request construction for every Zenzap endpoint.
//!
//! # Design
//! `RequestBuilder` holds the base URL, the bearer token and the signer, and
//! carries no mutable state between calls. Each `build_*` method validates its
//! input, serializes the body exactly once and signs either the path (GET) or
//! that serialized body (everything else). Nothing here touches the network.

use serde::Serialize;
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{Result, ZenzapError};
use crate::http::{HttpMethod, HttpRequest, APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE, SIGNATURE};
use crate::signature::Signer;
use crate::types::{CreateTask, CreateTopic, ListParams, MemberIds, SendMessage, UpdateTopic, MAX_EXTERNAL_ID};

/// Builds signed `HttpRequest` values without performing any I/O.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_url: String,
    api_key: String,
    signer: Signer,
}

impl RequestBuilder {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            base_url: config.normalized_base_url().to_string(),
            api_key: config.credentials.api_key.clone(),
            signer: Signer::new(config.credentials.secret.clone()),
        })
    }

    // --- members ---

    pub fn build_get_current_member(&self) -> HttpRequest {
        self.get("/v2/members/me".to_string())
    }

    pub fn build_list_members(&self, params: &ListParams) -> Result<HttpRequest> {
        params.validate()?;
        Ok(self.get(path_with_query("/v2/members", params)))
    }

    // --- topics ---

    pub fn build_create_topic(&self, input: &CreateTopic) -> Result<HttpRequest> {
        input.validate()?;
        self.with_body(HttpMethod::Post, "/v2/topics".to_string(), input)
    }

    pub fn build_get_topic(&self, topic_id: Uuid) -> HttpRequest {
        self.get(format!("/v2/topics/{topic_id}"))
    }

    /// Accepts the short form (resolvable by the creating bot only) or the
    /// full `botId:shortId` form.
    pub fn build_get_topic_by_external_id(&self, external_id: &str) -> Result<HttpRequest> {
        if external_id.trim().is_empty() {
            return Err(ZenzapError::validation("external id is required"));
        }
        if external_id.chars().count() > MAX_EXTERNAL_ID * 2 + 1 {
            return Err(ZenzapError::validation("external id is too long"));
        }
        Ok(self.get(format!("/v2/topics/external/{}", encode_segment(external_id))))
    }

    pub fn build_list_topics(&self, params: &ListParams) -> Result<HttpRequest> {
        params.validate()?;
        Ok(self.get(path_with_query("/v2/topics", params)))
    }

    pub fn build_update_topic(&self, topic_id: Uuid, input: &UpdateTopic) -> Result<HttpRequest> {
        input.validate()?;
        self.with_body(HttpMethod::Patch, format!("/v2/topics/{topic_id}"), input)
    }

    pub fn build_add_topic_members(&self, topic_id: Uuid, input: &MemberIds) -> Result<HttpRequest> {
        input.validate()?;
        self.with_body(HttpMethod::Post, format!("/v2/topics/{topic_id}/members"), input)
    }

    pub fn build_remove_topic_members(&self, topic_id: Uuid, input: &MemberIds) -> Result<HttpRequest> {
        input.validate()?;
        self.with_body(HttpMethod::Delete, format!("/v2/topics/{topic_id}/members"), input)
    }

    // --- messages and tasks ---

    pub fn build_send_message(&self, topic_id: Uuid, input: &SendMessage) -> Result<HttpRequest> {
        input.validate()?;
        self.with_body(HttpMethod::Post, format!("/v2/topics/{topic_id}/messages"), input)
    }

    pub fn build_create_task(&self, topic_id: Uuid, input: &CreateTask) -> Result<HttpRequest> {
        input.validate()?;
        self.with_body(HttpMethod::Post, format!("/v2/topics/{topic_id}/tasks"), input)
    }

    // --- helpers ---

    fn auth_headers(&self, signature: String) -> Vec<(String, String)> {
        vec![
            (AUTHORIZATION.to_string(), format!("Bearer {}", self.api_key)),
            (SIGNATURE.to_string(), signature),
        ]
    }

    fn get(&self, path: String) -> HttpRequest {
        let headers = self.auth_headers(self.signer.sign_path(&path));
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}{path}", self.base_url),
            path,
            headers,
            body: None,
        }
    }

    fn with_body<T: Serialize>(&self, method: HttpMethod, path: String, body: &T) -> Result<HttpRequest> {
        let body = serde_json::to_string(body)?;
        let mut headers = self.auth_headers(self.signer.sign_body(&body));
        headers.push((CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()));
        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            path,
            headers,
            body: Some(body),
        })
    }
}

/// Append `limit` and, when present, `cursor` as a form-urlencoded query.
fn path_with_query(path: &str, params: &ListParams) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("limit", &params.limit.to_string());
    if let Some(cursor) = &params.cursor {
        query.append_pair("cursor", cursor);
    }
    format!("{path}?{}", query.finish())
}

/// Percent-encode a single path segment, leaving only RFC 3986 unreserved
/// characters as-is.
fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len() * 3);
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
