//! Request payloads and response models for the Zenzap API.
//!
//! # Design
//! Request payloads serialize to compact camelCase JSON with optional fields
//! omitted (never `null`), in field declaration order. The serialized string
//! is what gets signed, so the layout of these structs is part of the wire
//! contract.
//!
//! Response models are conveniences decoded from `ApiResponse::data`; unknown
//! fields are ignored and most fields are optional because payload shapes
//! differ between endpoints.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, ZenzapError};

pub const MAX_TOPIC_NAME: usize = 64;
pub const MAX_TEXT: usize = 10_000;
pub const MAX_TASK_TITLE: usize = 256;
pub const MAX_EXTERNAL_ID: usize = 100;
pub const MAX_MEMBERS_PER_REQUEST: usize = 5;
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 100;

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ZenzapError::validation(format!("{field} is required")));
    }
    limit_text(field, value, max)
}

fn limit_text(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(ZenzapError::validation(format!(
            "{field} must be at most {max} characters, got {len}"
        )));
    }
    Ok(())
}

fn optional_external_id(value: Option<&str>) -> Result<()> {
    match value {
        Some(id) => require_text("externalId", id, MAX_EXTERNAL_ID),
        None => Ok(()),
    }
}

fn member_batch(member_ids: &[Uuid]) -> Result<()> {
    if member_ids.is_empty() {
        return Err(ZenzapError::validation("at least one member id is required"));
    }
    if member_ids.len() > MAX_MEMBERS_PER_REQUEST {
        return Err(ZenzapError::validation(format!(
            "at most {MAX_MEMBERS_PER_REQUEST} member ids per request, got {}",
            member_ids.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Payload for creating a topic. The calling bot is added by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopic {
    pub name: String,
    pub members: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl CreateTopic {
    pub fn new(name: impl Into<String>, members: Vec<Uuid>) -> Self {
        Self {
            name: name.into(),
            members,
            description: None,
            external_id: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name, MAX_TOPIC_NAME)?;
        if self.members.is_empty() {
            return Err(ZenzapError::validation("at least one member is required"));
        }
        if let Some(description) = &self.description {
            limit_text("description", description, MAX_TEXT)?;
        }
        optional_external_id(self.external_id.as_deref())
    }
}

/// Partial topic update; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTopic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateTopic {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_none() && self.description.is_none() {
            return Err(ZenzapError::validation("update requires a name or a description"));
        }
        if let Some(name) = &self.name {
            require_text("name", name, MAX_TOPIC_NAME)?;
        }
        if let Some(description) = &self.description {
            limit_text("description", description, MAX_TEXT)?;
        }
        Ok(())
    }
}

/// Body of the add/remove topic member calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberIds {
    pub member_ids: Vec<Uuid>,
}

impl MemberIds {
    pub fn new(member_ids: Vec<Uuid>) -> Self {
        Self { member_ids }
    }

    pub fn validate(&self) -> Result<()> {
        member_batch(&self.member_ids)
    }
}

/// Payload for posting a message to a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl SendMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            external_id: None,
        }
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_text("text", &self.text, MAX_TEXT)?;
        optional_external_id(self.external_id.as_deref())
    }
}

/// Payload for creating a task in a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Uuid>,
    /// Unix timestamp in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl CreateTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            assignee: None,
            due_date: None,
            external_id: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn assignee(mut self, assignee: Uuid) -> Self {
        self.assignee = Some(assignee);
        self
    }

    pub fn due_date(mut self, epoch_millis: i64) -> Self {
        self.due_date = Some(epoch_millis);
        self
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title, MAX_TASK_TITLE)?;
        if let Some(description) = &self.description {
            limit_text("description", description, MAX_TEXT)?;
        }
        if matches!(self.due_date, Some(ms) if ms < 0) {
            return Err(ZenzapError::validation("dueDate must be a non-negative epoch in milliseconds"));
        }
        optional_external_id(self.external_id.as_deref())
    }
}

/// `limit` / `cursor` parameters of the list endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub limit: u32,
    pub cursor: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            cursor: None,
        }
    }
}

impl ListParams {
    pub fn new(limit: u32) -> Self {
        Self { limit, cursor: None }
    }

    /// Continue from a cursor returned by a previous page, passed back verbatim.
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            return Err(ZenzapError::validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {}",
                self.limit
            )));
        }
        if matches!(&self.cursor, Some(c) if c.is_empty()) {
            return Err(ZenzapError::validation("cursor must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// External ids
// ---------------------------------------------------------------------------

/// An external identifier as accepted by the topic lookup endpoint.
///
/// The short form only resolves for the bot that created the entity; the
/// full `botId:shortId` form resolves for any bot that can see it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExternalId {
    Short(String),
    Full { bot_id: String, short_id: String },
}

impl ExternalId {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((bot_id, short_id)) if !bot_id.is_empty() && !short_id.is_empty() => ExternalId::Full {
                bot_id: bot_id.to_string(),
                short_id: short_id.to_string(),
            },
            _ => ExternalId::Short(raw.to_string()),
        }
    }

    pub fn full(bot_id: impl fmt::Display, short_id: impl Into<String>) -> Self {
        ExternalId::Full {
            bot_id: bot_id.to_string(),
            short_id: short_id.into(),
        }
    }

    pub fn short_id(&self) -> &str {
        match self {
            ExternalId::Short(short_id) | ExternalId::Full { short_id, .. } => short_id,
        }
    }

    pub fn bot_id(&self) -> Option<&str> {
        match self {
            ExternalId::Short(_) => None,
            ExternalId::Full { bot_id, .. } => Some(bot_id),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, ExternalId::Full { .. })
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalId::Short(short_id) => f.write_str(short_id),
            ExternalId::Full { bot_id, short_id } => write!(f, "{bot_id}:{short_id}"),
        }
    }
}

impl From<&str> for ExternalId {
    fn from(raw: &str) -> Self {
        ExternalId::parse(raw)
    }
}

// ---------------------------------------------------------------------------
// Response models
// ---------------------------------------------------------------------------

/// An organization member; bots are members too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<Uuid>,
    /// Returned in full `botId:shortId` form.
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Topic {
    pub fn parsed_external_id(&self) -> Option<ExternalId> {
        self.external_id.as_deref().map(ExternalId::parse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub topic_id: Uuid,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque continuation token; `None` on the last page.
    pub next_cursor: Option<String>,
}

impl<T: DeserializeOwned> Page<T> {
    /// Decode a list payload.
    ///
    /// Items are read from `key` (e.g. `"topics"`), falling back to `"data"`,
    /// or from a bare array. The cursor is read from `nextCursor`, falling back
    /// to `cursor`; an empty string counts as absent.
    pub fn from_value(data: &Value, key: &str) -> Result<Self> {
        let (items, next_cursor) = match data {
            Value::Array(items) => (items.clone(), None),
            Value::Object(map) => {
                let items = match map.get(key).or_else(|| map.get("data")) {
                    Some(Value::Array(items)) => items.clone(),
                    Some(other) => {
                        return Err(ZenzapError::InvalidResponse(format!(
                            "expected `{key}` to be an array, got {other}"
                        )))
                    }
                    None => Vec::new(),
                };
                let cursor = map
                    .get("nextCursor")
                    .filter(|v| !v.is_null())
                    .or_else(|| map.get("cursor"))
                    .and_then(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string);
                (items, cursor)
            }
            other => {
                return Err(ZenzapError::InvalidResponse(format!(
                    "expected a list payload, got {other}"
                )))
            }
        };

        Ok(Page {
            items: serde_json::from_value(Value::Array(items))?,
            next_cursor,
        })
    }
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}
