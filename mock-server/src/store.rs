//! In-memory state of the emulated API.
//!
//! DTOs here are defined independently of `zenzap-core`; the live
//! integration tests catch any drift between the two.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;
const MAX_NAME: usize = 64;
const MAX_TEXT: usize = 10_000;
const MAX_TITLE: usize = 256;
const MAX_EXTERNAL_ID: usize = 100;
const MAX_MEMBER_BATCH: usize = 5;

/// A bot account: the identity behind an API key.
#[derive(Clone, Debug)]
pub struct Bot {
    pub id: Uuid,
    pub name: String,
    pub api_key: String,
    pub secret: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub members: Vec<Uuid>,
    /// Full `botId:shortId` form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub created_at: i64,
    #[serde(skip)]
    pub created_by: Uuid,
    #[serde(skip)]
    pub short_external_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub created_at: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub created_at: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopic {
    pub name: String,
    pub members: Vec<Uuid>,
    pub description: Option<String>,
    pub external_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTopic {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberIds {
    pub member_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub text: String,
    pub external_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<Uuid>,
    pub due_date: Option<i64>,
    pub external_id: Option<String>,
}

/// One page of a list response, serialized under `key`.
#[derive(Debug)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Seed data: bot accounts plus human members.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub bots: Vec<Bot>,
    pub people: Vec<Member>,
}

impl Default for Fixture {
    fn default() -> Self {
        let bot = |n: u128, name: &str, key: &str| Bot {
            id: Uuid::from_u128(0xb0700000_0000_4000_8000_000000000000 + n),
            name: name.to_string(),
            api_key: format!("{key}-key"),
            secret: format!("{key}-secret"),
        };
        let person = |n: u128, name: &str| Member {
            id: Uuid::from_u128(0x9e0b1e00_0000_4000_8000_000000000000 + n),
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            status: "active".to_string(),
            kind: "user".to_string(),
        };

        Self {
            bots: vec![bot(1, "Integration Bot", "bot-a"), bot(2, "Partner Bot", "bot-b")],
            people: vec![
                person(1, "Alice"),
                person(2, "Bob"),
                person(3, "Carol"),
                person(4, "Dave"),
                person(5, "Erin"),
            ],
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    bots: Vec<Bot>,
    members: Vec<Member>,
    topics: Vec<Topic>,
    messages: Vec<Message>,
    tasks: Vec<Task>,
}

impl Store {
    pub fn new(fixture: Fixture) -> Self {
        let mut members: Vec<Member> = fixture
            .bots
            .iter()
            .map(|bot| Member {
                id: bot.id,
                name: bot.name.clone(),
                email: None,
                status: "active".to_string(),
                kind: "bot".to_string(),
            })
            .collect();
        members.extend(fixture.people);

        Self {
            bots: fixture.bots,
            members,
            ..Self::default()
        }
    }

    pub fn bot_by_key(&self, api_key: &str) -> Option<&Bot> {
        self.bots.iter().find(|bot| bot.api_key == api_key)
    }

    pub fn member(&self, id: Uuid) -> Result<&Member, ApiError> {
        self.members
            .iter()
            .find(|m| m.id == id)
            .ok_or(ApiError::NotFound("member not found"))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn list_members(&self, limit: Option<u32>, cursor: Option<&str>) -> Result<Listing<Member>, ApiError> {
        paginate(&self.members, limit, cursor)
    }

    // --- topics ---

    pub fn create_topic(&mut self, caller: Uuid, input: CreateTopic, now: i64) -> Result<Topic, ApiError> {
        require_text("name", &input.name, MAX_NAME)?;
        if input.members.is_empty() {
            return Err(ApiError::BadRequest("at least one member is required".to_string()));
        }
        if let Some(description) = &input.description {
            limit_text("description", description, MAX_TEXT)?;
        }
        let short = optional_external_id(input.external_id)?;
        if let Some(short) = &short {
            let taken = self
                .topics
                .iter()
                .any(|t| t.created_by == caller && t.short_external_id.as_ref() == Some(short));
            if taken {
                return Err(ApiError::Conflict(format!("externalId {short:?} already in use")));
            }
        }

        let mut members = vec![caller];
        for id in input.members {
            self.member(id)
                .map_err(|_| ApiError::BadRequest(format!("unknown member {id}")))?;
            if !members.contains(&id) {
                members.push(id);
            }
        }

        let topic = Topic {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            members,
            external_id: short.as_ref().map(|s| full_external_id(caller, s)),
            created_at: now,
            created_by: caller,
            short_external_id: short,
        };
        self.topics.push(topic.clone());
        Ok(topic)
    }

    /// Topics are only visible to their members; anything else is a 404.
    pub fn topic(&self, caller: Uuid, id: Uuid) -> Result<&Topic, ApiError> {
        self.topics
            .iter()
            .find(|t| t.id == id && t.members.contains(&caller))
            .ok_or(ApiError::NotFound("topic not found"))
    }

    fn topic_mut(&mut self, caller: Uuid, id: Uuid) -> Result<&mut Topic, ApiError> {
        self.topics
            .iter_mut()
            .find(|t| t.id == id && t.members.contains(&caller))
            .ok_or(ApiError::NotFound("topic not found"))
    }

    /// Short ids resolve against the caller's own topics; `botId:shortId`
    /// resolves against the named bot's topics.
    pub fn topic_by_external_id(&self, caller: Uuid, external_id: &str) -> Result<&Topic, ApiError> {
        let (creator, short) = match external_id.split_once(':') {
            Some((bot_id, short)) => match bot_id.parse::<Uuid>() {
                Ok(bot_id) => (bot_id, short),
                Err(_) => return Err(ApiError::NotFound("topic not found")),
            },
            None => (caller, external_id),
        };
        self.topics
            .iter()
            .find(|t| {
                t.created_by == creator
                    && t.short_external_id.as_deref() == Some(short)
                    && t.members.contains(&caller)
            })
            .ok_or(ApiError::NotFound("topic not found"))
    }

    pub fn list_topics(&self, caller: Uuid, limit: Option<u32>, cursor: Option<&str>) -> Result<Listing<Topic>, ApiError> {
        let visible: Vec<Topic> = self
            .topics
            .iter()
            .filter(|t| t.members.contains(&caller))
            .cloned()
            .collect();
        paginate(&visible, limit, cursor)
    }

    pub fn update_topic(&mut self, caller: Uuid, id: Uuid, input: UpdateTopic) -> Result<Topic, ApiError> {
        if input.name.is_none() && input.description.is_none() {
            return Err(ApiError::BadRequest("nothing to update".to_string()));
        }
        if let Some(name) = &input.name {
            require_text("name", name, MAX_NAME)?;
        }
        if let Some(description) = &input.description {
            limit_text("description", description, MAX_TEXT)?;
        }

        let topic = self.topic_mut(caller, id)?;
        if let Some(name) = input.name {
            topic.name = name;
        }
        if let Some(description) = input.description {
            topic.description = Some(description);
        }
        Ok(topic.clone())
    }

    pub fn add_members(&mut self, caller: Uuid, id: Uuid, input: MemberIds) -> Result<Topic, ApiError> {
        member_batch(&input.member_ids)?;
        for member_id in &input.member_ids {
            self.member(*member_id)
                .map_err(|_| ApiError::BadRequest(format!("unknown member {member_id}")))?;
        }

        let topic = self.topic_mut(caller, id)?;
        for member_id in input.member_ids {
            if !topic.members.contains(&member_id) {
                topic.members.push(member_id);
            }
        }
        Ok(topic.clone())
    }

    /// Removing the caller itself is how a bot leaves a topic.
    pub fn remove_members(&mut self, caller: Uuid, id: Uuid, input: MemberIds) -> Result<Topic, ApiError> {
        member_batch(&input.member_ids)?;
        let topic = self.topic_mut(caller, id)?;
        topic.members.retain(|m| !input.member_ids.contains(m));
        Ok(topic.clone())
    }

    // --- messages and tasks ---

    pub fn create_message(&mut self, caller: Uuid, topic_id: Uuid, input: SendMessage, now: i64) -> Result<Message, ApiError> {
        require_text("text", &input.text, MAX_TEXT)?;
        let short = optional_external_id(input.external_id)?;
        self.topic(caller, topic_id)?;

        let message = Message {
            id: Uuid::new_v4(),
            topic_id,
            text: input.text,
            external_id: short.map(|s| full_external_id(caller, &s)),
            created_at: now,
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    pub fn create_task(&mut self, caller: Uuid, topic_id: Uuid, input: CreateTask, now: i64) -> Result<Task, ApiError> {
        require_text("title", &input.title, MAX_TITLE)?;
        if let Some(description) = &input.description {
            limit_text("description", description, MAX_TEXT)?;
        }
        let short = optional_external_id(input.external_id)?;
        let topic = self.topic(caller, topic_id)?;
        if let Some(assignee) = input.assignee {
            if !topic.members.contains(&assignee) {
                return Err(ApiError::BadRequest("assignee must be a member of the topic".to_string()));
            }
        }

        let task = Task {
            id: Uuid::new_v4(),
            topic_id,
            title: input.title,
            description: input.description,
            assignee: input.assignee,
            due_date: input.due_date,
            external_id: short.map(|s| full_external_id(caller, &s)),
            created_at: now,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }
}

fn full_external_id(bot: Uuid, short: &str) -> String {
    format!("{bot}:{short}")
}

fn require_text(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    limit_text(field, value, max)
}

fn limit_text(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::BadRequest(format!("{field} exceeds {max} characters")));
    }
    Ok(())
}

fn optional_external_id(value: Option<String>) -> Result<Option<String>, ApiError> {
    match value {
        Some(id) => {
            require_text("externalId", &id, MAX_EXTERNAL_ID)?;
            if id.contains(':') {
                return Err(ApiError::BadRequest("externalId must not contain ':'".to_string()));
            }
            Ok(Some(id))
        }
        None => Ok(None),
    }
}

fn member_batch(ids: &[Uuid]) -> Result<(), ApiError> {
    if ids.is_empty() || ids.len() > MAX_MEMBER_BATCH {
        return Err(ApiError::BadRequest(format!(
            "memberIds must contain 1 to {MAX_MEMBER_BATCH} ids"
        )));
    }
    Ok(())
}

fn encode_cursor(offset: usize) -> String {
    hex::encode(format!("offset:{offset}"))
}

fn decode_cursor(cursor: &str) -> Option<usize> {
    let raw = hex::decode(cursor).ok()?;
    let text = String::from_utf8(raw).ok()?;
    text.strip_prefix("offset:")?.parse().ok()
}

fn paginate<T: Clone>(items: &[T], limit: Option<u32>, cursor: Option<&str>) -> Result<Listing<T>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::BadRequest(format!("limit must be between 1 and {MAX_LIMIT}")));
    }
    let start = match cursor {
        Some(cursor) => decode_cursor(cursor)
            .filter(|offset| *offset <= items.len())
            .ok_or_else(|| ApiError::BadRequest("invalid cursor".to_string()))?,
        None => 0,
    };
    let end = (start + limit as usize).min(items.len());

    Ok(Listing {
        items: items[start..end].to_vec(),
        next_cursor: (end < items.len()).then(|| encode_cursor(end)),
    })
}
