//! Endpoint methods for the Zenzap API.
//!
//! # Design
//! `ZenzapClient` pairs a sans-IO `RequestBuilder` with a `Transport`. Every
//! endpoint method validates and builds a signed request, executes it once
//! (no retries) and wraps the result in an `ApiResponse`. Non-2xx statuses
//! come back as `Ok(ApiResponse { success: false, .. })`; `Err` is reserved
//! for local failures and transport errors.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{Result, ZenzapError};
use crate::http::HttpRequest;
use crate::request::RequestBuilder;
use crate::response::ApiResponse;
use crate::transport::{Transport, UreqTransport};
use crate::types::{CreateTask, CreateTopic, ListParams, Member, MemberIds, Page, SendMessage, Topic, UpdateTopic};

/// Client for the Zenzap external integration API.
#[derive(Debug, Clone)]
pub struct ZenzapClient<T = UreqTransport> {
    requests: RequestBuilder,
    transport: T,
}

impl ZenzapClient<UreqTransport> {
    /// Validate `config` and build a client over a blocking ureq transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(&config, transport)
    }

    /// Build a client from `BOT_API_KEY`, `BOT_SECRET`, `API_BASE_URL` and
    /// `API_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> ZenzapClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Result<Self> {
        Ok(Self {
            requests: RequestBuilder::new(config)?,
            transport,
        })
    }

    /// The underlying request builder, for callers that run their own I/O.
    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    /// Send an already built request and wrap the response.
    pub fn execute(&self, request: HttpRequest) -> Result<ApiResponse> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.transport.execute(&request).map_err(|err| {
            warn!(method = %request.method, path = %request.path, error = %err, "request failed");
            ZenzapError::from(err)
        })?;

        let response = ApiResponse::from_http(response);
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            success = response.success,
            "received response"
        );
        Ok(response)
    }

    // --- members ---

    pub fn get_current_member(&self) -> Result<ApiResponse> {
        self.execute(self.requests.build_get_current_member())
    }

    pub fn list_members(&self, params: &ListParams) -> Result<ApiResponse> {
        self.execute(self.requests.build_list_members(params)?)
    }

    /// Walk every page of the member list.
    pub fn list_all_members(&self, limit: u32) -> Result<Vec<Member>> {
        self.collect_pages(limit, "members", |params| self.list_members(params))
    }

    // --- topics ---

    pub fn create_topic(&self, input: &CreateTopic) -> Result<ApiResponse> {
        self.execute(self.requests.build_create_topic(input)?)
    }

    pub fn get_topic(&self, topic_id: Uuid) -> Result<ApiResponse> {
        self.execute(self.requests.build_get_topic(topic_id))
    }

    /// Look a topic up by external id.
    ///
    /// A short id only resolves for the bot that created the topic; other
    /// members of the topic must pass the full `botId:shortId` form.
    pub fn get_topic_by_external_id(&self, external_id: &str) -> Result<ApiResponse> {
        self.execute(self.requests.build_get_topic_by_external_id(external_id)?)
    }

    pub fn list_topics(&self, params: &ListParams) -> Result<ApiResponse> {
        self.execute(self.requests.build_list_topics(params)?)
    }

    /// Walk every page of the topics the bot is a member of.
    pub fn list_all_topics(&self, limit: u32) -> Result<Vec<Topic>> {
        self.collect_pages(limit, "topics", |params| self.list_topics(params))
    }

    pub fn update_topic(&self, topic_id: Uuid, input: &UpdateTopic) -> Result<ApiResponse> {
        self.execute(self.requests.build_update_topic(topic_id, input)?)
    }

    /// Add up to five members per call.
    pub fn add_topic_members(&self, topic_id: Uuid, member_ids: &[Uuid]) -> Result<ApiResponse> {
        let input = MemberIds::new(member_ids.to_vec());
        self.execute(self.requests.build_add_topic_members(topic_id, &input)?)
    }

    /// Remove up to five members per call.
    pub fn remove_topic_members(&self, topic_id: Uuid, member_ids: &[Uuid]) -> Result<ApiResponse> {
        let input = MemberIds::new(member_ids.to_vec());
        self.execute(self.requests.build_remove_topic_members(topic_id, &input)?)
    }

    /// Remove the calling bot from a topic.
    ///
    /// Returns the failed `get_current_member` response unchanged if the bot
    /// identity cannot be resolved.
    pub fn leave_topic(&self, topic_id: Uuid) -> Result<ApiResponse> {
        let me = self.get_current_member()?;
        if !me.success {
            return Ok(me);
        }
        let bot: Member = me.json()?;
        self.remove_topic_members(topic_id, &[bot.id])
    }

    // --- messages and tasks ---

    pub fn send_message(&self, topic_id: Uuid, input: &SendMessage) -> Result<ApiResponse> {
        self.execute(self.requests.build_send_message(topic_id, input)?)
    }

    pub fn create_task(&self, topic_id: Uuid, input: &CreateTask) -> Result<ApiResponse> {
        self.execute(self.requests.build_create_task(topic_id, input)?)
    }

    fn collect_pages<I, F>(&self, limit: u32, key: &str, fetch: F) -> Result<Vec<I>>
    where
        I: DeserializeOwned,
        F: Fn(&ListParams) -> Result<ApiResponse>,
    {
        let mut params = ListParams::new(limit);
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        loop {
            let response = fetch(&params)?.error_for_status()?;
            let page: Page<I> = Page::from_value(&response.data, key)?;
            items.extend(page.items);

            let Some(cursor) = page.next_cursor else {
                return Ok(items);
            };
            if !seen.insert(cursor.clone()) {
                return Err(ZenzapError::InvalidResponse(format!(
                    "cursor {cursor:?} was returned twice while listing {key}"
                )));
            }
            debug!(key, pages = seen.len() + 1, "following cursor");
            params = ListParams::new(limit).cursor(cursor);
        }
    }
}
