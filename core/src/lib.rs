//! Synchronous client for the Zenzap external integration API.
//!
//! # Overview
//! Every call is authenticated with a bearer token and an `X-Signature`
//! header carrying an HMAC-SHA256 of either the request path (GET) or the
//! exact JSON body (POST/PATCH/DELETE). Responses are normalized into an
//! `ApiResponse { success, status, data }`.
//!
//! # Design
//! - `RequestBuilder` builds signed `HttpRequest` values without I/O.
//! - `Transport` executes them; `UreqTransport` is the blocking default.
//! - `ZenzapClient` ties both together, one method per endpoint.
//! - Non-2xx statuses are data, not errors. `ZenzapError` covers
//!   configuration, validation, transport and (de)serialization failures.
//!
//! ```no_run
//! use zenzap_core::{ClientConfig, CreateTopic, ZenzapClient};
//!
//! # fn main() -> zenzap_core::Result<()> {
//! let client = ZenzapClient::new(ClientConfig::new("api-key", "secret"))?;
//! let me = client.get_current_member()?;
//! if me.success {
//!     println!("bot id: {:?}", me.str_field("id"));
//! }
//! # let member = uuid::Uuid::nil();
//! let topic = client.create_topic(&CreateTopic::new("Launch", vec![member]).external_id("project-123"))?;
//! println!("{} {}", topic.status, topic.data);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod signature;
pub mod transport;
pub mod types;

pub use client::ZenzapClient;
pub use config::{ClientConfig, Credentials, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{Result, ZenzapError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::RequestBuilder;
pub use response::ApiResponse;
pub use signature::{sign, Signer};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{
    CreateTask, CreateTopic, ExternalId, ListParams, Member, MemberIds, Message, Page, SendMessage, Task, Topic,
    UpdateTopic,
};
