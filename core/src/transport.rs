//! Blocking HTTP execution of signed requests.
//!
//! # Design
//! `Transport` is the seam between the sans-IO request builder and the
//! network. Non-2xx statuses are returned as `HttpResponse` data; only
//! failures that produce no response at all become `TransportError`.
//! Implementations must not retry.

use std::io::ErrorKind;
use std::time::Duration;

use thiserror::Error;
use ureq::Agent;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// The request did not produce an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    /// DNS failure, refused or reset connection.
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

/// Executes one `HttpRequest` and returns the raw response.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// `Transport` backed by a ureq agent with a global per-call timeout.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    timeout: Duration,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let body = request.body.as_deref().unwrap_or_default().as_bytes();
        let url = request.url.as_str();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), request).call(),
            HttpMethod::Post => with_headers(self.agent.post(url), request).send(body),
            HttpMethod::Patch => with_headers(self.agent.patch(url), request).send(body),
            HttpMethod::Delete if request.body.is_some() => {
                with_headers(self.agent.delete(url).force_send_body(), request).send(body)
            }
            HttpMethod::Delete => with_headers(self.agent.delete(url), request).call(),
        };
        let mut response = result.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string().map_err(map_error)?;

        Ok(HttpResponse { status, headers, body })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn map_error(err: ureq::Error) -> TransportError {
    match &err {
        ureq::Error::Timeout(_) => TransportError::Timeout(err.to_string()),
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportError::Connect(err.to_string()),
        ureq::Error::Io(io) => match io.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout(err.to_string()),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::AddrNotAvailable => TransportError::Connect(err.to_string()),
            _ => TransportError::Other(err.to_string()),
        },
        _ => TransportError::Other(err.to_string()),
    }
}
