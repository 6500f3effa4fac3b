//! # JSON-over-HTTP Transport
//!
//! Every remote party the engine talks to (naming nodes, the registrar,
//! the storage hub) speaks JSON over HTTP. [`JsonTransport`] is the one
//! seam for all of it, so the engine can be driven against canned
//! responses in tests and against `reqwest` in production.
//!
//! A transport reports what the server said, status code included. Deciding
//! whether a 404 means "name not found" or "broken endpoint" is the caller's
//! job; the transport only fails when no answer came back at all.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::DEFAULT_REQUEST_TIMEOUT;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures where no usable HTTP answer was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {reason}")]
    Unreachable { url: String, reason: String },
}

impl TransportError {
    pub fn unreachable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        TransportError::Unreachable {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// An HTTP answer. `body` is `None` when the payload was empty or not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl JsonResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// A 200 with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self::new(200, Some(body))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// String field of a JSON object body.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.body.as_ref()?.get(field)?.as_str()
    }

    /// The body re-serialized for diagnostics. Empty for a missing body.
    pub fn body_text(&self) -> String {
        self.body.as_ref().map(Value::to_string).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Minimal JSON request primitive.
#[async_trait]
pub trait JsonTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<JsonResponse, TransportError>;

    /// POST `body` as JSON, optionally with a bearer token.
    async fn post(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<JsonResponse, TransportError>;
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// A transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::unreachable("<client>", e.to_string()))?;
        Ok(Self::with_http_client(http))
    }

    /// Use an existing client (custom TLS, proxies).
    pub fn with_http_client(http: Client) -> Self {
        Self { http }
    }

    fn parse_url(url: &str) -> Result<Url, TransportError> {
        Url::parse(url).map_err(|source| TransportError::Url {
            url: url.to_string(),
            source,
        })
    }

    async fn map_response(url: &str, response: Response) -> Result<JsonResponse, TransportError> {
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::unreachable(url, e.to_string()))?;
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(&bytes).ok()
        };
        debug!(url, status, json = body.is_some(), "http response");
        Ok(JsonResponse { status, body })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::with_http_client(
            Client::builder()
                .timeout(DEFAULT_REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        )
    }
}

#[async_trait]
impl JsonTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<JsonResponse, TransportError> {
        let parsed = Self::parse_url(url)?;
        debug!(url, "GET");
        let response = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(|e| TransportError::unreachable(url, e.to_string()))?;
        Self::map_response(url, response).await
    }

    async fn post(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<JsonResponse, TransportError> {
        let parsed = Self::parse_url(url)?;
        debug!(url, "POST");
        let mut request = self.http.post(parsed).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::unreachable(url, e.to_string()))?;
        Self::map_response(url, response).await
    }
}
