//! Anthropic Messages API client
//!
//! This module provides the `MessagesApi` seam and its reqwest-backed
//! implementation. Proxy endpoints are passed to the constructor and
//! installed on the HTTP client directly; ambient proxy variables are not
//! consulted.

use crate::core::config::{Config, ProxyConfig};
use crate::core::constants::{MESSAGES_PATH, header};
use crate::models::claude::{ClaudeErrorResponse, ClaudeMessagesRequest, ClaudeMessagesResponse};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Classification of a non-success API response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Authentication,
    PermissionDenied,
    RateLimited,
    InvalidRequest,
    Overloaded,
    Server,
    Other,
}

impl ApiErrorKind {
    /// Classify by HTTP status, then by the envelope's error type
    pub fn classify(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) | (_, "authentication_error") => ApiErrorKind::Authentication,
            (403, _) | (_, "permission_error") => ApiErrorKind::PermissionDenied,
            (429, _) | (_, "rate_limit_error") => ApiErrorKind::RateLimited,
            (503, _) | (529, _) | (_, "overloaded_error") => ApiErrorKind::Overloaded,
            (400, _) | (404, _) | (413, _) => ApiErrorKind::InvalidRequest,
            (_, "invalid_request_error") | (_, "not_found_error") => ApiErrorKind::InvalidRequest,
            (500..=599, _) | (_, "api_error") => ApiErrorKind::Server,
            _ => ApiErrorKind::Other,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiErrorKind::Authentication => "authentication failed",
            ApiErrorKind::PermissionDenied => "permission denied",
            ApiErrorKind::RateLimited => "rate limited",
            ApiErrorKind::InvalidRequest => "invalid request",
            ApiErrorKind::Overloaded => "service overloaded",
            ApiErrorKind::Server => "server error",
            ApiErrorKind::Other => "API error",
        };
        f.write_str(label)
    }
}

/// Error types that can occur during Messages API interactions
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid client configuration: {0}")]
    Configuration(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("{kind} (status {status}): {message}")]
    Api {
        kind: ApiErrorKind,
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ClientError {
    /// Map a transport-level reqwest error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        let detail = error_chain(&error);
        if error.is_timeout() {
            ClientError::Timeout(detail)
        } else if error.is_connect() {
            ClientError::Connection(detail)
        } else if error.is_builder() {
            ClientError::Configuration(detail)
        } else if error.is_decode() || error.is_body() {
            ClientError::InvalidResponse(detail)
        } else {
            ClientError::Unexpected(detail)
        }
    }

    /// Server-side request id, when the service returned one
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientError::Api { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

/// Render an error with all of its sources, outermost first
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}

/// Build a `ClientError::Api` from a non-success response body
fn parse_error_response(status: u16, body: &str, request_id: Option<String>) -> ClientError {
    let (error_type, message) = match serde_json::from_str::<ClaudeErrorResponse>(body) {
        Ok(envelope) if envelope.response_type == "error" => {
            (envelope.error.error_type, envelope.error.message)
        }
        _ if body.trim().is_empty() => (String::new(), format!("HTTP {}", status)),
        _ => (String::new(), body.trim().to_string()),
    };

    ClientError::Api {
        kind: ApiErrorKind::classify(status, &error_type),
        status,
        message,
        request_id,
    }
}

/// The one operation the smoke test needs from a chat-completion service
#[async_trait]
pub trait MessagesApi: Send + Sync {
    /// Send a single non-streaming Messages request
    async fn create_message(
        &self,
        request: &ClaudeMessagesRequest,
    ) -> Result<ClaudeMessagesResponse, ClientError>;
}

/// Everything needed to construct an `AnthropicClient`
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub proxy: ProxyConfig,
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.request_timeout),
            proxy: config.proxy.clone(),
        }
    }
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    headers: HeaderMap,
    url: String,
}

impl AnthropicClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if a proxy URL or the API key
    /// cannot be used, or the HTTP client fails to build.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder().timeout(config.timeout).no_proxy();

        if let Some(url) = &config.proxy.http_proxy {
            let proxy = Proxy::http(url).map_err(|e| {
                ClientError::Configuration(format!("Invalid HTTP proxy {}: {}", url, e))
            })?;
            builder = builder.proxy(proxy);
        }
        if let Some(url) = &config.proxy.https_proxy {
            let proxy = Proxy::https(url).map_err(|e| {
                ClientError::Configuration(format!("Invalid HTTPS proxy {}: {}", url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            ClientError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            headers: build_headers(&config.api_key)?,
            url: format!("{}{}", config.base_url.trim_end_matches('/'), MESSAGES_PATH),
        })
    }

    /// Full URL of the Messages endpoint
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MessagesApi for AnthropicClient {
    async fn create_message(
        &self,
        request: &ClaudeMessagesRequest,
    ) -> Result<ClaudeMessagesResponse, ClientError> {
        debug!("POST {} model={}", self.url, request.model);

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(header::REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(ClientError::from_reqwest)?;

        if !status.is_success() {
            return Err(parse_error_response(status.as_u16(), &body, request_id));
        }

        ClaudeMessagesResponse::from_body(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

fn build_headers(api_key: &str) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::API_KEY,
        HeaderValue::from_str(api_key)
            .map_err(|e| ClientError::Configuration(format!("Invalid API key: {}", e)))?,
    );
    headers.insert(
        header::VERSION,
        HeaderValue::from_static(header::VERSION_VALUE),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
