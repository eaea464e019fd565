//! Smoke-test runner
//!
//! Builds the single request, sends it once, and folds the result into a
//! `SmokeOutcome`. Nothing in here returns an error or panics on a failed
//! call; every failure becomes a `Failure` outcome that the caller prints.

use crate::core::client::{AnthropicClient, ApiErrorKind, ClientConfig, ClientError, MessagesApi};
use crate::core::config::Config;
use crate::models::claude::{ClaudeMessage, ClaudeMessagesRequest, ClaudeMessagesResponse};
use anyhow::Context;
use std::fmt;
use std::io::{self, Write};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a smoke test failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Connection,
    Timeout,
    Authentication,
    PermissionDenied,
    RateLimited,
    InvalidRequest,
    Overloaded,
    Server,
    InvalidResponse,
    Other,
}

impl From<&ClientError> for FailureKind {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::Configuration(_) => FailureKind::Configuration,
            ClientError::Connection(_) => FailureKind::Connection,
            ClientError::Timeout(_) => FailureKind::Timeout,
            ClientError::InvalidResponse(_) => FailureKind::InvalidResponse,
            ClientError::Unexpected(_) => FailureKind::Other,
            ClientError::Api { kind, .. } => match kind {
                ApiErrorKind::Authentication => FailureKind::Authentication,
                ApiErrorKind::PermissionDenied => FailureKind::PermissionDenied,
                ApiErrorKind::RateLimited => FailureKind::RateLimited,
                ApiErrorKind::InvalidRequest => FailureKind::InvalidRequest,
                ApiErrorKind::Overloaded => FailureKind::Overloaded,
                ApiErrorKind::Server => FailureKind::Server,
                ApiErrorKind::Other => FailureKind::Other,
            },
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Configuration => "configuration",
            FailureKind::Connection => "connection",
            FailureKind::Timeout => "timeout",
            FailureKind::Authentication => "authentication",
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::Overloaded => "overloaded",
            FailureKind::Server => "server",
            FailureKind::InvalidResponse => "invalid_response",
            FailureKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// Diagnostic record for a failed run
#[derive(Debug, Clone)]
pub struct SmokeFailure {
    pub kind: FailureKind,
    /// One-line rendering of the error and its causes
    pub message: String,
    /// Multi-line rendering with the full cause chain
    pub trace: String,
}

impl SmokeFailure {
    pub fn from_error(kind: FailureKind, error: &anyhow::Error) -> Self {
        let message = format!("{:#}", error).replace(['\r', '\n'], " ");
        Self {
            kind,
            message,
            trace: format!("{:?}", error),
        }
    }
}

/// Result of one smoke-test run
#[derive(Debug, Clone)]
pub enum SmokeOutcome {
    Success(ClaudeMessagesResponse),
    Failure(SmokeFailure),
}

impl SmokeOutcome {
    /// Failure outcome for configuration that could not be loaded
    pub fn configuration_failure(error: anyhow::Error) -> Self {
        let error = error.context("Failed to load configuration");
        SmokeOutcome::Failure(SmokeFailure::from_error(FailureKind::Configuration, &error))
    }

    fn client_failure(error: ClientError, context: &'static str) -> Self {
        let kind = FailureKind::from(&error);
        let request_id = error.request_id().map(str::to_string);
        let error = anyhow::Error::new(error).context(context);
        let mut failure = SmokeFailure::from_error(kind, &error);
        if let Some(id) = request_id {
            failure.trace.push_str(&format!("\n\nrequest-id: {}", id));
        }
        SmokeOutcome::Failure(failure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SmokeOutcome::Success(_))
    }

    /// Write the report to `out`
    ///
    /// Success prints the response's `content` field as JSON and nothing
    /// else. Failure prints a single `Detailed error:` line followed by the
    /// failure kind and the trace.
    pub fn write_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            SmokeOutcome::Success(response) => writeln!(out, "{}", response.content_json()),
            SmokeOutcome::Failure(failure) => {
                writeln!(out, "Detailed error: {}", failure.message)?;
                writeln!(out, "Failure kind: {}", failure.kind)?;
                writeln!(out, "{}", failure.trace)
            }
        }
    }
}

/// Build the single-turn smoke request from configuration
pub fn build_request(config: &Config) -> ClaudeMessagesRequest {
    ClaudeMessagesRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        messages: vec![ClaudeMessage::user(config.prompt.clone())],
    }
}

/// Send `request` once through `api` and classify the result
pub async fn run_with<A>(api: &A, request: &ClaudeMessagesRequest) -> SmokeOutcome
where
    A: MessagesApi + ?Sized,
{
    let started = Instant::now();
    match api.create_message(request).await {
        Ok(response) => {
            let usage = response.usage.clone().unwrap_or_default();
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                model = response.model.as_deref().unwrap_or("unknown"),
                stop_reason = response.stop_reason.as_deref().unwrap_or("none"),
                input_tokens = usage.input_tokens.unwrap_or(0),
                output_tokens = usage.output_tokens.unwrap_or(0),
                "Smoke request succeeded"
            );
            debug!("Reply text: {}", response.text());
            SmokeOutcome::Success(response)
        }
        Err(e) => {
            error!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Smoke request failed: {}", e
            );
            SmokeOutcome::client_failure(e, "Messages request failed")
        }
    }
}

/// Run the smoke test described by `config`
///
/// Proxy settings travel inside `ClientConfig`, so they are in place before
/// the HTTP client exists.
pub async fn run(config: &Config) -> SmokeOutcome {
    if config.uses_placeholder_key() {
        warn!(
            "ANTHROPIC_API_KEY is not set; using placeholder key, expect an authentication failure"
        );
    } else if config.looks_like_template_key() {
        warn!("API key still looks like a template value");
    }

    info!(
        base_url = %config.base_url,
        model = %config.model,
        max_tokens = config.max_tokens,
        api_key = %config.masked_api_key(),
        http_proxy = config.proxy.http_proxy.as_deref().unwrap_or("none"),
        https_proxy = config.proxy.https_proxy.as_deref().unwrap_or("none"),
        "Starting smoke test"
    );

    let client = match AnthropicClient::new(ClientConfig::from(config)) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to construct client: {}", e);
            return SmokeOutcome::client_failure(e, "Failed to construct Anthropic client");
        }
    };

    if config.proxy.is_direct() {
        debug!("No proxy configured, connecting directly");
    }
    info!("Sending request to {}", client.url());

    let outcome = run_with(&client, &build_request(config)).await;
    if !outcome.is_success() {
        warn!("Smoke test failed; see report for details");
    }
    outcome
}

/// Render the outcome to stdout, logging if stdout itself is unusable
pub fn report(outcome: &SmokeOutcome) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = outcome
        .write_report(&mut out)
        .and_then(|_| out.flush())
        .context("Failed to write report")
    {
        error!("{:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TomlConfig;
    use crate::core::constants::env;
    use crate::core::test_support::{
        MockServer, Reply, closed_addr, error_response_json, message_response_json,
    };
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::Mutex;

    /// In-memory `MessagesApi` returning a canned result
    struct FakeApi {
        result: Mutex<Option<Result<ClaudeMessagesResponse, ClientError>>>,
        seen: Mutex<Vec<ClaudeMessagesRequest>>,
    }

    impl FakeApi {
        fn new(result: Result<ClaudeMessagesResponse, ClientError>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MessagesApi for FakeApi {
        async fn create_message(
            &self,
            request: &ClaudeMessagesRequest,
        ) -> Result<ClaudeMessagesResponse, ClientError> {
            self.seen.lock().unwrap().push(request.clone());
            self.result
                .lock()
                .unwrap()
                .take()
                .expect("create_message called more than once")
        }
    }

    fn config_with(pairs: &[(&str, String)]) -> Config {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Config::resolve(TomlConfig::default(), move |key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    fn report_text(outcome: &SmokeOutcome) -> String {
        let mut buf = Vec::new();
        outcome.write_report(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_build_request_defaults() {
        let request = build_request(&config_with(&[]));
        assert_eq!(request.model, "claude-3-haiku-20240307");
        assert_eq!(request.max_tokens, 100);
        assert_eq!(request.messages, vec![ClaudeMessage::user("Hello")]);
    }

    #[tokio::test]
    async fn test_success_prints_content_verbatim() {
        let body = message_response_json();
        let response = ClaudeMessagesResponse::from_body(&body.to_string()).unwrap();
        let api = FakeApi::new(Ok(response));

        let request = build_request(&config_with(&[]));
        let outcome = run_with(&api, &request).await;
        assert!(outcome.is_success());
        assert_eq!(api.seen.lock().unwrap().as_slice(), &[request]);

        assert_eq!(report_text(&outcome), format!("{}\n", body["content"]));
    }

    #[tokio::test]
    async fn test_failure_prints_one_error_line_and_trace() {
        let api = FakeApi::new(Err(ClientError::Connection(
            "tcp connect error: Connection refused".to_string(),
        )));

        let outcome = run_with(&api, &build_request(&config_with(&[]))).await;
        let SmokeOutcome::Failure(failure) = &outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Connection);
        assert!(failure.message.contains("Connection refused"));

        let printed = report_text(&outcome);
        let error_lines = printed
            .lines()
            .filter(|l| l.starts_with("Detailed error:"))
            .count();
        assert_eq!(error_lines, 1);
        assert!(printed.lines().next().unwrap().starts_with("Detailed error:"));
        assert!(printed.contains("Failure kind: connection"));
        assert!(!failure.trace.trim().is_empty());
        assert!(failure.trace.contains("Caused by"));
    }

    #[test]
    fn test_configuration_failure_outcome() {
        let outcome = SmokeOutcome::configuration_failure(anyhow::anyhow!("bad toml"));
        let SmokeOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Configuration);
        assert!(failure.message.contains("bad toml"));
    }

    #[tokio::test]
    async fn test_missing_key_reaches_authentication_failure() {
        let reply = Reply::json(
            StatusCode::UNAUTHORIZED,
            error_response_json("authentication_error", "invalid x-api-key"),
        )
        .with_request_id("req_placeholder");
        let server = MockServer::start(reply).await;
        let config = config_with(&[
            (env::BASE_URL, server.uri()),
            (env::HTTP_PROXY, "direct".to_string()),
        ]);
        assert!(config.uses_placeholder_key());

        let outcome = run(&config).await;
        let SmokeOutcome::Failure(failure) = &outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Authentication);
        assert!(failure.trace.contains("request-id: req_placeholder"));

        let requests = server.requests().await;
        assert_eq!(
            requests[0].headers.get("x-api-key").unwrap(),
            "YOUR_API_KEY_HERE"
        );
    }

    #[tokio::test]
    async fn test_valid_key_succeeds_with_content() {
        let server = MockServer::start(Reply::json(StatusCode::OK, message_response_json())).await;
        let config = config_with(&[
            (env::BASE_URL, server.uri()),
            (env::API_KEY, "sk-ant-api03-valid".to_string()),
            (env::HTTP_PROXY, "direct".to_string()),
        ]);

        let outcome = run(&config).await;
        let SmokeOutcome::Success(response) = &outcome else {
            panic!("expected success");
        };
        assert!(!response.blocks().is_empty());

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].body["messages"],
            serde_json::json!([{"role": "user", "content": "Hello"}])
        );
        assert_eq!(requests[0].body["max_tokens"], 100);
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_connection_failure() {
        let proxy = format!("http://{}", closed_addr().await);
        let config = config_with(&[
            (env::BASE_URL, "http://api.smoke.invalid".to_string()),
            (env::HTTP_PROXY, proxy.clone()),
            (env::HTTPS_PROXY, proxy),
        ]);

        let outcome = run(&config).await;
        let SmokeOutcome::Failure(failure) = &outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Connection);
        assert!(report_text(&outcome).starts_with("Detailed error:"));
    }

    #[tokio::test]
    async fn test_proxy_applied_before_client_construction() {
        let proxy = MockServer::start(Reply::json(StatusCode::OK, message_response_json())).await;
        let config = config_with(&[
            (env::BASE_URL, "http://api.smoke.invalid".to_string()),
            (env::HTTP_PROXY, proxy.uri()),
        ]);

        let outcome = run(&config).await;
        assert!(outcome.is_success());
        assert_eq!(proxy.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_proxy_is_configuration_failure() {
        let config = config_with(&[(env::HTTP_PROXY, "not a url".to_string())]);

        let outcome = run(&config).await;
        let SmokeOutcome::Failure(failure) = &outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Configuration);
        assert!(failure.message.contains("Invalid HTTP proxy"));
        assert!(report_text(&outcome).contains("Failure kind: configuration"));
    }
}
