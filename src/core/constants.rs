//! Constants for environment keys, API defaults and content types
//!
//! This module defines the string and numeric constants shared by the
//! configuration layer, the client and the runner.

/// Environment variable names
pub mod env {
    /// Anthropic API key
    pub const API_KEY: &str = "ANTHROPIC_API_KEY";

    /// Override for the API base URL
    pub const BASE_URL: &str = "ANTHROPIC_BASE_URL";

    /// Proxy for plain HTTP traffic
    pub const HTTP_PROXY: &str = "HTTP_PROXY";

    /// Proxy for HTTPS traffic
    pub const HTTPS_PROXY: &str = "HTTPS_PROXY";

    /// Model identifier for the smoke request
    pub const MODEL: &str = "SMOKE_MODEL";

    /// Token ceiling for the smoke request
    pub const MAX_TOKENS: &str = "SMOKE_MAX_TOKENS";

    /// User message sent in the smoke request
    pub const PROMPT: &str = "SMOKE_PROMPT";

    /// Request timeout in seconds
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";

    /// Logging level
    pub const LOG_LEVEL: &str = "LOG_LEVEL";

    /// Path to the TOML configuration file
    pub const CONFIG_PATH: &str = "CONFIG_PATH";
}

/// Defaults for the smoke request
pub mod defaults {
    /// Stand-in used when no API key is configured. The remote service
    /// rejects it, which surfaces as an authentication failure.
    pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

    pub const BASE_URL: &str = "https://api.anthropic.com";

    /// Local proxy used for http:// traffic unless overridden
    pub const HTTP_PROXY: &str = "http://127.0.0.1:7890";

    /// Local proxy used for https:// traffic unless overridden
    pub const HTTPS_PROXY: &str = "http://127.0.0.1:7890";

    /// Proxy value that disables proxying for a scheme
    pub const DIRECT_PROXY: &str = "direct";

    pub const MODEL: &str = "claude-3-haiku-20240307";

    pub const MAX_TOKENS: u32 = 100;

    pub const PROMPT: &str = "Hello";

    /// Request timeout in seconds
    pub const REQUEST_TIMEOUT: u64 = 60;

    pub const LOG_LEVEL: &str = "info";

    pub const CONFIG_PATH: &str = "smoke.toml";
}

/// HTTP header names and values for the Messages API
pub mod header {
    pub const API_KEY: &str = "x-api-key";

    pub const VERSION: &str = "anthropic-version";

    pub const VERSION_VALUE: &str = "2023-06-01";

    /// Response header carrying the server-side request id
    pub const REQUEST_ID: &str = "request-id";
}

/// Messages API path, relative to the base URL
pub const MESSAGES_PATH: &str = "/v1/messages";

/// Content type constants
pub mod content {
    /// Text content type
    pub const TEXT: &str = "text";
}
