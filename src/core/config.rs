//! Application configuration management
//!
//! Configuration is resolved once at startup from three layers, lowest
//! precedence first: built-in defaults, an optional TOML file, and the
//! process environment (after `.env` has been loaded). The resolved value is
//! immutable; proxy settings are handed to the HTTP client explicitly rather
//! than written back into the environment.

use crate::core::constants::{defaults, env};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Number of leading key characters shown in logs
const MASKED_KEY_PREFIX: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSection {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxySection {
    #[serde(default)]
    pub http: Option<String>,
    #[serde(default)]
    pub https: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
}

/// On-disk configuration. Every table and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub proxy: ProxySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TomlConfig {
    /// Read and parse a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse TOML configuration")
    }
}

/// Proxy endpoints for outbound traffic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy used for `http://` targets
    pub http_proxy: Option<String>,

    /// Proxy used for `https://` targets
    pub https_proxy: Option<String>,
}

impl ProxyConfig {
    pub fn is_direct(&self) -> bool {
        self.http_proxy.is_none() && self.https_proxy.is_none()
    }
}

/// Resolved smoke-test configuration
#[derive(Clone)]
pub struct Config {
    /// Anthropic API key, or the placeholder when none is configured
    pub api_key: String,

    /// API base URL without trailing slash
    pub base_url: String,

    /// Model for the smoke request
    pub model: String,

    /// Token ceiling for the smoke request, always positive
    pub max_tokens: u32,

    /// Content of the single user message
    pub prompt: String,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Outbound proxy endpoints
    pub proxy: ProxyConfig,

    /// Logging level
    pub log_level: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.masked_api_key())
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("prompt", &self.prompt)
            .field("request_timeout", &self.request_timeout)
            .field("proxy", &self.proxy)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from `.env`, the config file and the environment
    ///
    /// `CONFIG_PATH` names the TOML file; when it is set the file must exist.
    /// Otherwise `smoke.toml` in the current directory is used if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match non_empty(lookup(env::CONFIG_PATH)) {
            Some(path) => TomlConfig::from_file(path)?,
            None if Path::new(defaults::CONFIG_PATH).is_file() => {
                TomlConfig::from_file(defaults::CONFIG_PATH)?
            }
            None => TomlConfig::default(),
        };
        Self::resolve(file, lookup)
    }

    /// Merge a parsed file with environment lookups and apply defaults
    ///
    /// # Errors
    ///
    /// Returns error if a numeric value cannot be parsed or is zero.
    pub fn resolve<F>(file: TomlConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| non_empty(lookup(key));

        let api_key = var(env::API_KEY)
            .or(non_empty(file.api.api_key))
            .unwrap_or_else(|| defaults::PLACEHOLDER_API_KEY.to_string());

        let base_url = var(env::BASE_URL)
            .or(non_empty(file.api.base_url))
            .unwrap_or_else(|| defaults::BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = var(env::MODEL)
            .or(non_empty(file.api.model))
            .unwrap_or_else(|| defaults::MODEL.to_string());

        let max_tokens = match var(env::MAX_TOKENS) {
            Some(raw) => parse_number::<u32>(env::MAX_TOKENS, &raw)?,
            None => file.api.max_tokens.unwrap_or(defaults::MAX_TOKENS),
        };
        if max_tokens == 0 {
            bail!("max_tokens must be a positive integer");
        }

        let prompt = var(env::PROMPT)
            .or(non_empty(file.api.prompt))
            .unwrap_or_else(|| defaults::PROMPT.to_string());

        let request_timeout = match var(env::REQUEST_TIMEOUT) {
            Some(raw) => parse_number::<u64>(env::REQUEST_TIMEOUT, &raw)?,
            None => file
                .api
                .request_timeout
                .unwrap_or(defaults::REQUEST_TIMEOUT),
        };
        if request_timeout == 0 {
            bail!("request_timeout must be at least one second");
        }

        let proxy = ProxyConfig {
            http_proxy: proxy_endpoint(
                var(env::HTTP_PROXY)
                    .or_else(|| var(&env::HTTP_PROXY.to_lowercase()))
                    .or(non_empty(file.proxy.http)),
                defaults::HTTP_PROXY,
            ),
            https_proxy: proxy_endpoint(
                var(env::HTTPS_PROXY)
                    .or_else(|| var(&env::HTTPS_PROXY.to_lowercase()))
                    .or(non_empty(file.proxy.https)),
                defaults::HTTPS_PROXY,
            ),
        };

        let log_level = var(env::LOG_LEVEL)
            .or(non_empty(file.logging.level))
            .unwrap_or_else(|| defaults::LOG_LEVEL.to_string());

        Ok(Config {
            api_key,
            base_url,
            model,
            max_tokens,
            prompt,
            request_timeout,
            proxy,
            log_level,
        })
    }

    /// True when no key was configured and the placeholder is in use
    pub fn uses_placeholder_key(&self) -> bool {
        self.api_key == defaults::PLACEHOLDER_API_KEY
    }

    /// True when the key still looks like an unedited template value
    pub fn looks_like_template_key(&self) -> bool {
        let key = self.api_key.to_lowercase();
        self.uses_placeholder_key() || key.contains("your-") || key.contains("your_")
    }

    /// API key reduced to a short prefix, safe for logs
    pub fn masked_api_key(&self) -> String {
        if self.api_key.chars().count() <= MASKED_KEY_PREFIX {
            return "***".to_string();
        }
        let prefix: String = self.api_key.chars().take(MASKED_KEY_PREFIX).collect();
        format!("{}...", prefix)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Apply the default endpoint; `direct` turns the proxy off
fn proxy_endpoint(configured: Option<String>, default: &str) -> Option<String> {
    let endpoint = configured.unwrap_or_else(|| default.to_string());
    if endpoint.eq_ignore_ascii_case(defaults::DIRECT_PROXY) {
        None
    } else {
        Some(endpoint)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
}
