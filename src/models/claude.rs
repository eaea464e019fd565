//! Claude API data models
//!
//! Request, response and error envelope structures for the Anthropic
//! Messages API. The response is only partially typed: `content` is required
//! and kept as the raw bytes the service sent; a few other fields are read
//! for logging.

use crate::core::constants::content;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[allow(dead_code)]
    Assistant,
}

/// A single conversation turn with plain-text content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeMessage {
    pub role: Role,
    pub content: String,
}

impl ClaudeMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Claude Messages API request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeMessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ClaudeMessage>,
}

/// Text content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeContentBlockText {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response content block
///
/// Text blocks are typed; anything else (tool use, thinking, future block
/// types) is kept as untyped JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaudeContentBlock {
    Text(ClaudeContentBlockText),
    Other(serde_json::Value),
}

impl ClaudeContentBlock {
    /// Text of the block, if it is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClaudeContentBlock::Text(block) if block.content_type == content::TEXT => {
                Some(&block.text)
            }
            _ => None,
        }
    }
}

/// Token usage reported by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaudeUsage {
    #[serde(default)]
    pub input_tokens: Option<u32>,
    #[serde(default)]
    pub output_tokens: Option<u32>,
}

/// Claude Messages API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeMessagesResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: Box<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<ClaudeUsage>,
    #[serde(skip)]
    blocks: Vec<ClaudeContentBlock>,
}

impl ClaudeMessagesResponse {
    /// Decode a response body
    ///
    /// `content` must be an array of content blocks; its original text is
    /// retained for printing.
    pub fn from_body(body: &str) -> serde_json::Result<Self> {
        let mut response: Self = serde_json::from_str(body)?;
        response.blocks = serde_json::from_str(response.content.get())?;
        Ok(response)
    }

    /// The `content` field exactly as received
    pub fn content_json(&self) -> &str {
        self.content.get()
    }

    /// Parsed content blocks
    pub fn blocks(&self) -> &[ClaudeContentBlock] {
        &self.blocks
    }

    /// All text blocks concatenated
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(ClaudeContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Error envelope returned on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeErrorResponse {
    #[serde(rename = "type")]
    pub response_type: String,
    pub error: ClaudeErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaudeErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
