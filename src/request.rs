//! Chat completion payloads built from text buckets.

use crate::config::resolve_model;
use crate::segment::TextBucket;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub stream: bool,
    pub messages: Vec<ChatMessage>,
}

/// Settings shared by every request built for a transcript.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Model name; `None` selects the default model.
    pub model: Option<String>,
    /// Prepended verbatim to each bucket's text.
    pub prompt: String,
    pub stream: bool,
}

impl ChatRequest {
    /// A single user message containing the prompt followed by the bucket text.
    pub fn for_bucket(bucket: &TextBucket, config: &RequestConfig) -> Self {
        Self {
            model: resolve_model(config.model.as_deref()),
            stream: config.stream,
            messages: vec![ChatMessage {
                role: Role::User,
                content: format!("{}{}", config.prompt, bucket.text),
            }],
        }
    }
}

/// One request per bucket, in bucket order.
pub fn build_requests(buckets: &[TextBucket], config: &RequestConfig) -> Vec<ChatRequest> {
    buckets
        .iter()
        .map(|bucket| ChatRequest::for_bucket(bucket, config))
        .collect()
}
