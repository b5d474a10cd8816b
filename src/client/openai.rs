use crate::client::sse::{parse_delta, SseDecoder, SseEvent};
use crate::client::{ChatClient, ChatStream};
use crate::config::DEFAULT_BASE_URL;
use crate::error::{Result, VxError};
use crate::request::{ChatMessage, ChatRequest};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::debug;

/// Client for OpenAI-compatible chat completion APIs (OpenAI, Perplexity,
/// OpenRouter, local servers).
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a new client for the default endpoint.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at another API root, e.g. `https://api.openai.com/v1`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// POST the request and turn non-2xx statuses into `Api` errors.
    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        debug!(
            "Sending chat request to {} (model {}, stream {})",
            self.endpoint(),
            request.model,
            request.stream
        );

        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request);
        if request.stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!("Chat API response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(VxError::Api(format!(
                "Chat API error ({}): {}",
                status, api_error.error.message
            )));
        }

        Err(VxError::Api(format!(
            "Chat API error ({}): {}",
            status, error_body
        )))
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = self.send(request).await?.text().await?;
        debug!(
            "Chat API response: {}",
            body.chars().take(500).collect::<String>()
        );

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| VxError::Api("Response contained no choices".to_string()))
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        let response = self.send(request).await?;
        Ok(delta_stream(response.bytes_stream()))
    }

    fn name(&self) -> &'static str {
        "OpenAI-compatible"
    }
}

struct DeltaState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    body_done: bool,
    done: bool,
}

/// Turn an SSE byte stream into content deltas. The stream ends at
/// `[DONE]`, at the end of the body, or after the first error.
pub fn delta_stream<S, B, E>(body: S) -> ChatStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<VxError> + Send + 'static,
{
    let state = DeltaState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        body_done: false,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            if let Some(event) = state.pending.pop_front() {
                match event {
                    SseEvent::Done => {
                        state.done = true;
                        return None;
                    }
                    SseEvent::Data(data) => match parse_delta(&data) {
                        Ok(Some(content)) => return Some((Ok(content), state)),
                        Ok(None) => continue,
                        Err(e) => {
                            state.done = true;
                            return Some((Err(e), state));
                        }
                    },
                }
            }

            if state.body_done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.feed(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.body_done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
