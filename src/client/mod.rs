pub mod openai;
pub mod sse;

use crate::error::Result;
use crate::request::ChatRequest;
use async_trait::async_trait;
use futures::stream::BoxStream;

pub use openai::OpenAiClient;

/// Incremental content deltas of one streamed response. Dropping the stream
/// releases the underlying connection.
pub type ChatStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a non-streaming request and return the reply text.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Send a request with `stream: true` and return its content deltas.
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream>;

    fn name(&self) -> &'static str;
}
