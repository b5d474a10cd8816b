pub mod client;
pub mod config;
pub mod error;
pub mod explain;
pub mod request;
pub mod segment;
pub mod transcript;

pub use config::{resolve_model, Config, DEFAULT_MODEL};
pub use error::{Result, VxError};
pub use explain::{ExplainStats, Explainer};
pub use request::{build_requests, ChatMessage, ChatRequest, RequestConfig, Role};
pub use segment::{segment, SegmentMode, Segmenter, TextBucket};
pub use transcript::{load_transcript, Fragment, RawFragment, TranscriptFormat};
