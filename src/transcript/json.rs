// JSON transcript format
use super::{RawFragment, TranscriptParser};
use crate::error::Result;
use serde::Deserialize;

/// Accepts a bare array of fragments or an object wrapping them in `text`.
pub struct JsonParser;

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTranscript {
    Fragments(Vec<RawFragment>),
    Wrapped { text: Vec<RawFragment> },
}

impl TranscriptParser for JsonParser {
    fn parse(&self, contents: &str) -> Result<Vec<RawFragment>> {
        let transcript: JsonTranscript = serde_json::from_str(contents)?;
        Ok(match transcript {
            JsonTranscript::Fragments(fragments) => fragments,
            JsonTranscript::Wrapped { text } => text,
        })
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
