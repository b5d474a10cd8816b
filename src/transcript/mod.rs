pub mod json;
pub mod srt;
pub mod timestamp;
pub mod vtt;

use crate::error::{Result, VxError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub use timestamp::{format_timestamp, parse_timestamp};

/// A transcript fragment as delivered by the transcript source, with
/// string-encoded offsets such as `00:01:05` or `00:01:05,250`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFragment {
    pub start: String,
    pub end: String,
    pub text: String,
}

impl RawFragment {
    pub fn new(start: impl Into<String>, end: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            text: text.into(),
        }
    }
}

/// A transcript fragment with offsets measured from the start of the video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl Fragment {
    pub fn new(start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Parse both offsets, failing on the first malformed one.
    pub fn parse(raw: &RawFragment) -> Result<Self> {
        let start = parse_timestamp(&raw.start).ok_or_else(|| VxError::TimeParse {
            value: raw.start.clone(),
        })?;
        let end = parse_timestamp(&raw.end).ok_or_else(|| VxError::TimeParse {
            value: raw.end.clone(),
        })?;

        Ok(Self::new(start, end, raw.text.clone()))
    }

    /// Parse both offsets, substituting zero for malformed ones.
    pub fn parse_lenient(raw: &RawFragment) -> Self {
        let lenient = |value: &str| {
            parse_timestamp(value).unwrap_or_else(|| {
                warn!("Unparsable timestamp {:?}, using 00:00:00", value);
                Duration::ZERO
            })
        };

        Self::new(lenient(&raw.start), lenient(&raw.end), raw.text.clone())
    }
}

/// Supported transcript file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFormat {
    Json,
    Srt,
    Vtt,
}

impl std::fmt::Display for TranscriptFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptFormat::Json => write!(f, "json"),
            TranscriptFormat::Srt => write!(f, "srt"),
            TranscriptFormat::Vtt => write!(f, "vtt"),
        }
    }
}

impl std::str::FromStr for TranscriptFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(TranscriptFormat::Json),
            "srt" => Ok(TranscriptFormat::Srt),
            "vtt" => Ok(TranscriptFormat::Vtt),
            _ => Err(format!(
                "Unknown transcript format: {}. Use 'json', 'srt', or 'vtt'",
                s
            )),
        }
    }
}

impl TranscriptFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                VxError::Config(format!(
                    "Cannot detect transcript format of {} (no extension)",
                    path.display()
                ))
            })?;

        extension.parse().map_err(VxError::Config)
    }
}

pub trait TranscriptParser {
    fn parse(&self, contents: &str) -> Result<Vec<RawFragment>>;
    fn extension(&self) -> &'static str;
}

pub fn create_parser(format: TranscriptFormat) -> Box<dyn TranscriptParser> {
    match format {
        TranscriptFormat::Json => Box::new(json::JsonParser),
        TranscriptFormat::Srt => Box::new(srt::SrtParser),
        TranscriptFormat::Vtt => Box::new(vtt::VttParser),
    }
}

/// Read a transcript file into raw fragments, in file order.
pub fn load_transcript(path: &Path) -> Result<Vec<RawFragment>> {
    let format = TranscriptFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path)?;
    let fragments = create_parser(format).parse(&contents)?;

    debug!(
        "Loaded {} fragments from {} ({})",
        fragments.len(),
        path.display(),
        format
    );

    Ok(fragments)
}
