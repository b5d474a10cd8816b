use crate::error::{Result, VxError};
use crate::request::RequestConfig;
use crate::segment::SegmentMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "mistral-7b-instruct";

/// OpenAI-compatible endpoint used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

pub const DEFAULT_PROMPT: &str = "ELI5 to me the content of this video snippet. Explain to me what the text discusses. Do not mention this prompt in your output.";

/// Default bucket length (five minutes).
pub const DEFAULT_CHUNK_SPAN_SECS: u64 = 5 * 60;

/// Resolve the model for a request, falling back to [`DEFAULT_MODEL`] when
/// none (or a blank name) was requested.
pub fn resolve_model(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MODEL)
        .to_string()
}

/// Parse a span such as `300`, `90s`, `5m` or `1h`. Bare numbers are seconds.
pub fn parse_span(value: &str) -> std::result::Result<Duration, String> {
    let value = value.trim();
    let (digits, multiplier) = match value.char_indices().last() {
        Some((i, 's')) => (&value[..i], 1),
        Some((i, 'm')) => (&value[..i], 60),
        Some((i, 'h')) => (&value[..i], 3600),
        _ => (value, 1),
    };

    let amount: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("Invalid span: {}. Use e.g. '300', '90s', '5m' or '1h'", value))?;

    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Span too large: {}", value))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: Option<String>,
    pub prompt: String,
    pub stream: bool,
    pub chunk_span_secs: u64,
    pub concurrency: usize,
    pub mode: SegmentMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
            prompt: DEFAULT_PROMPT.to_string(),
            stream: false,
            chunk_span_secs: DEFAULT_CHUNK_SPAN_SECS,
            concurrency: 1,
            mode: SegmentMode::default(),
        }
    }
}

impl Config {
    /// Load defaults, then the config file, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                match toml::from_str::<Config>(&contents) {
                    Ok(file_config) => config = file_config,
                    Err(e) => warn!("Ignoring invalid config file {:?}: {}", config_path, e),
                }
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `VX_*` overrides. Unparsable numeric values are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("VX_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = var("VX_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = var("VX_MODEL") {
            self.model = Some(model);
        }
        if let Some(prompt) = var("VX_PROMPT") {
            self.prompt = prompt;
        }
        if let Some(span) = var("VX_CHUNK_SPAN") {
            match parse_span(&span) {
                Ok(d) => self.chunk_span_secs = d.as_secs(),
                Err(e) => warn!("Ignoring VX_CHUNK_SPAN: {}", e),
            }
        }
        if let Some(concurrency) = var("VX_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.concurrency = c;
            }
        }
    }

    /// Check the settings needed before any transcript is processed.
    /// The API key is only required when requests will actually be sent.
    pub fn validate(&self, require_api_key: bool) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(VxError::Config("No prompt provided".to_string()));
        }

        if require_api_key && self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(VxError::Config(
                "No API key provided. Pass --key or export VX_API_KEY".to_string(),
            ));
        }

        if self.base_url.trim().is_empty() {
            return Err(VxError::Config("Base URL must not be empty".to_string()));
        }

        if self.chunk_span_secs == 0 {
            return Err(VxError::Config(
                "Chunk span must be greater than 0".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(VxError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn chunk_span(&self) -> Duration {
        Duration::from_secs(self.chunk_span_secs)
    }

    pub fn request_config(&self) -> RequestConfig {
        RequestConfig {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            stream: self.stream,
        }
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vx").join("config.toml"))
    }
}
