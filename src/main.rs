use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vx::client::OpenAiClient;
use vx::config::{parse_span, Config};
use vx::request::build_requests;
use vx::segment::{SegmentMode, Segmenter};
use vx::transcript::load_transcript;
use vx::Explainer;

#[derive(Parser)]
#[command(name = "vx")]
#[command(version, about = "Explain a video transcript segment by segment with an LLM")]
#[command(long_about = "Split a timestamped transcript (.json, .srt or .vtt) into time-bounded segments and send each one, prefixed with a prompt, to an OpenAI-compatible chat API.")]
struct Cli {
    /// Transcript file (.json, .srt or .vtt)
    transcript: PathBuf,

    /// Prompt prepended to every segment
    #[arg(short, long)]
    prompt: Option<String>,

    /// Model name (defaults to mistral-7b-instruct)
    #[arg(short, long)]
    model: Option<String>,

    /// API key (or set VX_API_KEY)
    #[arg(short, long)]
    key: Option<String>,

    /// Base API URL
    #[arg(long)]
    base_url: Option<String>,

    /// Stream responses to stdout as they are generated
    #[arg(short, long)]
    stream: bool,

    /// Segment length, e.g. 300, 90s, 5m, 1h
    #[arg(long, value_parser = parse_span)]
    span: Option<Duration>,

    /// Reproduce the historical segmentation (lenient timestamps, quirky buckets)
    #[arg(long)]
    legacy: bool,

    /// Number of concurrent API requests (non-streaming only)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Print the request payloads as JSON lines instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Flags take precedence over the config file and environment.
    fn apply(&self, config: &mut Config) {
        if let Some(ref prompt) = self.prompt {
            config.prompt = prompt.clone();
        }
        if let Some(ref model) = self.model {
            config.model = Some(model.clone());
        }
        if let Some(ref key) = self.key {
            config.api_key = Some(key.clone());
        }
        if let Some(ref url) = self.base_url {
            config.base_url = url.clone();
        }
        if self.stream {
            config.stream = true;
        }
        if let Some(span) = self.span {
            config.chunk_span_secs = span.as_secs();
        }
        if self.legacy {
            config.mode = SegmentMode::Legacy;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Load and validate configuration
    let mut config = Config::load().context("Failed to load configuration")?;
    cli.apply(&mut config);
    config
        .validate(!cli.dry_run)
        .context("Configuration validation failed")?;

    if !cli.transcript.exists() {
        anyhow::bail!("Transcript not found: {}", cli.transcript.display());
    }

    let segmenter = Segmenter::new(config.chunk_span()).with_mode(config.mode);

    info!("Transcript: {}", cli.transcript.display());
    info!(
        "Span:       {}s ({} mode)",
        segmenter.span().as_secs(),
        segmenter.mode()
    );
    info!("Model:      {}", vx::resolve_model(config.model.as_deref()));

    let fragments = load_transcript(&cli.transcript).context("Failed to read transcript")?;
    let buckets = segmenter
        .segment_raw(&fragments)
        .context("Failed to segment transcript")?;

    info!(
        "Split {} fragments into {} segments",
        fragments.len(),
        buckets.len()
    );

    let request_config = config.request_config();

    if cli.dry_run {
        for request in build_requests(&buckets, &request_config) {
            println!("{}", serde_json::to_string(&request)?);
        }
        return Ok(());
    }

    let api_key = config.api_key.clone().unwrap_or_default();
    let client = OpenAiClient::new(api_key).with_base_url(config.base_url.clone());

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || {
        // A second Ctrl+C exits without waiting for in-flight requests.
        if flag.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
    })
    .context("Failed to install Ctrl+C handler")?;

    let explainer = Explainer::new(Box::new(client))
        .with_concurrency(config.concurrency)
        .with_progress(!cli.quiet && !config.stream)
        .with_cancel_flag(cancelled.clone());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let stats = explainer
        .explain(&buckets, &request_config, &mut out)
        .await
        .context("Failed to write output")?;

    if cancelled.load(Ordering::Relaxed) {
        warn!("Cancelled by user");
    }

    if stats.failed > 0 {
        anyhow::bail!(
            "{} of {} segments failed: {}",
            stats.failed,
            stats.total,
            stats.errors.join("; ")
        );
    }

    Ok(())
}
