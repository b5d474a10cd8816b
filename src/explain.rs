use crate::client::ChatClient;
use crate::error::{Result, VxError};
use crate::request::{build_requests, ChatRequest, RequestConfig};
use crate::segment::TextBucket;
use crate::transcript::format_timestamp;
use console::style;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Statistics from explaining a transcript.
#[derive(Debug, Clone, Default)]
pub struct ExplainStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the loop stopped before every bucket was attempted.
    pub halted: bool,
    pub errors: Vec<String>,
    pub elapsed: Duration,
}

/// How a streamed reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamOutcome {
    Finished,
    /// The cancel flag was seen mid-stream; the stream was dropped.
    Cancelled,
}

/// Sends one request per bucket and writes the replies to a sink.
///
/// Streaming requests are sent one after another and a failed request does
/// not stop the rest. Non-streaming requests are dispatched `concurrency` at a
/// time, replies are written in bucket order, and the first failure halts the
/// loop.
pub struct Explainer {
    client: Arc<dyn ChatClient>,
    concurrency: usize,
    show_progress: bool,
    cancelled: Arc<AtomicBool>,
}

impl Explainer {
    /// Create a new explainer with the given client.
    pub fn new(client: Box<dyn ChatClient>) -> Self {
        Self {
            client: Arc::from(client),
            concurrency: 1,
            show_progress: true,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Maximum number of non-streaming requests in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Share a cancellation flag, e.g. one set by a Ctrl+C handler.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Build a request for every bucket and write each reply to `out`.
    ///
    /// Only failures of `out` itself are returned as errors; request failures
    /// are logged and recorded in the stats.
    pub async fn explain<W: Write>(
        &self,
        buckets: &[TextBucket],
        config: &RequestConfig,
        out: &mut W,
    ) -> Result<ExplainStats> {
        let start_time = Instant::now();
        let requests = build_requests(buckets, config);

        info!(
            "Explaining {} segments with {} ({})",
            buckets.len(),
            self.client.name(),
            if config.stream { "streaming" } else { "batch" }
        );

        let mut stats = if config.stream {
            self.explain_streaming(buckets, &requests, out).await?
        } else {
            self.explain_batch(buckets, requests, out).await?
        };
        stats.elapsed = start_time.elapsed();

        info!(
            "Explained {}/{} segments in {:.2}s",
            stats.succeeded,
            stats.total,
            stats.elapsed.as_secs_f64()
        );

        Ok(stats)
    }

    async fn explain_streaming<W: Write>(
        &self,
        buckets: &[TextBucket],
        requests: &[ChatRequest],
        out: &mut W,
    ) -> Result<ExplainStats> {
        let mut stats = ExplainStats {
            total: requests.len(),
            ..Default::default()
        };

        for (index, (bucket, request)) in buckets.iter().zip(requests).enumerate() {
            if self.is_cancelled() {
                stats.halted = true;
                break;
            }

            write_header(out, index, requests.len(), bucket)?;

            match self.stream_one(request, out).await {
                Ok(StreamOutcome::Finished) => stats.succeeded += 1,
                Ok(StreamOutcome::Cancelled) => {
                    warn!("Cancelled while streaming segment {}", index + 1);
                    stats.halted = true;
                    break;
                }
                Err(VxError::Io(e)) => return Err(VxError::Io(e)),
                Err(e) => {
                    warn!("Segment {} failed: {}", index + 1, e);
                    writeln!(out)?;
                    stats.failed += 1;
                    stats.errors.push(e.to_string());
                }
            }
        }

        Ok(stats)
    }

    async fn stream_one<W: Write>(
        &self,
        request: &ChatRequest,
        out: &mut W,
    ) -> Result<StreamOutcome> {
        let mut stream = self.client.complete_stream(request).await?;

        while let Some(delta) = stream.next().await {
            if self.is_cancelled() {
                debug!("Releasing response stream");
                return Ok(StreamOutcome::Cancelled);
            }
            out.write_all(delta?.as_bytes())?;
            out.flush()?;
        }

        writeln!(out)?;
        Ok(StreamOutcome::Finished)
    }

    async fn explain_batch<W: Write>(
        &self,
        buckets: &[TextBucket],
        requests: Vec<ChatRequest>,
        out: &mut W,
    ) -> Result<ExplainStats> {
        let total = requests.len();
        let mut stats = ExplainStats {
            total,
            ..Default::default()
        };

        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        // `buffered` keeps replies in request order; dropping it cancels
        // whatever is still in flight.
        let client = self.client.clone();
        let mut replies = stream::iter(requests.into_iter().map(move |request| {
            let client = client.clone();
            async move { client.complete(&request).await }
        }))
        .buffered(self.concurrency);

        for (index, bucket) in buckets.iter().enumerate() {
            if self.is_cancelled() {
                stats.halted = true;
                break;
            }

            let Some(reply) = replies.next().await else {
                break;
            };

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }

            match reply {
                Ok(content) => {
                    let written = match progress_bar {
                        Some(ref pb) => pb.suspend(|| write_reply(out, index, total, bucket, &content)),
                        None => write_reply(out, index, total, bucket, &content),
                    };
                    written?;
                    stats.succeeded += 1;
                }
                Err(e) => {
                    warn!("Segment {} failed, stopping: {}", index + 1, e);
                    stats.failed += 1;
                    stats.errors.push(e.to_string());
                    stats.halted = index + 1 < total;
                    break;
                }
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        Ok(stats)
    }
}

fn write_header<W: Write>(
    out: &mut W,
    index: usize,
    total: usize,
    bucket: &TextBucket,
) -> std::io::Result<()> {
    let header = format!(
        "── Segment {}/{} [{} - {}] ──",
        index + 1,
        total,
        format_timestamp(bucket.start),
        format_timestamp(bucket.end)
    );
    writeln!(out, "{}", style(header).cyan().bold())
}

fn write_reply<W: Write>(
    out: &mut W,
    index: usize,
    total: usize,
    bucket: &TextBucket,
    content: &str,
) -> std::io::Result<()> {
    write_header(out, index, total, bucket)?;
    writeln!(out, "{}", content.trim_end())?;
    writeln!(out)?;
    out.flush()
}
