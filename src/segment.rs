//! Regrouping of transcript fragments into time-bounded text buckets.

use crate::error::{Result, VxError};
use crate::transcript::{Fragment, RawFragment};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// How fragments are merged and how malformed offsets are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentMode {
    /// Malformed offsets are errors and every fragment's text lands in
    /// exactly one bucket.
    #[default]
    Strict,
    /// Reproduces the historical chunker: malformed offsets read as zero,
    /// the fragment that opens a new bucket loses its text, and the trailing
    /// bucket carries only the last fragment.
    Legacy,
}

impl std::fmt::Display for SegmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentMode::Strict => write!(f, "strict"),
            SegmentMode::Legacy => write!(f, "legacy"),
        }
    }
}

impl std::str::FromStr for SegmentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(SegmentMode::Strict),
            "legacy" => Ok(SegmentMode::Legacy),
            _ => Err(format!("Unknown mode: {}. Use 'strict' or 'legacy'", s)),
        }
    }
}

/// Merged transcript text covering `start..end` of the video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBucket {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// Splits transcripts into buckets of roughly `span` length.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    span: Duration,
    mode: SegmentMode,
}

impl Segmenter {
    pub fn new(span: Duration) -> Self {
        Self {
            span,
            mode: SegmentMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: SegmentMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn span(&self) -> Duration {
        self.span
    }

    pub fn mode(&self) -> SegmentMode {
        self.mode
    }

    pub fn segment(&self, fragments: &[Fragment]) -> Result<Vec<TextBucket>> {
        segment(fragments, self.span, self.mode)
    }

    /// Parse raw offsets according to the mode, then segment.
    pub fn segment_raw(&self, raw: &[RawFragment]) -> Result<Vec<TextBucket>> {
        let fragments: Vec<Fragment> = match self.mode {
            SegmentMode::Strict => raw.iter().map(Fragment::parse).collect::<Result<_>>()?,
            SegmentMode::Legacy => raw.iter().map(Fragment::parse_lenient).collect(),
        };
        self.segment(&fragments)
    }
}

/// Group `fragments` into buckets, closing a bucket once a fragment starts
/// strictly after the bucket's start plus `span`.
///
/// Fragments are expected in time order. Returns `InvalidInput` when there are
/// no fragments or none of them carries text.
pub fn segment(
    fragments: &[Fragment],
    span: Duration,
    mode: SegmentMode,
) -> Result<Vec<TextBucket>> {
    if fragments.is_empty() {
        return Err(VxError::InvalidInput(
            "Transcript contains no fragments".to_string(),
        ));
    }

    let buckets = match mode {
        SegmentMode::Strict => segment_strict(fragments, span),
        SegmentMode::Legacy => segment_legacy(fragments, span),
    };

    if buckets.is_empty() {
        return Err(VxError::InvalidInput("Transcript contains no text".to_string()));
    }

    debug!(
        "Segmented {} fragments into {} buckets ({} mode, span {}s)",
        fragments.len(),
        buckets.len(),
        mode,
        span.as_secs()
    );

    Ok(buckets)
}

fn segment_strict(fragments: &[Fragment], span: Duration) -> Vec<TextBucket> {
    let mut buckets = Vec::new();
    let mut anchor = fragments[0].start;
    let mut end = fragments[0].end;
    let mut buffer = TextBuffer::default();

    for fragment in fragments {
        if fragment.start > anchor.saturating_add(span) {
            if !buffer.is_empty() {
                // Overlapping cues would otherwise make adjacent buckets overlap.
                buckets.push(TextBucket {
                    start: anchor,
                    end: end.min(fragment.start),
                    text: buffer.take(),
                });
            }
            anchor = fragment.start;
        }
        buffer.push(&fragment.text);
        end = fragment.end;
    }

    if !buffer.is_empty() {
        buckets.push(TextBucket {
            start: anchor,
            end,
            text: buffer.take(),
        });
    }

    buckets
}

fn segment_legacy(fragments: &[Fragment], span: Duration) -> Vec<TextBucket> {
    let mut buckets = Vec::new();
    let mut anchor = fragments[0].start;
    let mut buffer = TextBuffer::default();

    for fragment in fragments {
        if fragment.start > anchor.saturating_add(span) {
            if buffer.is_empty() {
                debug!("Skipping empty bucket at {}s", anchor.as_secs());
            } else {
                buckets.push(TextBucket {
                    start: anchor,
                    end: fragment.end,
                    text: buffer.take(),
                });
            }
            anchor = fragment.start;
            continue;
        }
        buffer.push(&fragment.text);
    }

    if !buffer.is_empty() {
        let last = &fragments[fragments.len() - 1];
        let text = match last.text.trim() {
            "" => buffer.take(),
            text => text.to_string(),
        };
        buckets.push(TextBucket {
            start: last.start,
            end: last.end,
            text,
        });
    }

    // Every text-bearing fragment split a bucket and lost its text.
    if buckets.is_empty() {
        if let Some(last) = fragments.iter().rev().find(|f| !f.text.trim().is_empty()) {
            buckets.push(TextBucket {
                start: last.start,
                end: last.end,
                text: last.text.trim().to_string(),
            });
        }
    }

    buckets
}

/// Space-joined text accumulator that ignores blank fragments.
#[derive(Default)]
struct TextBuffer(String);

impl TextBuffer {
    fn push(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        self.0.push_str(text);
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn take(&mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    fn frag(start: u64, end: u64, text: &str) -> Fragment {
        Fragment::new(Duration::from_secs(start), Duration::from_secs(end), text)
    }

    fn bucket(start: u64, end: u64, text: &str) -> TextBucket {
        TextBucket {
            start: Duration::from_secs(start),
            end: Duration::from_secs(end),
            text: text.to_string(),
        }
    }

    fn hello_world_later() -> Vec<Fragment> {
        vec![
            frag(0, 2, "hello"),
            frag(3, 5, "world"),
            frag(600, 602, "later"),
        ]
    }

    #[test]
    fn test_empty_input_is_rejected() {
        for mode in [SegmentMode::Strict, SegmentMode::Legacy] {
            match segment(&[], FIVE_MINUTES, mode) {
                Err(VxError::InvalidInput(_)) => {}
                other => panic!("expected InvalidInput, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_blank_transcript_is_rejected() {
        let fragments = vec![frag(0, 1, "  "), frag(2, 3, "")];
        assert!(segment(&fragments, FIVE_MINUTES, SegmentMode::Strict).is_err());
        assert!(segment(&fragments, FIVE_MINUTES, SegmentMode::Legacy).is_err());
    }

    #[test]
    fn test_strict_splits_and_keeps_every_fragment() {
        let buckets = segment(&hello_world_later(), FIVE_MINUTES, SegmentMode::Strict).unwrap();

        assert_eq!(
            buckets,
            vec![bucket(0, 5, "hello world"), bucket(600, 602, "later")]
        );
    }

    // Legacy: the splitting fragment closes the bucket with its own end time
    // and its text is dropped; nothing trails because the buffer is empty.
    #[test]
    fn test_legacy_drops_splitting_fragment_text() {
        let buckets = segment(&hello_world_later(), FIVE_MINUTES, SegmentMode::Legacy).unwrap();

        assert_eq!(buckets, vec![bucket(0, 602, "hello world")]);
    }

    #[test]
    fn test_legacy_trailing_bucket_uses_last_fragment() {
        let fragments = vec![frag(0, 2, "a"), frag(3, 5, "b")];
        let buckets = segment(&fragments, FIVE_MINUTES, SegmentMode::Legacy).unwrap();

        assert_eq!(buckets, vec![bucket(3, 5, "b")]);
    }

    #[test]
    fn test_strict_trailing_bucket_uses_buffer() {
        let fragments = vec![frag(0, 2, "a"), frag(3, 5, "b")];
        let buckets = segment(&fragments, FIVE_MINUTES, SegmentMode::Strict).unwrap();

        assert_eq!(buckets, vec![bucket(0, 5, "a b")]);
    }

    #[test]
    fn test_multiple_splits() {
        let fragments = vec![
            frag(0, 10, "a"),
            frag(100, 110, "b"),
            frag(400, 410, "c"),
            frag(500, 510, "d"),
            frag(800, 810, "e"),
        ];

        let strict = segment(&fragments, FIVE_MINUTES, SegmentMode::Strict).unwrap();
        assert_eq!(
            strict,
            vec![
                bucket(0, 110, "a b"),
                bucket(400, 510, "c d"),
                bucket(800, 810, "e"),
            ]
        );

        // Legacy buckets overlap: each ends where the next one's opener ends.
        let legacy = segment(&fragments, FIVE_MINUTES, SegmentMode::Legacy).unwrap();
        assert_eq!(legacy, vec![bucket(0, 410, "a b"), bucket(400, 810, "d")]);
    }

    #[test]
    fn test_legacy_skips_empty_buckets() {
        let fragments = vec![frag(0, 1, "a"), frag(400, 401, "b"), frag(800, 801, "c")];
        let buckets = segment(&fragments, FIVE_MINUTES, SegmentMode::Legacy).unwrap();

        assert_eq!(buckets, vec![bucket(0, 401, "a")]);
    }

    #[test]
    fn test_legacy_keeps_text_only_found_in_splitting_fragments() {
        let fragments = vec![frag(0, 1, ""), frag(400, 401, "real speech")];
        let buckets = segment(&fragments, FIVE_MINUTES, SegmentMode::Legacy).unwrap();

        assert_eq!(buckets, vec![bucket(400, 401, "real speech")]);

        let fragments = vec![
            frag(0, 1, " "),
            frag(400, 401, "first"),
            frag(800, 801, "second"),
        ];
        let buckets = segment(&fragments, FIVE_MINUTES, SegmentMode::Legacy).unwrap();

        assert_eq!(buckets, vec![bucket(800, 801, "second")]);
    }

    #[test]
    fn test_single_long_fragment() {
        let fragments = vec![frag(0, 900, "long")];

        for mode in [SegmentMode::Strict, SegmentMode::Legacy] {
            let buckets = segment(&fragments, FIVE_MINUTES, mode).unwrap();
            assert_eq!(buckets, vec![bucket(0, 900, "long")]);
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let fragments = vec![frag(0, 1, "a"), frag(300, 301, "b")];
        let buckets = segment(&fragments, FIVE_MINUTES, SegmentMode::Strict).unwrap();

        assert_eq!(buckets, vec![bucket(0, 301, "a b")]);
    }

    #[test]
    fn test_overlapping_fragments_are_clamped() {
        let fragments = vec![frag(0, 5, "a"), frag(3, 8, "b")];
        let buckets = segment(&fragments, Duration::from_secs(2), SegmentMode::Strict).unwrap();

        assert_eq!(buckets, vec![bucket(0, 3, "a"), bucket(3, 8, "b")]);
    }

    #[test]
    fn test_zero_span() {
        let fragments = vec![frag(0, 1, "a"), frag(0, 1, "b"), frag(2, 3, "c")];
        let buckets = segment(&fragments, Duration::ZERO, SegmentMode::Strict).unwrap();

        assert_eq!(buckets, vec![bucket(0, 1, "a b"), bucket(2, 3, "c")]);
    }

    #[test]
    fn test_text_is_trimmed_and_space_joined() {
        let fragments = vec![frag(0, 1, " one "), frag(1, 2, ""), frag(2, 3, "two\n")];
        let buckets = segment(&fragments, FIVE_MINUTES, SegmentMode::Strict).unwrap();

        assert_eq!(buckets[0].text, "one two");
    }

    #[test]
    fn test_segmenter_defaults_to_strict() {
        let segmenter = Segmenter::new(FIVE_MINUTES);
        assert_eq!(segmenter.span(), FIVE_MINUTES);
        assert_eq!(segmenter.mode(), SegmentMode::Strict);

        let segmenter = segmenter.with_mode(SegmentMode::Legacy);
        assert_eq!(segmenter.mode(), SegmentMode::Legacy);
    }

    #[test]
    fn test_segmenter_parses_raw_strictly() {
        let raw = vec![
            RawFragment::new("00:00:00", "00:00:02", "hello"),
            RawFragment::new("00:00:03", "bogus", "world"),
        ];

        let result = Segmenter::new(FIVE_MINUTES).segment_raw(&raw);
        assert!(matches!(result, Err(VxError::TimeParse { .. })));
    }

    #[test]
    fn test_segmenter_parses_raw_leniently() {
        let raw = vec![
            RawFragment::new("00:00:00", "00:00:02", "hello"),
            RawFragment::new("bogus", "00:00:05", "world"),
        ];

        let buckets = Segmenter::new(FIVE_MINUTES)
            .with_mode(SegmentMode::Legacy)
            .segment_raw(&raw)
            .unwrap();

        assert_eq!(buckets, vec![bucket(0, 5, "world")]);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("strict".parse::<SegmentMode>().unwrap(), SegmentMode::Strict);
        assert_eq!("LEGACY".parse::<SegmentMode>().unwrap(), SegmentMode::Legacy);
        assert!("loose".parse::<SegmentMode>().is_err());
        assert_eq!(SegmentMode::default(), SegmentMode::Strict);
    }
}
