// SRT transcript format
use super::{RawFragment, TranscriptParser};
use crate::error::Result;
use regex::Regex;

pub struct SrtParser;

impl TranscriptParser for SrtParser {
    fn parse(&self, contents: &str) -> Result<Vec<RawFragment>> {
        Ok(parse_cues(contents))
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

/// Collect cue blocks (`start --> end` followed by text lines) in file order.
///
/// Lines outside a cue, such as SRT indices, the WebVTT header or `NOTE`
/// blocks, are skipped. Multi-line cue text is joined with a space and cues
/// without text are dropped.
pub(super) fn parse_cues(contents: &str) -> Vec<RawFragment> {
    let timing_re = Regex::new(
        r"^\s*(\d+(?::\d{2}){1,2}(?:[.,]\d{1,9})?)\s*-->\s*(\d+(?::\d{2}){1,2}(?:[.,]\d{1,9})?)",
    )
    .expect("Invalid regex");

    let mut fragments = Vec::new();
    let mut current: Option<(String, String, Vec<&str>)> = None;

    for line in contents.lines() {
        if let Some(cap) = timing_re.captures(line) {
            flush_cue(current.take(), &mut fragments);
            current = Some((cap[1].to_string(), cap[2].to_string(), Vec::new()));
        } else if line.trim().is_empty() {
            flush_cue(current.take(), &mut fragments);
        } else if let Some((_, _, lines)) = current.as_mut() {
            lines.push(line.trim());
        }
    }
    flush_cue(current.take(), &mut fragments);

    fragments
}

fn flush_cue(cue: Option<(String, String, Vec<&str>)>, fragments: &mut Vec<RawFragment>) {
    if let Some((start, end, lines)) = cue {
        if !lines.is_empty() {
            fragments.push(RawFragment::new(start, end, lines.join(" ")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srt_parse() {
        let contents = "1\n00:00:01,500 --> 00:00:04,000\nHello, world!\n\n2\n00:00:04,500 --> 00:00:07,000\nThis is a test.\n";

        let fragments = SrtParser.parse(contents).unwrap();

        assert_eq!(fragments.len(), 2);
        assert_eq!(
            fragments[0],
            RawFragment::new("00:00:01,500", "00:00:04,000", "Hello, world!")
        );
        assert_eq!(fragments[1].text, "This is a test.");
    }

    #[test]
    fn test_multiline_cue_is_joined() {
        let contents = "1\r\n00:00:00,000 --> 00:00:05,000\r\nThis is line one.\r\nThis is line two.\r\n";

        let fragments = SrtParser.parse(contents).unwrap();

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "This is line one. This is line two.");
    }

    #[test]
    fn test_cue_without_text_is_dropped() {
        let contents = "1\n00:00:00,000 --> 00:00:01,000\n\n2\n00:00:01,000 --> 00:00:02,000\nkept\n";

        let fragments = SrtParser.parse(contents).unwrap();

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "kept");
    }
}
