// WebVTT transcript format
use super::{srt::parse_cues, RawFragment, TranscriptParser};
use crate::error::{Result, VxError};

pub struct VttParser;

impl TranscriptParser for VttParser {
    fn parse(&self, contents: &str) -> Result<Vec<RawFragment>> {
        if !contents.trim_start_matches('\u{feff}').starts_with("WEBVTT") {
            return Err(VxError::InvalidInput(
                "WebVTT transcript must start with a WEBVTT header".to_string(),
            ));
        }
        Ok(parse_cues(contents))
    }

    fn extension(&self) -> &'static str {
        "vtt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vtt_parse() {
        let contents = "WEBVTT\n\nNOTE generated\n\n00:00:01.500 --> 00:00:04.000 align:start\nHello, world!\n\n00:05.000 --> 00:07.000\nShort form.\n";

        let fragments = VttParser.parse(contents).unwrap();

        assert_eq!(fragments.len(), 2);
        assert_eq!(
            fragments[0],
            RawFragment::new("00:00:01.500", "00:00:04.000", "Hello, world!")
        );
        assert_eq!(fragments[1].start, "00:05.000");
        assert_eq!(fragments[1].text, "Short form.");
    }

    #[test]
    fn test_vtt_requires_header() {
        assert!(VttParser.parse("00:00:01.000 --> 00:00:02.000\nhi\n").is_err());
    }
}
