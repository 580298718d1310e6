use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use crate::{Result, SubtitleError};

const TIMING_PATTERN: &str =
    r"^\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})";

/// A single subtitle cue
///
/// Times are signed milliseconds so a provider's out-of-range values can be
/// represented before the timeline shifter clamps them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// Sequential number, reassigned on serialization
    pub index: u32,
    /// Start time in milliseconds
    pub start: i64,
    /// End time in milliseconds
    pub end: i64,
    /// Subtitle text, possibly multi-line
    pub text: String,
}

impl Cue {
    pub fn new(start: i64, end: i64, text: impl Into<String>) -> Self {
        Self {
            index: 0,
            start,
            end,
            text: text.into(),
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n",
            self.index,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Parse SRT text into cues.
///
/// Blocks are separated by empty lines. Whitespace-only lines between blocks
/// are ignored, inside a block they belong to the cue text. The index line is
/// read leniently (it is recomputed on output), the timing line is mandatory.
pub fn parse(input: &str) -> Result<Vec<Cue>> {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let timing = timing_regex()?;

    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in normalized.lines().chain(std::iter::once("")) {
        if line.is_empty() {
            if !block.is_empty() {
                cues.push(parse_block(&block, timing)?);
                block.clear();
            }
        } else if block.is_empty() && line.trim().is_empty() {
            continue;
        } else {
            block.push(line);
        }
    }

    Ok(cues)
}

fn parse_block(lines: &[&str], timing: &Regex) -> Result<Cue> {
    // Providers occasionally omit the index line; accept a block that opens with timing
    let (index, rest) = if timing.is_match(lines[0]) {
        (0, lines)
    } else {
        (lines[0].trim().parse::<u32>().unwrap_or(0), &lines[1..])
    };

    let timing_line = rest.first().ok_or_else(|| {
        SubtitleError::Format(format!("cue '{}' has no timing line", lines[0]))
    })?;

    let caps = timing.captures(timing_line).ok_or_else(|| {
        SubtitleError::Format(format!("malformed timing line: {}", timing_line))
    })?;

    let field = |i: usize| -> Result<i64> {
        caps[i]
            .parse::<i64>()
            .map_err(|e| SubtitleError::Format(format!("bad timing field '{}': {}", &caps[i], e)))
    };

    let start = compose_millis(field(1)?, field(2)?, field(3)?, field(4)?)
        .ok_or_else(|| SubtitleError::Format(format!("timestamp out of range: {}", timing_line)))?;
    let end = compose_millis(field(5)?, field(6)?, field(7)?, field(8)?)
        .ok_or_else(|| SubtitleError::Format(format!("timestamp out of range: {}", timing_line)))?;

    Ok(Cue {
        index,
        start,
        end,
        text: rest[1..].join("\n").trim_end().to_string(),
    })
}

/// Serialize cues, numbering them from 1 in sequence order
pub fn serialize(cues: &[Cue]) -> String {
    let mut output = String::new();

    for (i, cue) in cues.iter().enumerate() {
        output.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            cue.text
        ));
    }

    output
}

/// Reassign sequential indices to already-serialized SRT text
pub fn renumber(input: &str) -> Result<String> {
    Ok(serialize(&parse(input)?))
}

/// Format milliseconds as `HH:MM:SS,mmm`; negative values render as zero
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Parse a single `HH:MM:SS,mmm` timestamp to milliseconds
pub fn parse_timestamp(timestamp: &str) -> Result<i64> {
    let invalid = || SubtitleError::Format(format!("invalid timestamp: {}", timestamp));

    let (hms, millis) = timestamp
        .trim()
        .split_once([',', '.'])
        .ok_or_else(invalid)?;

    let parts: Vec<&str> = hms.split(':').collect();
    if parts.len() != 3 || millis.len() != 3 {
        return Err(invalid());
    }

    let number = |s: &str| s.parse::<i64>().map_err(|_| invalid());

    compose_millis(
        number(parts[0])?,
        number(parts[1])?,
        number(parts[2])?,
        number(millis)?,
    )
    .ok_or_else(invalid)
}

/// `None` when the value does not fit in an `i64` millisecond count
fn compose_millis(hours: i64, minutes: i64, seconds: i64, millis: i64) -> Option<i64> {
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(millis)
}

fn timing_regex() -> Result<&'static Regex> {
    static TIMING: OnceLock<Regex> = OnceLock::new();

    if let Some(re) = TIMING.get() {
        return Ok(re);
    }
    let re = Regex::new(TIMING_PATTERN)
        .map_err(|e| SubtitleError::Format(format!("timing pattern: {}", e)))?;
    Ok(TIMING.get_or_init(|| re))
}

/// An ordered subtitle document
#[derive(Debug, Clone, Default)]
pub struct SubtitleDocument {
    cues: Vec<Cue>,
}

impl SubtitleDocument {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    pub fn parse(input: &str) -> Result<Self> {
        Ok(Self::new(parse(input)?))
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Latest end time across all cues
    pub fn total_duration_ms(&self) -> i64 {
        self.cues.iter().map(|cue| cue.end).max().unwrap_or(0).max(0)
    }

    pub fn serialize(&self) -> String {
        serialize(&self.cues)
    }

    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        tokio::fs::write(path.as_ref(), self.serialize()).await?;
        Ok(())
    }

    /// Report non-fatal issues such as inverted timings, empty text or overlaps
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (i, cue) in self.cues.iter().enumerate() {
            if cue.end <= cue.start {
                issues.push(format!("Cue {}: End time is not after start time", i + 1));
            }

            if cue.text.trim().is_empty() {
                issues.push(format!("Cue {}: Empty text", i + 1));
            }
        }

        for (i, pair) in self.cues.windows(2).enumerate() {
            if pair[0].end > pair[1].start {
                issues.push(format!("Cues {} and {}: Overlapping timestamps", i + 1, i + 2));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:02,500\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\nagain\n\n";

    #[test]
    fn test_timestamp_formatting() {
        assert_eq!(format_timestamp(3_661_000), "01:01:01,000");
        assert_eq!(format_timestamp(1500), "00:00:01,500");
        assert_eq!(format_timestamp(0), "00:00:00,000");
        assert_eq!(format_timestamp(-250), "00:00:00,000");
    }

    #[test]
    fn test_timestamp_parsing() {
        assert_eq!(parse_timestamp("01:01:01,000").unwrap(), 3_661_000);
        assert_eq!(parse_timestamp("00:00:01,500").unwrap(), 1500);
        assert!(parse_timestamp("00:01,500").is_err());
        assert!(parse_timestamp("garbage").is_err());
    }

    #[test]
    fn test_parse_sample() {
        let cues = parse(SAMPLE).unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, 1000);
        assert_eq!(cues[0].end, 2500);
        assert_eq!(cues[0].text, "Hello");
        assert_eq!(cues[1].text, "World\nagain");
    }

    #[test]
    fn test_parse_crlf_and_missing_trailing_blank() {
        let input = "1\r\n00:00:01,000 --> 00:00:02,000\r\nHi\r\n\r\n2\r\n00:00:02,000 --> 00:00:03,000\r\nThere";
        let cues = parse(input).unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].text, "There");
    }

    #[test]
    fn test_parse_lenient_index() {
        let input = "x\n00:00:01,000 --> 00:00:02,000\nA\n\n00:00:03,000 --> 00:00:04,000\nB\n";
        let cues = parse(input).unwrap();

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 0);
        assert_eq!(cues[1].start, 3000);
        assert_eq!(cues[1].text, "B");
    }

    #[test]
    fn test_parse_rejects_bad_timing() {
        let input = "1\n00:00:01 -> 00:00:02\nBroken\n";
        let err = parse(input).unwrap_err();
        assert!(matches!(err, SubtitleError::Format(_)));
    }

    #[test]
    fn test_parse_rejects_out_of_range_hours() {
        let input = "1\n999999999999999:00:00,000 --> 999999999999999:00:01,000\nx\n\n";
        let err = parse(input).unwrap_err();
        assert!(matches!(err, SubtitleError::Format(_)));

        assert!(parse_timestamp("999999999999999:00:00,000").is_err());
    }

    #[test]
    fn test_parse_keeps_indentation_and_blank_looking_lines() {
        let cues = vec![Cue::new(0, 1000, "  indented"), Cue::new(1000, 2000, "A\n \nB")];
        let reparsed = parse(&serialize(&cues)).unwrap();

        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0].text, "  indented");
        assert_eq!(reparsed[1].text, "A\n \nB");

        let whitespace_line = parse("1\n00:00:00,000 --> 00:00:01,000\nA\n \nB\n\n").unwrap();
        assert_eq!(whitespace_line.len(), 1);
        assert_eq!(whitespace_line[0].text, "A\n \nB");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_serialize_numbers_from_one() {
        let cues = vec![Cue::new(0, 1000, "First"), Cue::new(1000, 2000, "Second")];
        let output = serialize(&cues);

        assert_eq!(
            output,
            "1\n00:00:00,000 --> 00:00:01,000\nFirst\n\n2\n00:00:01,000 --> 00:00:02,000\nSecond\n\n"
        );
    }

    #[test]
    fn test_parse_serialize_preserves_cues() {
        let cues = vec![
            Cue::new(0, 1500, "One"),
            Cue::new(1500, 1500, ""),
            Cue::new(2000, 3_600_500, "Two\nlines"),
        ];
        let reparsed = parse(&serialize(&cues)).unwrap();

        assert_eq!(reparsed.len(), cues.len());
        for (a, b) in cues.iter().zip(&reparsed) {
            assert_eq!((a.start, a.end, &a.text), (b.start, b.end, &b.text));
        }
    }

    #[test]
    fn test_renumber_concatenated_chunks() {
        let chunk = "1\n00:00:01,000 --> 00:00:02,000\nA\n\n2\n00:00:02,000 --> 00:00:03,000\nB\n\n";
        let combined = format!("{}\n{}", chunk, chunk);
        let output = renumber(&combined).unwrap();
        let indices: Vec<u32> = parse(&output).unwrap().iter().map(|c| c.index).collect();

        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_cue_display() {
        let mut cue = Cue::new(10_000, 15_000, "Test subtitle");
        cue.index = 1;

        assert_eq!(cue.to_string(), "1\n00:00:10,000 --> 00:00:15,000\nTest subtitle\n");
    }

    #[test]
    fn test_validation() {
        let doc = SubtitleDocument::new(vec![
            Cue::new(10_000, 5000, "Inverted"),
            Cue::new(4000, 6000, ""),
        ]);
        let issues = doc.validate();

        assert!(issues.iter().any(|issue| issue.contains("End time is not after start time")));
        assert!(issues.iter().any(|issue| issue.contains("Empty text")));
        assert!(issues.iter().any(|issue| issue.contains("Overlapping")));
        assert_eq!(doc.total_duration_ms(), 6000);
    }
}
