//! SubRip caption parser.
//!
//! Blocks of: an optional numeric index line, a `start --> end` timestamp
//! line, one or more text lines, and a blank separator. Malformed input is
//! an explicit error, never a silently-empty caption list; the caller is
//! expected to abort the render on failure rather than proceed captionless.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("caption file contains no cues")]
    Empty,
    #[error("line {line}: expected a timestamp line, got {text:?}")]
    ExpectedTimestamp { line: usize, text: String },
    #[error("line {line}: invalid timestamp {text:?}")]
    InvalidTimestamp { line: usize, text: String },
    #[error("line {line}: cue has no text")]
    MissingText { line: usize },
}

/// A timed caption record. Within a parsed list, entries are expected to be
/// sorted ascending by `start_ms` and pairwise non-overlapping; violations
/// are input defects and lookup is first-match-wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caption {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

pub fn parse_srt(input: &str) -> Result<Vec<Caption>, CaptionError> {
    let input = input.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = input.lines().map(|l| l.trim_end()).collect();

    let mut captions = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }

        // Optional cue index line.
        if lines[i].trim().parse::<u64>().is_ok() {
            i += 1;
        }

        let Some(&ts_line) = lines.get(i) else {
            return Err(CaptionError::ExpectedTimestamp {
                line: i + 1,
                text: String::new(),
            });
        };
        let (start_ms, end_ms) = parse_timestamp_line(ts_line, i + 1)?;
        i += 1;

        let mut text_lines: Vec<&str> = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            text_lines.push(lines[i].trim());
            i += 1;
        }
        if text_lines.is_empty() {
            return Err(CaptionError::MissingText { line: i });
        }

        captions.push(Caption {
            start_ms,
            end_ms,
            text: text_lines.join(" "),
        });
    }

    if captions.is_empty() {
        return Err(CaptionError::Empty);
    }
    Ok(captions)
}

fn parse_timestamp_line(line: &str, line_no: usize) -> Result<(u64, u64), CaptionError> {
    let Some((start, end)) = line.split_once("-->") else {
        return Err(CaptionError::ExpectedTimestamp {
            line: line_no,
            text: line.to_string(),
        });
    };
    let start_ms = parse_timestamp(start.trim()).ok_or_else(|| CaptionError::InvalidTimestamp {
        line: line_no,
        text: start.trim().to_string(),
    })?;
    // Trailing cue settings after the end time are ignored.
    let end = end.trim().split_whitespace().next().unwrap_or("");
    let end_ms = parse_timestamp(end).ok_or_else(|| CaptionError::InvalidTimestamp {
        line: line_no,
        text: end.to_string(),
    })?;
    Ok((start_ms, end_ms))
}

/// `HH:MM:SS,mmm` with `.` accepted as the millisecond separator.
fn parse_timestamp(s: &str) -> Option<u64> {
    let (hms, millis) = s
        .rsplit_once(',')
        .or_else(|| s.rsplit_once('.'))
        .unwrap_or((s, "0"));
    let millis: u64 = millis.parse().ok()?;
    if millis >= 1000 {
        return None;
    }

    let mut parts = hms.split(':').rev();
    let seconds: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next().map(|p| p.parse().ok()).unwrap_or(Some(0))?;
    let hours: u64 = parts.next().map(|p| p.parse().ok()).unwrap_or(Some(0))?;
    if parts.next().is_some() || seconds >= 60 || minutes >= 60 {
        return None;
    }

    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}
