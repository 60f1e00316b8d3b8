//! Incremental progress parsing of ffmpeg output lines.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::timecode::parse_time;

static TIME_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?:^|[\s_])(?:out_)?time=\s*(\S+)").ok());
static DURATION_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Duration:\s*(\d+:\d{2}:\d{2}(?:\.\d+)?)").ok());

/// A progress snapshot of a running conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Media time processed so far.
    pub elapsed: Duration,
    /// Expected media length of the output.
    pub total: Duration,
    /// Process id of the running ffmpeg.
    pub process_id: u32,
}

impl ConversionProgress {
    /// Whole percent of `elapsed` over `total`, rounded to the nearest
    /// percent. Zero when the total is zero.
    pub fn percent(&self) -> u32 {
        let total = self.total.as_secs_f64();
        if total <= 0.0 {
            return 0;
        }
        let ratio = self.elapsed.as_secs_f64() / total;
        // Scaling before rounding keeps 0.29 and 0.57 from truncating to 28
        // and 56.
        (ratio * 100.0).round().max(0.0) as u32
    }
}

/// Turns ffmpeg stats lines into [`ConversionProgress`] snapshots.
///
/// Lines are fed one at a time as they arrive. The parser never fails;
/// lines without a usable `time=` value are skipped.
#[derive(Debug, Clone, Default)]
pub struct ProgressParser {
    total: Option<Duration>,
    process_id: u32,
}

impl ProgressParser {
    /// A parser with a known total, or one that learns it from the
    /// `Duration:` header when `total` is `None` or zero.
    pub fn new(total: Option<Duration>) -> Self {
        Self {
            total: total.filter(|t| !t.is_zero()),
            process_id: 0,
        }
    }

    pub fn set_process_id(&mut self, process_id: u32) {
        self.process_id = process_id;
    }

    pub fn total(&self) -> Option<Duration> {
        self.total
    }

    /// Consumes one line, returning a snapshot when it carries elapsed time
    /// and a non-zero total is known.
    pub fn parse_line(&mut self, line: &str) -> Option<ConversionProgress> {
        if self.total.is_none() {
            self.total = parse_header_duration(line).filter(|t| !t.is_zero());
        }

        let elapsed = parse_elapsed(line)?;
        let total = self.total?;
        Some(ConversionProgress {
            elapsed,
            total,
            process_id: self.process_id,
        })
    }
}

/// Elapsed media time of a stats line.
pub fn parse_elapsed(line: &str) -> Option<Duration> {
    let re = TIME_REGEX.as_ref()?;
    let caps = re.captures(line)?;
    parse_time(caps.get(1)?.as_str())
}

fn parse_header_duration(line: &str) -> Option<Duration> {
    let re = DURATION_REGEX.as_ref()?;
    let caps = re.captures(line)?;
    parse_time(caps.get(1)?.as_str())
}
