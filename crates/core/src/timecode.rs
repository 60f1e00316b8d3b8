//! ffmpeg time text (`H:MM:SS.mmm`) formatting and parsing.

use std::time::Duration;

/// Formats a duration as `H:MM:SS.mmm`.
///
/// Hours are not padded; minutes and seconds use two digits and the fraction
/// is always three digits. Sub-millisecond precision is truncated.
pub fn format_time(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}

/// Parses `H:MM:SS[.fff]` into a duration.
///
/// Any number of hour digits and any fraction length are accepted; fractions
/// longer than milliseconds are truncated. Negative values, `N/A` and
/// anything else malformed yield `None`.
pub fn parse_time(text: &str) -> Option<Duration> {
    let text = text.trim();
    let mut parts = text.splitn(3, ':');
    let hours = parts.next()?;
    let mins = parts.next()?;
    let rest = parts.next()?;

    let (secs, fraction) = match rest.split_once('.') {
        Some((secs, fraction)) => (secs, Some(fraction)),
        None => (rest, None),
    };

    let hours: u64 = parse_digits(hours)?;
    let mins: u64 = parse_digits(mins)?;
    let secs: u64 = parse_digits(secs)?;
    if mins >= 60 || secs >= 60 {
        return None;
    }

    let millis = match fraction {
        Some(fraction) => {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let mut padded: String = fraction.chars().take(3).collect();
            while padded.len() < 3 {
                padded.push('0');
            }
            padded.parse::<u64>().ok()?
        }
        None => 0,
    };

    Some(Duration::from_millis(
        ((hours * 60 + mins) * 60 + secs) * 1000 + millis,
    ))
}

fn parse_digits(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
