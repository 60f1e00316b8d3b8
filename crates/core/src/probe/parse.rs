//! Reconciles raw ffprobe output into [`MediaInfo`].

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::model::{as_f64, FormatOutput, RawFormat, RawStream, StreamsOutput};
use super::MediaInfo;
use crate::converter::ConverterError;
use crate::streams::{AudioStream, SubtitleStream, VideoStream};

/// Stream values at or below this are treated as missing.
const MIN_STREAM_VALUE: f64 = 0.01;

/// Builds a [`MediaInfo`] from the JSON of the streams and format queries.
pub fn parse_probe_output(
    path: &Path,
    streams_json: &str,
    format_json: &str,
) -> Result<MediaInfo, ConverterError> {
    let streams: StreamsOutput =
        serde_json::from_str(streams_json).map_err(|e| ConverterError::ParseError {
            reason: format!("Failed to parse ffprobe streams: {}", e),
        })?;
    let format: FormatOutput = if format_json.trim().is_empty() {
        FormatOutput::default()
    } else {
        serde_json::from_str(format_json).map_err(|e| ConverterError::ParseError {
            reason: format!("Failed to parse ffprobe format: {}", e),
        })?
    };
    let format = format.format;

    let container_duration = as_f64(&format.duration).unwrap_or(0.0);
    let container_bitrate = as_f64(&format.bit_rate).unwrap_or(0.0);

    let mut info = MediaInfo {
        path: path.to_path_buf(),
        size: as_f64(&format.size).map(|s| s as u64).unwrap_or(0),
        creation_time: creation_time(&format),
        duration: Duration::ZERO,
        format_name: format.format_name.clone(),
        bit_rate: (container_bitrate > 0.0).then_some(container_bitrate as u64),
        video_streams: Vec::new(),
        audio_streams: Vec::new(),
        subtitle_streams: Vec::new(),
    };

    for raw in &streams.streams {
        match raw.codec_type.as_deref() {
            Some("video") => info.video_streams.push(video_stream(
                path,
                raw,
                container_duration,
                container_bitrate,
            )),
            Some("audio") => info.audio_streams.push(audio_stream(
                path,
                raw,
                container_duration,
                container_bitrate,
            )),
            Some("subtitle") => info.subtitle_streams.push(subtitle_stream(path, raw)),
            _ => {}
        }
    }

    if info.video_streams.is_empty()
        && info.audio_streams.is_empty()
        && info.subtitle_streams.is_empty()
    {
        return Err(ConverterError::invalid_input(
            path,
            "ffprobe reported no media streams",
        ));
    }

    let longest_video = info.video_streams.iter().map(|s| s.duration).max();
    let longest_audio = info.audio_streams.iter().map(|s| s.duration).max();
    info.duration = longest_video
        .into_iter()
        .chain(longest_audio)
        .max()
        .unwrap_or(Duration::ZERO);

    Ok(info)
}

fn video_stream(path: &Path, raw: &RawStream, container_duration: f64, container_bitrate: f64) -> VideoStream {
    let duration = prefer_stream(as_f64(&raw.duration), container_duration);
    let width = raw.width.unwrap_or(0);
    let height = raw.height.unwrap_or(0);

    let mut stream = VideoStream::new(path, raw.index);
    stream.codec_name = raw.codec_name.clone().unwrap_or_default();
    stream.duration = seconds(duration);
    stream.width = width;
    stream.height = height;
    stream.framerate = framerate(as_f64(&raw.nb_frames), duration, raw.r_frame_rate.as_deref());
    stream.ratio = aspect_ratio(width, height);
    stream.pixel_format = raw.pix_fmt.clone().unwrap_or_default();
    stream.rotation = rotation(raw);
    stream.bitrate = prefer_stream(as_f64(&raw.bit_rate), container_bitrate) as u64;
    stream.default = raw.disposition.default == 1;
    stream.forced = raw.disposition.forced == 1;
    stream
}

fn audio_stream(path: &Path, raw: &RawStream, container_duration: f64, container_bitrate: f64) -> AudioStream {
    let mut stream = AudioStream::new(path, raw.index);
    stream.codec_name = raw.codec_name.clone().unwrap_or_default();
    stream.duration = seconds(prefer_stream(as_f64(&raw.duration), container_duration));
    stream.channels = raw.channels.unwrap_or(0);
    stream.sample_rate = as_f64(&raw.sample_rate).map(|r| r as u32).unwrap_or(0);
    stream.bitrate = prefer_stream(as_f64(&raw.bit_rate), container_bitrate) as u64;
    stream.language = raw.tags.language.clone();
    stream.title = raw.tags.title.clone();
    stream.default = raw.disposition.default == 1;
    stream.forced = raw.disposition.forced == 1;
    stream
}

fn subtitle_stream(path: &Path, raw: &RawStream) -> SubtitleStream {
    let mut stream = SubtitleStream::new(path, raw.index);
    stream.codec_name = raw.codec_name.clone().unwrap_or_default();
    stream.duration = seconds(as_f64(&raw.duration).unwrap_or(0.0));
    stream.language = raw.tags.language.clone();
    stream.title = raw.tags.title.clone();
    stream.default = raw.disposition.default == 1;
    stream.forced = raw.disposition.forced == 1;
    stream
}

/// The stream's own value when it is meaningful, else the container's.
fn prefer_stream(stream_value: Option<f64>, container_value: f64) -> f64 {
    match stream_value {
        Some(value) if value > MIN_STREAM_VALUE => value,
        _ => container_value,
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

/// Frames per second rounded to three decimals.
///
/// Counted frames over duration is preferred; the nominal `r_frame_rate`
/// fraction is the fallback.
pub(crate) fn framerate(nb_frames: Option<f64>, duration: f64, r_frame_rate: Option<&str>) -> f64 {
    if let Some(frames) = nb_frames {
        if frames > 0.0 && duration > 0.0 {
            return round3(frames / duration);
        }
    }
    let Some((num, den)) = r_frame_rate.and_then(|r| r.split_once('/')) else {
        return r_frame_rate
            .and_then(|r| r.trim().parse::<f64>().ok())
            .map(round3)
            .unwrap_or(0.0);
    };
    match (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
        (Ok(num), Ok(den)) if den > 0.0 => round3(num / den),
        _ => 0.0,
    }
}

/// Reduced `W:H` ratio, or `0:0` when either side is zero.
pub(crate) fn aspect_ratio(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        return "0:0".to_string();
    }
    let divisor = gcd(width, height);
    format!("{}:{}", width / divisor, height / divisor)
}

/// Greatest common divisor by repeated subtraction.
fn gcd(mut a: u32, mut b: u32) -> u32 {
    while a != b {
        if a > b {
            a -= b;
        } else {
            b -= a;
        }
    }
    a
}

fn rotation(raw: &RawStream) -> Option<i32> {
    as_f64(&raw.tags.rotate)
        .or_else(|| {
            raw.side_data_list
                .iter()
                .find_map(|side| as_f64(&side.rotation))
        })
        .map(|r| r.round() as i32)
}

fn creation_time(format: &RawFormat) -> Option<DateTime<Utc>> {
    let text = format.tags.creation_time.as_deref()?;
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
