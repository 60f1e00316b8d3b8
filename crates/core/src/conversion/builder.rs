//! Assembles streams and global options into an ffmpeg argument list.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::debug;

use super::parameter::{render_tokens, Parameter, ParameterPosition, ParameterSet};
use super::types::{ConversionPreset, HardwareAcceleration, VideoSyncMethod};
use crate::converter::ConverterError;
use crate::streams::{MediaStream, Stream};
use crate::timecode::format_time;

/// A single ffmpeg invocation: input streams, global options and an output.
///
/// Setters take the conversion by value and return it. Assembly is pure: the
/// same conversion always renders the same arguments.
#[derive(Debug, Default)]
pub struct Conversion {
    streams: Vec<MediaStream>,
    parameters: ParameterSet,
    output: Option<PathBuf>,
    overwrite: Option<bool>,
    output_time: Option<Duration>,
    seek: Option<Duration>,
    raw: Option<Vec<String>>,
    running: AtomicBool,
}

impl Clone for Conversion {
    /// Clones the configuration; the clone can run independently.
    fn clone(&self) -> Self {
        Self {
            streams: self.streams.clone(),
            parameters: self.parameters.clone(),
            output: self.output.clone(),
            overwrite: self.overwrite,
            output_time: self.output_time,
            seek: self.seek,
            raw: self.raw.clone(),
            running: AtomicBool::new(false),
        }
    }
}

impl Conversion {
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversion that runs the given argument string verbatim.
    ///
    /// The text is split with shell quoting rules; an unterminated quote is
    /// rejected.
    pub fn from_arguments(text: &str) -> Result<Self, ConverterError> {
        let tokens = shell_words::split(text).map_err(|e| ConverterError::InvalidArguments {
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: Some(tokens),
            ..Self::default()
        })
    }

    pub fn add_stream(mut self, stream: impl Into<MediaStream>) -> Self {
        self.streams.push(stream.into());
        self
    }

    pub fn add_streams<I, S>(mut self, streams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MediaStream>,
    {
        self.streams.extend(streams.into_iter().map(Into::into));
        self
    }

    /// Registers a free-form parameter such as `-tune film`.
    pub fn add_parameter(mut self, text: &str, position: ParameterPosition) -> Self {
        self.parameters.add(Parameter::new(text, position));
        self
    }

    pub fn set_output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// `-y` when true, `-n` when false.
    pub fn set_overwrite_output(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    pub fn set_preset(self, preset: ConversionPreset) -> Self {
        self.with(Parameter::output("-preset", preset.as_str()))
    }

    /// Seeks every input before decoding.
    pub fn set_seek(mut self, seek: Duration) -> Self {
        self.seek = Some(seek);
        self.with(Parameter::input("-ss", format_time(seek)))
    }

    /// Limits how much of the input is read.
    pub fn set_input_time(self, time: Duration) -> Self {
        self.with(Parameter::input("-t", format_time(time)))
    }

    /// Limits the output length.
    pub fn set_output_time(mut self, time: Duration) -> Self {
        self.output_time = Some(time);
        self.with(Parameter::output("-t", format_time(time)))
    }

    /// Bits per second.
    pub fn set_video_bitrate(self, bitrate: u64) -> Self {
        self.with(Parameter::output("-b:v", bitrate))
    }

    /// Bits per second.
    pub fn set_audio_bitrate(self, bitrate: u64) -> Self {
        self.with(Parameter::output("-b:a", bitrate))
    }

    /// Uses every available core, or a single thread when disabled.
    pub fn use_multi_thread(self, enabled: bool) -> Self {
        let threads = if enabled {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            1
        };
        self.with(Parameter::output("-threads", threads))
    }

    pub fn set_frame_rate(self, framerate: f64) -> Self {
        self.with(Parameter::output("-r", framerate))
    }

    pub fn set_input_frame_rate(self, framerate: f64) -> Self {
        self.with(Parameter::input("-r", framerate))
    }

    /// Output container, e.g. `matroska`.
    pub fn set_output_format(self, format: impl AsRef<str>) -> Self {
        self.with(Parameter::output("-f", format.as_ref()))
    }

    pub fn set_input_format(self, format: impl AsRef<str>) -> Self {
        self.with(Parameter::input("-f", format.as_ref()))
    }

    pub fn set_pixel_format(self, format: impl AsRef<str>) -> Self {
        self.with(Parameter::output("-pix_fmt", format.as_ref()))
    }

    /// Ends the output with its shortest stream.
    pub fn use_shortest(mut self, enabled: bool) -> Self {
        if enabled {
            self.parameters.add(Parameter::from_tokens(
                ["-shortest"],
                ParameterPosition::PostInput,
            ));
        } else {
            self.parameters
                .remove("-shortest", ParameterPosition::PostInput);
        }
        self
    }

    pub fn set_video_sync_method(self, method: VideoSyncMethod) -> Self {
        self.with(Parameter::output("-vsync", method.as_str()))
    }

    pub fn use_hardware_acceleration(mut self, hw: HardwareAcceleration) -> Self {
        self.parameters
            .add(Parameter::input("-hwaccel", &hw.accelerator));
        if let Some(device) = hw.device {
            self.parameters.add(Parameter::input("-hwaccel_device", device));
        }
        if let Some(decoder) = &hw.decoder {
            self.parameters.add(Parameter::input("-c:v", decoder));
        }
        if let Some(encoder) = &hw.encoder {
            self.parameters
                .add(Parameter::output("-c:v", encoder.ffmpeg_name()));
        }
        self
    }

    fn with(mut self, parameter: Parameter) -> Self {
        self.parameters.add(parameter);
        self
    }

    pub fn streams(&self) -> &[MediaStream] {
        &self.streams
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Whether the conversion was built from a raw argument string.
    pub fn is_raw(&self) -> bool {
        self.raw.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Media length the output is expected to have, used as the progress
    /// total. `None` when unknown, which includes raw conversions.
    pub fn expected_duration(&self) -> Option<Duration> {
        if let Some(time) = self.output_time {
            return Some(time);
        }
        if self.raw.is_some() {
            return None;
        }
        let longest = self
            .streams
            .iter()
            .map(Stream::effective_duration)
            .max()?
            .saturating_sub(self.seek.unwrap_or_default());
        (!longest.is_zero()).then_some(longest)
    }

    /// Argument tokens, with `-n` unless overwrite was requested.
    pub fn arguments(&self) -> Vec<String> {
        self.arguments_with_default(false)
    }

    /// Rendered argument string.
    pub fn build(&self) -> String {
        render_tokens(&self.arguments())
    }

    /// Argument tokens, using `default_overwrite` when the conversion does
    /// not choose itself. The overwrite flag is a global parameter and is
    /// always present, even with no streams.
    pub(crate) fn arguments_with_default(&self, default_overwrite: bool) -> Vec<String> {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }

        let overwrite = self.overwrite.unwrap_or(default_overwrite);
        let mut args = vec![if overwrite { "-y" } else { "-n" }.to_string()];
        push_tokens(
            &mut args,
            self.parameters.iter_position(ParameterPosition::PreInput),
        );

        // One `-i` per distinct source, in first-seen order; the pre-input
        // flags of all streams of a source share that input's scope.
        let mut inputs: Vec<(&Path, ParameterSet)> = Vec::new();
        let mut input_of_stream = Vec::with_capacity(self.streams.len());
        for stream in &self.streams {
            let slot = match inputs.iter().position(|(path, _)| *path == stream.path()) {
                Some(slot) => slot,
                None => {
                    inputs.push((stream.path(), ParameterSet::new()));
                    inputs.len() - 1
                }
            };
            inputs[slot].1.extend(stream.input_parameters());
            input_of_stream.push(slot);
        }
        for (path, input_parameters) in &inputs {
            push_tokens(&mut args, input_parameters.iter());
            args.push("-i".to_string());
            args.push(path.to_string_lossy().into_owned());
        }

        for (stream, input) in self.streams.iter().zip(input_of_stream) {
            args.push("-map".to_string());
            args.push(format!("{}:{}", input, stream.index()));
            let fragment: ParameterSet = stream.parameters().into_iter().collect();
            push_tokens(&mut args, fragment.iter());
        }

        push_tokens(
            &mut args,
            self.parameters.iter_position(ParameterPosition::PostInput),
        );
        if let Some(output) = &self.output {
            args.push(output.to_string_lossy().into_owned());
        }

        debug!(arguments = %render_tokens(&args), "Assembled conversion arguments");
        args
    }

    /// Marks the conversion as running until the guard is dropped.
    pub(crate) fn begin_run(&self) -> Result<RunGuard<'_>, ConverterError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(ConverterError::MultipleConversionInProgress);
        }
        Ok(RunGuard {
            running: &self.running,
        })
    }
}

/// Clears the running flag of a [`Conversion`] on drop.
pub(crate) struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

fn push_tokens<'a>(args: &mut Vec<String>, parameters: impl Iterator<Item = &'a Parameter>) {
    for parameter in parameters {
        args.extend(parameter.tokens().iter().cloned());
    }
}
