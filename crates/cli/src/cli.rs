//! Command-line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ffconduit_core::conversion::ConversionPreset;

#[derive(Debug, Parser)]
#[command(name = "ffconduit", version, about = "Probe and convert media with ffmpeg")]
pub struct Cli {
    /// Configuration file; defaults plus FFCONDUIT_* variables when omitted.
    #[arg(long, env = "FFCONDUIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Print collected metrics in Prometheus text format before exiting.
    #[arg(long, global = true)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print stream and container information as JSON.
    Probe { path: PathBuf },

    /// Convert every stream of INPUT into OUTPUT.
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Video encoder name, e.g. libx264, h264_nvenc or copy.
        #[arg(long)]
        video_codec: Option<String>,

        /// Audio encoder name, e.g. aac, libopus or copy.
        #[arg(long)]
        audio_codec: Option<String>,

        #[arg(long)]
        preset: Option<ConversionPreset>,

        /// Scale video to WIDTHxHEIGHT.
        #[arg(long, value_parser = parse_size)]
        size: Option<(u32, u32)>,

        /// Replace OUTPUT if it exists.
        #[arg(long)]
        overwrite: bool,
    },

    /// List the encoders and hardware accelerators ffmpeg reports.
    Capabilities,

    /// Check that ffmpeg and ffprobe can be started.
    Validate,
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let (width, height) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {}", text))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid dimension {:?}: {}", value, e))
    };
    Ok((parse(width)?, parse(height)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "ffconduit",
            "convert",
            "in.mkv",
            "out.mp4",
            "--video-codec",
            "libx265",
            "--preset",
            "slow",
            "--size",
            "1280x720",
            "--overwrite",
        ])
        .unwrap();

        match cli.command {
            Command::Convert {
                input,
                output,
                video_codec,
                audio_codec,
                preset,
                size,
                overwrite,
            } => {
                assert_eq!(input, PathBuf::from("in.mkv"));
                assert_eq!(output, PathBuf::from("out.mp4"));
                assert_eq!(video_codec.as_deref(), Some("libx265"));
                assert_eq!(audio_codec, None);
                assert_eq!(preset, Some(ConversionPreset::Slow));
                assert_eq!(size, Some((1280, 720)));
                assert!(overwrite);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["ffconduit", "probe", "a.mkv", "--config", "ff.toml", "--print-metrics"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("ff.toml")));
        assert!(cli.print_metrics);
        assert!(matches!(cli.command, Command::Probe { .. }));
    }

    #[test]
    fn test_invalid_preset_rejected() {
        assert!(Cli::try_parse_from(["ffconduit", "convert", "a", "b", "--preset", "warp"]).is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("640x480"), Ok((640, 480)));
        assert!(parse_size("640").is_err());
        assert!(parse_size("wide x tall").is_err());
    }
}
