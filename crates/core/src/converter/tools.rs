//! Locating the ffmpeg and ffprobe executables.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::ConverterError;

/// Resolved executable paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Makes the executables available, e.g. by finding or installing them.
///
/// Installation is up to implementors; the converter only consumes the
/// resulting paths.
#[async_trait]
pub trait ExecutableProvider: Send + Sync {
    /// Ensures both executables exist, preferring `destination` when given.
    async fn ensure_available(
        &self,
        destination: Option<&Path>,
    ) -> Result<ToolPaths, ConverterError>;
}

/// Finds already installed executables: first in the destination directory,
/// then on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutables;

impl LocalExecutables {
    fn locate(name: &str, destination: Option<&Path>) -> Result<PathBuf, ConverterError> {
        if let Some(dir) = destination {
            let candidate = dir.join(format!("{}{}", name, std::env::consts::EXE_SUFFIX));
            if candidate.is_file() {
                return Ok(candidate);
            }
            debug!(dir = %dir.display(), name, "Executable not in directory, searching PATH");
        }
        which::which(name).map_err(|_| ConverterError::ExecutableNotFound {
            path: destination
                .map(|dir| dir.join(name))
                .unwrap_or_else(|| PathBuf::from(name)),
        })
    }
}

#[async_trait]
impl ExecutableProvider for LocalExecutables {
    async fn ensure_available(
        &self,
        destination: Option<&Path>,
    ) -> Result<ToolPaths, ConverterError> {
        Ok(ToolPaths {
            ffmpeg: Self::locate("ffmpeg", destination)?,
            ffprobe: Self::locate("ffprobe", destination)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finds_tools_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ffmpeg", "ffprobe"] {
            let path = dir.path().join(format!("{}{}", name, std::env::consts::EXE_SUFFIX));
            std::fs::write(&path, b"").unwrap();
        }

        let tools = LocalExecutables
            .ensure_available(Some(dir.path()))
            .await
            .unwrap();
        assert!(tools.ffmpeg.starts_with(dir.path()));
        assert!(tools.ffprobe.starts_with(dir.path()));
    }

    #[test]
    fn test_missing_tool_names_destination() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalExecutables::locate("ffconduit-no-such-tool", Some(dir.path())).unwrap_err();
        match err {
            ConverterError::ExecutableNotFound { path } => {
                assert_eq!(path, dir.path().join("ffconduit-no-such-tool"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
