use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::{Result, SubtitleError};

/// Media probing and cutting, implemented by ffmpeg in production
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Duration of `path` in whole seconds
    async fn probe_duration(&self, path: &Path) -> Result<u64>;

    /// Extract the audio track of `source` into `output`
    async fn extract_audio(&self, source: &Path, output: &Path) -> Result<()>;

    /// Copy `[start, start + duration)` of `source` into `output`
    async fn split(
        &self,
        source: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> Result<()>;
}

/// ffmpeg / ffprobe backed media tool
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: String,
    ffprobe: String,
    /// Inherit the console instead of discarding tool output
    log_spawn: bool,
}

impl FfmpegTool {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            log_spawn: config.log_spawn,
        }
    }

    fn console(&self) -> Stdio {
        if self.log_spawn {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }

    async fn run_ffmpeg(&self, args: &[&str], output: &Path) -> Result<()> {
        debug!("Running {} {}", self.ffmpeg, args.join(" "));

        let status = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(self.console())
            .stderr(self.console())
            .status()
            .await
            .map_err(|e| SubtitleError::MediaTool(format!("failed to run {}: {}", self.ffmpeg, e)))?;

        if !status.success() {
            return Err(SubtitleError::MediaTool(format!(
                "{} exited with {} while writing {}",
                self.ffmpeg,
                status,
                output.display()
            )));
        }

        if !output.exists() {
            return Err(SubtitleError::MediaTool(format!(
                "{} produced no output at {}",
                self.ffmpeg,
                output.display()
            )));
        }

        Ok(())
    }
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new(&MediaConfig::default())
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe_duration(&self, path: &Path) -> Result<u64> {
        let path_str = path.to_string_lossy().into_owned();

        let output = Command::new(&self.ffprobe)
            .args([
                "-v", "error",
                "-show_entries", "format=duration",
                "-of", "default=noprint_wrappers=1:nokey=1",
                path_str.as_str(),
            ])
            .stdin(Stdio::null())
            .stderr(self.console())
            .output()
            .await
            .map_err(|e| SubtitleError::MediaTool(format!("failed to run {}: {}", self.ffprobe, e)))?;

        if !output.status.success() {
            return Err(SubtitleError::MediaTool(format!(
                "ffprobe failed for {}",
                path.display()
            )));
        }

        let duration = parse_probe_duration(&String::from_utf8_lossy(&output.stdout))?;
        info!("⏱️ Duration of {}: {}s", path.display(), duration);
        Ok(duration)
    }

    async fn extract_audio(&self, source: &Path, output: &Path) -> Result<()> {
        info!("🎵 Extracting audio: {} -> {}", source.display(), output.display());

        let source_str = source.to_string_lossy().into_owned();
        let output_str = output.to_string_lossy().into_owned();

        self.run_ffmpeg(
            &["-y", "-i", source_str.as_str(), "-vn", output_str.as_str()],
            output,
        )
        .await
    }

    async fn split(
        &self,
        source: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> Result<()> {
        let source_str = source.to_string_lossy().into_owned();
        let output_str = output.to_string_lossy().into_owned();
        let start = format!("{:.3}", start_seconds);
        let duration = format!("{:.3}", duration_seconds);

        self.run_ffmpeg(
            &[
                "-y",
                "-i", source_str.as_str(),
                "-ss", start.as_str(),
                "-t", duration.as_str(),
                output_str.as_str(),
            ],
            output,
        )
        .await
    }
}

/// Parse ffprobe's bare duration output, truncated to whole seconds
pub fn parse_probe_duration(stdout: &str) -> Result<u64> {
    let value = stdout.trim();

    let seconds: f64 = value.parse().map_err(|_| {
        SubtitleError::MediaTool(format!("unexpected ffprobe duration output: {:?}", value))
    })?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(SubtitleError::MediaTool(format!(
            "invalid media duration: {}",
            value
        )));
    }

    Ok(seconds.trunc() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_duration_parsing() {
        assert_eq!(parse_probe_duration("600.482000\n").unwrap(), 600);
        assert_eq!(parse_probe_duration("59.999").unwrap(), 59);
        assert_eq!(parse_probe_duration("0").unwrap(), 0);
    }

    #[test]
    fn test_probe_duration_rejects_garbage() {
        assert!(matches!(
            parse_probe_duration("N/A"),
            Err(SubtitleError::MediaTool(_))
        ));
        assert!(parse_probe_duration("").is_err());
        assert!(parse_probe_duration("-3.0").is_err());
    }

    #[test]
    fn test_tool_from_config() {
        let config = MediaConfig {
            ffmpeg_path: "/opt/bin/ffmpeg".to_string(),
            log_spawn: true,
            ..MediaConfig::default()
        };
        let tool = FfmpegTool::new(&config);

        assert_eq!(tool.ffmpeg, "/opt/bin/ffmpeg");
        assert_eq!(tool.ffprobe, "ffprobe");
        assert!(tool.log_spawn);
    }

    #[tokio::test]
    async fn test_missing_binary_is_media_tool_error() {
        let config = MediaConfig {
            ffmpeg_path: "definitely-not-ffmpeg-binary".to_string(),
            ffprobe_path: "definitely-not-ffprobe-binary".to_string(),
            ..MediaConfig::default()
        };
        let tool = FfmpegTool::new(&config);
        let dir = tempfile::TempDir::new().unwrap();

        let probe = tool.probe_duration(&dir.path().join("a.mp3")).await;
        assert!(matches!(probe, Err(SubtitleError::MediaTool(_))));

        let split = tool
            .split(&dir.path().join("a.mp3"), 0.0, 1.0, &dir.path().join("b.mp3"))
            .await;
        assert!(matches!(split, Err(SubtitleError::MediaTool(_))));
    }
}
