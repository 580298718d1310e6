use chrono::Local;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::{Result, SubtitleError};

/// Exit code for a missing or unsupported input
pub const EXIT_ARGUMENT_ERROR: i32 = 2;
/// Exit code for every other failure
pub const EXIT_FATAL_ERROR: i32 = 1;

/// Whether any cause in an error chain is an argument error
pub fn is_argument_error<'a, I>(chain: I) -> bool
where
    I: IntoIterator<Item = &'a (dyn std::error::Error + 'static)>,
{
    chain
        .into_iter()
        .filter_map(|cause| cause.downcast_ref::<SubtitleError>())
        .any(|e| !e.is_fatal())
}

/// Record a failed command and pick its exit code.
///
/// Argument errors are not logged. Everything else is appended to `path`.
pub async fn record_failure(
    path: &Path,
    command: &str,
    argument_error: bool,
    message: &str,
) -> Result<i32> {
    if argument_error {
        return Ok(EXIT_ARGUMENT_ERROR);
    }

    append(path, command, message).await?;
    Ok(EXIT_FATAL_ERROR)
}

/// Append a timestamped fatal error entry to `path`
pub async fn append(path: &Path, command: &str, message: &str) -> Result<()> {
    let entry = format!(
        "[{}] {} failed: {}\n",
        Local::now().to_rfc3339(),
        command,
        message.trim_end()
    );

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(entry.as_bytes()).await?;
    file.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_are_appended() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("whisper-subtitle-error.log");

        append(&path, "subtitle", "Media tool error: ffmpeg exited with 1").await.unwrap();
        append(&path, "translate", "Provider error: 429\n").await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("subtitle failed: Media tool error: ffmpeg exited with 1"));
        assert!(lines[1].ends_with("translate failed: Provider error: 429"));
    }

    #[test]
    fn test_argument_error_found_through_context() {
        let argument = anyhow::Error::from(SubtitleError::Argument("missing file".to_string()))
            .context("generating subtitles for clip.docx");
        let provider = anyhow::Error::from(SubtitleError::Provider("500".to_string()))
            .context("generating subtitles for clip.mp4");
        let io = anyhow::anyhow!("disk full");

        assert!(is_argument_error(argument.chain()));
        assert!(!is_argument_error(provider.chain()));
        assert!(!is_argument_error(io.chain()));
    }

    #[tokio::test]
    async fn test_argument_failure_is_not_logged() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("whisper-subtitle-error.log");

        let code = record_failure(&path, "subtitle", true, "Argument error: missing file")
            .await
            .unwrap();

        assert_eq!(code, EXIT_ARGUMENT_ERROR);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_fatal_failure_is_logged() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("whisper-subtitle-error.log");

        let code = record_failure(&path, "subtitle", false, "Media tool error: split failed")
            .await
            .unwrap();

        assert_eq!(code, EXIT_FATAL_ERROR);
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.trim_end().ends_with("subtitle failed: Media tool error: split failed"));
    }
}
