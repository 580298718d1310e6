use std::path::{Path, PathBuf};
use tracing::info;

use super::srt::{self, Cue};
use crate::job::{validate_subtitle_path, JobPaths};
use crate::Result;

/// Project cues to plain text, one cue per line
pub fn to_plain_text(cues: &[Cue]) -> String {
    let mut output = String::new();
    for cue in cues {
        output.push_str(&cue.text);
        output.push('\n');
    }
    output
}

/// Remove a single trailing sentence period (ASCII or ideographic) from each cue
pub fn strip_trailing_period(cues: &mut [Cue]) {
    for cue in cues.iter_mut() {
        let trimmed = cue.text.trim_end();
        if let Some(stripped) = trimmed
            .strip_suffix('.')
            .or_else(|| trimmed.strip_suffix('。'))
        {
            // Keep ellipses intact
            if !stripped.ends_with('.') {
                cue.text = stripped.to_string();
            }
        }
    }
}

/// Convert an `.srt` file into a `.txt` file next to it
pub async fn convert_srt_file(source: &Path) -> Result<PathBuf> {
    validate_subtitle_path(source)?;

    let content = tokio::fs::read_to_string(source).await?;
    let cues = srt::parse(&content)?;

    let paths = JobPaths::from_source(source)?;
    let output = paths.with_extension("txt");
    tokio::fs::write(&output, to_plain_text(&cues)).await?;

    info!("📝 Converted {} cues to text: {}", cues.len(), output.display());
    Ok(output)
}
