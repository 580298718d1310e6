use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::OutputFormat;
use crate::transcription::srt::{self, SubtitleDocument};
use crate::Result;

/// Join chunk outputs in order with a single newline between them
pub fn concatenate(chunks: &[String]) -> String {
    let mut merged = String::new();
    for chunk in chunks {
        if !merged.is_empty() {
            merged.push('\n');
        }
        merged.push_str(chunk);
    }
    merged
}

/// Write the merged output for one format.
///
/// The raw concatenation is written first; timed formats are then re-parsed
/// and overwritten with sequential cue indices.
pub async fn write_merged(
    chunks: &[String],
    format: OutputFormat,
    output: &Path,
) -> Result<PathBuf> {
    let merged = concatenate(chunks);
    tokio::fs::write(output, &merged).await?;

    if format.has_timing() {
        let document = SubtitleDocument::new(srt::parse(&merged)?);

        for issue in document.validate().iter().take(10) {
            warn!("⚠️ {}: {}", output.display(), issue);
        }

        document.save_to_file(output).await?;
        info!("🔢 Renumbered {} cues in {}", document.len(), output.display());
    }

    info!("💾 Wrote {}", output.display());
    Ok(output.to_path_buf())
}
