use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::config::OutputFormat;
use crate::{Result, SubtitleError};

/// Media extensions accepted by the `subtitle` command
pub const MEDIA_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mp3", "wav", "flac"];

/// Every file a job reads or writes, derived from the source's directory and stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    dir: PathBuf,
    stem: String,
    audio_extension: String,
}

impl JobPaths {
    pub fn from_source(source: &Path) -> Result<Self> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SubtitleError::Argument(format!("invalid file name: {}", source.display()))
            })?;

        let dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            dir,
            stem,
            audio_extension: "mp3".to_string(),
        })
    }

    pub fn with_audio_extension(mut self, extension: impl Into<String>) -> Self {
        self.audio_extension = extension.into();
        self
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// `<dir>/<stem><suffix>.<extension>`
    pub fn with_suffix(&self, suffix: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{}{}.{}", self.stem, suffix, extension))
    }

    /// `<dir>/<stem>.<extension>`
    pub fn with_extension(&self, extension: &str) -> PathBuf {
        self.with_suffix("", extension)
    }

    /// Extracted audio track, reused across runs
    pub fn intermediate_audio(&self) -> PathBuf {
        self.with_suffix("_tmp", &self.audio_extension)
    }

    pub fn chunk_audio(&self, index: usize) -> PathBuf {
        self.with_suffix(&format!("_chunk_{}", index), &self.audio_extension)
    }

    /// Raw provider output for a chunk, in the chunk's local timeline
    pub fn chunk_transcript(&self, index: usize) -> PathBuf {
        self.with_suffix(&format!("_chunk_{}", index), "srt")
    }

    /// Per-format output for a chunk; for `txt` this is a separate file from the raw transcript
    pub fn chunk_output(&self, index: usize, format: OutputFormat) -> PathBuf {
        match format {
            OutputFormat::Srt => self.with_suffix(&format!("_chunk_{}_realigned", index), "srt"),
            OutputFormat::Txt => self.with_suffix(&format!("_chunk_{}", index), "txt"),
        }
    }

    pub fn output(&self, format: OutputFormat) -> PathBuf {
        self.with_extension(format.extension())
    }

    /// `<dir>/<stem>-<language slug>.srt`
    pub fn translated(&self, language: &str) -> PathBuf {
        self.with_suffix(&format!("-{}", language_slug(language)), "srt")
    }
}

/// Lowercase a language name and replace spaces with dashes
pub fn language_slug(language: &str) -> String {
    language.trim().to_lowercase().replace(' ', "-")
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Check that `path` is an existing media file with a supported extension
pub fn validate_media_path(path: &Path) -> Result<()> {
    match extension_of(path) {
        Some(ext) if MEDIA_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(SubtitleError::Argument(format!(
                "unsupported media file {}, expected one of: {}",
                path.display(),
                MEDIA_EXTENSIONS.join(", ")
            )))
        }
    }

    if !path.is_file() {
        return Err(SubtitleError::Argument(format!(
            "media file not found: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Check that `path` is an existing `.srt` file
pub fn validate_subtitle_path(path: &Path) -> Result<()> {
    if extension_of(path).as_deref() != Some("srt") {
        return Err(SubtitleError::Argument(format!(
            "expected an .srt file, got {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(SubtitleError::Argument(format!(
            "subtitle file not found: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Per-format chunk output keyed by chunk index
///
/// Appends may arrive in any completion order; reads come back in index order.
#[derive(Debug, Default)]
pub struct Accumulator {
    inner: Mutex<HashMap<OutputFormat, BTreeMap<usize, String>>>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, format: OutputFormat, index: usize, content: String) {
        let mut inner = self.inner.lock().await;
        inner.entry(format).or_default().insert(index, content);
    }

    /// Chunk outputs for `format`, in chunk-index order
    pub async fn ordered(&self, format: OutputFormat) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .get(&format)
            .map(|chunks| chunks.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// State owned by a single pipeline run
#[derive(Debug)]
pub struct JobContext {
    pub source: PathBuf,
    pub paths: JobPaths,
    pub formats: Vec<OutputFormat>,
    pub language: Option<String>,
    pub prompt: Option<String>,
    pub total_duration_seconds: f64,
    pub chunk_count: usize,
    pub accumulator: Accumulator,
}

impl JobContext {
    pub fn audio_path(&self) -> PathBuf {
        self.paths.intermediate_audio()
    }
}
