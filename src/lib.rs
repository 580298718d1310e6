//! Whisper Subtitle - chunked media-to-subtitle engine
//!
//! Splits large media into upload-sized audio chunks, transcribes each chunk
//! through the OpenAI Whisper API, realigns the per-chunk subtitle timelines
//! and merges them into one renumbered subtitle file. Also translates and
//! flattens existing subtitle files.

pub mod audio;
pub mod chunking;
pub mod config;
pub mod error_log;
pub mod job;
pub mod llm;
pub mod merge;
pub mod processing;
pub mod transcription;

use thiserror::Error;

/// Errors surfaced by the subtitle engine
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// Missing or unsupported input; reported to the user without touching the error log
    #[error("Argument error: {0}")]
    Argument(String),

    #[error("Media tool error: {0}")]
    MediaTool(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Subtitle format error: {0}")]
    Format(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubtitleError {
    /// Whether this error should be appended to the persistent error log
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SubtitleError::Argument(_))
    }
}

impl From<reqwest::Error> for SubtitleError {
    fn from(err: reqwest::Error) -> Self {
        SubtitleError::Provider(err.to_string())
    }
}

impl From<tokio::sync::AcquireError> for SubtitleError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        SubtitleError::Scheduler(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SubtitleError>;

// Re-export main types for easy access
pub use crate::audio::{FfmpegTool, MediaTool};
pub use crate::chunking::{plan_chunks, ChunkSpec, DEFAULT_CHUNK_BYTE_BUDGET};
pub use crate::config::{Config, ConfigBuilder, OutputFormat};
pub use crate::job::JobPaths;
pub use crate::llm::translation::{translate_srt_file, SubtitleTranslator};
pub use crate::llm::{ChatMessage, LLMResponse, LLM};
pub use crate::merge::write_merged;
pub use crate::processing::{ChunkReport, ChunkStage, PipelineResult, SubtitlePipeline};
pub use crate::transcription::srt::{Cue, SubtitleDocument};
pub use crate::transcription::text::{convert_srt_file, to_plain_text};
pub use crate::transcription::timeline::shift_and_clamp;
pub use crate::transcription::whisper::{AudioChunk, OpenAITranscriber, Transcriber};
