use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

use crate::chunking::DEFAULT_CHUNK_BYTE_BUDGET;
use crate::{Result, SubtitleError};

/// Configuration for the subtitle engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File that fatal errors are appended to
    pub error_log: PathBuf,

    /// OpenAI credentials and model selection
    pub openai: OpenAIConfig,

    /// What to produce from a transcription run
    pub transcription: TranscriptionConfig,

    /// Chunk sizing and scheduling
    pub chunking: ChunkingConfig,

    /// Subtitle translation language pair
    pub translation: TranslationConfig,

    /// External media tool settings
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub transcription_model: String,
    pub translation_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Output formats, in the order they are written
    pub formats: Vec<OutputFormat>,

    /// Source language hint (ISO-639-1)
    pub language: Option<String>,

    /// Vocabulary prompt passed verbatim to the provider when the file exists
    pub prompt_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum bytes of audio per uploaded chunk
    pub chunk_byte_budget: u64,

    /// Chunks processed at once
    pub max_concurrent_chunks: usize,

    /// Drop one trailing period from every realigned cue
    pub strip_trailing_period: bool,

    /// Keep the extracted `_tmp` audio after a successful run
    pub keep_intermediate_audio: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,

    /// Container used for the intermediate and chunk audio
    pub audio_extension: String,

    /// Let ffmpeg/ffprobe write to the console instead of running silently
    pub log_spawn: bool,
}

/// Subtitle output formats
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    Srt,
    Txt,
}

impl OutputFormat {
    /// Whether the format carries cue timing (and so needs realignment and renumbering)
    pub fn has_timing(&self) -> bool {
        matches!(self, OutputFormat::Srt)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Srt => "srt",
            OutputFormat::Txt => "txt",
        }
    }

    /// Parse a comma-separated list such as `srt,txt`
    pub fn parse_list(value: &str) -> Result<Vec<OutputFormat>> {
        let mut formats = Vec::new();

        for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let format: OutputFormat = item.parse().map_err(|_| {
                SubtitleError::Argument(format!(
                    "--format {} is invalid, supported formats: srt,txt",
                    value
                ))
            })?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }

        if formats.is_empty() {
            return Err(SubtitleError::Argument("no output format given".to_string()));
        }

        Ok(formats)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            error_log: PathBuf::from("whisper-subtitle-error.log"),
            openai: OpenAIConfig::default(),
            transcription: TranscriptionConfig::default(),
            chunking: ChunkingConfig::default(),
            translation: TranslationConfig::default(),
            media: MediaConfig::default(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            transcription_model: "whisper-1".to_string(),
            translation_model: "gpt-3.5-turbo".to_string(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            formats: vec![OutputFormat::Srt],
            language: None,
            prompt_file: Some(PathBuf::from("prompt.txt")),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_byte_budget: DEFAULT_CHUNK_BYTE_BUDGET,
            max_concurrent_chunks: 1,
            strip_trailing_period: false,
            keep_intermediate_audio: false,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            audio_extension: "mp3".to_string(),
            log_spawn: false,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then an optional TOML file, then environment.
    ///
    /// An explicit `path` must exist; otherwise the well-known locations are
    /// tried and silently skipped when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_default_locations()?,
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn from_default_locations() -> Result<Self> {
        let config_paths = ["whisper-subtitle.toml", "config/whisper-subtitle.toml"];

        for path in config_paths.iter().map(Path::new) {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            SubtitleError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        let config = toml::from_str(&config_str).map_err(|e| {
            SubtitleError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;

        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Override settings from environment-style variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = var("OPENAI_API_KEY") {
            self.openai.api_key = Some(api_key);
        }

        if let Some(base_url) = var("OPENAI_BASE_URL") {
            self.openai.base_url = base_url;
        }

        if let Some(formats) = var("SUBTITLE_FORMAT") {
            self.transcription.formats = OutputFormat::parse_list(&formats)?;
        }

        if let Some(language) = var("SUBTITLE_LANGUAGE") {
            self.transcription.language = Some(language);
        }

        if let Some(prompt_file) = var("SUBTITLE_PROMPT_FILE") {
            self.transcription.prompt_file = Some(PathBuf::from(prompt_file));
        }

        if let Some(concurrency) = var("SUBTITLE_MAX_CONCURRENT_CHUNKS") {
            self.chunking.max_concurrent_chunks = concurrency.trim().parse().map_err(|_| {
                SubtitleError::Configuration(format!(
                    "SUBTITLE_MAX_CONCURRENT_CHUNKS must be a positive integer, got {}",
                    concurrency
                ))
            })?;
        }

        if let Some(from) = var("SUBTITLE_LANGUAGE_TRANSLATE_FROM")
            .or_else(|| var("SUBTITLE_TRANSLATE_LANGUAGE_FROM"))
        {
            self.translation.from = Some(from);
        }

        if let Some(to) = var("SUBTITLE_LANGUAGE_TRANSLATE_TO")
            .or_else(|| var("SUBTITLE_TRANSLATE_LANGUAGE_TO"))
        {
            self.translation.to = Some(to);
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| SubtitleError::Configuration(e.to_string()))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate settings every command depends on
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_byte_budget == 0 {
            return Err(SubtitleError::Configuration(
                "chunk_byte_budget must be greater than 0".to_string(),
            ));
        }

        if self.chunking.max_concurrent_chunks == 0 {
            return Err(SubtitleError::Configuration(
                "max_concurrent_chunks must be greater than 0".to_string(),
            ));
        }

        if self.transcription.formats.is_empty() {
            return Err(SubtitleError::Configuration(
                "at least one output format is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Fail fast when a command needs the OpenAI API but no key is configured
    pub fn require_api_key(&self) -> Result<&str> {
        self.openai
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SubtitleError::Configuration("OPENAI_API_KEY is not set".to_string()))
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        let formats: Vec<String> = self.transcription.formats.iter().map(|f| f.to_string()).collect();

        format!(
            "Whisper Subtitle Configuration:\n\
            - Formats: {}\n\
            - Language: {}\n\
            - Chunk Budget: {} bytes\n\
            - Concurrent Chunks: {}\n\
            - Transcription Model: {}",
            formats.join(","),
            self.transcription.language.as_deref().unwrap_or("auto"),
            self.chunking.chunk_byte_budget,
            self.chunking.max_concurrent_chunks,
            self.openai.transcription_model,
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.openai.api_key = Some(api_key.into());
        self
    }

    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.config.transcription.formats = formats;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.config.transcription.language = Some(language.into());
        self
    }

    pub fn with_prompt_file(mut self, prompt_file: Option<PathBuf>) -> Self {
        self.config.transcription.prompt_file = prompt_file;
        self
    }

    pub fn with_chunk_byte_budget(mut self, budget: u64) -> Self {
        self.config.chunking.chunk_byte_budget = budget;
        self
    }

    pub fn with_max_concurrent_chunks(mut self, max: usize) -> Self {
        self.config.chunking.max_concurrent_chunks = max;
        self
    }

    pub fn strip_trailing_period(mut self, enable: bool) -> Self {
        self.config.chunking.strip_trailing_period = enable;
        self
    }

    pub fn keep_intermediate_audio(mut self, enable: bool) -> Self {
        self.config.chunking.keep_intermediate_audio = enable;
        self
    }

    pub fn with_translation(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.config.translation.from = Some(from.into());
        self.config.translation.to = Some(to.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
