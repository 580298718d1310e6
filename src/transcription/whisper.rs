use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::{debug, info};

use crate::config::OpenAIConfig;
use crate::{Result, SubtitleError};

/// Audio payload handed to a transcription provider
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// File name reported to the provider (the extension selects the decoder)
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AudioChunk {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a chunk file from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk.mp3".to_string());
        Ok(Self { file_name, bytes })
    }

    pub fn mime_type(&self) -> &'static str {
        let ext = Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "flac" => "audio/flac",
            "m4a" => "audio/mp4",
            "ogg" => "audio/ogg",
            "webm" => "audio/webm",
            _ => "application/octet-stream",
        }
    }
}

/// Speech-to-text provider returning SRT text for one audio chunk
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        chunk: AudioChunk,
        language: Option<&str>,
        prompt: Option<&str>,
    ) -> Result<String>;
}

/// OpenAI Whisper transcription over HTTP
pub struct OpenAITranscriber {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAITranscriber {
    pub fn new(config: &OpenAIConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SubtitleError::Configuration("OPENAI_API_KEY is not set".to_string()))?;

        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/audio/transcriptions", config.base_url.trim_end_matches('/')),
            model: config.transcription_model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transcriber for OpenAITranscriber {
    async fn transcribe(
        &self,
        chunk: AudioChunk,
        language: Option<&str>,
        prompt: Option<&str>,
    ) -> Result<String> {
        let mime = chunk.mime_type();
        let file_name = chunk.file_name.clone();
        let size = chunk.bytes.len();

        let part = Part::bytes(chunk.bytes)
            .file_name(file_name.clone())
            .mime_str(mime)?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "srt");

        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }
        if let Some(prompt) = prompt {
            form = form.text("prompt", prompt.to_string());
        }

        debug!("Uploading {} ({} bytes) to {}", file_name, size, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SubtitleError::Provider(format!(
                "Whisper API error {}: {}",
                status, text
            )));
        }

        let body = response.text().await?;
        info!("🎤 Transcribed {} ({} bytes of subtitles)", file_name, body.len());
        Ok(body)
    }
}
