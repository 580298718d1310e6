use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{create_llm, ChatMessage, LLM};
use crate::config::Config;
use crate::job::{validate_subtitle_path, JobPaths};
use crate::transcription::srt::{self, format_timestamp, Cue};
use crate::{Result, SubtitleError};

/// Translates subtitle cues one at a time, leaving timing untouched
pub struct SubtitleTranslator {
    llm: Arc<dyn LLM>,
    from: String,
    to: String,
}

impl SubtitleTranslator {
    pub fn new(llm: Arc<dyn LLM>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            llm,
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "Act as a highly proficient translation assistant. Your task is to accurately \
             translate the provided text from {from} to {to}, maintaining the original meaning, \
             tone, and style. Pay special attention to cultural nuances and idiomatic expressions \
             to ensure the translation is contextually appropriate. Additionally, ensure the \
             translation is concise and suitable for subtitle formatting. Add a half-width space \
             between full-width and half-width characters to improve readability.\n\n\
             Source Language: {from}\n\
             Target Language: {to}",
            from = self.from,
            to = self.to
        )
    }

    /// Translate one cue's text; an empty answer keeps the original
    pub async fn translate_text(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let messages = vec![ChatMessage::system(self.system_prompt()), ChatMessage::user(text)];
        let response = self.llm.chat(messages).await?;

        if let Some(tokens) = response.tokens_used {
            debug!("Translation used {} tokens", tokens);
        }

        let translated = response.content.trim();
        if translated.is_empty() {
            Ok(text.to_string())
        } else {
            Ok(translated.to_string())
        }
    }

    /// Translate every cue in order
    pub async fn translate_cues(&self, mut cues: Vec<Cue>) -> Result<Vec<Cue>> {
        let total = cues.len();

        for (i, cue) in cues.iter_mut().enumerate() {
            info!(
                "🌐 [{}/{}] {} --> {} \"{}\"",
                i + 1,
                total,
                format_timestamp(cue.start),
                format_timestamp(cue.end),
                cue.text
            );
            cue.text = self.translate_text(&cue.text).await?;
            debug!("Translated to \"{}\"", cue.text);
        }

        Ok(cues)
    }

    /// Translate `source` into `<stem>-<language slug>.srt` next to it
    pub async fn translate_file(&self, source: &Path) -> Result<PathBuf> {
        validate_subtitle_path(source)?;

        let content = tokio::fs::read_to_string(source).await?;
        let cues = self.translate_cues(srt::parse(&content)?).await?;

        let output = JobPaths::from_source(source)?.translated(&self.to);
        tokio::fs::write(&output, srt::serialize(&cues)).await?;

        info!("✅ Translated {} cues: {}", cues.len(), output.display());
        Ok(output)
    }
}

/// Translate an `.srt` file using the configured OpenAI chat model and language pair
pub async fn translate_srt_file(config: &Config, source: &Path) -> Result<PathBuf> {
    validate_subtitle_path(source)?;

    let from = config.translation.from.clone().ok_or_else(|| {
        SubtitleError::Argument("source language missing, pass --from".to_string())
    })?;
    let to = config.translation.to.clone().ok_or_else(|| {
        SubtitleError::Argument("target language missing, pass --to".to_string())
    })?;

    config.require_api_key()?;
    let llm: Arc<dyn LLM> = Arc::from(create_llm(&config.openai)?);

    info!("🌐 Language From: {}", from);
    info!("🌐 Language To:   {}", to);

    SubtitleTranslator::new(llm, from, to).translate_file(source).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::llm::LLMResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedLLM {
        replies: Mutex<Vec<String>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LLM for ScriptedLLM {
        async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
            self.seen.lock().unwrap().push(messages);
            let content = self.replies.lock().unwrap().remove(0);
            Ok(LLMResponse { content, tokens_used: None })
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn scripted(replies: &[&str]) -> Arc<ScriptedLLM> {
        Arc::new(ScriptedLLM {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_system_prompt_names_language_pair() {
        let translator = SubtitleTranslator::new(scripted(&[]), "Japanese", "English");
        let prompt = translator.system_prompt();

        assert!(prompt.contains("from Japanese to English"));
        assert!(prompt.ends_with("Source Language: Japanese\nTarget Language: English"));
    }

    #[tokio::test]
    async fn test_empty_reply_keeps_original() {
        let llm = scripted(&["Bonjour", "  "]);
        let translator = SubtitleTranslator::new(llm.clone(), "English", "French");
        let cues = vec![Cue::new(0, 1000, "Hello"), Cue::new(1000, 2000, "Untouched")];

        let translated = translator.translate_cues(cues).await.unwrap();

        assert_eq!(translated[0].text, "Bonjour");
        assert_eq!(translated[1].text, "Untouched");
        assert_eq!(translated[1].start, 1000);

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0][0].role, "system");
        assert_eq!(seen[0][1], ChatMessage::user("Hello"));
    }

    #[tokio::test]
    async fn test_translate_file_writes_slugged_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("movie.srt");
        tokio::fs::write(&source, "1\n00:00:01,000 --> 00:00:02,000\n你好\n\n")
            .await
            .unwrap();

        let translator = SubtitleTranslator::new(scripted(&["Hello"]), "Chinese", "British English");
        let output = translator.translate_file(&source).await.unwrap();

        assert_eq!(output, dir.path().join("movie-british-english.srt"));
        let content = tokio::fs::read_to_string(&output).await.unwrap();
        assert_eq!(content, "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n");
    }

    #[tokio::test]
    async fn test_missing_language_is_argument_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("movie.srt");
        tokio::fs::write(&source, "").await.unwrap();

        let result = translate_srt_file(&Config::default(), &source).await;
        assert!(matches!(result, Err(SubtitleError::Argument(_))));
    }

    #[tokio::test]
    async fn test_language_pair_without_api_key_is_configuration_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("movie.srt");
        tokio::fs::write(&source, "").await.unwrap();

        let config = ConfigBuilder::new().with_translation("Japanese", "English").build();
        let result = translate_srt_file(&config, &source).await;

        assert!(matches!(result, Err(SubtitleError::Configuration(_))));
        assert!(!dir.path().join("movie-english.srt").exists());
    }
}
