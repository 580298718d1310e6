use futures::future::try_join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::audio::{FfmpegTool, MediaTool};
use crate::chunking::{plan_chunks, ChunkSpec};
use crate::config::{Config, OutputFormat};
use crate::job::{validate_media_path, Accumulator, JobContext, JobPaths};
use crate::merge::write_merged;
use crate::transcription::srt;
use crate::transcription::text::{strip_trailing_period, to_plain_text};
use crate::transcription::timeline::{seconds_to_millis, shift_and_clamp};
use crate::transcription::whisper::{AudioChunk, OpenAITranscriber, Transcriber};
use crate::Result;

/// Lifecycle of a single chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChunkStage {
    Pending,
    Split,
    Transcribed,
    Realigned,
    Merged,
    Cleaned,
}

/// What happened to one chunk during a run
#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    pub spec: ChunkSpec,
    pub stages: Vec<ChunkStage>,
    /// Chunk audio was already on disk
    pub split_skipped: bool,
    /// Raw transcript was already on disk; no provider call was made
    pub transcription_skipped: bool,
    pub cue_count: usize,
}

impl ChunkReport {
    fn new(spec: ChunkSpec) -> Self {
        Self {
            spec,
            stages: vec![ChunkStage::Pending],
            split_skipped: false,
            transcription_skipped: false,
            cue_count: 0,
        }
    }

    fn advance(&mut self, stage: ChunkStage) {
        self.stages.push(stage);
    }

    pub fn stage(&self) -> ChunkStage {
        self.stages.last().copied().unwrap_or(ChunkStage::Pending)
    }
}

/// Outcome of a full media-to-subtitle run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub source: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub chunk_count: usize,
    pub duration_seconds: u64,
    pub chunks: Vec<ChunkReport>,
    pub processing_time: Duration,
}

/// Chunked transcription pipeline: extract, plan, split, transcribe, realign, merge
pub struct SubtitlePipeline {
    config: Config,
    media: Arc<dyn MediaTool>,
    transcriber: Arc<dyn Transcriber>,
    chunk_semaphore: Arc<Semaphore>,
}

impl SubtitlePipeline {
    pub fn new(
        config: Config,
        media: Arc<dyn MediaTool>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Result<Self> {
        config.validate()?;

        let max_concurrent = config.chunking.max_concurrent_chunks;
        info!("🔧 Initializing SubtitlePipeline with {} concurrent chunk(s)", max_concurrent);

        Ok(Self {
            config,
            media,
            transcriber,
            chunk_semaphore: Arc::new(Semaphore::new(max_concurrent)),
        })
    }

    /// Pipeline backed by ffmpeg and the OpenAI Whisper API
    pub fn from_config(config: Config) -> Result<Self> {
        config.require_api_key()?;
        let media = Arc::new(FfmpegTool::new(&config.media));
        let transcriber = Arc::new(OpenAITranscriber::new(&config.openai)?);
        Self::new(config, media, transcriber)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Produce every configured output format for `source`
    pub async fn run(&self, source: &Path) -> Result<PipelineResult> {
        let start_time = Instant::now();
        validate_media_path(source)?;

        let paths = JobPaths::from_source(source)?
            .with_audio_extension(self.config.media.audio_extension.clone());
        let formats = self.config.transcription.formats.clone();
        let language = self.config.transcription.language.clone();
        let prompt = self.load_prompt().await?;

        let format_names: Vec<String> = formats.iter().map(|f| f.to_string()).collect();
        info!("🎬 Media: {}", source.display());
        info!("📄 Formats: {}", format_names.join(", "));
        info!("🌐 Language: {}", language.as_deref().unwrap_or("not set"));
        info!("💬 Custom Prompt: {}", if prompt.is_some() { "set" } else { "not set" });

        let audio_path = self.prepare_audio(source, &paths).await?;

        let size = tokio::fs::metadata(&audio_path).await?.len();
        let duration = self.media.probe_duration(&audio_path).await?;
        let plan = plan_chunks(size, duration as f64, self.config.chunking.chunk_byte_budget);

        info!(
            "✂️ Planned {} chunk(s) for {} bytes / {}s of audio",
            plan.len(),
            size,
            duration
        );

        let ctx = JobContext {
            source: source.to_path_buf(),
            paths,
            formats,
            language,
            prompt,
            total_duration_seconds: duration as f64,
            chunk_count: plan.len(),
            accumulator: Accumulator::new(),
        };

        let chunks = try_join_all(plan.iter().map(|spec| self.process_chunk(&ctx, *spec))).await?;

        let mut outputs = Vec::with_capacity(ctx.formats.len());
        for format in &ctx.formats {
            let contents = ctx.accumulator.ordered(*format).await;
            let output = ctx.paths.output(*format);
            outputs.push(write_merged(&contents, *format, &output).await?);
        }

        if !self.config.chunking.keep_intermediate_audio {
            if let Err(e) = tokio::fs::remove_file(&audio_path).await {
                warn!("Failed to remove intermediate audio {}: {}", audio_path.display(), e);
            }
        }

        let processing_time = start_time.elapsed();
        info!(
            "🎉 Subtitles for {} completed in {:.2}s",
            source.display(),
            processing_time.as_secs_f64()
        );

        Ok(PipelineResult {
            source: ctx.source.clone(),
            outputs,
            chunk_count: ctx.chunk_count,
            duration_seconds: duration,
            chunks,
            processing_time,
        })
    }

    async fn load_prompt(&self) -> Result<Option<String>> {
        let Some(prompt_file) = &self.config.transcription.prompt_file else {
            return Ok(None);
        };

        if !prompt_file.is_file() {
            return Ok(None);
        }

        let prompt = tokio::fs::read_to_string(prompt_file).await?;
        Ok(Some(prompt).filter(|p| !p.trim().is_empty()))
    }

    /// Reuse `<stem>_tmp` audio when present, otherwise extract it
    async fn prepare_audio(&self, source: &Path, paths: &JobPaths) -> Result<PathBuf> {
        let audio_path = paths.intermediate_audio();

        if audio_path.exists() {
            warn!("🎵 Audio already exists, reusing {}", audio_path.display());
        } else {
            self.media.extract_audio(source, &audio_path).await?;
            info!("✅ Audio extracted: {}", audio_path.display());
        }

        Ok(audio_path)
    }

    async fn process_chunk(&self, ctx: &JobContext, spec: ChunkSpec) -> Result<ChunkReport> {
        let _permit = self.chunk_semaphore.acquire().await?;
        let index = spec.index;
        let mut report = ChunkReport::new(spec);

        info!(
            "📦 Chunk {}/{}: {:.1}s + {:.1}s",
            index + 1,
            ctx.chunk_count,
            spec.start_offset_seconds,
            spec.duration_seconds
        );

        let chunk_audio = ctx.paths.chunk_audio(index);
        let transcript_path = ctx.paths.chunk_transcript(index);
        let has_transcript = transcript_path.exists();

        // Pending -> Split
        if chunk_audio.exists() || has_transcript {
            warn!("Chunk {} audio already exists, skipping split", index);
            report.split_skipped = true;
        } else {
            self.media
                .split(
                    &ctx.audio_path(),
                    spec.start_offset_seconds,
                    spec.duration_seconds,
                    &chunk_audio,
                )
                .await?;
        }
        report.advance(ChunkStage::Split);

        // Split -> Transcribed
        let raw = if has_transcript {
            warn!("Chunk {} transcript already exists, skipping transcription", index);
            report.transcription_skipped = true;
            tokio::fs::read_to_string(&transcript_path).await?
        } else {
            let chunk = AudioChunk::load(&chunk_audio).await?;
            let raw = self
                .transcriber
                .transcribe(chunk, ctx.language.as_deref(), ctx.prompt.as_deref())
                .await?;
            tokio::fs::write(&transcript_path, &raw).await?;
            raw
        };
        report.advance(ChunkStage::Transcribed);

        // Transcribed -> Realigned, one format at a time
        let cues = srt::parse(&raw)?;
        report.cue_count = cues.len();

        let offset_ms = seconds_to_millis(spec.start_offset_seconds);
        let ceiling_ms = seconds_to_millis(spec.duration_seconds);

        let mut realigned = Vec::with_capacity(ctx.formats.len());
        for format in &ctx.formats {
            let content = match format {
                OutputFormat::Srt => {
                    let mut timed = cues.clone();
                    if self.config.chunking.strip_trailing_period {
                        strip_trailing_period(&mut timed);
                    }
                    srt::serialize(&shift_and_clamp(timed, offset_ms, ceiling_ms))
                }
                // Plain text keeps the transcript wording untouched
                OutputFormat::Txt => to_plain_text(&cues),
            };
            tokio::fs::write(ctx.paths.chunk_output(index, *format), &content).await?;
            realigned.push((*format, content));
        }
        report.advance(ChunkStage::Realigned);

        // Realigned -> Merged
        for (format, content) in realigned {
            ctx.accumulator.append(format, index, content).await;
        }
        report.advance(ChunkStage::Merged);

        // Merged -> Cleaned
        self.cleanup_chunk(ctx, index).await;
        report.advance(ChunkStage::Cleaned);

        info!("✅ Chunk {} done ({} cues)", index, report.cue_count);
        Ok(report)
    }

    async fn cleanup_chunk(&self, ctx: &JobContext, index: usize) {
        let mut temp_files = vec![ctx.paths.chunk_audio(index), ctx.paths.chunk_transcript(index)];
        temp_files.extend(ctx.formats.iter().map(|f| ctx.paths.chunk_output(index, *f)));

        for path in temp_files {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!("Could not remove temp file {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedMedia {
        duration: u64,
        splits: AtomicUsize,
    }

    #[async_trait]
    impl MediaTool for FixedMedia {
        async fn probe_duration(&self, _path: &Path) -> Result<u64> {
            Ok(self.duration)
        }

        async fn extract_audio(&self, _source: &Path, output: &Path) -> Result<()> {
            tokio::fs::write(output, vec![0u8; 2048]).await?;
            Ok(())
        }

        async fn split(&self, _source: &Path, _start: f64, _dur: f64, output: &Path) -> Result<()> {
            self.splits.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(output, b"chunk").await?;
            Ok(())
        }
    }

    struct EchoTranscriber;

    #[async_trait]
    impl Transcriber for EchoTranscriber {
        async fn transcribe(&self, chunk: AudioChunk, _l: Option<&str>, _p: Option<&str>) -> Result<String> {
            Ok(format!("1\n00:00:00,000 --> 00:00:02,000\n{}.\n\n", chunk.file_name))
        }
    }

    #[tokio::test]
    async fn test_chunk_report_walks_every_stage() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("clip.mp3");
        tokio::fs::write(&source, b"audio").await.unwrap();

        let config = ConfigBuilder::new()
            .with_chunk_byte_budget(1024)
            .with_prompt_file(None)
            .strip_trailing_period(true)
            .build();
        let media = Arc::new(FixedMedia { duration: 10, splits: AtomicUsize::new(0) });
        let pipeline = SubtitlePipeline::new(config, media.clone(), Arc::new(EchoTranscriber)).unwrap();

        let result = pipeline.run(&source).await.unwrap();

        assert_eq!(result.chunk_count, 2);
        assert_eq!(media.splits.load(Ordering::SeqCst), 2);
        assert!(result.chunks.iter().all(|c| c.stage() == ChunkStage::Cleaned));
        assert_eq!(
            result.chunks[0].stages,
            vec![
                ChunkStage::Pending,
                ChunkStage::Split,
                ChunkStage::Transcribed,
                ChunkStage::Realigned,
                ChunkStage::Merged,
                ChunkStage::Cleaned,
            ]
        );

        let merged = tokio::fs::read_to_string(dir.path().join("clip.srt")).await.unwrap();
        let cues = srt::parse(&merged).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].start, 5000);
        assert_eq!(cues[1].text, "clip_chunk_1.mp3");

        assert!(!dir.path().join("clip_tmp.mp3").exists());
        assert!(!dir.path().join("clip_chunk_0.srt").exists());
    }

    #[tokio::test]
    async fn test_strip_period_only_applies_to_srt() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("clip.mp3");
        tokio::fs::write(&source, b"audio").await.unwrap();

        let config = ConfigBuilder::new()
            .with_formats(vec![OutputFormat::Srt, OutputFormat::Txt])
            .with_prompt_file(None)
            .strip_trailing_period(true)
            .build();
        let media = Arc::new(FixedMedia { duration: 10, splits: AtomicUsize::new(0) });
        let pipeline = SubtitlePipeline::new(config, media, Arc::new(EchoTranscriber)).unwrap();

        pipeline.run(&source).await.unwrap();

        let merged = tokio::fs::read_to_string(dir.path().join("clip.srt")).await.unwrap();
        assert_eq!(srt::parse(&merged).unwrap()[0].text, "clip_chunk_0.mp3");

        let text = tokio::fs::read_to_string(dir.path().join("clip.txt")).await.unwrap();
        assert_eq!(text, "clip_chunk_0.mp3.\n");
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let config = ConfigBuilder::new().with_max_concurrent_chunks(0).build();
        let media = Arc::new(FixedMedia { duration: 1, splits: AtomicUsize::new(0) });

        assert!(SubtitlePipeline::new(config, media, Arc::new(EchoTranscriber)).is_err());
    }

    #[test]
    fn test_from_config_requires_api_key() {
        assert!(matches!(
            SubtitlePipeline::from_config(Config::default()),
            Err(crate::SubtitleError::Configuration(_))
        ));
    }
}
