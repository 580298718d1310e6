pub mod srt;
pub mod text;
pub mod timeline;
pub mod whisper;

pub use srt::{Cue, SubtitleDocument};
pub use text::{strip_trailing_period, to_plain_text};
pub use timeline::shift_and_clamp;
pub use whisper::{AudioChunk, OpenAITranscriber, Transcriber};
