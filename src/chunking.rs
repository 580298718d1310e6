use serde::{Deserialize, Serialize};

/// Upload budget per chunk: 24 MiB, just under the Whisper API's 25 MB cap
pub const DEFAULT_CHUNK_BYTE_BUDGET: u64 = 24 * 1024 * 1024;

/// One contiguous time range of the source audio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkSpec {
    pub index: usize,
    pub start_offset_seconds: f64,
    pub duration_seconds: f64,
}

impl ChunkSpec {
    pub fn end_seconds(&self) -> f64 {
        self.start_offset_seconds + self.duration_seconds
    }
}

/// Split a file of `total_size_bytes` and `total_duration_seconds` into
/// time ranges whose proportional size stays within `chunk_byte_budget`.
///
/// Assumes constant bitrate. Every chunk shares the same nominal duration
/// except the last, which is clamped to what remains.
pub fn plan_chunks(
    total_size_bytes: u64,
    total_duration_seconds: f64,
    chunk_byte_budget: u64,
) -> Vec<ChunkSpec> {
    if total_size_bytes == 0 || chunk_byte_budget == 0 {
        return Vec::new();
    }

    let count = total_size_bytes.div_ceil(chunk_byte_budget) as usize;
    let chunk_duration =
        total_duration_seconds * chunk_byte_budget as f64 / total_size_bytes as f64;

    (0..count)
        .map(|index| {
            let start = chunk_duration * index as f64;
            ChunkSpec {
                index,
                start_offset_seconds: start,
                duration_seconds: chunk_duration.min(total_duration_seconds - start).max(0.0),
            }
        })
        .collect()
}
