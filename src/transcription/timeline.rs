use super::srt::Cue;

/// Reposition a chunk's cues onto the global timeline.
///
/// Clamping happens in the chunk's local frame: starts are floored at zero and
/// ends capped at `ceiling_ms` (the chunk's real duration). Both bounds are then
/// shifted by `offset_ms`. Cues left with `start >= end` are kept as-is.
pub fn shift_and_clamp(mut cues: Vec<Cue>, offset_ms: i64, ceiling_ms: i64) -> Vec<Cue> {
    for cue in cues.iter_mut() {
        cue.start = cue.start.max(0).saturating_add(offset_ms);
        cue.end = cue.end.min(ceiling_ms).saturating_add(offset_ms);
    }
    cues
}

/// Convert a chunk-relative duration in seconds to whole milliseconds
pub fn seconds_to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}
