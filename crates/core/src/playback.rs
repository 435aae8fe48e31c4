/// Length of the clip played for each review.
pub const CLIP_LENGTH_MS: u64 = 15_000;

/// Ephemeral playback flags set by the surrounding app from device events.
///
/// Only drives the progress indicator; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackState {
    is_playing: bool,
    started_at: i64,
}

impl PlaybackState {
    /// Records the playing flag; the start instant is `now_ms` when playing, else 0.
    pub fn set_playing(&mut self, is_playing: bool, now_ms: i64) {
        self.is_playing = is_playing;
        self.started_at = if is_playing { now_ms } else { 0 };
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Milliseconds since the Unix epoch; 0 while stopped.
    #[must_use]
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    fn elapsed_ms(&self, now_ms: i64) -> Option<i64> {
        (self.is_playing && self.started_at > 0).then(|| (now_ms - self.started_at).max(0))
    }

    /// Percentage of the clip window elapsed, clamped to `0.0..=100.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self, now_ms: i64) -> f64 {
        self.elapsed_ms(now_ms).map_or(0.0, |elapsed| {
            (elapsed as f64 / CLIP_LENGTH_MS as f64 * 100.0).min(100.0)
        })
    }

    /// True once a playing clip has run for the whole window and should be paused.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn clip_finished(&self, now_ms: i64) -> bool {
        self.elapsed_ms(now_ms)
            .is_some_and(|elapsed| elapsed >= CLIP_LENGTH_MS as i64)
    }
}
