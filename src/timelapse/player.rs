//! Frame player for the timelapse view.

use std::time::{Duration, Instant};

/// Per-frame delay limits (milliseconds).
const MIN_FRAME_DELAY_MS: u64 = 100;
const MAX_FRAME_DELAY_MS: u64 = 1000;
const FRAME_DELAY_STEP_MS: u64 = 50;
const DEFAULT_FRAME_DELAY_MS: u64 = 300;

/// Playback state over a fixed-length frame range.
///
/// The player knows only the range length; frame contents are looked up by
/// the view using [`Player::index`].
#[derive(Debug, Clone)]
pub struct Player {
    len: usize,
    index: usize,
    playing: bool,
    frame_delay: Duration,
    last_advance: Instant,
}

impl Player {
    /// A new player starts at the first frame, playing.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            index: 0,
            playing: len > 0,
            frame_delay: Duration::from_millis(DEFAULT_FRAME_DELAY_MS),
            last_advance: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn frame_delay_ms(&self) -> u64 {
        self.frame_delay.as_millis() as u64
    }

    /// The active range changed: restart from the first frame and resume
    /// playing.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.index = 0;
        self.playing = len > 0;
        self.last_advance = Instant::now();
    }

    /// Manual step forward, wrapping at the end.
    pub fn next(&mut self) {
        if self.len == 0 {
            return;
        }
        self.index = (self.index + 1) % self.len;
        self.last_advance = Instant::now();
    }

    /// Manual step back, wrapping at the start.
    pub fn prev(&mut self) {
        if self.len == 0 {
            return;
        }
        self.index = (self.index + self.len - 1) % self.len;
        self.last_advance = Instant::now();
    }

    /// Toggle play/pause. Resuming while parked on the last frame restarts
    /// from the beginning.
    pub fn toggle_play(&mut self) {
        if self.len == 0 {
            return;
        }
        if !self.playing && self.index >= self.len - 1 {
            self.index = 0;
        }
        self.playing = !self.playing;
        self.last_advance = Instant::now();
    }

    /// Jump to a frame; scrubbing pauses playback.
    pub fn scrub(&mut self, index: usize) {
        if self.len == 0 {
            return;
        }
        self.index = index.min(self.len - 1);
        self.playing = false;
    }

    pub fn faster(&mut self) {
        let ms = self
            .frame_delay_ms()
            .saturating_sub(FRAME_DELAY_STEP_MS)
            .max(MIN_FRAME_DELAY_MS);
        self.frame_delay = Duration::from_millis(ms);
    }

    pub fn slower(&mut self) {
        let ms = (self.frame_delay_ms() + FRAME_DELAY_STEP_MS).min(MAX_FRAME_DELAY_MS);
        self.frame_delay = Duration::from_millis(ms);
    }

    /// Advance on the playback cadence. Reaching the last frame stops
    /// playback (no loop). Returns true when the displayed frame changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.playing || self.len == 0 {
            return false;
        }
        if now.duration_since(self.last_advance) < self.frame_delay {
            return false;
        }

        self.last_advance = now;
        if self.index + 1 < self.len {
            self.index += 1;
            true
        } else {
            self.playing = false;
            false
        }
    }
}
