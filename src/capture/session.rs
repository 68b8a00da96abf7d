//! Capture session state machine.
//!
//! All loop state that drives auto capture (countdowns, the consecutive
//! aligned-frame counter, the last-trigger instant, the last-seen frame
//! timestamp) lives as fields of [`CaptureSession`] with idempotent
//! start/stop/reset paths. The session is driven cooperatively: the UI loop
//! calls [`CaptureSession::tick`] once per iteration and acts on the
//! returned [`TickOutcome`].

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};

use super::camera::{open_with_fallback, Camera, FacingMode, FrameSource, StreamStartup};
use super::detector::FaceBox;
use super::{snapshot_jpeg, CaptureError, Frame};

/// Geometry and debounce tuning for the auto-align assist.
///
/// The target zone is a circle fixed relative to the frame: the user lines
/// their head up with it. Fractions are of frame height except the center x.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Zone center, as a fraction of frame width.
    #[serde(default = "default_zone_center_x")]
    pub zone_center_x: f32,

    /// Zone center, as a fraction of frame height.
    #[serde(default = "default_zone_center_y")]
    pub zone_center_y: f32,

    /// Zone radius, as a fraction of frame height.
    #[serde(default = "default_zone_radius")]
    pub zone_radius: f32,

    /// Face center must be within this fraction of the radius.
    #[serde(default = "default_center_tolerance")]
    pub center_tolerance: f32,

    /// Face width must be at least this many radii (too far otherwise).
    #[serde(default = "default_min_face_scale")]
    pub min_face_scale: f32,

    /// Face width must be at most this many radii (too close otherwise).
    #[serde(default = "default_max_face_scale")]
    pub max_face_scale: f32,

    /// Consecutive aligned frames required before a trigger.
    #[serde(default = "default_stability_frames")]
    pub stability_frames: u32,

    /// Minimum time between auto triggers.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_zone_center_x() -> f32 {
    0.5
}

fn default_zone_center_y() -> f32 {
    0.25
}

fn default_zone_radius() -> f32 {
    0.107
}

fn default_center_tolerance() -> f32 {
    0.8
}

fn default_min_face_scale() -> f32 {
    1.25
}

fn default_max_face_scale() -> f32 {
    2.3
}

fn default_stability_frames() -> u32 {
    12
}

fn default_cooldown_ms() -> u64 {
    3000
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            zone_center_x: default_zone_center_x(),
            zone_center_y: default_zone_center_y(),
            zone_radius: default_zone_radius(),
            center_tolerance: default_center_tolerance(),
            min_face_scale: default_min_face_scale(),
            max_face_scale: default_max_face_scale(),
            stability_frames: default_stability_frames(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl AlignmentConfig {
    fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownKind {
    Manual,
    Auto,
}

/// A one-second-cadence countdown. At most one exists per session; starting
/// a new one replaces (cancels) the old.
#[derive(Debug)]
struct Countdown {
    kind: CountdownKind,
    remaining: u32,
    last_tick: Instant,
}

impl Countdown {
    fn new(kind: CountdownKind, seconds: u32, now: Instant) -> Self {
        Self {
            kind,
            remaining: seconds,
            last_tick: now,
        }
    }

    /// Advance; returns true once the countdown has fired.
    fn tick(&mut self, now: Instant) -> bool {
        while self.remaining > 0 && now.duration_since(self.last_tick) >= Duration::from_secs(1) {
            self.last_tick += Duration::from_secs(1);
            self.remaining -= 1;
        }
        self.remaining == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Stream acquisition in progress (or not started yet).
    Starting,
    Live,
    CountingDown(CountdownKind),
    Saving,
    /// Stream acquisition failed; user can retry by re-entering.
    Failed,
}

/// What the driving loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    None,
    /// Produce a snapshot now (countdown fired, or an immediate request).
    Capture,
}

const TIMER_CYCLE: &[u32] = &[0, 3, 5, 10];
const AUTO_DELAY_CYCLE: &[u32] = &[0, 2, 3, 5];

pub struct CaptureSession {
    state: SessionState,
    facing: FacingMode,
    source: Option<Box<dyn FrameSource>>,
    current_frame: Option<Frame>,

    /// Non-fatal startup notice (e.g. rear camera fallback).
    notice: Option<String>,
    /// Recoverable failure message for the UI.
    error: Option<String>,

    /// Manual self-timer seconds; 0 = immediate.
    timer_seconds: u32,
    auto_mode: bool,
    /// Pre-capture countdown after an auto trigger; 0 = shoot immediately.
    auto_delay_seconds: u32,

    /// Result of the latest alignment evaluation (None = unknown).
    aligned: Option<bool>,
    good_frames: u32,
    last_shot_at: Option<Instant>,
    last_frame_ts: Option<SystemTime>,
    countdown: Option<Countdown>,

    align: AlignmentConfig,
}

impl CaptureSession {
    pub fn new(align: AlignmentConfig) -> Self {
        Self {
            state: SessionState::Starting,
            facing: FacingMode::Front,
            source: None,
            current_frame: None,
            notice: None,
            error: None,
            timer_seconds: 0,
            auto_mode: false,
            auto_delay_seconds: 3,
            aligned: None,
            good_frames: 0,
            last_shot_at: None,
            last_frame_ts: None,
            countdown: None,
            align,
        }
    }

    // ========================================================================
    // Stream lifecycle
    // ========================================================================

    /// Acquire a stream for the current facing mode. Any previous stream is
    /// stopped first.
    pub fn start(&mut self, camera: &dyn Camera) {
        self.stop_stream();
        self.state = SessionState::Starting;
        self.error = None;
        self.notice = None;

        match open_with_fallback(camera, self.facing) {
            Ok((source, startup)) => {
                if startup == StreamStartup::FellBackToFront {
                    self.facing = FacingMode::Front;
                    self.notice =
                        Some("Rear camera unavailable, switched to front.".to_string());
                }
                self.source = Some(source);
                self.state = SessionState::Live;
            }
            Err(err) => {
                tracing::error!(error = %err, "Camera start failed");
                self.error = Some(err.to_string());
                self.state = SessionState::Failed;
            }
        }
    }

    /// Switch front/rear. Resets all alignment state so nothing auto-fires
    /// across the switch; the old stream is stopped before the new request.
    pub fn toggle_facing(&mut self, camera: &dyn Camera) {
        if self.is_busy() {
            return;
        }
        self.reset_alignment();
        self.cancel_countdown();
        self.facing = self.facing.toggled();
        self.start(camera);
    }

    /// Stop the stream and all timers. Safe to call repeatedly and on every
    /// teardown path.
    pub fn teardown(&mut self) {
        self.stop_stream();
        self.cancel_countdown();
        self.reset_alignment();
    }

    fn stop_stream(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.stop();
        }
        self.source = None;
    }

    // ========================================================================
    // Mode toggles
    // ========================================================================

    pub fn cycle_timer(&mut self) {
        if self.is_busy() || self.auto_mode {
            return;
        }
        self.timer_seconds = next_in_cycle(TIMER_CYCLE, self.timer_seconds);
    }

    pub fn cycle_auto_delay(&mut self) {
        if self.is_busy() || !self.auto_mode {
            return;
        }
        self.auto_delay_seconds = next_in_cycle(AUTO_DELAY_CYCLE, self.auto_delay_seconds);
    }

    /// Toggle the auto-align assist; entering or leaving resets all
    /// alignment state.
    pub fn toggle_auto_mode(&mut self) {
        if self.is_busy() {
            return;
        }
        self.reset_alignment();
        self.cancel_countdown();
        self.auto_mode = !self.auto_mode;
    }

    fn reset_alignment(&mut self) {
        self.good_frames = 0;
        self.aligned = None;
        self.last_frame_ts = None;
    }

    fn cancel_countdown(&mut self) {
        self.countdown = None;
        if matches!(self.state, SessionState::CountingDown(_)) {
            self.state = SessionState::Live;
        }
    }

    fn is_busy(&self) -> bool {
        !matches!(self.state, SessionState::Live)
    }

    // ========================================================================
    // Capture
    // ========================================================================

    /// Manual shutter press: immediate capture, or start the self-timer.
    pub fn request_capture(&mut self, now: Instant) -> TickOutcome {
        if self.is_busy() {
            return TickOutcome::None;
        }
        self.error = None;

        if self.timer_seconds == 0 {
            TickOutcome::Capture
        } else {
            self.start_countdown(CountdownKind::Manual, self.timer_seconds, now);
            TickOutcome::None
        }
    }

    fn start_countdown(&mut self, kind: CountdownKind, seconds: u32, now: Instant) {
        // Assignment replaces any pending countdown, so two can never run
        // concurrently.
        self.countdown = Some(Countdown::new(kind, seconds, now));
        self.state = SessionState::CountingDown(kind);
    }

    /// Rasterize the current frame. The session moves to `Saving`; the
    /// caller persists the blob and reports back via [`Self::saved`] or
    /// [`Self::save_failed`].
    pub fn take_snapshot(&mut self) -> Result<Vec<u8>, CaptureError> {
        let frame = self.current_frame.as_ref().ok_or(CaptureError::NotReady)?;
        let blob = snapshot_jpeg(frame, self.facing)?;
        self.state = SessionState::Saving;
        Ok(blob)
    }

    pub fn saved(&mut self) {
        self.state = SessionState::Live;
    }

    /// Persisting failed. The current frame is retained, so a manual retry
    /// does not need a fresh capture or a new stream.
    pub fn save_failed(&mut self, message: String) {
        tracing::error!(error = %message, "Saving snapshot failed");
        self.error = Some(message);
        self.state = SessionState::Live;
    }

    /// Surface a transient capture problem without leaving `Live`.
    pub fn capture_failed(&mut self, err: &CaptureError) {
        self.error = Some(err.to_string());
        self.state = SessionState::Live;
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// One cooperative step: poll a frame, run any countdown, and (in auto
    /// mode) evaluate alignment on fresh frames.
    ///
    /// `detect` is the face-detection capability; it returns `None` when no
    /// detector is available, which disables auto triggering but nothing
    /// else.
    pub fn tick<F>(&mut self, now: Instant, detect: F) -> TickOutcome
    where
        F: FnOnce(&Frame) -> Option<Vec<FaceBox>>,
    {
        self.poll_frame();

        // A running countdown suspends alignment evaluation entirely.
        if let Some(countdown) = self.countdown.as_mut() {
            if countdown.tick(now) {
                self.countdown = None;
                self.state = SessionState::Live;
                return TickOutcome::Capture;
            }
            return TickOutcome::None;
        }

        if !self.auto_mode || self.state != SessionState::Live {
            return TickOutcome::None;
        }

        // Only evaluate frames the loop has not seen yet.
        let Some(frame) = self.current_frame.as_ref() else {
            return TickOutcome::None;
        };
        if self.last_frame_ts == Some(frame.timestamp) {
            return TickOutcome::None;
        }
        self.last_frame_ts = Some(frame.timestamp);

        let Some(faces) = detect(frame) else {
            self.aligned = None;
            return TickOutcome::None;
        };

        let ok = faces
            .first()
            .map(|face| self.evaluate_alignment(face, frame))
            .unwrap_or(false);
        self.aligned = Some(ok);

        if ok {
            self.good_frames += 1;
        } else {
            self.good_frames = 0;
        }

        let stable = self.good_frames >= self.align.stability_frames;
        let cooldown_ok = self
            .last_shot_at
            .map(|t| now.duration_since(t) > self.align.cooldown())
            .unwrap_or(true);

        if stable && cooldown_ok {
            self.last_shot_at = Some(now);
            self.good_frames = 0;

            if self.auto_delay_seconds == 0 {
                return TickOutcome::Capture;
            }
            self.start_countdown(CountdownKind::Auto, self.auto_delay_seconds, now);
        }

        TickOutcome::None
    }

    fn poll_frame(&mut self) {
        if let Some(source) = self.source.as_mut() {
            match source.poll_frame() {
                Ok(Some(frame)) => self.current_frame = Some(frame),
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "Frame poll failed"),
            }
        }
    }

    /// Geometric test: face center inside the target zone, face size within
    /// the near/far band.
    fn evaluate_alignment(&self, face: &FaceBox, frame: &Frame) -> bool {
        use image::GenericImageView;

        let (frame_w, frame_h) = frame.image.dimensions();
        let w = frame_w as f32;
        let h = frame_h as f32;
        if w == 0.0 || h == 0.0 {
            return false;
        }

        let radius = h * self.align.zone_radius;
        let zone_x = w * self.align.zone_center_x;
        let zone_y = h * self.align.zone_center_y;

        let (fx, fy) = face.center();
        let dist = (fx - zone_x).hypot(fy - zone_y);
        let center_ok = dist <= radius * self.align.center_tolerance;

        let face_w = face.width as f32;
        let size_ok =
            face_w >= radius * self.align.min_face_scale && face_w <= radius * self.align.max_face_scale;

        center_ok && size_ok
    }

    // ========================================================================
    // Accessors for the view
    // ========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.current_frame.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn aligned(&self) -> Option<bool> {
        self.aligned
    }

    pub fn auto_mode(&self) -> bool {
        self.auto_mode
    }

    pub fn timer_seconds(&self) -> u32 {
        self.timer_seconds
    }

    pub fn auto_delay_seconds(&self) -> u32 {
        self.auto_delay_seconds
    }

    pub fn countdown_remaining(&self) -> Option<(CountdownKind, u32)> {
        self.countdown.as_ref().map(|c| (c.kind, c.remaining))
    }
}

fn next_in_cycle(cycle: &[u32], current: u32) -> u32 {
    let pos = cycle.iter().position(|&v| v == current).unwrap_or(0);
    cycle[(pos + 1) % cycle.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use image::{DynamicImage, RgbImage};

    const FRAME_W: u32 = 100;
    const FRAME_H: u32 = 100;

    /// Source producing a fresh synthetic frame on every poll.
    #[derive(Debug)]
    struct TickerSource {
        n: u64,
        stopped: bool,
    }

    impl FrameSource for TickerSource {
        fn facing(&self) -> FacingMode {
            FacingMode::Front
        }

        fn poll_frame(&mut self) -> Result<Option<Frame>> {
            if self.stopped {
                return Ok(None);
            }
            self.n += 1;
            Ok(Some(Frame {
                image: DynamicImage::ImageRgb8(RgbImage::new(FRAME_W, FRAME_H)),
                timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(self.n),
            }))
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    struct TestCamera;

    impl Camera for TestCamera {
        fn open(&self, _facing: FacingMode) -> Result<Box<dyn FrameSource>> {
            Ok(Box::new(TickerSource { n: 0, stopped: false }))
        }
    }

    /// A face dead-center in the default target zone of a 100x100 frame.
    fn aligned_face() -> FaceBox {
        // Zone center (50, 25), radius 10.7; width 18 sits inside the
        // [13.4, 24.6] size band.
        FaceBox { x: 41, y: 16, width: 18, height: 18 }
    }

    fn misaligned_face() -> FaceBox {
        FaceBox { x: 0, y: 0, width: 10, height: 10 }
    }

    fn session_with_auto(auto_delay: u32) -> CaptureSession {
        let mut session = CaptureSession::new(AlignmentConfig::default());
        session.start(&TestCamera);
        session.toggle_auto_mode();
        while session.auto_delay_seconds() != auto_delay {
            session.cycle_auto_delay();
        }
        session
    }

    fn tick_aligned(session: &mut CaptureSession, now: Instant) -> TickOutcome {
        session.tick(now, |_| Some(vec![aligned_face()]))
    }

    #[test]
    fn test_twelve_aligned_frames_trigger_exactly_once() {
        let mut session = session_with_auto(0);
        let start = Instant::now();

        for i in 0..11 {
            let outcome = tick_aligned(&mut session, start + Duration::from_millis(i * 100));
            assert_eq!(outcome, TickOutcome::None, "frame {i} must not trigger");
        }

        let outcome = tick_aligned(&mut session, start + Duration::from_millis(1100));
        assert_eq!(outcome, TickOutcome::Capture);
        assert_eq!(session.good_frames, 0, "counter resets after trigger");
    }

    #[test]
    fn test_misaligned_frame_resets_counter() {
        let mut session = session_with_auto(0);
        let start = Instant::now();

        for i in 0..11 {
            tick_aligned(&mut session, start + Duration::from_millis(i * 100));
        }
        session.tick(start + Duration::from_millis(1100), |_| {
            Some(vec![misaligned_face()])
        });
        assert_eq!(session.good_frames, 0);
        assert_eq!(session.aligned(), Some(false));

        // The streak starts over; 11 more aligned frames are not enough.
        for i in 0..11 {
            let outcome = tick_aligned(&mut session, start + Duration::from_millis(1200 + i * 100));
            assert_eq!(outcome, TickOutcome::None);
        }
    }

    #[test]
    fn test_cooldown_suppresses_second_trigger() {
        let mut session = session_with_auto(0);
        let start = Instant::now();

        let mut t = start;
        let mut captures = 0;
        for _ in 0..60 {
            t += Duration::from_millis(100);
            if tick_aligned(&mut session, t) == TickOutcome::Capture {
                captures += 1;
            }
        }
        // 60 frames over 6s: first trigger at frame 12, cooldown 3s blocks
        // re-trigger until 12 further aligned frames accumulate after it.
        assert_eq!(captures, 2);
    }

    #[test]
    fn test_no_faces_is_not_aligned() {
        let mut session = session_with_auto(0);
        session.tick(Instant::now(), |_| Some(vec![]));
        assert_eq!(session.aligned(), Some(false));
    }

    #[test]
    fn test_detector_unavailable_leaves_alignment_unknown() {
        let mut session = session_with_auto(0);
        session.tick(Instant::now(), |_| None);
        assert_eq!(session.aligned(), None);
    }

    #[test]
    fn test_stale_frame_is_not_reevaluated() {
        let mut session = session_with_auto(0);
        let now = Instant::now();
        tick_aligned(&mut session, now);
        let frames_after_first = session.good_frames;

        // Stop the source: no new frames arrive, so the counter must not
        // move even with an eager detector.
        session.stop_stream();
        for i in 0..5 {
            tick_aligned(&mut session, now + Duration::from_millis(100 + i));
        }
        assert_eq!(session.good_frames, frames_after_first);
    }

    #[test]
    fn test_auto_trigger_starts_pre_capture_countdown() {
        let mut session = session_with_auto(2);
        let start = Instant::now();

        let mut t = start;
        for _ in 0..12 {
            t += Duration::from_millis(100);
            assert_eq!(tick_aligned(&mut session, t), TickOutcome::None);
        }
        assert_eq!(
            session.state(),
            SessionState::CountingDown(CountdownKind::Auto)
        );
        assert_eq!(session.countdown_remaining(), Some((CountdownKind::Auto, 2)));

        // Alignment is suspended while counting down; the countdown fires
        // after two seconds.
        assert_eq!(tick_aligned(&mut session, t + Duration::from_secs(1)), TickOutcome::None);
        assert_eq!(
            tick_aligned(&mut session, t + Duration::from_secs(2)),
            TickOutcome::Capture
        );
        assert_eq!(session.state(), SessionState::Live);
    }

    #[test]
    fn test_manual_timer_countdown() {
        let mut session = CaptureSession::new(AlignmentConfig::default());
        session.start(&TestCamera);
        session.cycle_timer();
        assert_eq!(session.timer_seconds(), 3);

        let start = Instant::now();
        assert_eq!(session.request_capture(start), TickOutcome::None);
        assert_eq!(
            session.state(),
            SessionState::CountingDown(CountdownKind::Manual)
        );

        // A second press while counting down is ignored.
        assert_eq!(session.request_capture(start), TickOutcome::None);

        let none = session.tick(start + Duration::from_secs(2), |_| None);
        assert_eq!(none, TickOutcome::None);
        let fired = session.tick(start + Duration::from_secs(3), |_| None);
        assert_eq!(fired, TickOutcome::Capture);
    }

    #[test]
    fn test_immediate_manual_capture() {
        let mut session = CaptureSession::new(AlignmentConfig::default());
        session.start(&TestCamera);
        assert_eq!(session.timer_seconds(), 0);
        assert_eq!(session.request_capture(Instant::now()), TickOutcome::Capture);
    }

    #[test]
    fn test_toggle_facing_resets_alignment_state() {
        let mut session = session_with_auto(0);
        let start = Instant::now();
        for i in 0..6 {
            tick_aligned(&mut session, start + Duration::from_millis(i * 100));
        }
        assert!(session.good_frames > 0);

        session.toggle_facing(&TestCamera);
        assert_eq!(session.good_frames, 0);
        assert_eq!(session.aligned(), None);
        assert_eq!(session.facing(), FacingMode::Rear);
    }

    #[test]
    fn test_leaving_auto_mode_cancels_auto_countdown() {
        let mut session = session_with_auto(3);
        let start = Instant::now();
        let mut t = start;
        for _ in 0..12 {
            t += Duration::from_millis(100);
            tick_aligned(&mut session, t);
        }
        assert!(session.countdown_remaining().is_some());

        session.toggle_auto_mode();
        assert!(session.countdown_remaining().is_none());
        assert_eq!(session.state(), SessionState::Live);
        assert!(!session.auto_mode());
    }

    #[test]
    fn test_save_failure_keeps_frame_and_returns_to_live() {
        let mut session = CaptureSession::new(AlignmentConfig::default());
        session.start(&TestCamera);
        session.tick(Instant::now(), |_| None); // pull a frame

        let blob = session.take_snapshot().unwrap();
        assert!(!blob.is_empty());
        assert_eq!(session.state(), SessionState::Saving);

        session.save_failed("disk full".to_string());
        assert_eq!(session.state(), SessionState::Live);
        assert!(session.error().is_some());
        assert!(session.frame().is_some(), "frame retained for retry");
    }

    #[test]
    fn test_snapshot_without_frame_is_not_ready() {
        let mut session = CaptureSession::new(AlignmentConfig::default());
        assert!(matches!(
            session.take_snapshot(),
            Err(CaptureError::NotReady)
        ));
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut session = session_with_auto(0);
        session.teardown();
        session.teardown();
        assert!(session.countdown_remaining().is_none());
        assert_eq!(session.good_frames, 0);
    }
}
