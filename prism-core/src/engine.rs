//! Playback engine: wall-clock pacing, pause, speed, and seek.
//!
//! The engine owns the scheduler loop. Each iteration folds pending intents
//! into the playback state, services at most one seek, parks while paused,
//! then pulls one frame and holds it until its wall-clock due time. Pacing
//! reduces to a single anchor: the surface clock is rewritten so that frame
//! timestamps map directly onto clock readings, and every pause or seek
//! simply re-anchors.
//!
//! The engine is generic over both ends of the pipeline: any
//! [`FrameSource`] upstream and any [`PresentationSurface`] downstream.

use std::path::Path;
use std::time::Duration;

use crate::clock::{format_timecode, PlaybackClock};
use crate::codec::CodecSession;
use crate::convert::PixelConverter;
use crate::error::{OpenError, PlaybackError};
use crate::media::{MediaSession, StreamDescriptor};
use crate::pump::{FramePump, FrameSource, PumpStep};
use crate::state::{Intent, PlaybackState};
use crate::surface::PresentationSurface;

/// How long to park between event checks while paused. Short enough that
/// resume feels immediate, long enough not to spin.
const PAUSE_WAIT: Duration = Duration::from_millis(250);

/// Coarse lifecycle of one playback session, for logging and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Opening,
    Ready,
    Playing,
    Paused,
    Seeking,
    Ended,
    Aborted,
}

/// Why [`Engine::run`] returned successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stream played out to its natural end.
    Ended,
    /// The surface asked to close, or a close intent arrived.
    Closed,
    /// A seek landed beyond the last frame of the stream.
    SeekPastEnd,
}

/// One playback session: a frame source paced onto a presentation surface.
pub struct Engine<S: PresentationSurface, F: FrameSource> {
    surface: S,
    source: F,
    descriptor: StreamDescriptor,
    clock: PlaybackClock,
    state: PlaybackState,
    engine_state: EngineState,
    /// Packed RGBA scratch buffer, sized once from the descriptor.
    rgba: Vec<u8>,
    duration_text: String,
    close_requested: bool,
    /// Whether the surface clock has been anchored to the frame schedule.
    anchored: bool,
    /// Decoded frame waiting for its due time, by pts. Its pixels already
    /// sit in `rgba`; the frame survives interrupted pacing waits so an
    /// intent arriving mid-wait never forces an early present.
    pending_pts: Option<i64>,
}

impl<S: PresentationSurface> Engine<S, FramePump> {
    /// Open `path` and assemble the full decode pipeline behind the engine.
    pub fn open(path: impl AsRef<Path>, surface: S) -> Result<Self, OpenError> {
        let media = MediaSession::open(path)?;
        let codec = CodecSession::open(&media)?;
        let converter = PixelConverter::new(&codec)?;
        let descriptor = media.describe(&codec);

        tracing::info!(
            width = descriptor.width,
            height = descriptor.height,
            fps = descriptor.fps,
            duration_secs = descriptor.duration_secs(),
            "pipeline ready"
        );

        Ok(Self::new(
            descriptor,
            FramePump::new(media, codec, converter),
            surface,
        ))
    }
}

impl<S: PresentationSurface, F: FrameSource> Engine<S, F> {
    pub fn new(descriptor: StreamDescriptor, source: F, surface: S) -> Self {
        let rgba = vec![0u8; descriptor.width as usize * descriptor.height as usize * 4];
        Self {
            surface,
            source,
            clock: PlaybackClock::new(&descriptor),
            state: PlaybackState::new(),
            engine_state: EngineState::Opening,
            rgba,
            duration_text: format_timecode(descriptor.duration_secs()),
            close_requested: false,
            anchored: false,
            pending_pts: None,
            descriptor,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine_state
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Set the playback speed before or during a run. Non-positive values
    /// are ignored, same as the equivalent intent.
    pub fn set_speed(&mut self, speed: f64) {
        self.state.apply(Intent::SetSpeed(speed), self.descriptor.fps);
    }

    /// Drive playback until the stream ends, the surface closes, or a
    /// runtime error aborts the session.
    pub fn run(&mut self) -> Result<StopReason, PlaybackError> {
        self.transition(EngineState::Ready);

        loop {
            if self.surface.should_close() || self.close_requested {
                tracing::info!("surface closed, stopping playback");
                return Ok(StopReason::Closed);
            }

            let intents = self.surface.poll_events();
            self.apply_intents(intents);
            if self.close_requested {
                tracing::info!("close requested, stopping playback");
                return Ok(StopReason::Closed);
            }

            if self.state.seek_requested {
                if let Some(reason) = self.perform_seek()? {
                    return Ok(reason);
                }
                continue;
            }

            if self.state.paused {
                self.wait_while_paused();
                continue;
            }

            let pts = match self.pending_pts {
                Some(pts) => pts,
                None => match self.source.next_frame(&mut self.rgba) {
                    Ok(PumpStep::Frame { pts }) => {
                        if !self.anchored {
                            // First frame: anchor the clock so this frame
                            // is due exactly now and the rest of the
                            // schedule follows from the timestamps.
                            self.surface.set_now(
                                self.clock.target_wall_secs(pts, self.state.speed_factor),
                            );
                            self.anchored = true;
                            self.transition(EngineState::Playing);
                        }
                        self.pending_pts = Some(pts);
                        pts
                    }
                    Ok(PumpStep::EndOfStream) => {
                        tracing::info!(frames = self.state.frame_index, "end of stream");
                        self.transition(EngineState::Ended);
                        return Ok(StopReason::Ended);
                    }
                    Err(source) => {
                        tracing::error!(error = %source, "playback aborted");
                        self.transition(EngineState::Aborted);
                        return Err(source);
                    }
                },
            };

            // An interrupted wait leaves the frame pending; the intent is
            // serviced at the top of the loop and pacing resumes, so the
            // frame goes up no earlier than its due time or not at all.
            if self.pace_until(pts) {
                self.present(pts);
                self.pending_pts = None;
            }
        }
    }

    // ========================================================================
    // Scheduler internals
    // ========================================================================

    fn apply_intents(&mut self, intents: Vec<Intent>) {
        for intent in intents {
            if intent == Intent::Close {
                self.close_requested = true;
            } else {
                self.state.apply(intent, self.descriptor.fps);
            }
        }
    }

    /// Service one pending seek. Returns a stop reason when the seek ends
    /// the session instead of repositioning it.
    fn perform_seek(&mut self) -> Result<Option<StopReason>, PlaybackError> {
        self.state.seek_requested = false;
        // Any frame still waiting on its due time is superseded; it was
        // never presented, so it never advanced the frame index.
        self.pending_pts = None;
        let target = self.clock.timestamp_for_index(self.state.frame_index);
        self.transition(EngineState::Seeking);
        tracing::debug!(target, frame_index = self.state.frame_index, "seeking");

        match self.source.seek_to(target, &mut self.rgba) {
            Ok(PumpStep::Frame { pts }) => {
                // The landed frame goes up immediately; pacing resumes from
                // it by re-anchoring the clock to its due time.
                self.present(pts);
                self.surface
                    .set_now(self.clock.target_wall_secs(pts, self.state.speed_factor));
                self.anchored = true;
                self.transition(EngineState::Playing);
                Ok(None)
            }
            Ok(PumpStep::EndOfStream) | Err(PlaybackError::SeekPastEnd { .. }) => {
                tracing::warn!(target, "seek ran past the end of the stream");
                self.transition(EngineState::Ended);
                Ok(Some(StopReason::SeekPastEnd))
            }
            Err(source) => {
                tracing::error!(error = %source, "seek aborted playback");
                self.transition(EngineState::Aborted);
                Err(source)
            }
        }
    }

    /// Park until unpaused. Wall time spent here is struck from the
    /// schedule by restoring the clock to its pause-entry reading.
    fn wait_while_paused(&mut self) {
        let entered = self.surface.now();
        self.transition(EngineState::Paused);

        while self.state.paused && !self.close_requested && !self.surface.should_close() {
            let intents = self.surface.wait_events_timeout(PAUSE_WAIT);
            self.apply_intents(intents);
        }

        self.surface.set_now(entered);
        if !self.close_requested {
            self.transition(EngineState::Playing);
        }
    }

    /// Hold the already-decoded frame until its wall-clock due time,
    /// staying responsive to intents while waiting. Returns `false` when
    /// an interrupting intent arrived before the due time; the frame must
    /// not be presented until pacing completes.
    fn pace_until(&mut self, pts: i64) -> bool {
        loop {
            let target = self.clock.target_wall_secs(pts, self.state.speed_factor);
            let remaining = target - self.surface.now();
            if remaining <= 0.0 {
                return true;
            }
            let intents = self
                .surface
                .wait_events_timeout(Duration::from_secs_f64(remaining));
            self.apply_intents(intents);
            if self.close_requested
                || self.surface.should_close()
                || self.state.seek_requested
                || self.state.paused
            {
                return false;
            }
        }
    }

    fn present(&mut self, pts: i64) {
        self.surface
            .present(&self.rgba, self.descriptor.width, self.descriptor.height);
        let title = format!(
            "prism  {} - {}",
            format_timecode(self.clock.pts_to_secs(pts)),
            self.duration_text
        );
        self.surface.set_title(&title);
        self.state.frame_index += 1;
    }

    fn transition(&mut self, next: EngineState) {
        if self.engine_state != next {
            tracing::debug!(from = ?self.engine_state, to = ?next, "engine state");
            self.engine_state = next;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use ffmpeg_next::Rational;

    /// Frame source with a fixed timestamp script. Each frame writes its
    /// pts into the first eight buffer bytes so presents can be verified.
    struct ScriptedSource {
        pts: Vec<i64>,
        cursor: usize,
    }

    impl ScriptedSource {
        fn new(pts: Vec<i64>) -> Self {
            Self { pts, cursor: 0 }
        }

        fn emit(pts: i64, out: &mut [u8]) {
            out[..8].copy_from_slice(&pts.to_le_bytes());
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self, out: &mut [u8]) -> Result<PumpStep, PlaybackError> {
            match self.pts.get(self.cursor).copied() {
                Some(pts) => {
                    self.cursor += 1;
                    Self::emit(pts, out);
                    Ok(PumpStep::Frame { pts })
                }
                None => Ok(PumpStep::EndOfStream),
            }
        }

        fn seek_to(&mut self, target_pts: i64, out: &mut [u8]) -> Result<PumpStep, PlaybackError> {
            match self.pts.iter().position(|&p| p >= target_pts) {
                Some(index) => {
                    self.cursor = index + 1;
                    let pts = self.pts[index];
                    Self::emit(pts, out);
                    Ok(PumpStep::Frame { pts })
                }
                None => Err(PlaybackError::SeekPastEnd { target: target_pts }),
            }
        }
    }

    /// Surface with a hand-cranked clock: waiting advances time by exactly
    /// the requested timeout, so the schedule is fully deterministic.
    /// Intent batches are handed out one per event call, poll or wait.
    ///
    /// With `partial_waits` set, each wait advances by at most that many
    /// seconds before returning, modeling an intent that arrives while the
    /// engine is still waiting out a frame's due time.
    struct MockSurface {
        now: f64,
        batches: VecDeque<Vec<Intent>>,
        presents: Vec<(f64, i64)>,
        titles: Vec<String>,
        partial_waits: Option<f64>,
    }

    impl MockSurface {
        fn new(batches: Vec<Vec<Intent>>) -> Self {
            Self {
                now: 0.0,
                batches: batches.into(),
                presents: Vec::new(),
                titles: Vec::new(),
                partial_waits: None,
            }
        }

        fn with_partial_waits(mut self, seconds: f64) -> Self {
            self.partial_waits = Some(seconds);
            self
        }

        fn next_batch(&mut self) -> Vec<Intent> {
            self.batches.pop_front().unwrap_or_default()
        }
    }

    impl PresentationSurface for MockSurface {
        fn present(&mut self, rgba: &[u8], _width: u32, _height: u32) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&rgba[..8]);
            self.presents.push((self.now, i64::from_le_bytes(bytes)));
        }

        fn poll_events(&mut self) -> Vec<Intent> {
            self.next_batch()
        }

        fn wait_events_timeout(&mut self, timeout: Duration) -> Vec<Intent> {
            let step = match self.partial_waits {
                Some(step) => timeout.as_secs_f64().min(step),
                None => timeout.as_secs_f64(),
            };
            self.now += step;
            self.next_batch()
        }

        fn should_close(&self) -> bool {
            false
        }

        fn set_title(&mut self, title: &str) {
            self.titles.push(title.to_owned());
        }

        fn now(&self) -> f64 {
            self.now
        }

        fn set_now(&mut self, seconds: f64) {
            self.now = seconds;
        }
    }

    fn descriptor(time_base_den: i32, fps: f64, duration: i64) -> StreamDescriptor {
        StreamDescriptor {
            width: 2,
            height: 1,
            fps,
            time_base: Rational::new(1, time_base_den),
            duration,
            start_time: 0,
        }
    }

    fn engine(
        desc: StreamDescriptor,
        pts: Vec<i64>,
        batches: Vec<Vec<Intent>>,
    ) -> Engine<MockSurface, ScriptedSource> {
        Engine::new(desc, ScriptedSource::new(pts), MockSurface::new(batches))
    }

    fn close_to(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn plays_frames_in_order_at_their_due_times() {
        // 10 fps frames in a millisecond time base: due at 0.0, 0.1, 0.2.
        let mut engine = engine(descriptor(1000, 10.0, 300), vec![0, 100, 200], vec![]);
        let stop = engine.run().unwrap();

        assert_eq!(stop, StopReason::Ended);
        assert_eq!(engine.engine_state(), EngineState::Ended);
        assert_eq!(engine.state().frame_index, 3);

        let presents = &engine.surface.presents;
        assert_eq!(presents.len(), 3);
        assert_eq!(presents[0].1, 0);
        assert_eq!(presents[1].1, 100);
        assert_eq!(presents[2].1, 200);
        assert!(close_to(presents[0].0, 0.0));
        assert!(close_to(presents[1].0, 0.1));
        assert!(close_to(presents[2].0, 0.2));
    }

    #[test]
    fn doubling_speed_halves_every_interval() {
        let mut engine = engine(descriptor(1000, 10.0, 300), vec![0, 100, 200], vec![]);
        engine.set_speed(2.0);
        engine.run().unwrap();

        let presents = &engine.surface.presents;
        assert!(close_to(presents[0].0, 0.0));
        assert!(close_to(presents[1].0, 0.05));
        assert!(close_to(presents[2].0, 0.1));
    }

    #[test]
    fn paused_wall_time_does_not_shift_the_schedule() {
        // Pause after the first frame, sit through two 250 ms waits, then
        // resume. The remaining frames keep their original due times.
        let batches = vec![
            vec![],
            vec![Intent::TogglePause],
            vec![],
            vec![Intent::TogglePause],
        ];
        let mut engine = engine(descriptor(1000, 10.0, 300), vec![0, 100, 200], batches);
        engine.run().unwrap();

        let presents = &engine.surface.presents;
        assert_eq!(presents.len(), 3);
        assert!(close_to(presents[1].0, 0.1));
        assert!(close_to(presents[2].0, 0.2));
    }

    #[test]
    fn double_toggle_in_one_batch_never_pauses() {
        let batches = vec![vec![Intent::TogglePause, Intent::TogglePause]];
        let mut engine = engine(descriptor(1000, 10.0, 300), vec![0, 100, 200], batches);
        let stop = engine.run().unwrap();

        assert_eq!(stop, StopReason::Ended);
        let presents = &engine.surface.presents;
        assert!(close_to(presents[1].0, 0.1));
        assert!(close_to(presents[2].0, 0.2));
    }

    #[test]
    fn pause_arriving_mid_wait_never_presents_early() {
        // The pause lands 10 ms into the 100 ms wait for the second frame.
        // That frame must stay back until its original due time, not go up
        // at the moment of the interruption.
        let batches = vec![
            vec![],
            vec![],
            vec![Intent::TogglePause],
            vec![],
            vec![Intent::TogglePause],
        ];
        let surface = MockSurface::new(batches).with_partial_waits(0.01);
        let mut engine = Engine::new(
            descriptor(1000, 10.0, 300),
            ScriptedSource::new(vec![0, 100]),
            surface,
        );
        let stop = engine.run().unwrap();

        assert_eq!(stop, StopReason::Ended);
        let presents = &engine.surface.presents;
        assert_eq!(presents.len(), 2);
        assert_eq!(presents[0], (0.0, 0));
        assert_eq!(presents[1].1, 100);
        assert!(presents[1].0 >= 0.1 - 1e-9);
        assert!(close_to(presents[1].0, 0.1));
    }

    #[test]
    fn seek_arriving_mid_wait_lands_on_the_requested_frame() {
        // One frame has been presented (index 1) when a +5 s seek arrives
        // while frame 1 is still waiting out its due time. The pending
        // frame must neither be shown nor counted, so the seek targets
        // frame 1 + 150 = 151 exactly.
        let pts: Vec<i64> = (0..300).collect();
        let batches = vec![vec![], vec![], vec![Intent::SeekBy(5)]];
        let surface = MockSurface::new(batches).with_partial_waits(0.01);
        let mut engine = Engine::new(descriptor(30, 30.0, 300), ScriptedSource::new(pts), surface);
        let stop = engine.run().unwrap();

        assert_eq!(stop, StopReason::Ended);
        let presents = &engine.surface.presents;
        assert_eq!(presents[0], (0.0, 0));
        assert_eq!(presents[1].1, 151);
        assert!(presents.iter().all(|p| p.1 != 1));
        assert!(presents[1..].windows(2).all(|w| w[0].1 + 1 == w[1].1));
        assert_eq!(engine.state().frame_index, 300);
    }

    #[test]
    fn seek_jumps_to_the_requested_frame_immediately() {
        // 30 fps, pts == frame index. Seeking +5 s from frame 0 lands on
        // frame 150, shown at once, and playback continues from there.
        let pts: Vec<i64> = (0..300).collect();
        let batches = vec![vec![Intent::SeekBy(5)]];
        let mut engine = engine(descriptor(30, 30.0, 300), pts, batches);
        let stop = engine.run().unwrap();

        assert_eq!(stop, StopReason::Ended);
        let presents = &engine.surface.presents;
        assert_eq!(presents.len(), 150);
        assert_eq!(presents[0], (0.0, 150));
        assert!(presents.windows(2).all(|w| w[0].1 < w[1].1));
        assert_eq!(engine.state().frame_index, 300);
    }

    #[test]
    fn seek_past_end_stops_playback() {
        let pts: Vec<i64> = (0..10).collect();
        let batches = vec![vec![Intent::SeekBy(60)]];
        let mut engine = engine(descriptor(30, 30.0, 10), pts, batches);
        let stop = engine.run().unwrap();

        assert_eq!(stop, StopReason::SeekPastEnd);
        assert_eq!(engine.engine_state(), EngineState::Ended);
        assert!(engine.surface.presents.is_empty());
    }

    #[test]
    fn empty_source_ends_without_presenting() {
        let mut engine = engine(descriptor(1000, 10.0, 0), vec![], vec![]);
        let stop = engine.run().unwrap();

        assert_eq!(stop, StopReason::Ended);
        assert!(engine.surface.presents.is_empty());
        assert_eq!(engine.state().frame_index, 0);
    }

    #[test]
    fn close_intent_stops_mid_stream() {
        let batches = vec![vec![], vec![Intent::Close]];
        let mut engine = engine(descriptor(1000, 10.0, 300), vec![0, 100, 200], batches);
        let stop = engine.run().unwrap();

        assert_eq!(stop, StopReason::Closed);
        assert_eq!(engine.surface.presents.len(), 1);
    }

    #[test]
    fn titles_carry_position_and_duration() {
        let mut engine = engine(descriptor(1, 1.0, 3), vec![0, 1, 2], vec![]);
        engine.run().unwrap();

        assert_eq!(engine.surface.titles[0], "prism  00:00:00 - 00:00:03");
        assert_eq!(engine.surface.titles[2], "prism  00:00:02 - 00:00:03");
    }
}
