//! Presentation surface abstraction.
//!
//! The engine never talks to a window system directly. Anything that can
//! show RGBA frames, report a clock, and deliver user intents implements
//! [`PresentationSurface`]; the scheduler is written entirely against this
//! trait. The player binary ships a headless implementation, and the engine
//! tests drive a scripted one with a hand-cranked clock.

use std::time::Duration;

use crate::state::Intent;

/// Sink for decoded frames plus the event and clock services the scheduler
/// needs. One surface instance backs one playback session.
///
/// The clock contract mirrors a resettable monotonic timer: `now` starts
/// near zero when the surface is created, and `set_now` rewrites the current
/// reading so the scheduler can re-anchor after seeks and pauses.
pub trait PresentationSurface {
    /// Display one tightly packed RGBA frame of `width * height * 4` bytes.
    fn present(&mut self, rgba: &[u8], width: u32, height: u32);

    /// Drain whatever intents have accumulated, without blocking.
    fn poll_events(&mut self) -> Vec<Intent>;

    /// Block until an intent arrives or `timeout` elapses, then drain.
    fn wait_events_timeout(&mut self, timeout: Duration) -> Vec<Intent>;

    /// True once the surface wants the session to end (window closed,
    /// frame budget exhausted). Checked every scheduler iteration.
    fn should_close(&self) -> bool;

    /// Update the title line shown alongside the video.
    fn set_title(&mut self, title: &str);

    /// Current clock reading in seconds.
    fn now(&self) -> f64;

    /// Rewrite the clock so that `now` returns `seconds` immediately after.
    fn set_now(&mut self, seconds: f64);
}
