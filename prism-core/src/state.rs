//! Mutable playback state and the discrete user intents that drive it.
//!
//! The input layer (key handler, remote control, test script) never touches
//! engine internals; it emits [`Intent`]s, and the scheduler folds them into
//! [`PlaybackState`] once per loop iteration.

/// A discrete user intent, produced by the external input layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Flip between paused and playing.
    TogglePause,
    /// Hold-to-pause: `true` on press, `false` on release.
    PauseHold(bool),
    /// Jump by a signed number of seconds relative to the current frame.
    SeekBy(i64),
    /// Replace the playback speed factor. Non-positive values are ignored.
    SetSpeed(f64),
    /// Shut the engine down.
    Close,
}

/// Scheduler-owned playback state, read once per pacing iteration.
///
/// `frame_index` always names the *next* frame to be requested, never the
/// last one displayed. It advances by exactly one per presented frame and is
/// overwritten wholesale by seek intents.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub paused: bool,
    pub seek_requested: bool,
    pub frame_index: u64,
    pub speed_factor: f64,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            paused: false,
            seek_requested: false,
            frame_index: 0,
            speed_factor: 1.0,
        }
    }

    /// Fold one intent into the state. `fps` converts second-based seek
    /// deltas into frame counts.
    pub fn apply(&mut self, intent: Intent, fps: f64) {
        match intent {
            Intent::TogglePause => self.paused = !self.paused,
            Intent::PauseHold(held) => self.paused = held,
            Intent::SeekBy(secs) => {
                let delta = (secs as f64 * fps).round() as i64;
                self.frame_index = (self.frame_index as i64 + delta).max(0) as u64;
                self.seek_requested = true;
            }
            Intent::SetSpeed(speed) => {
                if speed > 0.0 {
                    self.speed_factor = speed;
                }
            }
            // Close terminates the loop; the scheduler handles it directly.
            Intent::Close => {}
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_forward_60s_at_30fps_adds_1800_frames() {
        let mut state = PlaybackState::new();
        state.frame_index = 10;
        state.apply(Intent::SeekBy(60), 30.0);
        assert_eq!(state.frame_index, 1810);
        assert!(state.seek_requested);
    }

    #[test]
    fn seek_backward_clamps_at_zero() {
        let mut state = PlaybackState::new();
        state.frame_index = 100;
        state.apply(Intent::SeekBy(-60), 30.0);
        assert_eq!(state.frame_index, 0);
        assert!(state.seek_requested);
    }

    #[test]
    fn double_toggle_is_a_no_op() {
        let mut state = PlaybackState::new();
        state.apply(Intent::TogglePause, 30.0);
        state.apply(Intent::TogglePause, 30.0);
        assert!(!state.paused);
    }

    #[test]
    fn hold_to_pause_follows_press_and_release() {
        let mut state = PlaybackState::new();
        state.apply(Intent::PauseHold(true), 30.0);
        assert!(state.paused);
        state.apply(Intent::PauseHold(false), 30.0);
        assert!(!state.paused);
    }

    #[test]
    fn non_positive_speed_is_ignored() {
        let mut state = PlaybackState::new();
        state.apply(Intent::SetSpeed(2.0), 30.0);
        assert_eq!(state.speed_factor, 2.0);
        state.apply(Intent::SetSpeed(0.0), 30.0);
        assert_eq!(state.speed_factor, 2.0);
        state.apply(Intent::SetSpeed(-1.0), 30.0);
        assert_eq!(state.speed_factor, 2.0);
    }
}
