//! Playback clock math: stream time base to wall-clock seconds.
//!
//! All pacing decisions reduce to one mapping: a presentation timestamp in
//! stream time-base units becomes a target wall-clock second. The speed
//! factor divides the interval, so 2.0 plays twice as fast (half the wall
//! time between any two timestamps).

use ffmpeg_next::Rational;

use crate::media::StreamDescriptor;

/// Converts presentation timestamps to wall-clock pacing targets.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    time_base: Rational,
    fps: f64,
}

impl PlaybackClock {
    pub fn new(descriptor: &StreamDescriptor) -> Self {
        Self {
            time_base: descriptor.time_base,
            fps: descriptor.fps,
        }
    }

    /// Seconds represented by `pts` in the stream time base.
    pub fn pts_to_secs(&self, pts: i64) -> f64 {
        pts as f64 * self.time_base.numerator() as f64 / self.time_base.denominator() as f64
    }

    /// Wall-clock second at which the frame carrying `pts` is due.
    pub fn target_wall_secs(&self, pts: i64, speed_factor: f64) -> f64 {
        self.pts_to_secs(pts) / speed_factor
    }

    /// Duration of one frame in time-base units.
    pub fn frame_duration_units(&self) -> i64 {
        let units = self.time_base.denominator() as f64
            / (self.time_base.numerator() as f64 * self.fps);
        (units.round() as i64).max(1)
    }

    /// Seek target timestamp for a given frame index.
    pub fn timestamp_for_index(&self, frame_index: u64) -> i64 {
        frame_index as i64 * self.frame_duration_units()
    }
}

/// `HH:MM:SS` for window-title position display.
pub fn format_timecode(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(num: i32, den: i32, fps: f64) -> PlaybackClock {
        PlaybackClock {
            time_base: Rational::new(num, den),
            fps,
        }
    }

    #[test]
    fn pts_to_secs_uses_time_base() {
        let clock = clock(1, 1000, 25.0);
        assert_eq!(clock.pts_to_secs(2500), 2.5);
    }

    #[test]
    fn doubling_speed_halves_the_interval() {
        let clock = clock(1, 90_000, 30.0);
        let (a, b) = (90_000, 180_000);
        let normal = clock.target_wall_secs(b, 1.0) - clock.target_wall_secs(a, 1.0);
        let fast = clock.target_wall_secs(b, 2.0) - clock.target_wall_secs(a, 2.0);
        assert!((fast - normal / 2.0).abs() < 1e-9);
    }

    #[test]
    fn frame_duration_in_time_base_units() {
        // 25 fps in a 1/12800 time base: one frame spans 512 units.
        assert_eq!(clock(1, 12800, 25.0).frame_duration_units(), 512);
        // Degenerate base never collapses to zero.
        assert_eq!(clock(1, 30, 60.0).frame_duration_units(), 1);
    }

    #[test]
    fn seek_target_scales_with_frame_index() {
        // Frame 150 of a 30 fps stream sits at t = 5 s = pts 150.
        assert_eq!(clock(1, 30, 30.0).timestamp_for_index(150), 150);
        assert_eq!(clock(1, 12800, 25.0).timestamp_for_index(150), 150 * 512);
    }

    #[test]
    fn timecode_formatting() {
        assert_eq!(format_timecode(0.0), "00:00:00");
        assert_eq!(format_timecode(3723.9), "01:02:03");
        assert_eq!(format_timecode(-5.0), "00:00:00");
    }
}
