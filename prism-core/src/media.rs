//! Media session: container demuxing and stream selection.
//!
//! A [`MediaSession`] owns the opened container for the lifetime of one
//! playback session. It picks the first video stream (and notes the first
//! audio stream purely for logging), serves raw packets to the frame pump,
//! and repositions the container on seek. Everything downstream works in
//! the video stream's time base, which is captured here at open time.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::format;
use ffmpeg::media::Type;
use ffmpeg::rescale::{self, Rescale};
use ffmpeg::{Packet, Rational};
use once_cell::sync::OnceCell;

use crate::codec::CodecSession;
use crate::error::{OpenError, PlaybackError};

static FFMPEG_INIT: OnceCell<()> = OnceCell::new();

/// Initialize the media backend exactly once per process.
fn init_backend() -> Result<(), OpenError> {
    FFMPEG_INIT
        .get_or_try_init(|| ffmpeg::init().map_err(OpenError::Backend))
        .map(|_| ())
}

// ============================================================================
// Stream descriptor
// ============================================================================

/// Immutable facts about the selected video stream, captured at open time
/// and shared with the clock and the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct StreamDescriptor {
    pub width: u32,
    pub height: u32,
    /// Frames per second; always finite and positive, enforced at open.
    pub fps: f64,
    /// Time base of the video stream; every timestamp in the pipeline is
    /// expressed in these units.
    pub time_base: Rational,
    /// Stream duration in time-base units.
    pub duration: i64,
    /// First timestamp of the stream, usually 0.
    pub start_time: i64,
}

impl StreamDescriptor {
    pub fn duration_secs(&self) -> f64 {
        self.duration as f64 * self.time_base.numerator() as f64
            / self.time_base.denominator() as f64
    }
}

// ============================================================================
// Media session
// ============================================================================

/// An opened container with one selected video stream.
pub struct MediaSession {
    input: format::context::Input,
    video_index: usize,
    video_parameters: ffmpeg::codec::Parameters,
    time_base: Rational,
    fps: f64,
    duration: i64,
    start_time: i64,
}

/// The stream's average frame rate when it carries one, otherwise its
/// nominal rate. `None` when neither yields a usable positive rate.
fn effective_fps(average: Rational, nominal: Rational) -> Option<f64> {
    let fps = if average.numerator() > 0 {
        f64::from(average)
    } else {
        f64::from(nominal)
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

impl MediaSession {
    /// Open `path` and select the first video stream.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        init_backend()?;

        let path = path.as_ref().to_path_buf();
        let input = format::input(&path).map_err(|source| OpenError::Container {
            path: path.clone(),
            source,
        })?;

        let mut video_index = None;
        let mut audio_index = None;
        for stream in input.streams() {
            match stream.parameters().medium() {
                Type::Video if video_index.is_none() => video_index = Some(stream.index()),
                Type::Audio if audio_index.is_none() => audio_index = Some(stream.index()),
                _ => {}
            }
        }
        let video_index =
            video_index.ok_or_else(|| OpenError::NoVideoStream { path: path.clone() })?;

        let stream = input
            .stream(video_index)
            .ok_or_else(|| OpenError::NoVideoStream { path: path.clone() })?;
        let video_parameters = stream.parameters();
        let time_base = stream.time_base();

        // A zero frame rate would poison every frame-index calculation
        // downstream, so it is rejected here.
        let fps = effective_fps(stream.avg_frame_rate(), stream.rate())
            .ok_or_else(|| OpenError::NoFrameRate { path: path.clone() })?;

        // Prefer the stream's own duration; some containers only carry a
        // global one, which then gets rescaled into the stream time base.
        let duration = if stream.duration() > 0 {
            stream.duration()
        } else {
            input.duration().rescale(rescale::TIME_BASE, time_base)
        };
        let start_time = stream.start_time().max(0);

        tracing::info!(
            path = %path.display(),
            video_index,
            audio_index,
            fps,
            duration,
            "opened container"
        );

        Ok(Self {
            input,
            video_index,
            video_parameters,
            time_base,
            fps,
            duration,
            start_time,
        })
    }

    /// Read the next packet from the container, any stream.
    /// `None` means the container is exhausted.
    pub fn read_packet(&mut self) -> Result<Option<Packet>, PlaybackError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some(packet)),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(source) => Err(PlaybackError::Demux(source)),
        }
    }

    /// Reposition the container at or before `target_pts` (video time base).
    /// The decoder must be flushed afterwards; [`crate::pump::FramePump`]
    /// handles that.
    pub fn seek(&mut self, target_pts: i64) -> Result<(), PlaybackError> {
        let ts = target_pts.rescale(self.time_base, rescale::TIME_BASE);
        self.input
            .seek(ts, ..ts)
            .map_err(|source| PlaybackError::Seek {
                target: target_pts,
                source,
            })
    }

    /// Descriptor combining container facts with the codec's frame geometry.
    pub fn describe(&self, codec: &CodecSession) -> StreamDescriptor {
        StreamDescriptor {
            width: codec.width(),
            height: codec.height(),
            fps: self.fps,
            time_base: self.time_base,
            duration: self.duration,
            start_time: self.start_time,
        }
    }

    pub fn video_index(&self) -> usize {
        self.video_index
    }

    pub fn video_parameters(&self) -> ffmpeg::codec::Parameters {
        self.video_parameters.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_prefers_average_and_rejects_zero() {
        let r = Rational::new;
        assert_eq!(effective_fps(r(30, 1), r(25, 1)), Some(30.0));
        assert_eq!(effective_fps(r(0, 1), r(25, 1)), Some(25.0));
        assert_eq!(effective_fps(r(0, 1), r(0, 1)), None);
        // 1/0 converts to infinity, 0/0 to NaN; neither is usable.
        assert_eq!(effective_fps(r(1, 0), r(0, 0)), None);
    }
}
