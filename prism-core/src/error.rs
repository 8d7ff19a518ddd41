//! Playback error taxonomy.
//!
//! Two tiers, matching how failures are allowed to propagate:
//! - [`OpenError`]: fatal before any playback state exists; the engine never
//!   starts and the process should report the message and exit.
//! - [`PlaybackError`]: fatal at runtime; playback stops but the caller
//!   (window loop, host process) may keep running.
//!
//! End-of-stream and "need more input" are *not* errors anywhere in this
//! crate; they are ordinary pipeline signals carried by status enums.

use std::path::PathBuf;

use ffmpeg_next as ffmpeg;
use thiserror::Error;

/// Unrecoverable failures while opening a media source.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("couldn't initialize media backend: {0}")]
    Backend(ffmpeg::Error),

    #[error("couldn't open input {path:?}: {source}")]
    Container {
        path: PathBuf,
        source: ffmpeg::Error,
    },

    #[error("no video stream in {path:?}")]
    NoVideoStream { path: PathBuf },

    /// Both the average and the nominal frame rate are unset or zero;
    /// frame-index and pacing math would divide by zero downstream.
    #[error("video stream in {path:?} reports no usable frame rate")]
    NoFrameRate { path: PathBuf },

    #[error("couldn't read codec parameters: {0}")]
    CodecParameters(ffmpeg::Error),

    #[error("no usable decoder for the video stream: {0}")]
    Decoder(ffmpeg::Error),

    #[error("couldn't create pixel converter: {0}")]
    Converter(ffmpeg::Error),
}

/// Failures after playback has started. These stop the current stream but
/// leave the presentation surface to its owner.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("couldn't read packet from container: {0}")]
    Demux(ffmpeg::Error),

    #[error("decoder rejected packet: {0}")]
    Feed(ffmpeg::Error),

    #[error("couldn't decode frame: {0}")]
    Decode(ffmpeg::Error),

    #[error("pixel conversion failed: {0}")]
    Convert(ffmpeg::Error),

    /// Mid-stream pixel format switches are unsupported by design; the
    /// converter is negotiated once per codec session.
    #[error("pixel format changed mid-stream ({was:?} -> {now:?})")]
    PixelFormatChanged {
        was: ffmpeg::format::Pixel,
        now: ffmpeg::format::Pixel,
    },

    #[error("seek to timestamp {target} failed: {source}")]
    Seek {
        target: i64,
        source: ffmpeg::Error,
    },

    /// End-of-stream was reached while scanning for the seek target.
    /// Distinct from [`PlaybackError::Demux`] so callers can end playback
    /// instead of freezing on the last frame.
    #[error("no frame at or after timestamp {target}")]
    SeekPastEnd { target: i64 },
}
