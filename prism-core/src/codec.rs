//! Codec session: the push/pull decoding boundary.
//!
//! The decoder is a push/pull machine with its own internal queue: packets
//! go in with [`CodecSession::feed`], frames come out with
//! [`CodecSession::decode_next`], and the two sides are deliberately
//! decoupled. "Try again" conditions on either side are surfaced as status
//! values, never as errors, so the frame pump can interleave feeding and
//! draining without special cases.

use ffmpeg_next as ffmpeg;
use ffmpeg::codec::{self, threading};
use ffmpeg::format::Pixel;
use ffmpeg::frame;
use ffmpeg::util::error::EAGAIN;
use ffmpeg::Packet;

use crate::error::{OpenError, PlaybackError};
use crate::media::MediaSession;

/// Outcome of offering one packet to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Packet consumed; it must not be offered again.
    Accepted,
    /// Decoder queue is full; drain a frame and offer the same packet again.
    Busy,
    /// Decoder already saw end-of-stream and takes no more input.
    EndOfStream,
}

/// Outcome of asking the decoder for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// A complete frame is available via [`CodecSession::frame`].
    Frame,
    /// The decoder needs more packets before it can emit a frame.
    NeedMoreInput,
    /// All buffered frames have been drained after end-of-stream.
    EndOfStream,
}

/// A configured video decoder bound to one media session's video stream.
pub struct CodecSession {
    decoder: codec::decoder::Video,
    frame: frame::Video,
}

impl CodecSession {
    /// Build a decoder from the session's video stream parameters, with
    /// frame-level threading and an automatic thread count.
    pub fn open(media: &MediaSession) -> Result<Self, OpenError> {
        let mut context = codec::context::Context::from_parameters(media.video_parameters())
            .map_err(OpenError::CodecParameters)?;
        context.set_threading(threading::Config::kind(threading::Type::Frame));
        let decoder = context.decoder().video().map_err(OpenError::Decoder)?;

        tracing::debug!(
            codec = ?decoder.id(),
            width = decoder.width(),
            height = decoder.height(),
            format = ?decoder.format(),
            "decoder ready"
        );

        Ok(Self {
            decoder,
            frame: frame::Video::empty(),
        })
    }

    /// Offer one compressed packet to the decoder.
    pub fn feed(&mut self, packet: &Packet) -> Result<FeedStatus, PlaybackError> {
        match self.decoder.send_packet(packet) {
            Ok(()) => Ok(FeedStatus::Accepted),
            Err(ffmpeg::Error::Other { errno: EAGAIN }) => Ok(FeedStatus::Busy),
            Err(ffmpeg::Error::Eof) => Ok(FeedStatus::EndOfStream),
            Err(source) => Err(PlaybackError::Feed(source)),
        }
    }

    /// Signal end-of-stream so the decoder releases its buffered frames.
    pub fn begin_drain(&mut self) -> Result<(), PlaybackError> {
        match self.decoder.send_eof() {
            Ok(()) | Err(ffmpeg::Error::Eof) => Ok(()),
            Err(source) => Err(PlaybackError::Feed(source)),
        }
    }

    /// Pull the next decoded frame into the internal slot.
    pub fn decode_next(&mut self) -> Result<DecodeStatus, PlaybackError> {
        match self.decoder.receive_frame(&mut self.frame) {
            Ok(()) => Ok(DecodeStatus::Frame),
            Err(ffmpeg::Error::Other { errno: EAGAIN }) => Ok(DecodeStatus::NeedMoreInput),
            Err(ffmpeg::Error::Eof) => Ok(DecodeStatus::EndOfStream),
            Err(source) => Err(PlaybackError::Decode(source)),
        }
    }

    /// Drop all buffered decoder state. Required after a container seek,
    /// otherwise stale pre-seek frames leak into the output.
    pub fn flush(&mut self) {
        self.decoder.flush();
    }

    /// The most recently decoded frame. Only meaningful right after
    /// [`CodecSession::decode_next`] returned [`DecodeStatus::Frame`].
    pub fn frame(&self) -> &frame::Video {
        &self.frame
    }

    /// Presentation timestamp of the current frame, in stream time-base
    /// units. Falls back to the decode timestamp when the container carries
    /// no pts, and to 0 when it carries neither.
    pub fn frame_pts(&self) -> i64 {
        self.frame.timestamp().or(self.frame.pts()).unwrap_or(0)
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    pub fn pixel_format(&self) -> Pixel {
        self.decoder.format()
    }
}
