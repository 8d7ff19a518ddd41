//! Frame pump: one decoded RGBA frame per call.
//!
//! The pump owns the demux -> decode -> convert chain and hides its
//! interleaving behind a pull interface. Each [`FramePump::next_frame`]
//! call loops internally: read a packet, skip non-video streams, offer it
//! to the decoder (re-offering later if the decoder is momentarily full),
//! and pull until a frame lands. Container exhaustion flips the pump into
//! drain mode so the decoder's buffered frames still come out in order
//! before end-of-stream is reported.

use crate::codec::{CodecSession, DecodeStatus, FeedStatus};
use crate::convert::PixelConverter;
use crate::error::PlaybackError;
use crate::media::MediaSession;

use ffmpeg_next::Packet;

/// Result of pulling one frame out of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStep {
    /// A frame was written to the caller's buffer.
    Frame {
        /// Presentation timestamp in stream time-base units.
        pts: i64,
    },
    /// The pipeline is fully drained; no frame was written.
    EndOfStream,
}

/// Source of presentable frames. The scheduler is generic over this so its
/// pacing logic can be exercised without a real container.
pub trait FrameSource {
    /// Decode and convert the next frame in presentation order into `out`.
    fn next_frame(&mut self, out: &mut [u8]) -> Result<PumpStep, PlaybackError>;

    /// Reposition so the next frame is the first one with
    /// `pts >= target_pts`, decode it into `out`, and return its pts.
    fn seek_to(&mut self, target_pts: i64, out: &mut [u8]) -> Result<PumpStep, PlaybackError>;
}

enum Step {
    Decoded,
    Exhausted,
}

/// The real pipeline: container packets in, packed RGBA out.
pub struct FramePump {
    media: MediaSession,
    codec: CodecSession,
    converter: PixelConverter,
    /// Video packet the decoder refused while full; re-offered next round.
    pending: Option<Packet>,
    draining: bool,
}

impl FramePump {
    pub fn new(media: MediaSession, codec: CodecSession, converter: PixelConverter) -> Self {
        Self {
            media,
            codec,
            converter,
            pending: None,
            draining: false,
        }
    }

    /// Run the feed/decode loop until a frame is decoded or the pipeline
    /// is exhausted. The decoded frame stays in the codec session's slot.
    fn advance(&mut self) -> Result<Step, PlaybackError> {
        loop {
            if !self.draining && self.pending.is_none() {
                loop {
                    match self.media.read_packet()? {
                        Some(packet) if packet.stream() == self.media.video_index() => {
                            self.pending = Some(packet);
                            break;
                        }
                        // Audio and data packets are not ours to decode.
                        Some(_) => continue,
                        None => {
                            self.codec.begin_drain()?;
                            self.draining = true;
                            break;
                        }
                    }
                }
            }

            if let Some(packet) = self.pending.take() {
                match self.codec.feed(&packet)? {
                    FeedStatus::Accepted => {}
                    FeedStatus::Busy => self.pending = Some(packet),
                    FeedStatus::EndOfStream => {
                        self.draining = true;
                    }
                }
            }

            match self.codec.decode_next()? {
                DecodeStatus::Frame => return Ok(Step::Decoded),
                DecodeStatus::NeedMoreInput => continue,
                DecodeStatus::EndOfStream => return Ok(Step::Exhausted),
            }
        }
    }
}

impl FrameSource for FramePump {
    fn next_frame(&mut self, out: &mut [u8]) -> Result<PumpStep, PlaybackError> {
        match self.advance()? {
            Step::Decoded => {
                let pts = self.codec.frame_pts();
                self.converter.convert(self.codec.frame(), out)?;
                Ok(PumpStep::Frame { pts })
            }
            Step::Exhausted => Ok(PumpStep::EndOfStream),
        }
    }

    fn seek_to(&mut self, target_pts: i64, out: &mut [u8]) -> Result<PumpStep, PlaybackError> {
        self.media.seek(target_pts)?;
        self.codec.flush();
        self.pending = None;
        self.draining = false;

        // The container lands on a keyframe at or before the target; decode
        // forward, discarding frames, until the target timestamp is reached.
        // Discarded frames are never converted.
        loop {
            match self.advance()? {
                Step::Decoded => {
                    let pts = self.codec.frame_pts();
                    if pts >= target_pts {
                        self.converter.convert(self.codec.frame(), out)?;
                        return Ok(PumpStep::Frame { pts });
                    }
                }
                Step::Exhausted => {
                    return Err(PlaybackError::SeekPastEnd { target: target_pts })
                }
            }
        }
    }
}
