//! Pixel converter: decoder-native frames to tightly packed RGBA.
//!
//! The converter is negotiated once per codec session, against the source
//! pixel format observed at open time. Frame geometry never changes, so the
//! scaling context and the intermediate RGBA frame are both allocated once
//! and reused for every conversion.

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::frame;
use ffmpeg::software::scaling;

use crate::codec::CodecSession;
use crate::error::{OpenError, PlaybackError};

/// Converts decoded frames into the surface's RGBA byte layout.
pub struct PixelConverter {
    scaler: scaling::Context,
    rgba: frame::Video,
    source_format: Pixel,
    width: u32,
}

impl PixelConverter {
    /// Negotiate a converter for the codec session's output geometry.
    pub fn new(codec: &CodecSession) -> Result<Self, OpenError> {
        let (width, height) = (codec.width(), codec.height());
        let source_format = codec.pixel_format();
        let scaler = scaling::Context::get(
            source_format,
            width,
            height,
            Pixel::RGBA,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(OpenError::Converter)?;

        Ok(Self {
            scaler,
            rgba: frame::Video::new(Pixel::RGBA, width, height),
            source_format,
            width,
        })
    }

    /// Convert `frame` into `out`, which must hold `width * height * 4`
    /// bytes. Rejects frames whose pixel format differs from the one the
    /// converter was negotiated for.
    pub fn convert(&mut self, frame: &frame::Video, out: &mut [u8]) -> Result<(), PlaybackError> {
        if frame.format() != self.source_format {
            return Err(PlaybackError::PixelFormatChanged {
                was: self.source_format,
                now: frame.format(),
            });
        }

        self.scaler
            .run(frame, &mut self.rgba)
            .map_err(PlaybackError::Convert)?;

        // The scaler may pad rows; copy row by row to strip the stride.
        let row_len = self.width as usize * 4;
        let stride = self.rgba.stride(0);
        let data = self.rgba.data(0);
        for (y, dst_row) in out.chunks_exact_mut(row_len).enumerate() {
            let start = y * stride;
            dst_row.copy_from_slice(&data[start..start + row_len]);
        }
        Ok(())
    }
}
