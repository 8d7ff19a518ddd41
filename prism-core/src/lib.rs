//! # Prism Core
//!
//! Single-stream video playback pipeline: container demux, video decode,
//! RGBA pixel conversion, and a wall-clock pacing scheduler with pause,
//! speed, and seek.
//!
//! The pipeline is a straight line. [`MediaSession`] reads packets from the
//! container, [`CodecSession`] turns them into frames, [`PixelConverter`]
//! packs those into RGBA bytes, and [`FramePump`] drives the three as one
//! pull-based [`FrameSource`]. On top sits the [`Engine`], which paces
//! frames onto any [`PresentationSurface`] using the stream's timestamps
//! and the surface's clock.

pub mod clock;
pub mod codec;
pub mod convert;
pub mod engine;
pub mod error;
pub mod media;
pub mod pump;
pub mod state;
pub mod surface;

pub use clock::{format_timecode, PlaybackClock};
pub use codec::{CodecSession, DecodeStatus, FeedStatus};
pub use convert::PixelConverter;
pub use engine::{Engine, EngineState, StopReason};
pub use error::{OpenError, PlaybackError};
pub use media::{MediaSession, StreamDescriptor};
pub use pump::{FramePump, FrameSource, PumpStep};
pub use state::{Intent, PlaybackState};
pub use surface::PresentationSurface;

/// Crate version, for startup logging.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
