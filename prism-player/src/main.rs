//! # Prism Player
//!
//! Headless playback front end. Decodes a video file and paces its frames
//! against the real wall clock without rendering them anywhere, which makes
//! it useful for soak-testing the pipeline and for timing measurements.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use prism_core::{Engine, Intent, PresentationSurface, StopReason};

/// Log a progress line every this many presented frames.
const PROGRESS_INTERVAL: u64 = 120;

// ============================================================================
// CLI
// ============================================================================

struct Args {
    input: PathBuf,
    speed: f64,
    max_frames: Option<u64>,
}

fn print_usage() {
    println!("usage: prism [OPTIONS] <FILE>");
    println!();
    println!("options:");
    println!("  --speed <FACTOR>    playback speed, 2.0 plays twice as fast (default 1.0)");
    println!("  --max-frames <N>    stop after presenting N frames");
    println!("  -h, --help          show this help");
}

fn parse_args() -> Result<Args> {
    let mut input = None;
    let mut speed = 1.0;
    let mut max_frames = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--speed" => {
                let value = args.next().context("--speed requires a value")?;
                speed = value
                    .parse::<f64>()
                    .with_context(|| format!("invalid speed factor: {value}"))?;
                if speed <= 0.0 {
                    bail!("speed factor must be positive, got {speed}");
                }
            }
            "--max-frames" => {
                let value = args.next().context("--max-frames requires a value")?;
                let count = value
                    .parse::<u64>()
                    .with_context(|| format!("invalid frame count: {value}"))?;
                max_frames = Some(count);
            }
            other if other.starts_with('-') => bail!("unknown option: {other}"),
            other => {
                if input.is_some() {
                    bail!("only one input file may be given");
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    let input = match input {
        Some(path) => path,
        None => {
            print_usage();
            bail!("no input file given");
        }
    };

    Ok(Args {
        input,
        speed,
        max_frames,
    })
}

// ============================================================================
// Headless surface
// ============================================================================

/// Presentation surface with no window. Frames are counted, not shown; the
/// clock is the process monotonic clock with a rewritable offset.
struct HeadlessSurface {
    epoch: Instant,
    offset: f64,
    presented: u64,
    max_frames: Option<u64>,
    title: String,
}

impl HeadlessSurface {
    fn new(max_frames: Option<u64>) -> Self {
        Self {
            epoch: Instant::now(),
            offset: 0.0,
            presented: 0,
            max_frames,
            title: String::new(),
        }
    }
}

impl PresentationSurface for HeadlessSurface {
    fn present(&mut self, _rgba: &[u8], _width: u32, _height: u32) {
        self.presented += 1;
        if self.presented % PROGRESS_INTERVAL == 0 {
            tracing::info!(frames = self.presented, title = %self.title, "progress");
        }
    }

    fn poll_events(&mut self) -> Vec<Intent> {
        Vec::new()
    }

    fn wait_events_timeout(&mut self, timeout: Duration) -> Vec<Intent> {
        thread::sleep(timeout);
        Vec::new()
    }

    fn should_close(&self) -> bool {
        matches!(self.max_frames, Some(max) if self.presented >= max)
    }

    fn set_title(&mut self, title: &str) {
        self.title.clear();
        self.title.push_str(title);
    }

    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() + self.offset
    }

    fn set_now(&mut self, seconds: f64) {
        self.offset = seconds - self.epoch.elapsed().as_secs_f64();
    }
}

// ============================================================================
// Entry point
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prism=info,prism_core=info".into()),
        )
        .init();

    let args = parse_args()?;
    tracing::info!(version = prism_core::VERSION, input = %args.input.display(), "starting");

    let surface = HeadlessSurface::new(args.max_frames);
    let mut engine = Engine::open(&args.input, surface)
        .with_context(|| format!("couldn't open {}", args.input.display()))?;
    engine.set_speed(args.speed);

    match engine.run() {
        Ok(StopReason::Ended) => {
            tracing::info!(frames = engine.state().frame_index, "playback finished");
            Ok(())
        }
        Ok(StopReason::Closed) => {
            tracing::info!(frames = engine.state().frame_index, "playback stopped");
            Ok(())
        }
        Ok(StopReason::SeekPastEnd) => {
            tracing::info!("seek ran past the end of the stream");
            Ok(())
        }
        Err(source) => Err(source).context("playback failed"),
    }
}
