#![deny(unreachable_patterns)]
//! Frame composition and FFmpeg CLI wrapper.
//!
//! This crate provides:
//! - Greedy character-budget word wrapping
//! - Font loading with fallback to a default face, and pixel text measurement
//! - Frame composition (background, contrast overlay, centered text blocks)
//! - Type-safe FFmpeg command building with timeout and cancellation
//! - Container duration probing via FFprobe
//! - Still image + narration muxing into a portrait MP4

pub mod command;
pub mod error;
pub mod fonts;
pub mod frame;
pub mod layout;
pub mod mux;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fonts::{FontBook, FontConfig};
pub use frame::{FrameComposer, FramePlan, PlacedLine, PlacedRule};
pub use layout::{wrap, TextBlock};
pub use mux::{build_mux_command, FfmpegMuxer, Muxer};
pub use probe::{probe_duration, DurationProbe, FfprobeProbe};
