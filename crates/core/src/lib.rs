//! Core library for the Wavescope audio visualizer.
//!
//! Each module owns a distinct subsystem: audio decoding and transport,
//! spectral analysis, the software canvas, the effect registry and its state
//! store, frame scheduling over interchangeable clocks, and the offline
//! export pipeline. The same renderers draw the live view and the exported
//! video; only the clock and the frame sink differ.

pub mod audio;
pub mod avatar;
pub mod canvas;
pub mod config;
pub mod effects;
pub mod error;
pub mod export;
pub mod safety;
pub mod scheduler;
pub mod spectrum;

pub use audio::{AudioClip, AudioTap, TrackInfo, Transport};
pub use avatar::Avatar;
pub use canvas::{Canvas, Gradient, GradientStop, Paint, Rgba};
pub use config::{AppConfig, AudioConfig, RenderConfig};
pub use effects::{EffectState, EffectStateStore, EffectVariant};
pub use error::{Result, VizError};
pub use export::{
    EncoderSettings, ExportOutcome, ExportPipeline, ExportSettings, ExportStatus, FfmpegEncoder,
    FrameEncoder, ResolutionPreset,
};
pub use scheduler::{DisplayClock, FrameClock, FrameScheduler, StopHandle, VirtualClock};
pub use spectrum::{Analyzer, SpectralSampler, Spectrum};
