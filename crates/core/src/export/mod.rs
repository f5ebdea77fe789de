//! Offline export pipeline.
//!
//! Renders the selected track against a virtual clock, one frame per fixed
//! interval, and streams the frames into an encoder. The pipeline walks a
//! small state machine (idle, recording, processing, done or error) and can
//! be cancelled at any point without leaving partial output behind.

mod encoder;

pub use encoder::{EncoderSettings, FfmpegEncoder, FrameEncoder, MemoryEncoder};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::Transport;
use crate::avatar::Avatar;
use crate::effects::{EffectStateStore, EffectVariant};
use crate::scheduler::{FrameScheduler, StopHandle, VirtualClock};
use crate::spectrum::SpectralSampler;
use crate::{VizError, Result};

/// Output resolutions the pipeline knows how to produce, each with a fixed
/// target bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPreset {
    Hd720,
    FullHd1080,
    Uhd4k,
}

impl ResolutionPreset {
    pub const ALL: [ResolutionPreset; 3] = [
        ResolutionPreset::Hd720,
        ResolutionPreset::FullHd1080,
        ResolutionPreset::Uhd4k,
    ];

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ResolutionPreset::Hd720 => (1280, 720),
            ResolutionPreset::FullHd1080 => (1920, 1080),
            ResolutionPreset::Uhd4k => (3840, 2160),
        }
    }

    pub fn bitrate_bps(self) -> u64 {
        match self {
            ResolutionPreset::Hd720 => 5_000_000,
            ResolutionPreset::FullHd1080 => 10_000_000,
            ResolutionPreset::Uhd4k => 20_000_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResolutionPreset::Hd720 => "720p",
            ResolutionPreset::FullHd1080 => "1080p",
            ResolutionPreset::Uhd4k => "2160p",
        }
    }
}

impl FromStr for ResolutionPreset {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "720" | "720p" | "hd" => Ok(ResolutionPreset::Hd720),
            "1080" | "1080p" | "fullhd" => Ok(ResolutionPreset::FullHd1080),
            "2160" | "2160p" | "4k" | "uhd" => Ok(ResolutionPreset::Uhd4k),
            other => Err(VizError::Message(format!(
                "unknown resolution preset '{other}' (expected 720p, 1080p or 2160p)"
            ))),
        }
    }
}

/// Where the pipeline currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportStatus {
    #[default]
    Idle,
    Recording,
    Processing,
    Done,
    Error,
}

/// How a completed `export` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed(PathBuf),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub preset: ResolutionPreset,
    pub fps: u32,
    pub out_dir: PathBuf,
    pub avatar_path: Option<PathBuf>,
    /// How long to wait for the avatar image before exporting without it.
    pub avatar_timeout: Duration,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            preset: ResolutionPreset::FullHd1080,
            fps: 60,
            out_dir: PathBuf::from("."),
            avatar_path: None,
            avatar_timeout: Duration::from_secs(3),
        }
    }
}

/// Drives one export at a time. The state machine only leaves `Recording`
/// through cancellation, an encoder fault, or the clock running out.
#[derive(Debug)]
pub struct ExportPipeline {
    settings: ExportSettings,
    status: ExportStatus,
    progress: f32,
    cancel: StopHandle,
    error: Option<String>,
}

impl ExportPipeline {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            status: ExportStatus::Idle,
            progress: 0.0,
            cancel: StopHandle::default(),
            error: None,
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn status(&self) -> ExportStatus {
        self.status
    }

    /// Fraction of the track covered so far, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Handle that aborts a running export from another thread.
    pub fn cancel_handle(&self) -> StopHandle {
        self.cancel.clone()
    }

    /// Requests cancellation. Safe to call from any state, any number of
    /// times; outside a run it just resets the pipeline to idle.
    pub fn cancel(&mut self) {
        self.cancel.stop();
        if self.status != ExportStatus::Recording {
            self.reset_idle();
        }
    }

    fn reset_idle(&mut self) {
        self.status = ExportStatus::Idle;
        self.progress = 0.0;
        self.error = None;
        self.cancel.reset();
    }

    /// Records the error state, keeping the bare message for
    /// `error_message` and handing the original error back unchanged.
    fn fail(&mut self, error: VizError) -> VizError {
        self.status = ExportStatus::Error;
        self.error = Some(match &error {
            VizError::Encoder(message) => message.clone(),
            other => other.to_string(),
        });
        error
    }

    /// Runs a full export of the loaded track, blocking until it completes,
    /// fails, or is cancelled through the handle.
    ///
    /// The renderers are driven by a fresh state store against a virtual
    /// clock, so the output is deterministic and independent of any live
    /// view of the same track.
    pub fn export(
        &mut self,
        variant: EffectVariant,
        transport: &mut Transport,
        sampler: &SpectralSampler,
        encoder: &mut dyn FrameEncoder,
    ) -> Result<ExportOutcome> {
        let Some(track) = transport.track().cloned() else {
            self.status = ExportStatus::Error;
            let message = "select an audio track first".to_string();
            self.error = Some(message.clone());
            return Err(VizError::Audio(message));
        };
        if sampler.tap().is_none() {
            self.status = ExportStatus::Error;
            let message = "no audio source attached".to_string();
            self.error = Some(message.clone());
            return Err(VizError::Audio(message));
        }

        let (width, height) = self.settings.preset.dimensions();
        let avatar = self
            .settings
            .avatar_path
            .clone()
            .and_then(|path| Avatar::load_with_timeout(path, self.settings.avatar_timeout));

        let mut scheduler =
            FrameScheduler::with_store(variant, width, height, EffectStateStore::new());
        scheduler.set_avatar(avatar);

        self.cancel.reset();
        self.status = ExportStatus::Recording;
        self.progress = 0.0;
        self.error = None;

        transport.rewind();
        transport.play();

        let duration = track.duration_seconds.max(f32::EPSILON);
        let mut clock = VirtualClock::bounded(self.settings.fps, track.duration_seconds);
        let interval = clock.interval();
        let cancel = self.cancel.clone();
        let mut encode_error: Option<VizError> = None;
        let mut progress = 0.0f32;

        scheduler.run(&mut clock, sampler, |canvas, _tick, elapsed| {
            if cancel.is_stopped() {
                return false;
            }
            if let Err(e) = encoder.write_frame(&canvas.to_rgba8()) {
                encode_error = Some(e);
                return false;
            }
            transport.advance(interval);
            progress = ((elapsed + interval) / duration).clamp(0.0, 1.0);
            true
        });

        // Teardown order: encoder first, then playback. The clock is
        // already stopped once the run loop returns.
        if self.cancel.is_stopped() {
            encoder.abort();
            transport.pause();
            self.reset_idle();
            return Ok(ExportOutcome::Cancelled);
        }
        if let Some(error) = encode_error {
            encoder.abort();
            transport.pause();
            return Err(self.fail(error));
        }
        transport.pause();

        self.progress = progress;
        self.status = ExportStatus::Processing;
        match encoder.finish() {
            Ok(path) => {
                self.progress = 1.0;
                self.status = ExportStatus::Done;
                Ok(ExportOutcome::Completed(path))
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioClip, AudioTap};
    use crate::scheduler::FrameClock;

    fn sine_clip(seconds: f32, rate: u32) -> AudioClip {
        let count = (seconds * rate as f32) as usize;
        let samples: Vec<f32> = (0..count)
            .map(|i| (i as f32 * 220.0 * std::f32::consts::TAU / rate as f32).sin())
            .collect();
        AudioClip::from_samples(samples, rate)
    }

    fn loaded_setup(seconds: f32) -> (Transport, SpectralSampler) {
        let clip = sine_clip(seconds, 8_000);
        let mut transport = Transport::new();
        transport.load("test-track", &clip);
        let sampler = SpectralSampler::new(AudioTap::new(clip), 32);
        (transport, sampler)
    }

    fn tiny_pipeline() -> ExportPipeline {
        // 720p frames are large; tests only care about counts, so keep the
        // preset but verify against frame totals, not bytes.
        ExportPipeline::new(ExportSettings {
            preset: ResolutionPreset::Hd720,
            fps: 60,
            ..Default::default()
        })
    }

    struct CancellingEncoder {
        inner: MemoryEncoder,
        handle: StopHandle,
        after: u64,
    }

    impl FrameEncoder for CancellingEncoder {
        fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
            self.inner.write_frame(rgba)?;
            if self.inner.frames_written >= self.after {
                self.handle.stop();
            }
            Ok(())
        }

        fn finish(&mut self) -> Result<PathBuf> {
            self.inner.finish()
        }

        fn abort(&mut self) {
            self.inner.abort();
        }
    }

    #[test]
    fn preset_table_matches_published_tiers() {
        assert_eq!(ResolutionPreset::Hd720.dimensions(), (1280, 720));
        assert_eq!(ResolutionPreset::FullHd1080.dimensions(), (1920, 1080));
        assert_eq!(ResolutionPreset::Uhd4k.dimensions(), (3840, 2160));
        assert_eq!(ResolutionPreset::Hd720.bitrate_bps(), 5_000_000);
        assert_eq!(ResolutionPreset::FullHd1080.bitrate_bps(), 10_000_000);
        assert_eq!(ResolutionPreset::Uhd4k.bitrate_bps(), 20_000_000);
    }

    #[test]
    fn presets_parse_from_common_spellings() {
        assert_eq!(
            "720p".parse::<ResolutionPreset>().unwrap(),
            ResolutionPreset::Hd720
        );
        assert_eq!(
            "1080".parse::<ResolutionPreset>().unwrap(),
            ResolutionPreset::FullHd1080
        );
        assert_eq!(
            "4K".parse::<ResolutionPreset>().unwrap(),
            ResolutionPreset::Uhd4k
        );
        assert!("480p".parse::<ResolutionPreset>().is_err());
    }

    #[test]
    fn ten_second_track_schedules_six_hundred_frames() {
        let mut clock = VirtualClock::bounded(60, 10.0);
        let mut frames = 0u32;
        while clock.next_frame().is_some() {
            frames += 1;
        }
        assert_eq!(frames, 600);
    }

    #[test]
    fn export_writes_one_frame_per_virtual_tick() {
        let (mut transport, sampler) = loaded_setup(1.0);
        let mut pipeline = tiny_pipeline();
        let mut encoder = MemoryEncoder::new();

        let outcome = pipeline
            .export(EffectVariant::Bars, &mut transport, &sampler, &mut encoder)
            .unwrap();

        // 1 second at 60 fps.
        assert_eq!(encoder.frames_written, 60);
        assert!(encoder.finished);
        assert_eq!(pipeline.status(), ExportStatus::Done);
        assert_eq!(pipeline.progress(), 1.0);
        assert!(matches!(outcome, ExportOutcome::Completed(_)));
        assert!(!transport.is_playing());
    }

    #[test]
    fn export_without_a_track_reports_an_error() {
        let mut transport = Transport::new();
        let sampler = SpectralSampler::detached(32);
        let mut pipeline = tiny_pipeline();
        let mut encoder = MemoryEncoder::new();

        let result = pipeline.export(
            EffectVariant::Waveform,
            &mut transport,
            &sampler,
            &mut encoder,
        );

        assert!(result.is_err());
        assert_eq!(pipeline.status(), ExportStatus::Error);
        assert_eq!(pipeline.error_message(), Some("select an audio track first"));
        assert_eq!(encoder.frames_written, 0);
    }

    #[test]
    fn cancel_mid_export_resets_and_allows_a_clean_restart() {
        let (mut transport, sampler) = loaded_setup(1.0);
        let mut pipeline = tiny_pipeline();
        let mut encoder = CancellingEncoder {
            inner: MemoryEncoder::new(),
            handle: pipeline.cancel_handle(),
            after: 10,
        };

        let outcome = pipeline
            .export(EffectVariant::Burst, &mut transport, &sampler, &mut encoder)
            .unwrap();

        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert_eq!(pipeline.status(), ExportStatus::Idle);
        assert_eq!(pipeline.progress(), 0.0);
        assert!(encoder.inner.aborted);
        assert!(!encoder.inner.finished);
        assert!(!transport.is_playing());

        // The rearmed pipeline runs to completion.
        let mut fresh = MemoryEncoder::new();
        let outcome = pipeline
            .export(EffectVariant::Burst, &mut transport, &sampler, &mut fresh)
            .unwrap();
        assert!(matches!(outcome, ExportOutcome::Completed(_)));
        assert_eq!(fresh.frames_written, 60);
        assert_eq!(pipeline.status(), ExportStatus::Done);
    }

    #[test]
    fn cancel_is_idempotent_from_any_state() {
        let mut pipeline = tiny_pipeline();
        pipeline.cancel();
        pipeline.cancel();
        assert_eq!(pipeline.status(), ExportStatus::Idle);
        assert_eq!(pipeline.progress(), 0.0);

        let (mut transport, sampler) = loaded_setup(0.5);
        let mut encoder = MemoryEncoder::new();
        pipeline
            .export(
                EffectVariant::RingSpectrum,
                &mut transport,
                &sampler,
                &mut encoder,
            )
            .unwrap();
        assert_eq!(pipeline.status(), ExportStatus::Done);
        pipeline.cancel();
        assert_eq!(pipeline.status(), ExportStatus::Idle);
    }

    #[test]
    fn encoder_failure_surfaces_as_error_state() {
        let (mut transport, sampler) = loaded_setup(1.0);
        let mut pipeline = tiny_pipeline();
        let mut encoder = MemoryEncoder {
            fail_after: Some(5),
            ..Default::default()
        };

        let result = pipeline.export(
            EffectVariant::Storm,
            &mut transport,
            &sampler,
            &mut encoder,
        );

        let error = result.unwrap_err();
        assert_eq!(error.to_string(), "encoder: simulated encoder failure");
        assert_eq!(pipeline.status(), ExportStatus::Error);
        assert!(encoder.aborted);
        assert_eq!(pipeline.error_message(), Some("simulated encoder failure"));
    }

    #[test]
    fn frames_match_the_preset_geometry() {
        let (mut transport, sampler) = loaded_setup(0.5);
        let mut pipeline = tiny_pipeline();

        struct ProbingEncoder {
            inner: MemoryEncoder,
            last_len: usize,
        }
        impl FrameEncoder for ProbingEncoder {
            fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
                self.last_len = rgba.len();
                self.inner.write_frame(rgba)
            }
            fn finish(&mut self) -> Result<PathBuf> {
                self.inner.finish()
            }
            fn abort(&mut self) {
                self.inner.abort();
            }
        }

        let mut encoder = ProbingEncoder {
            inner: MemoryEncoder::new(),
            last_len: 0,
        };
        pipeline
            .export(
                EffectVariant::Aurora,
                &mut transport,
                &sampler,
                &mut encoder,
            )
            .unwrap();

        // Every frame matches the preset geometry.
        assert_eq!(encoder.last_len, 1280 * 720 * 4);
        assert_eq!(encoder.inner.frames_written, 30);
        assert!((transport.position() - 0.5).abs() < 0.02);
    }
}
