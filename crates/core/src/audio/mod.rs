//! Audio clip loading, the shared tap, and the playback transport.

use std::path::Path;
use std::sync::Arc;

use crate::{VizError, Result};

/// A decoded mono audio clip. Samples are `f32` in `[-1, 1]`; malformed
/// (non-finite) samples are repaired to silence during load.
#[derive(Debug, Clone)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioClip {
    /// Loads a WAV file, downmixing multi-channel input to mono.
    pub fn from_wav_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref())
            .map_err(|e| VizError::Audio(e.to_string()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.unwrap_or(0.0))
                .collect(),
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample.min(32).max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.unwrap_or(0) as f32 * scale)
                    .collect()
            }
        };

        let mut samples = Vec::with_capacity(interleaved.len() / channels);
        for frame in interleaved.chunks_exact(channels) {
            let sum: f32 = frame.iter().copied().filter(|v| v.is_finite()).sum();
            samples.push((sum / channels as f32).clamp(-1.0, 1.0));
        }

        if samples.is_empty() {
            return Err(VizError::Audio("audio file contains no samples".into()));
        }

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate.max(1),
        })
    }

    /// Wraps raw samples, repairing non-finite values to silence.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        let samples = samples
            .into_iter()
            .map(|v| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 })
            .collect();
        Self {
            samples,
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Copies the block of samples starting at `at_seconds` into `out`,
    /// zero-padding past either end of the clip.
    pub fn window(&self, at_seconds: f32, out: &mut [f32]) {
        out.fill(0.0);
        if !at_seconds.is_finite() {
            return;
        }
        let start = (at_seconds.max(0.0) * self.sample_rate as f32) as usize;
        if start >= self.samples.len() {
            return;
        }
        let available = self.samples.len() - start;
        let count = out.len().min(available);
        out[..count].copy_from_slice(&self.samples[start..start + count]);
    }
}

/// Shared handle over the clip that both the live sampler and the export
/// encoder read from. Cloning shares the underlying clip; nothing is ever
/// duplicated destructively.
#[derive(Debug, Clone)]
pub struct AudioTap {
    clip: Arc<AudioClip>,
}

impl AudioTap {
    pub fn new(clip: AudioClip) -> Self {
        Self {
            clip: Arc::new(clip),
        }
    }

    pub fn clip(&self) -> &AudioClip {
        &self.clip
    }
}

/// Metadata the export pipeline and the UI need about the selected track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    pub duration_seconds: f32,
}

/// Playback transport: the collaborator interface providing track name,
/// duration and position control. Position advances only through
/// [`Transport::advance`], so both wall-clock and virtual-clock drivers can
/// steer it.
#[derive(Debug, Default)]
pub struct Transport {
    track: Option<TrackInfo>,
    playing: bool,
    position: f32,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, name: impl Into<String>, clip: &AudioClip) {
        self.track = Some(TrackInfo {
            name: name.into(),
            duration_seconds: clip.duration_seconds(),
        });
        self.position = 0.0;
        self.playing = false;
    }

    pub fn track(&self) -> Option<&TrackInfo> {
        self.track.as_ref()
    }

    pub fn play(&mut self) {
        if self.track.is_some() {
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn rewind(&mut self) {
        self.position = 0.0;
    }

    pub fn seek(&mut self, seconds: f32) {
        let limit = self
            .track
            .as_ref()
            .map(|t| t.duration_seconds)
            .unwrap_or(0.0);
        self.position = seconds.clamp(0.0, limit.max(0.0));
    }

    pub fn advance(&mut self, delta_seconds: f32) {
        if self.playing && delta_seconds.is_finite() && delta_seconds > 0.0 {
            self.position += delta_seconds;
            if let Some(track) = &self.track {
                if self.position >= track.duration_seconds {
                    self.position = track.duration_seconds;
                    self.playing = false;
                }
            }
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}
