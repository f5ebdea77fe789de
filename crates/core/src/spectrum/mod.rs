//! Spectrum type, FFT analyzer and the point-in-time spectral sampler.
//!
//! The analyzer is the single source both the live scheduler and the export
//! pipeline read from, so an exported render sees the same amplitudes the
//! live view did for the same track position.

use std::sync::{Arc, Mutex, MutexGuard};
use std::{f32::consts::PI, fmt};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::audio::AudioTap;
use crate::safety;
use crate::{VizError, Result};

/// Analysis window length in samples. Power of two keeps realfft happy.
const WINDOW_SIZE: usize = 2048;
/// Gain applied to bin magnitudes before quantizing to `0..=255`.
const MAGNITUDE_GAIN: f32 = 8.0;

/// Ordered per-tick array of frequency-bin amplitudes, low to high, each in
/// `0..=255`. Regenerated every tick and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spectrum {
    bins: Vec<u8>,
}

impl Spectrum {
    pub fn zeroed(len: usize) -> Self {
        Self {
            bins: vec![0; len],
        }
    }

    pub fn from_bins(bins: Vec<u8>) -> Self {
        Self { bins }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    /// Amplitude of bin `index`, or 0 when out of range.
    pub fn bin(&self, index: usize) -> u8 {
        self.bins.get(index).copied().unwrap_or(0)
    }

    /// Amplitude of bin `index` normalized to `[0, 1]`.
    pub fn normalized(&self, index: usize) -> f32 {
        self.bin(index) as f32 / 255.0
    }

    /// Mean amplitude over all bins, normalized to `[0, 1]`.
    pub fn average_energy(&self) -> f32 {
        if self.bins.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.bins.iter().map(|&b| b as u32).sum();
        sum as f32 / (self.bins.len() as f32 * 255.0)
    }

    /// Mean amplitude over a bin range, normalized to `[0, 1]`. The range is
    /// clamped to the spectrum length.
    pub fn band_energy(&self, range: std::ops::Range<usize>) -> f32 {
        let start = range.start.min(self.bins.len());
        let end = range.end.min(self.bins.len());
        if start >= end {
            return 0.0;
        }
        let sum: u32 = self.bins[start..end].iter().map(|&b| b as u32).sum();
        sum as f32 / ((end - start) as f32 * 255.0)
    }

    /// Low-frequency band, roughly the bottom eighth of the bins.
    pub fn bass_energy(&self) -> f32 {
        self.band_energy(0..(self.bins.len() / 8).max(1))
    }

    /// Mid band.
    pub fn mid_energy(&self) -> f32 {
        let len = self.bins.len();
        self.band_energy(len / 8..(len / 2).max(1))
    }

    /// High-frequency band, the top half of the bins.
    pub fn treble_energy(&self) -> f32 {
        let len = self.bins.len();
        self.band_energy(len / 2..len)
    }
}

/// Realfft-backed analyzer mapping a clip position to bin amplitudes.
pub struct Analyzer {
    bin_count: usize,
    planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl Analyzer {
    pub fn new(bin_count: usize) -> Self {
        Self {
            bin_count: bin_count.max(1),
            planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Computes the amplitude distribution of the clip at `at_seconds`.
    pub fn analyze(&mut self, tap: &AudioTap, at_seconds: f32) -> Result<Spectrum> {
        let bin_count = self.bin_count;
        let fft = self.prepare_fft()?;

        tap.clip().window(at_seconds, &mut fft.input);
        for (index, value) in fft.input.iter_mut().enumerate() {
            *value *= hann_value(index, WINDOW_SIZE);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        // Skip the DC bin, then average groups of FFT bins down to the
        // requested resolution.
        let usable = fft.spectrum.len().saturating_sub(1);
        let mut bins = Vec::with_capacity(bin_count);
        for out_index in 0..bin_count {
            let start = 1 + out_index * usable / bin_count;
            let end = (1 + (out_index + 1) * usable / bin_count).max(start + 1);
            let end = end.min(fft.spectrum.len());
            let mut magnitude = 0.0f32;
            for bin in &fft.spectrum[start.min(end)..end] {
                magnitude += bin.norm();
            }
            let count = (end - start.min(end)).max(1) as f32;
            let scaled = magnitude / count / WINDOW_SIZE as f32 * MAGNITUDE_GAIN * 255.0 * 4.0;
            bins.push(safety::safe_channel(scaled));
        }

        Ok(Spectrum::from_bins(bins))
    }

    fn prepare_fft(&mut self) -> Result<&mut FftResources> {
        if self.fft.is_none() {
            let plan = self.planner.plan_fft_forward(WINDOW_SIZE);
            let input = plan.make_input_vec();
            let spectrum = plan.make_output_vec();
            let scratch = plan.make_scratch_vec();
            self.fft = Some(FftResources {
                plan,
                input,
                spectrum,
                scratch,
            });
        }
        self.fft
            .as_mut()
            .ok_or(VizError::InvalidInput("fft resources missing"))
    }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("bin_count", &self.bin_count)
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

/// Point-in-time spectral sampler. Callable at arbitrary frequency on either
/// clock; returns a zero-filled spectrum when no audio source is attached so
/// renderers degrade to their idle appearance.
#[derive(Debug, Clone)]
pub struct SpectralSampler {
    analyzer: Arc<Mutex<Analyzer>>,
    tap: Option<AudioTap>,
}

impl SpectralSampler {
    /// Creates a sampler with an attached audio source.
    pub fn new(tap: AudioTap, bin_count: usize) -> Self {
        Self {
            analyzer: Arc::new(Mutex::new(Analyzer::new(bin_count))),
            tap: Some(tap),
        }
    }

    /// Creates a sampler with no audio source; every sample is silence.
    pub fn detached(bin_count: usize) -> Self {
        Self {
            analyzer: Arc::new(Mutex::new(Analyzer::new(bin_count))),
            tap: None,
        }
    }

    pub fn attach(&mut self, tap: AudioTap) {
        self.tap = Some(tap);
    }

    pub fn detach(&mut self) {
        self.tap = None;
    }

    pub fn tap(&self) -> Option<&AudioTap> {
        self.tap.as_ref()
    }

    pub fn bin_count(&self) -> usize {
        self.lock().map(|a| a.bin_count()).unwrap_or(0)
    }

    /// Samples the amplitude distribution at `at_seconds`. Never fails: a
    /// missing source, a poisoned lock or an analysis fault all degrade to
    /// silence.
    pub fn sample(&self, at_seconds: f32) -> Spectrum {
        let Some(tap) = &self.tap else {
            return Spectrum::zeroed(self.bin_count());
        };
        match self.lock() {
            Ok(mut analyzer) => {
                let bins = analyzer.bin_count();
                analyzer
                    .analyze(tap, at_seconds)
                    .unwrap_or_else(|_| Spectrum::zeroed(bins))
            }
            Err(_) => Spectrum::zeroed(0),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Analyzer>> {
        self.analyzer
            .lock()
            .map_err(|_| VizError::msg("spectrum analyzer has been poisoned"))
    }
}
