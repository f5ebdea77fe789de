//! The effect renderer registry: thirteen independently implemented draw
//! routines, the closed variant enumeration that selects between them, and
//! the per-driver store holding each variant's mutable state.
//!
//! Every renderer is a deterministic function of (spectrum, elapsed time,
//! state-before); the export pipeline relies on that to replay the same
//! visuals on a virtual clock.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::avatar::Avatar;
use crate::canvas::{Canvas, Paint, Rgba};
use crate::spectrum::Spectrum;

mod aurora;
mod bars;
mod burst;
mod dashboard;
mod helix;
mod pulse;
mod rain;
mod ring;
mod shatter;
mod spiral;
mod state;
mod storm;
mod tunnel;
mod waveform;

pub use state::{EffectState, Particle, Spring};

/// Closed enumeration of the thirteen visual effects. Selecting a variant is
/// a pure switch; state is allocated lazily by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectVariant {
    Bars,
    Waveform,
    Dashboard,
    PulseTrace,
    RingSpectrum,
    SpiralGalaxy,
    Helix,
    GlyphRain,
    Burst,
    Aurora,
    Tunnel,
    Storm,
    Shatter,
}

impl EffectVariant {
    pub const ALL: [EffectVariant; 13] = [
        EffectVariant::Bars,
        EffectVariant::Waveform,
        EffectVariant::Dashboard,
        EffectVariant::PulseTrace,
        EffectVariant::RingSpectrum,
        EffectVariant::SpiralGalaxy,
        EffectVariant::Helix,
        EffectVariant::GlyphRain,
        EffectVariant::Burst,
        EffectVariant::Aurora,
        EffectVariant::Tunnel,
        EffectVariant::Storm,
        EffectVariant::Shatter,
    ];

    /// Stable kebab-case identifier, also used by the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            EffectVariant::Bars => "bars",
            EffectVariant::Waveform => "waveform",
            EffectVariant::Dashboard => "dashboard",
            EffectVariant::PulseTrace => "pulse-trace",
            EffectVariant::RingSpectrum => "ring-spectrum",
            EffectVariant::SpiralGalaxy => "spiral-galaxy",
            EffectVariant::Helix => "helix",
            EffectVariant::GlyphRain => "glyph-rain",
            EffectVariant::Burst => "burst",
            EffectVariant::Aurora => "aurora",
            EffectVariant::Tunnel => "tunnel",
            EffectVariant::Storm => "storm",
            EffectVariant::Shatter => "shatter",
        }
    }

    /// Human-readable label for menus.
    pub fn label(&self) -> &'static str {
        match self {
            EffectVariant::Bars => "Bar Spectrum",
            EffectVariant::Waveform => "Waveform",
            EffectVariant::Dashboard => "Dashboard",
            EffectVariant::PulseTrace => "Pulse Trace",
            EffectVariant::RingSpectrum => "Ring Spectrum",
            EffectVariant::SpiralGalaxy => "Spiral Galaxy",
            EffectVariant::Helix => "Helix",
            EffectVariant::GlyphRain => "Glyph Rain",
            EffectVariant::Burst => "Burst",
            EffectVariant::Aurora => "Aurora",
            EffectVariant::Tunnel => "Tunnel",
            EffectVariant::Storm => "Storm",
            EffectVariant::Shatter => "Shatter",
        }
    }
}

impl fmt::Display for EffectVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == s)
            .ok_or_else(|| format!("unknown effect `{s}`"))
    }
}

const DEFAULT_STORE_SEED: u64 = 0x00C0_FFEE_D15C_0000;

/// Lazily constructed per-variant state, scoped to one driver. The export
/// pipeline builds its own store so mid-flight live animation never leaks
/// into an exported render.
#[derive(Debug)]
pub struct EffectStateStore {
    states: HashMap<EffectVariant, EffectState>,
    seed: u64,
}

impl Default for EffectStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectStateStore {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_STORE_SEED)
    }

    /// Store whose random streams derive from `seed`; two stores built with
    /// the same seed replay identical trajectories.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            states: HashMap::new(),
            seed,
        }
    }

    /// Returns the state bundle for `variant`, constructing the default on
    /// first access and the same instance thereafter.
    pub fn state_for(&mut self, variant: EffectVariant) -> &mut EffectState {
        let seed = self.variant_seed(variant);
        self.states
            .entry(variant)
            .or_insert_with(|| EffectState::new_for(variant, seed))
    }

    /// Discards the state for one variant; the next access rebuilds the
    /// default. Used on effect switch.
    pub fn reset(&mut self, variant: EffectVariant) {
        self.states.remove(&variant);
    }

    /// Discards all state, e.g. on surface teardown.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    fn variant_seed(&self, variant: EffectVariant) -> u64 {
        (variant as u64 + 1)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(self.seed)
    }
}

/// Dispatches one frame to the renderer for `variant`.
///
/// The renderers never fail: zero spectra, missing avatars and degenerate
/// gradients all produce a reduced idle visual. A state bundle of the wrong
/// shape, however, is a fatal bug.
pub fn render(
    variant: EffectVariant,
    canvas: &mut Canvas,
    spectrum: &Spectrum,
    elapsed: f32,
    state: &mut EffectState,
    avatar: Option<&Avatar>,
) {
    match (variant, state) {
        (EffectVariant::Bars, EffectState::Bars(s)) => bars::draw(canvas, spectrum, elapsed, s),
        (EffectVariant::Waveform, EffectState::Waveform(s)) => {
            waveform::draw(canvas, spectrum, elapsed, s)
        }
        (EffectVariant::Dashboard, EffectState::Dashboard(s)) => {
            dashboard::draw(canvas, spectrum, elapsed, s)
        }
        (EffectVariant::PulseTrace, EffectState::PulseTrace(s)) => {
            pulse::draw(canvas, spectrum, elapsed, s)
        }
        (EffectVariant::RingSpectrum, EffectState::RingSpectrum(s)) => {
            ring::draw(canvas, spectrum, elapsed, s, avatar)
        }
        (EffectVariant::SpiralGalaxy, EffectState::SpiralGalaxy(s)) => {
            spiral::draw(canvas, spectrum, elapsed, s)
        }
        (EffectVariant::Helix, EffectState::Helix(s)) => helix::draw(canvas, spectrum, elapsed, s),
        (EffectVariant::GlyphRain, EffectState::GlyphRain(s)) => {
            rain::draw(canvas, spectrum, elapsed, s)
        }
        (EffectVariant::Burst, EffectState::Burst(s)) => burst::draw(canvas, spectrum, elapsed, s),
        (EffectVariant::Aurora, EffectState::Aurora(s)) => {
            aurora::draw(canvas, spectrum, elapsed, s)
        }
        (EffectVariant::Tunnel, EffectState::Tunnel(s)) => {
            tunnel::draw(canvas, spectrum, elapsed, s)
        }
        (EffectVariant::Storm, EffectState::Storm(s)) => storm::draw(canvas, spectrum, elapsed, s),
        (EffectVariant::Shatter, EffectState::Shatter(s)) => {
            shatter::draw(canvas, spectrum, elapsed, s)
        }
        (variant, state) => panic!(
            "state bundle for {:?} handed to the {variant:?} renderer",
            state.variant()
        ),
    }
}

/// Darkens the whole surface slightly, leaving trails from earlier frames.
pub(crate) fn fade_trail(canvas: &mut Canvas, alpha: f32) {
    let w = canvas.width() as f32;
    let h = canvas.height() as f32;
    canvas.fill_rect(0.0, 0.0, w, h, &Paint::Solid(Rgba::BLACK.with_alpha(alpha)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_spectrum(tick: u64, bins: usize) -> Spectrum {
        let bins: Vec<u8> = (0..bins)
            .map(|i| {
                // Loud bass pulses every 25 ticks, noisy elsewhere.
                if i < bins / 8 && tick % 25 < 3 {
                    220
                } else {
                    ((tick * 7 + i as u64 * 13) % 200) as u8
                }
            })
            .collect();
        Spectrum::from_bins(bins)
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for variant in EffectVariant::ALL {
            let parsed: EffectVariant = variant.name().parse().unwrap();
            assert_eq!(parsed, variant);
        }
        assert!("laser-show".parse::<EffectVariant>().is_err());
    }

    #[test]
    fn store_hands_back_the_same_instance() {
        let mut store = EffectStateStore::new();
        if let EffectState::Tunnel(state) = store.state_for(EffectVariant::Tunnel) {
            state.progress = 0.5;
        }
        match store.state_for(EffectVariant::Tunnel) {
            EffectState::Tunnel(state) => assert_eq!(state.progress, 0.5),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn reset_rebuilds_default_state() {
        let mut store = EffectStateStore::new();
        if let EffectState::Tunnel(state) = store.state_for(EffectVariant::Tunnel) {
            state.progress = 0.5;
        }
        store.reset(EffectVariant::Tunnel);
        match store.state_for(EffectVariant::Tunnel) {
            EffectState::Tunnel(state) => assert_eq!(state.progress, 0.0),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "state bundle")]
    fn mismatched_state_is_a_fatal_bug() {
        let mut canvas = Canvas::new(32, 32);
        let spectrum = Spectrum::zeroed(16);
        let mut state = EffectState::new_for(EffectVariant::Waveform, 1);
        render(
            EffectVariant::Bars,
            &mut canvas,
            &spectrum,
            0.0,
            &mut state,
            None,
        );
    }

    #[test]
    fn every_renderer_survives_a_zero_spectrum() {
        let mut store = EffectStateStore::new();
        let mut canvas = Canvas::new(64, 48);
        let spectrum = Spectrum::zeroed(32);
        for variant in EffectVariant::ALL {
            for tick in 0..5u64 {
                let state = store.state_for(variant);
                render(
                    variant,
                    &mut canvas,
                    &spectrum,
                    tick as f32 / 60.0,
                    state,
                    None,
                );
            }
        }
    }

    #[test]
    fn every_renderer_survives_an_empty_spectrum() {
        let mut store = EffectStateStore::new();
        let mut canvas = Canvas::new(48, 48);
        let spectrum = Spectrum::zeroed(0);
        for variant in EffectVariant::ALL {
            let state = store.state_for(variant);
            render(variant, &mut canvas, &spectrum, 0.1, state, None);
        }
    }

    #[test]
    fn replays_produce_identical_state_trajectories() {
        for variant in EffectVariant::ALL {
            let mut store_a = EffectStateStore::with_seed(99);
            let mut store_b = EffectStateStore::with_seed(99);
            let mut canvas_a = Canvas::new(80, 60);
            let mut canvas_b = Canvas::new(80, 60);
            for tick in 0..40u64 {
                let spectrum = synthetic_spectrum(tick, 32);
                let elapsed = tick as f32 / 60.0;
                render(
                    variant,
                    &mut canvas_a,
                    &spectrum,
                    elapsed,
                    store_a.state_for(variant),
                    None,
                );
                render(
                    variant,
                    &mut canvas_b,
                    &spectrum,
                    elapsed,
                    store_b.state_for(variant),
                    None,
                );
            }
            let state_a = format!("{:?}", store_a.state_for(variant));
            let state_b = format!("{:?}", store_b.state_for(variant));
            assert_eq!(state_a, state_b, "{variant} state trajectories diverged");
            assert_eq!(
                canvas_a.to_rgba8(),
                canvas_b.to_rgba8(),
                "{variant} pixels diverged"
            );
        }
    }
}
