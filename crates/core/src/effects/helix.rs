//! Twin phase-shifted strands with connecting rungs.

use std::f32::consts::PI;

use crate::canvas::{Canvas, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const SAMPLE_STEP: f32 = 8.0;
const RUNG_EVERY: usize = 4;
const GLOW_SMOOTHING: f32 = 0.2;

#[derive(Debug, Clone, Default)]
pub struct HelixState {
    phase: f32,
    glow: f32,
}

impl HelixState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(super) fn draw(canvas: &mut Canvas, spectrum: &Spectrum, elapsed: f32, state: &mut HelixState) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let mid = height * 0.5;
    super::fade_trail(canvas, 0.3);

    let bass = spectrum.bass_energy();
    let treble = spectrum.treble_energy();
    state.phase += 0.05 + treble * 0.25;
    state.glow += (bass - state.glow) * GLOW_SMOOTHING;

    let amplitude = height * 0.18 * (0.5 + bass * 1.5);
    let frequency = 0.018 + treble * 0.01;

    let mut strand_a: Vec<(f32, f32)> = Vec::new();
    let mut strand_b: Vec<(f32, f32)> = Vec::new();
    let mut x = 0.0;
    while x <= width {
        let angle = x * frequency + state.phase;
        strand_a.push((x, mid + angle.sin() * amplitude));
        strand_b.push((x, mid + (angle + PI).sin() * amplitude));
        x += SAMPLE_STEP;
    }

    let hue_a = safety::safe_hue(180.0 + elapsed * 15.0);
    let hue_b = safety::safe_hue(hue_a + 140.0);
    let color_a = Rgba::from_hsla(hue_a, 85.0, 60.0, 0.9);
    let color_b = Rgba::from_hsla(hue_b, 85.0, 60.0, 0.9);

    // Rungs first so the strands draw over them.
    let rung_alpha = 0.15 + state.glow * 0.5;
    for (i, (a, b)) in strand_a.iter().zip(strand_b.iter()).enumerate() {
        if i % RUNG_EVERY == 0 {
            let hue = safety::safe_hue(hue_a + i as f32 * 3.0);
            let rung = Rgba::from_hsla(hue, 60.0, 55.0, rung_alpha);
            canvas.stroke_line(a.0, a.1, b.0, b.1, 1.5, &Paint::Solid(rung));
        }
    }

    canvas.stroke_polyline(&strand_a, 2.5, &Paint::Solid(color_a));
    canvas.stroke_polyline(&strand_b, 2.5, &Paint::Solid(color_b));

    // Crossing points light up with the bass glow.
    for (i, (a, b)) in strand_a.iter().zip(strand_b.iter()).enumerate() {
        if (a.1 - b.1).abs() < amplitude * 0.08 && i % 2 == 0 {
            canvas.glow_circle(a.0, a.1, 5.0, Rgba::WHITE, state.glow.clamp(0.0, 1.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_advances_every_tick() {
        let mut canvas = Canvas::new(64, 48);
        let mut state = HelixState::new();
        draw(&mut canvas, &Spectrum::zeroed(16), 0.0, &mut state);
        let first = state.phase;
        draw(&mut canvas, &Spectrum::zeroed(16), 0.0, &mut state);
        assert!(state.phase > first);
    }

    #[test]
    fn glow_follows_bass() {
        let mut canvas = Canvas::new(64, 48);
        let mut state = HelixState::new();
        let mut bins = vec![0u8; 32];
        bins[0] = 255;
        bins[1] = 255;
        bins[2] = 255;
        bins[3] = 255;
        let bass = Spectrum::from_bins(bins);
        for _ in 0..60 {
            draw(&mut canvas, &bass, 0.0, &mut state);
        }
        assert!(state.glow > 0.9);
    }
}
