//! Layered drifting ribbons with band-driven undulation.

use crate::canvas::{Canvas, GradientStop, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const LAYERS: usize = 4;
const SAMPLE_STEP: f32 = 12.0;

#[derive(Debug, Clone)]
pub struct AuroraState {
    phases: [f32; LAYERS],
    hue: f32,
}

impl AuroraState {
    pub fn new() -> Self {
        Self {
            phases: [0.0, 1.7, 3.1, 4.6],
            hue: 120.0,
        }
    }
}

impl Default for AuroraState {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) fn draw(canvas: &mut Canvas, spectrum: &Spectrum, _elapsed: f32, state: &mut AuroraState) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    super::fade_trail(canvas, 0.28);

    let bands = [
        spectrum.bass_energy(),
        spectrum.mid_energy(),
        spectrum.treble_energy(),
        spectrum.average_energy(),
    ];
    state.hue = safety::safe_hue(state.hue + 0.1 + spectrum.treble_energy() * 0.8);

    for layer in 0..LAYERS {
        let energy = bands[layer % bands.len()];
        state.phases[layer] += (0.01 + 0.006 * layer as f32) * (0.4 + energy * 2.0);

        let base_y = height * (0.25 + 0.15 * layer as f32);
        let amplitude = height * 0.08 * (0.4 + energy * 1.6);
        let frequency = 0.008 + 0.003 * layer as f32;
        let thickness = height * 0.10;

        let mut ribbon: Vec<(f32, f32)> = Vec::new();
        let mut x = 0.0;
        while x <= width + SAMPLE_STEP {
            let y = base_y + ((x * frequency) + state.phases[layer]).sin() * amplitude;
            ribbon.push((x, y));
            x += SAMPLE_STEP;
        }
        // Close the strip along its lower edge, right to left.
        for &(rx, ry) in ribbon.clone().iter().rev() {
            ribbon.push((rx, ry + thickness));
        }

        let hue = safety::safe_hue(state.hue + layer as f32 * 28.0);
        let bright = Rgba::from_hsla(hue, 85.0, 58.0, 0.35 + energy * 0.4);
        let dim = bright.with_alpha(0.0);
        let stops = vec![GradientStop::new(0.0, bright), GradientStop::new(1.0, dim)];
        match safety::linear_gradient(0.0, base_y, 0.0, base_y + thickness, stops) {
            Some(gradient) => canvas.fill_polygon(&ribbon, &Paint::Gradient(gradient)),
            // Degenerate geometry: skip the paint step, keep the frame.
            None => {}
        }
    }
}
