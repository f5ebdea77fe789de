//! Gauge-cluster dashboard: three dials driven by band energies plus a
//! mini spectrum strip along the bottom.

use std::f32::consts::PI;

use crate::canvas::{Canvas, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const NEEDLE_SMOOTHING: f32 = 0.25;
/// Peak markers bleed off at this rate per tick.
const PEAK_DECAY: f32 = 0.008;
/// Dial sweep from the lower-left to the lower-right of the face.
const SWEEP_START: f32 = 0.75 * PI;
const SWEEP_RANGE: f32 = 1.5 * PI;

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    needles: [f32; 3],
    peaks: [f32; 3],
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(super) fn draw(
    canvas: &mut Canvas,
    spectrum: &Spectrum,
    elapsed: f32,
    state: &mut DashboardState,
) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    canvas.clear(Rgba::new(8, 10, 16, 1.0));

    let bands = [
        spectrum.bass_energy(),
        spectrum.mid_energy(),
        spectrum.treble_energy(),
    ];
    let hues = [10.0, 140.0, 210.0];
    let radius = (width / 8.0).min(height / 3.2);

    for (index, &band) in bands.iter().enumerate() {
        let needle = &mut state.needles[index];
        *needle += (band - *needle) * NEEDLE_SMOOTHING;
        let peak = &mut state.peaks[index];
        *peak = if band >= *peak {
            band
        } else {
            (*peak - PEAK_DECAY).max(0.0)
        };

        let cx = width * (0.25 + 0.25 * index as f32);
        let cy = height * 0.4;
        draw_gauge(canvas, cx, cy, radius, *needle, *peak, hues[index], elapsed);
    }

    draw_strip(canvas, spectrum, width, height);
}

fn draw_gauge(
    canvas: &mut Canvas,
    cx: f32,
    cy: f32,
    radius: f32,
    needle: f32,
    peak: f32,
    hue: f32,
    elapsed: f32,
) {
    let face = Rgba::from_hsla(hue, 25.0, 16.0, 1.0);
    let rim = Rgba::from_hsla(hue, 60.0, 45.0, 0.9);
    canvas.fill_circle(cx, cy, radius, &Paint::Solid(face));
    canvas.stroke_circle(cx, cy, radius, 2.0, &Paint::Solid(rim));

    // Tick marks around the sweep.
    for i in 0..=10 {
        let angle = SWEEP_START + SWEEP_RANGE * i as f32 / 10.0;
        let (sin, cos) = angle.sin_cos();
        let inner = radius * 0.82;
        let outer = radius * 0.94;
        let mark = Rgba::from_hsla(hue, 30.0, 60.0, 0.8);
        canvas.stroke_line(
            cx + cos * inner,
            cy + sin * inner,
            cx + cos * outer,
            cy + sin * outer,
            1.5,
            &Paint::Solid(mark),
        );
    }

    // Peak marker as a brighter dot along the arc.
    let peak_angle = SWEEP_START + SWEEP_RANGE * safety::safe_alpha(peak);
    let (psin, pcos) = peak_angle.sin_cos();
    let dot = Rgba::from_hsla(hue, 95.0, 70.0, 0.95);
    canvas.fill_circle(
        cx + pcos * radius * 0.88,
        cy + psin * radius * 0.88,
        2.5,
        &Paint::Solid(dot),
    );

    // Needle.
    let angle = SWEEP_START + SWEEP_RANGE * safety::safe_alpha(needle);
    let (nsin, ncos) = angle.sin_cos();
    let needle_color = Rgba::from_hsla(hue, 90.0, 62.0, 1.0);
    canvas.stroke_line(
        cx,
        cy,
        cx + ncos * radius * 0.78,
        cy + nsin * radius * 0.78,
        2.5,
        &Paint::Solid(needle_color),
    );
    canvas.fill_circle(cx, cy, 3.5, &Paint::Solid(needle_color));

    // Redline glow when pegged.
    if needle > 0.85 {
        let pulse = 0.5 + 0.5 * (elapsed * 10.0).sin();
        canvas.glow_circle(cx, cy, radius, needle_color, 0.3 * pulse);
    }
}

fn draw_strip(canvas: &mut Canvas, spectrum: &Spectrum, width: f32, height: f32) {
    let len = spectrum.len();
    if len == 0 {
        return;
    }
    let strip_top = height * 0.72;
    let strip_height = height * 0.22;
    let slot = width / len as f32;
    for i in 0..len {
        let value = spectrum.normalized(i);
        let bar = value * strip_height;
        let hue = safety::safe_hue(200.0 - value * 160.0);
        let color = Rgba::from_hsla(hue, 80.0, 55.0, 0.9);
        canvas.fill_rect(
            i as f32 * slot + 1.0,
            strip_top + strip_height - bar,
            (slot - 2.0).max(1.0),
            bar,
            &Paint::Solid(color),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needles_smooth_toward_band_energy() {
        let mut canvas = Canvas::new(120, 80);
        let mut state = DashboardState::new();
        let spectrum = Spectrum::from_bins(vec![255; 32]);
        for _ in 0..80 {
            draw(&mut canvas, &spectrum, 0.0, &mut state);
        }
        for needle in state.needles {
            assert!(needle > 0.95, "needle should approach 1.0, got {needle}");
        }
    }

    #[test]
    fn peaks_hold_then_decay_at_bounded_rate() {
        let mut canvas = Canvas::new(120, 80);
        let mut state = DashboardState::new();
        draw(&mut canvas, &Spectrum::from_bins(vec![255; 32]), 0.0, &mut state);
        let held = state.peaks[0];
        assert!(held > 0.99);
        draw(&mut canvas, &Spectrum::zeroed(32), 0.0, &mut state);
        assert!((state.peaks[0] - (held - PEAK_DECAY)).abs() < 1e-6);
    }
}
