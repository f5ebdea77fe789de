//! Mirrored oscilloscope-style trace smoothed across ticks.

use crate::canvas::{Canvas, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const SMOOTHING: f32 = 0.35;

#[derive(Debug, Clone, Default)]
pub struct WaveformState {
    smoothed: Vec<f32>,
}

impl WaveformState {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_geometry(&mut self, len: usize) {
        if self.smoothed.len() != len {
            self.smoothed = vec![0.0; len];
        }
    }
}

pub(super) fn draw(
    canvas: &mut Canvas,
    spectrum: &Spectrum,
    elapsed: f32,
    state: &mut WaveformState,
) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let mid = height * 0.5;
    super::fade_trail(canvas, 0.25);

    let len = spectrum.len().max(2);
    state.ensure_geometry(len);

    let mut top = Vec::with_capacity(len);
    let mut bottom = Vec::with_capacity(len);
    let mut loudest = (0usize, 0.0f32);
    for i in 0..len {
        let value = spectrum.normalized(i);
        let s = &mut state.smoothed[i];
        *s += (value - *s) * SMOOTHING;
        if *s > loudest.1 {
            loudest = (i, *s);
        }
        let x = i as f32 / (len - 1) as f32 * width;
        let swing = *s * height * 0.35;
        top.push((x, mid - swing));
        bottom.push((x, mid + swing));
    }

    let hue = safety::safe_hue(160.0 + elapsed * 12.0);
    let line = Rgba::from_hsla(hue, 90.0, 60.0, 0.9);
    let faint = Rgba::from_hsla(hue, 40.0, 35.0, 0.35);

    canvas.stroke_line(0.0, mid, width, mid, 1.0, &Paint::Solid(faint));
    canvas.stroke_polyline(&top, 2.0, &Paint::Solid(line));
    canvas.stroke_polyline(&bottom, 2.0, &Paint::Solid(line.with_alpha(0.6)));

    let (peak_index, peak) = loudest;
    if peak > 0.05 {
        let x = peak_index as f32 / (len - 1) as f32 * width;
        canvas.glow_circle(x, mid - peak * height * 0.35, 6.0 + peak * 10.0, line, peak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_converges_toward_input() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = WaveformState::new();
        let spectrum = Spectrum::from_bins(vec![255; 16]);
        for _ in 0..60 {
            draw(&mut canvas, &spectrum, 0.0, &mut state);
        }
        assert!(state.smoothed.iter().all(|&s| s > 0.95));
    }

    #[test]
    fn trace_reallocates_on_spectrum_length_change() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = WaveformState::new();
        draw(&mut canvas, &Spectrum::zeroed(16), 0.0, &mut state);
        assert_eq!(state.smoothed.len(), 16);
        draw(&mut canvas, &Spectrum::zeroed(64), 0.0, &mut state);
        assert_eq!(state.smoothed.len(), 64);
    }
}
