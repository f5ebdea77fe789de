//! Mirrored bar spectrum with falling peak-hold caps.

use crate::canvas::{Canvas, GradientStop, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const BAR_WIDTH: f32 = 14.0;
const BAR_GAP: f32 = 4.0;
/// Pixels a cap may fall per tick. Rising is always instantaneous.
const CAP_DECAY: f32 = 3.5;
const CAP_THICKNESS: f32 = 4.0;

#[derive(Debug, Clone, Default)]
pub struct BarsState {
    bar_count: usize,
    caps: Vec<f32>,
}

impl BarsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caps(&self) -> &[f32] {
        &self.caps
    }

    fn ensure_geometry(&mut self, bar_count: usize) {
        if self.bar_count != bar_count {
            self.bar_count = bar_count;
            // Reallocate rather than resize: stale cap heights from another
            // geometry must not survive.
            self.caps = vec![0.0; bar_count];
        }
    }
}

pub(super) fn draw(canvas: &mut Canvas, spectrum: &Spectrum, elapsed: f32, state: &mut BarsState) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    super::fade_trail(canvas, 0.3);

    let slot = BAR_WIDTH + BAR_GAP;
    let bar_count = ((width / slot).floor() as usize).max(1);
    state.ensure_geometry(bar_count);

    let last_bin = spectrum.len().saturating_sub(1);
    let center = (bar_count as f32 - 1.0) / 2.0;
    for i in 0..bar_count {
        // Low bins sit at the center of the row, mirrored outward, so loud
        // low-frequency content visually occupies the middle.
        let dist = if center > 0.0 {
            (i as f32 - center).abs() / center
        } else {
            0.0
        };
        let bin = ((dist * last_bin as f32) as usize).min(last_bin);
        let amplitude = spectrum.normalized(bin);
        let target = amplitude * height * 0.8;

        let cap = &mut state.caps[i];
        *cap = if target >= *cap {
            target
        } else {
            (*cap - CAP_DECAY).max(target)
        };

        let x = i as f32 * slot + BAR_GAP * 0.5;
        let hue = safety::safe_hue(210.0 - dist * 160.0 + amplitude * 70.0 + elapsed * 4.0);
        let base = Rgba::from_hsla(hue, 85.0, 50.0, 0.95);
        let tip = Rgba::from_hsla(hue + 40.0, 90.0, 68.0, 0.95);
        let stops = vec![GradientStop::new(0.0, base), GradientStop::new(1.0, tip)];
        if let Some(gradient) = safety::linear_gradient(x, height, x, height - target, stops) {
            canvas.fill_rect(x, height - target, BAR_WIDTH, target, &Paint::Gradient(gradient));
        }

        if *cap > CAP_THICKNESS {
            let cap_color = Rgba::from_hsla(hue + 20.0, 90.0, 78.0, 1.0);
            canvas.fill_rect(
                x,
                height - *cap - CAP_THICKNESS,
                BAR_WIDTH,
                CAP_THICKNESS,
                &Paint::Solid(cap_color),
            );
        }
    }
}
