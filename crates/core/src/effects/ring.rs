//! Radial spectrum ring with the avatar (or a glow disc) at its center.

use std::f32::consts::TAU;

use crate::avatar::Avatar;
use crate::canvas::{Canvas, GradientStop, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const SMOOTHING: f32 = 0.4;
const ROTATION_RATE: f32 = 0.25;

#[derive(Debug, Clone, Default)]
pub struct RingState {
    smoothed: Vec<f32>,
}

impl RingState {
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
    state: &mut RingState,
    avatar: Option<&Avatar>,
) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let cx = width * 0.5;
    let cy = height * 0.5;
    let base_radius = width.min(height) * 0.22;
    super::fade_trail(canvas, 0.3);

    let len = spectrum.len().max(1);
    state.ensure_geometry(len);

    let rotation = elapsed * ROTATION_RATE;
    let max_bar = width.min(height) * 0.24;
    for i in 0..len {
        let value = spectrum.normalized(i);
        let s = &mut state.smoothed[i];
        *s += (value - *s) * SMOOTHING;

        let angle = i as f32 / len as f32 * TAU + rotation;
        let (sin, cos) = angle.sin_cos();
        let inner = base_radius + 4.0;
        let outer = inner + *s * max_bar;
        let hue = safety::safe_hue(angle.to_degrees() + elapsed * 10.0);
        let color = Rgba::from_hsla(hue, 85.0, 55.0 + *s * 20.0, 0.9);
        canvas.stroke_line(
            cx + cos * inner,
            cy + sin * inner,
            cx + cos * outer,
            cy + sin * outer,
            3.0,
            &Paint::Solid(color),
        );
    }

    let pulse = spectrum.bass_energy();
    match avatar {
        Some(avatar) => {
            canvas.blit_circle_image(
                cx,
                cy,
                base_radius * (1.0 + pulse * 0.06),
                avatar.width(),
                avatar.height(),
                avatar.pixels(),
            );
            let rim = Rgba::from_hsla(elapsed * 20.0, 70.0, 60.0, 0.8);
            canvas.stroke_circle(cx, cy, base_radius, 2.0, &Paint::Solid(rim));
        }
        // No avatar yet (or it failed to load): generic glow treatment.
        None => {
            let glow = Rgba::from_hsla(200.0 + pulse * 80.0, 80.0, 60.0, 1.0);
            let stops = vec![
                GradientStop::new(0.0, glow.with_alpha(0.9)),
                GradientStop::new(1.0, glow.with_alpha(0.0)),
            ];
            if let Some(gradient) =
                safety::radial_gradient(cx, cy, 0.0, base_radius * (1.0 + pulse), stops)
            {
                canvas.fill_circle(cx, cy, base_radius, &Paint::Gradient(gradient));
            }
        }
    }
}
