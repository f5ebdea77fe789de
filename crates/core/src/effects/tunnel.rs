//! Concentric polygons receding into depth, with a spring-driven camera
//! rush on bass hits.

use std::f32::consts::TAU;

use crate::canvas::{Canvas, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

use super::Spring;

const RING_COUNT: usize = 14;
const SIDES: usize = 6;
const PROGRESS_RATE: f32 = 0.005;
const BASS_THRESHOLD: f32 = 0.5;
const RUSH_IMPULSE: f32 = 2.2;
const SPRING_STIFFNESS: f32 = 18.0;
const ZOOM_MIN: f32 = 1.0;
const ZOOM_MAX: f32 = 1.9;
const TICK_DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone)]
pub struct TunnelState {
    pub progress: f32,
    zoom: Spring,
}

impl TunnelState {
    pub fn new() -> Self {
        Self {
            progress: 0.0,
            zoom: Spring::critically_damped(ZOOM_MIN, SPRING_STIFFNESS),
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom.position
    }
}

impl Default for TunnelState {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) fn draw(canvas: &mut Canvas, spectrum: &Spectrum, elapsed: f32, state: &mut TunnelState) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let cx = width * 0.5;
    let cy = height * 0.5;
    let max_radius = width.max(height) * 0.75;
    super::fade_trail(canvas, 0.35);

    if spectrum.bass_energy() > BASS_THRESHOLD {
        state.zoom.kick(RUSH_IMPULSE);
    }
    state.zoom.step(TICK_DT);
    state.zoom.clamp(ZOOM_MIN, ZOOM_MAX);

    let energy = spectrum.average_energy();
    state.progress = (state.progress + PROGRESS_RATE + energy * 0.01).fract();

    for ring in 0..RING_COUNT {
        let t = (state.progress + ring as f32 / RING_COUNT as f32).fract();
        // Cubic depth curve: rings linger in the distance, then sweep past.
        let depth = t * t * t;
        let radius = depth * max_radius * state.zoom.position;
        if radius < 1.0 {
            continue;
        }
        let rotation = elapsed * 0.3 + t * 1.2;
        let points: Vec<(f32, f32)> = (0..SIDES)
            .map(|side| {
                let angle = rotation + side as f32 / SIDES as f32 * TAU;
                let (sin, cos) = angle.sin_cos();
                (cx + cos * radius, cy + sin * radius)
            })
            .collect();
        let hue = safety::safe_hue(elapsed * 20.0 + t * 240.0);
        let color = Rgba::from_hsla(hue, 80.0, 50.0 + depth * 25.0, (0.2 + depth).min(1.0));
        canvas.stroke_polygon(&points, 1.0 + depth * 3.0, &Paint::Solid(color));
    }

    let core = Rgba::from_hsla(elapsed * 20.0, 60.0, 70.0, 1.0);
    canvas.glow_circle(cx, cy, 6.0 + energy * 16.0, core, 0.5);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bass_heavy(len: usize) -> Spectrum {
        let mut bins = vec![0u8; len];
        for bin in bins.iter_mut().take((len / 8).max(1)) {
            *bin = 255;
        }
        Spectrum::from_bins(bins)
    }

    #[test]
    fn zoom_stays_within_the_bounded_range() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = TunnelState::new();
        for tick in 0..300 {
            draw(&mut canvas, &bass_heavy(32), tick as f32 / 60.0, &mut state);
            assert!(
                (ZOOM_MIN..=ZOOM_MAX).contains(&state.zoom()),
                "zoom escaped bounds: {}",
                state.zoom()
            );
        }
    }

    #[test]
    fn bass_kick_raises_zoom_then_it_settles() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = TunnelState::new();
        draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        draw(&mut canvas, &bass_heavy(32), 0.02, &mut state);
        assert!(state.zoom() > ZOOM_MIN);
        for tick in 0..600 {
            draw(&mut canvas, &Spectrum::zeroed(32), tick as f32 / 60.0, &mut state);
        }
        assert!((state.zoom() - ZOOM_MIN).abs() < 0.02, "zoom should settle");
    }

    #[test]
    fn progress_cycles_in_unit_interval() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = TunnelState::new();
        for _ in 0..1000 {
            draw(&mut canvas, &Spectrum::from_bins(vec![255; 32]), 0.0, &mut state);
            assert!((0.0..1.0).contains(&state.progress));
        }
    }
}
