//! Particles orbiting outward along logarithmic spiral arms.

use std::f32::consts::TAU;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::canvas::{Canvas, Composite, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const ARMS: u32 = 3;
const TARGET_PARTICLES: usize = 220;
/// Angular twist of an arm from hub to rim, in turns.
const ARM_TWIST: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct SpiralState {
    particles: Vec<ArmParticle>,
    hue_drift: f32,
    rng: SmallRng,
}

#[derive(Debug, Clone, PartialEq)]
struct ArmParticle {
    arm: u32,
    /// Progress along the arm in [0, 1].
    t: f32,
    speed: f32,
    size: f32,
}

impl SpiralState {
    pub(super) fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            hue_drift: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }
}

pub(super) fn draw(
    canvas: &mut Canvas,
    spectrum: &Spectrum,
    elapsed: f32,
    state: &mut SpiralState,
) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let cx = width * 0.5;
    let cy = height * 0.5;
    let max_radius = width.min(height) * 0.48;
    super::fade_trail(canvas, 0.12);

    let energy = spectrum.average_energy();

    while state.particles.len() < TARGET_PARTICLES {
        let arm = state.rng.gen_range(0..ARMS);
        state.particles.push(ArmParticle {
            arm,
            t: 0.0,
            speed: 0.002 + state.rng.gen::<f32>() * 0.004,
            size: 1.0 + state.rng.gen::<f32>() * 2.2,
        });
    }

    state.hue_drift = safety::safe_hue(state.hue_drift + 0.3 + energy * 2.0);

    canvas.set_composite(Composite::Lighter);
    for particle in &mut state.particles {
        particle.t += particle.speed * (0.4 + energy * 2.5);
        let theta =
            particle.arm as f32 / ARMS as f32 * TAU + particle.t * ARM_TWIST * TAU + elapsed * 0.1;
        let radius = particle.t.powf(1.2) * max_radius;
        let (sin, cos) = theta.sin_cos();
        let hue = safety::safe_hue(state.hue_drift + particle.t * 120.0);
        let alpha = (1.0 - particle.t) * (0.5 + energy);
        let color = Rgba::from_hsla(hue, 80.0, 62.0, alpha);
        canvas.fill_circle(
            cx + cos * radius,
            cy + sin * radius,
            particle.size * (1.0 + energy),
            &Paint::Solid(color),
        );
    }
    canvas.set_composite(Composite::SourceOver);
    state.particles.retain(|p| p.t < 1.0);

    let core = Rgba::from_hsla(state.hue_drift, 70.0, 70.0, 1.0);
    canvas.glow_circle(cx, cy, 8.0 + energy * 20.0, core, 0.6 + energy * 0.4);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_refills_to_target_each_tick() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = SpiralState::new(3);
        draw(&mut canvas, &Spectrum::zeroed(16), 0.0, &mut state);
        assert_eq!(state.particle_count(), TARGET_PARTICLES);
    }

    #[test]
    fn particles_leave_at_the_rim() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = SpiralState::new(3);
        let loud = Spectrum::from_bins(vec![255; 16]);
        for tick in 0..400 {
            draw(&mut canvas, &loud, tick as f32 / 60.0, &mut state);
            assert!(state.particles.iter().all(|p| p.t < 1.0));
        }
    }
}
