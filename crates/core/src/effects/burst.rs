//! Fireworks: energy-conditioned bursts of ballistic particles with a
//! decaying camera shake.

use std::f32::consts::TAU;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::canvas::{Canvas, Composite, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

use super::Particle;

/// Spawn probability stays zero below this average energy.
const ENERGY_FLOOR: f32 = 0.12;
const MAX_SPAWN_CHANCE: f32 = 0.55;
const GRAVITY: f32 = 0.06;
const DAMPING: f32 = 0.985;
/// Life lost per tick; removal happens exactly when life reaches zero.
const LIFE_DECAY: f32 = 0.016;
const SHAKE_DECAY: f32 = 0.88;
const SHAKE_LIMIT: f32 = 12.0;

#[derive(Debug, Clone)]
pub struct BurstState {
    particles: Vec<Particle>,
    shake: f32,
    rng: SmallRng,
}

impl BurstState {
    pub(super) fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            shake: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn shake(&self) -> f32 {
        self.shake
    }
}

pub(super) fn draw(canvas: &mut Canvas, spectrum: &Spectrum, elapsed: f32, state: &mut BurstState) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    super::fade_trail(canvas, 0.22);

    let energy = spectrum.average_energy();
    let spawn_chance = ((energy - ENERGY_FLOOR) * 1.8).clamp(0.0, MAX_SPAWN_CHANCE);
    if state.rng.gen::<f32>() < spawn_chance {
        spawn_burst(state, width, height, energy);
    }

    // Shake decays geometrically whether or not anything new fired.
    let shake_x = (elapsed * 37.0).sin() * state.shake;
    let shake_y = (elapsed * 29.0).cos() * state.shake;
    state.shake *= SHAKE_DECAY;

    canvas.set_composite(Composite::Lighter);
    for particle in &mut state.particles {
        if !particle.step(GRAVITY, DAMPING, LIFE_DECAY) {
            continue;
        }
        let fraction = particle.life_fraction();
        let alpha = fraction * fraction;
        let color = Rgba::from_hsla(particle.hue, 90.0, 60.0, alpha);
        canvas.fill_circle(
            particle.x + shake_x,
            particle.y + shake_y,
            particle.size * (0.5 + fraction * 0.5),
            &Paint::Solid(color),
        );
    }
    canvas.set_composite(Composite::SourceOver);
    state.particles.retain(|p| p.life > 0.0);
}

fn spawn_burst(state: &mut BurstState, width: f32, height: f32, energy: f32) {
    // The per-burst scale is itself drawn from an energy-conditioned
    // distribution; everything else derives from it.
    let scale = 0.5 + state.rng.gen::<f32>() * 0.7 + energy;
    let count = (26.0 + 60.0 * scale) as usize;
    let cx = state.rng.gen::<f32>() * width;
    let cy = height * (0.15 + state.rng.gen::<f32>() * 0.5);
    let base_hue = state.rng.gen::<f32>() * 360.0;

    for _ in 0..count {
        let angle = state.rng.gen::<f32>() * TAU;
        let speed = (1.5 + state.rng.gen::<f32>() * 3.5) * scale;
        let (sin, cos) = angle.sin_cos();
        state.particles.push(Particle {
            x: cx,
            y: cy,
            vx: cos * speed,
            vy: sin * speed,
            size: 1.5 + state.rng.gen::<f32>() * 2.5,
            hue: safety::safe_hue(base_hue + state.rng.gen::<f32>() * 40.0 - 20.0),
            life: 1.0,
            max_life: 1.0,
        });
    }

    state.shake = (state.shake + 2.5 * scale).min(SHAKE_LIMIT);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud(len: usize) -> Spectrum {
        Spectrum::from_bins(vec![255; len])
    }

    #[test]
    fn silence_never_spawns() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = BurstState::new(5);
        for tick in 0..200 {
            draw(&mut canvas, &Spectrum::zeroed(16), tick as f32 / 60.0, &mut state);
        }
        assert_eq!(state.particle_count(), 0);
        assert_eq!(state.shake(), 0.0);
    }

    #[test]
    fn loud_audio_spawns_bursts_and_shake() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = BurstState::new(5);
        for tick in 0..30 {
            draw(&mut canvas, &loud(16), tick as f32 / 60.0, &mut state);
        }
        assert!(state.particle_count() > 0);
    }

    #[test]
    fn particle_lives_decay_linearly_and_particles_die_on_time() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = BurstState::new(5);
        // Spawn once, then starve the effect.
        while state.particle_count() == 0 {
            draw(&mut canvas, &loud(16), 0.0, &mut state);
        }
        let mut previous: Vec<f32> = state.particles.iter().map(|p| p.life).collect();
        let expected_ticks = (1.0 / LIFE_DECAY).ceil() as usize + 1;
        for _ in 0..expected_ticks {
            draw(&mut canvas, &Spectrum::zeroed(16), 0.0, &mut state);
            for (particle, prev) in state.particles.iter().zip(previous.iter()) {
                assert!(
                    (prev - particle.life - LIFE_DECAY).abs() < 1e-6,
                    "life must fall by exactly the decay rate"
                );
            }
            assert!(state.particles.iter().all(|p| p.life > 0.0));
            previous = state.particles.iter().map(|p| p.life).collect();
        }
        assert_eq!(state.particle_count(), 0, "all particles should be gone");
    }

    #[test]
    fn shake_decays_geometrically() {
        let mut canvas = Canvas::new(64, 64);
        let mut state = BurstState::new(5);
        while state.shake() == 0.0 {
            draw(&mut canvas, &loud(16), 0.0, &mut state);
        }
        let before = state.shake();
        draw(&mut canvas, &Spectrum::zeroed(16), 0.0, &mut state);
        assert!(state.shake() <= before * SHAKE_DECAY + 1e-6);
    }
}
