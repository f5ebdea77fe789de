//! Lightning bolts on treble spikes, with wind-blown rain underneath.

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::canvas::{Canvas, Paint, Rgba};
use crate::spectrum::Spectrum;

use super::Particle;

const TREBLE_THRESHOLD: f32 = 0.4;
const BOLT_COOLDOWN_TICKS: u32 = 10;
const BOLT_LIFE_DECAY: f32 = 0.07;
const BOLT_SEGMENTS: usize = 12;
const RAIN_GRAVITY: f32 = 0.04;
const RAIN_DAMPING: f32 = 1.0;
const RAIN_LIFE_DECAY: f32 = 0.006;

#[derive(Debug, Clone)]
pub struct StormState {
    bolts: Vec<Bolt>,
    drops: Vec<Particle>,
    flash: f32,
    cooldown: u32,
    rng: SmallRng,
}

#[derive(Debug, Clone, PartialEq)]
struct Bolt {
    points: Vec<(f32, f32)>,
    life: f32,
}

impl StormState {
    pub(super) fn new(seed: u64) -> Self {
        Self {
            bolts: Vec::new(),
            drops: Vec::new(),
            flash: 0.0,
            cooldown: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn bolt_count(&self) -> usize {
        self.bolts.len()
    }

    pub fn drop_count(&self) -> usize {
        self.drops.len()
    }
}

pub(super) fn draw(canvas: &mut Canvas, spectrum: &Spectrum, _elapsed: f32, state: &mut StormState) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    super::fade_trail(canvas, 0.3);

    let treble = spectrum.treble_energy();
    let energy = spectrum.average_energy();

    state.cooldown = state.cooldown.saturating_sub(1);
    if treble > TREBLE_THRESHOLD && state.cooldown == 0 {
        state.bolts.push(spawn_bolt(&mut state.rng, width, height));
        state.flash = 0.5;
        state.cooldown = BOLT_COOLDOWN_TICKS;
    }

    // Rain density scales with overall energy.
    let drop_count = (energy * 12.0) as usize;
    for _ in 0..drop_count {
        state.drops.push(Particle {
            x: state.rng.gen::<f32>() * width,
            y: -10.0,
            vx: -1.5 - energy * 2.0,
            vy: 6.0 + state.rng.gen::<f32>() * 4.0 + energy * 4.0,
            size: 1.0,
            hue: 210.0,
            life: 1.0,
            max_life: 1.0,
        });
    }

    if state.flash > 0.005 {
        let wash = Rgba::new(220, 228, 255, 1.0).with_alpha(state.flash * 0.4);
        canvas.fill_rect(0.0, 0.0, width, height, &Paint::Solid(wash));
    }
    state.flash *= 0.85;

    let rain_color = Rgba::from_hsla(210.0, 60.0, 65.0, 0.5);
    for drop in &mut state.drops {
        if !drop.step(RAIN_GRAVITY, RAIN_DAMPING, RAIN_LIFE_DECAY) {
            continue;
        }
        canvas.stroke_line(
            drop.x,
            drop.y,
            drop.x - drop.vx,
            drop.y - drop.vy,
            1.0,
            &Paint::Solid(rain_color),
        );
    }
    let floor = height;
    state.drops.retain(|d| d.life > 0.0 && d.y < floor);

    for bolt in &mut state.bolts {
        let alpha = bolt.life.clamp(0.0, 1.0);
        let core = Rgba::new(240, 244, 255, alpha);
        let halo = Rgba::from_hsla(225.0, 80.0, 70.0, alpha * 0.4);
        canvas.stroke_polyline(&bolt.points, 5.0, &Paint::Solid(halo));
        canvas.stroke_polyline(&bolt.points, 2.0, &Paint::Solid(core));
        if let Some(&(tx, ty)) = bolt.points.last() {
            canvas.glow_circle(tx, ty, 6.0, core, alpha);
        }
        bolt.life -= BOLT_LIFE_DECAY;
    }
    state.bolts.retain(|b| b.life > 0.0);
}

/// Midpoint-jittered walk from the sky to a random strike point.
fn spawn_bolt(rng: &mut SmallRng, width: f32, height: f32) -> Bolt {
    let mut x = rng.gen::<f32>() * width;
    let mut points = Vec::with_capacity(BOLT_SEGMENTS + 1);
    points.push((x, 0.0));
    let step = height * 0.9 / BOLT_SEGMENTS as f32;
    for segment in 1..=BOLT_SEGMENTS {
        x += (rng.gen::<f32>() - 0.5) * width * 0.09;
        // Fork bias: the lower half wanders harder.
        if segment > BOLT_SEGMENTS / 2 {
            x += (rng.gen::<f32>() - 0.5) * width * 0.05;
        }
        points.push((x, segment as f32 * step));
    }
    Bolt { points, life: 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn treble_heavy(len: usize) -> Spectrum {
        let mut bins = vec![0u8; len];
        for bin in bins.iter_mut().skip(len / 2) {
            *bin = 255;
        }
        Spectrum::from_bins(bins)
    }

    #[test]
    fn treble_spike_spawns_a_bolt_with_cooldown() {
        let mut canvas = Canvas::new(100, 80);
        let mut state = StormState::new(21);
        draw(&mut canvas, &treble_heavy(32), 0.0, &mut state);
        assert_eq!(state.bolt_count(), 1);
        // The very next tick is inside the cooldown window.
        draw(&mut canvas, &treble_heavy(32), 0.0, &mut state);
        assert_eq!(state.bolt_count(), 1);
    }

    #[test]
    fn bolts_fade_out_completely() {
        let mut canvas = Canvas::new(100, 80);
        let mut state = StormState::new(21);
        draw(&mut canvas, &treble_heavy(32), 0.0, &mut state);
        for _ in 0..20 {
            draw(&mut canvas, &Spectrum::zeroed(32), 0.0, &mut state);
        }
        assert_eq!(state.bolt_count(), 0);
    }

    #[test]
    fn rain_falls_and_leaves_the_screen() {
        let mut canvas = Canvas::new(100, 80);
        let mut state = StormState::new(21);
        let loud = Spectrum::from_bins(vec![200; 32]);
        for _ in 0..10 {
            draw(&mut canvas, &loud, 0.0, &mut state);
        }
        assert!(state.drop_count() > 0);
        for _ in 0..300 {
            draw(&mut canvas, &Spectrum::zeroed(32), 0.0, &mut state);
        }
        assert_eq!(state.drop_count(), 0);
    }
}
