//! Glass shards blasted outward on bass hits, tumbling as they fade.

use std::f32::consts::TAU;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::canvas::{Canvas, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const BASS_THRESHOLD: f32 = 0.5;
const COOLDOWN_TICKS: u32 = 14;
const LIFE_DECAY: f32 = 0.014;
const GRAVITY: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct ShatterState {
    shards: Vec<Shard>,
    cooldown: u32,
    rng: SmallRng,
}

#[derive(Debug, Clone, PartialEq)]
struct Shard {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    rotation: f32,
    spin: f32,
    size: f32,
    hue: f32,
    life: f32,
}

impl ShatterState {
    pub(super) fn new(seed: u64) -> Self {
        Self {
            shards: Vec::new(),
            cooldown: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

pub(super) fn draw(
    canvas: &mut Canvas,
    spectrum: &Spectrum,
    elapsed: f32,
    state: &mut ShatterState,
) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let cx = width * 0.5;
    let cy = height * 0.5;
    super::fade_trail(canvas, 0.25);

    let bass = spectrum.bass_energy();
    state.cooldown = state.cooldown.saturating_sub(1);
    if bass > BASS_THRESHOLD && state.cooldown == 0 {
        spawn_shards(state, cx, cy, bass);
        state.cooldown = COOLDOWN_TICKS;
    }

    for shard in &mut state.shards {
        shard.vy += GRAVITY;
        shard.x += shard.vx;
        shard.y += shard.vy;
        shard.rotation += shard.spin;
        shard.life -= LIFE_DECAY;
        if shard.life <= 0.0 {
            continue;
        }

        let alpha = shard.life.clamp(0.0, 1.0);
        let fill = Rgba::from_hsla(shard.hue, 45.0, 68.0, alpha * 0.55);
        let edge = Rgba::from_hsla(shard.hue, 30.0, 88.0, alpha * 0.9);
        let points: [(f32, f32); 3] = [
            vertex(shard, shard.rotation, 1.0),
            vertex(shard, shard.rotation + 2.2, 0.7),
            vertex(shard, shard.rotation + 4.2, 0.9),
        ];
        canvas.fill_polygon(&points, &Paint::Solid(fill));
        canvas.stroke_polygon(&points, 1.0, &Paint::Solid(edge));
    }
    state.shards.retain(|s| s.life > 0.0);

    // The pane itself: a faint pulsing core where shards originate.
    let core = Rgba::from_hsla(205.0, 40.0, 80.0, 1.0);
    canvas.glow_circle(cx, cy, 10.0 + bass * 30.0, core, 0.3 + bass * 0.5);
    let _ = elapsed;
}

fn vertex(shard: &Shard, angle: f32, reach: f32) -> (f32, f32) {
    let (sin, cos) = angle.sin_cos();
    (
        shard.x + cos * shard.size * reach,
        shard.y + sin * shard.size * reach,
    )
}

fn spawn_shards(state: &mut ShatterState, cx: f32, cy: f32, bass: f32) {
    let count = (18.0 + bass * 30.0) as usize;
    for _ in 0..count {
        let angle = state.rng.gen::<f32>() * TAU;
        let speed = (2.0 + state.rng.gen::<f32>() * 6.0) * (0.5 + bass);
        let (sin, cos) = angle.sin_cos();
        state.shards.push(Shard {
            x: cx,
            y: cy,
            vx: cos * speed,
            vy: sin * speed,
            rotation: state.rng.gen::<f32>() * TAU,
            spin: (state.rng.gen::<f32>() - 0.5) * 0.3,
            size: 4.0 + state.rng.gen::<f32>() * 10.0,
            hue: safety::safe_hue(190.0 + state.rng.gen::<f32>() * 40.0),
            life: 1.0,
        });
    }
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
    fn bass_hit_spawns_shards_once_per_cooldown() {
        let mut canvas = Canvas::new(80, 80);
        let mut state = ShatterState::new(17);
        draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        let after_first = state.shard_count();
        assert!(after_first > 0);
        draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        assert_eq!(state.shard_count(), after_first, "cooldown should block");
    }

    #[test]
    fn shards_die_exactly_when_life_runs_out() {
        let mut canvas = Canvas::new(80, 80);
        let mut state = ShatterState::new(17);
        draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        let ticks = (1.0 / LIFE_DECAY).ceil() as usize + 1;
        for _ in 0..ticks {
            draw(&mut canvas, &Spectrum::zeroed(32), 0.0, &mut state);
        }
        assert_eq!(state.shard_count(), 0);
    }
}
