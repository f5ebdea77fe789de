//! Falling glyph columns with trailing fades, speed driven by band energy.

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::canvas::{Canvas, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

const CELL: f32 = 14.0;
const SPEED_SMOOTHING: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct RainState {
    columns: Vec<Column>,
    rng: SmallRng,
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    /// Head position in cell rows; fractional for smooth motion.
    head: f32,
    speed: f32,
    length: f32,
    seed_offset: f32,
}

impl RainState {
    pub(super) fn new(seed: u64) -> Self {
        Self {
            columns: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn ensure_geometry(&mut self, count: usize) {
        if self.columns.len() != count {
            let rng = &mut self.rng;
            self.columns = (0..count)
                .map(|_| Column {
                    head: -(rng.gen::<f32>() * 30.0),
                    speed: 0.2 + rng.gen::<f32>() * 0.3,
                    length: 6.0 + rng.gen::<f32>() * 12.0,
                    seed_offset: rng.gen::<f32>() * 100.0,
                })
                .collect();
        }
    }
}

pub(super) fn draw(canvas: &mut Canvas, spectrum: &Spectrum, _elapsed: f32, state: &mut RainState) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    super::fade_trail(canvas, 0.22);

    let count = ((width / CELL) as usize).max(1);
    state.ensure_geometry(count);
    let rows = height / CELL;

    let spectrum_len = spectrum.len().max(1);
    for (index, column) in state.columns.iter_mut().enumerate() {
        let bin = index * spectrum_len / count;
        let energy = spectrum.normalized(bin);
        let target_speed = 0.15 + energy * 1.3;
        column.speed += (target_speed - column.speed) * SPEED_SMOOTHING;
        column.head += column.speed;

        if column.head - column.length > rows {
            column.head = -(state.rng.gen::<f32>() * 20.0);
            column.length = 6.0 + state.rng.gen::<f32>() * 12.0;
        }

        let x = index as f32 * CELL + 1.0;
        let cells = column.length as usize;
        for k in 0..cells {
            let row = column.head - k as f32;
            let y = row * CELL;
            if y < -CELL || y > height {
                continue;
            }
            let fade = 1.0 - k as f32 / column.length;
            let (color, alpha) = if k == 0 {
                (Rgba::from_hsla(120.0, 30.0, 85.0, 1.0), 1.0)
            } else {
                let hue = safety::safe_hue(110.0 + energy * 70.0 + column.seed_offset);
                (Rgba::from_hsla(hue, 85.0, 45.0, 1.0), fade * 0.8)
            };
            // Cheap glyph: a cell with a varying inner notch.
            let notch = ((row + column.seed_offset) as i64).rem_euclid(3) as f32;
            canvas.fill_rect(
                x,
                y + notch,
                CELL - 2.0,
                CELL - 2.0 - notch,
                &Paint::Solid(color.with_alpha(alpha)),
            );
        }
    }
}
