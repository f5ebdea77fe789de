//! ECG-style pulse trace.
//!
//! The trace scrolls at a constant scan rate regardless of audio. A discrete
//! pulse machine triggers on bass energy and then walks a fixed, hand-drawn
//! P-QRS-T template, so the characteristic heartbeat shape appears whatever
//! the spectral content looks like.

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::canvas::{Canvas, Paint, Rgba};
use crate::safety;
use crate::spectrum::Spectrum;

/// Trace slots written per tick; this is the horizontal scan rate.
const SCAN_STEP: usize = 3;
const BASS_THRESHOLD: f32 = 0.55;
/// Minimum ticks between triggers.
const COOLDOWN_TICKS: u32 = 30;
/// Blank slots trailing the write cursor, mimicking a hardware monitor.
const CURSOR_GAP: usize = 10;

/// Successive baseline offsets: P wave, QRS complex, T wave.
const TEMPLATE: [f32; 24] = [
    0.0, 0.05, 0.12, 0.18, 0.12, 0.05, 0.0, 0.0, -0.14, 0.90, -0.32, -0.05, 0.0, 0.0, 0.05, 0.14,
    0.24, 0.30, 0.26, 0.16, 0.08, 0.03, 0.0, 0.0,
];

#[derive(Debug, Clone)]
pub struct PulseTraceState {
    trace: Vec<f32>,
    cursor: usize,
    ticks_since_trigger: u32,
    template_step: Option<usize>,
    amplitude: f32,
    rng: SmallRng,
}

impl PulseTraceState {
    pub(super) fn new(seed: u64) -> Self {
        Self {
            trace: Vec::new(),
            cursor: 0,
            ticks_since_trigger: COOLDOWN_TICKS,
            template_step: None,
            amplitude: 1.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn is_pulsing(&self) -> bool {
        self.template_step.is_some()
    }

    fn ensure_geometry(&mut self, len: usize) {
        if self.trace.len() != len {
            self.trace = vec![0.0; len];
            self.cursor = 0;
        }
    }
}

/// Draws the per-trigger amplitude from a tri-modal distribution: rarely
/// very high, rarely very low, usually mid-range.
fn tri_modal_amplitude(rng: &mut SmallRng) -> f32 {
    let roll: f32 = rng.gen();
    if roll < 0.10 {
        1.6 + rng.gen::<f32>() * 0.4
    } else if roll < 0.25 {
        0.35 + rng.gen::<f32>() * 0.25
    } else {
        0.8 + rng.gen::<f32>() * 0.4
    }
}

pub(super) fn draw(
    canvas: &mut Canvas,
    spectrum: &Spectrum,
    _elapsed: f32,
    state: &mut PulseTraceState,
) {
    let width = canvas.width() as f32;
    let height = canvas.height() as f32;
    let mid = height * 0.5;
    canvas.clear(Rgba::new(4, 10, 6, 1.0));

    let len = ((width / 3.0) as usize).max(32);
    state.ensure_geometry(len);

    state.ticks_since_trigger = state.ticks_since_trigger.saturating_add(1);
    if spectrum.bass_energy() > BASS_THRESHOLD && state.ticks_since_trigger >= COOLDOWN_TICKS {
        state.template_step = Some(0);
        state.amplitude = tri_modal_amplitude(&mut state.rng);
        state.ticks_since_trigger = 0;
    }

    for _ in 0..SCAN_STEP {
        let value = match state.template_step {
            Some(step) => {
                let v = TEMPLATE[step] * state.amplitude;
                state.template_step = if step + 1 < TEMPLATE.len() {
                    Some(step + 1)
                } else {
                    None
                };
                v
            }
            // Idle baseline wobble keyed to the write position, so the
            // quiet trace still looks alive.
            None => (state.cursor as f32 * 0.7).sin() * 0.012,
        };
        state.trace[state.cursor] = value;
        state.cursor = (state.cursor + 1) % len;
    }

    draw_grid(canvas, width, height);

    let swing = height * 0.35;
    let slot = width / len as f32;
    let line = Rgba::from_hsla(130.0, 90.0, 58.0, 0.95);
    let gap_end = (state.cursor + CURSOR_GAP).min(len);

    let mut segment: Vec<(f32, f32)> = Vec::with_capacity(len);
    let flush = |canvas: &mut Canvas, segment: &mut Vec<(f32, f32)>| {
        if segment.len() >= 2 {
            canvas.stroke_polyline(segment, 2.0, &Paint::Solid(line));
        }
        segment.clear();
    };
    for i in 0..len {
        if i >= state.cursor && i < gap_end {
            flush(canvas, &mut segment);
            continue;
        }
        let y = mid - safety::safe_number(state.trace[i], 0.0) * swing;
        segment.push((i as f32 * slot, y));
    }
    flush(canvas, &mut segment);

    let newest = (state.cursor + len - 1) % len;
    let y = mid - state.trace[newest] * swing;
    canvas.glow_circle(newest as f32 * slot, y, 4.0, line, 0.8);
}

fn draw_grid(canvas: &mut Canvas, width: f32, height: f32) {
    let grid = Rgba::from_hsla(130.0, 30.0, 22.0, 0.5);
    let paint = Paint::Solid(grid);
    let step = 28.0;
    let mut x = 0.0;
    while x < width {
        canvas.stroke_line(x, 0.0, x, height, 1.0, &paint);
        x += step;
    }
    let mut y = 0.0;
    while y < height {
        canvas.stroke_line(0.0, y, width, y, 1.0, &paint);
        y += step;
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
    fn bass_spike_triggers_a_pulse() {
        let mut canvas = Canvas::new(120, 80);
        let mut state = PulseTraceState::new(7);
        draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        assert!(state.is_pulsing());
        assert!(state.amplitude() > 0.0);
    }

    #[test]
    fn cooldown_blocks_immediate_retrigger() {
        let mut canvas = Canvas::new(120, 80);
        let mut state = PulseTraceState::new(7);
        draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        let first_amplitude = state.amplitude();
        // The template is 24 steps at 3 per tick, done after 8 ticks; the
        // cooldown keeps blocking beyond that.
        for _ in 0..(TEMPLATE.len() / SCAN_STEP) {
            draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        }
        assert!(!state.is_pulsing());
        assert_eq!(state.amplitude(), first_amplitude);
    }

    #[test]
    fn retrigger_allowed_after_cooldown() {
        let mut canvas = Canvas::new(120, 80);
        let mut state = PulseTraceState::new(7);
        draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        for _ in 0..COOLDOWN_TICKS {
            draw(&mut canvas, &Spectrum::zeroed(32), 0.0, &mut state);
        }
        draw(&mut canvas, &bass_heavy(32), 0.0, &mut state);
        assert!(state.is_pulsing());
    }

    #[test]
    fn amplitudes_fall_into_the_three_modes() {
        let mut rng = SmallRng::seed_from_u64(99);
        let mut saw_low = false;
        let mut saw_mid = false;
        let mut saw_high = false;
        for _ in 0..500 {
            let a = tri_modal_amplitude(&mut rng);
            assert!((0.35..=2.0).contains(&a));
            if a < 0.6 {
                saw_low = true;
            } else if a > 1.6 {
                saw_high = true;
            } else if (0.8..=1.2).contains(&a) {
                saw_mid = true;
            }
        }
        assert!(saw_low && saw_mid && saw_high);
    }

    #[test]
    fn scan_advances_at_constant_rate() {
        let mut canvas = Canvas::new(300, 80);
        let mut state = PulseTraceState::new(1);
        draw(&mut canvas, &Spectrum::zeroed(32), 0.0, &mut state);
        let cursor_before = state.cursor;
        draw(&mut canvas, &Spectrum::zeroed(32), 0.0, &mut state);
        assert_eq!(state.cursor, cursor_before + SCAN_STEP);
    }
}
