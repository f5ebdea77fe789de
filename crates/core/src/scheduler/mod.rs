//! Frame scheduling: one loop, two clocks.
//!
//! The live path paces itself against wall time at the display refresh rate;
//! the export path advances a virtual clock by a fixed interval per frame so
//! rendering stays frame-accurate however long each frame really takes. The
//! renderer code never knows which clock is driving it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::avatar::Avatar;
use crate::canvas::Canvas;
use crate::effects::{self, EffectStateStore, EffectVariant};
use crate::spectrum::SpectralSampler;

/// A source of frame timestamps. `None` means the clock is exhausted and the
/// loop should stop.
pub trait FrameClock {
    fn next_frame(&mut self) -> Option<f32>;
}

/// Wall-clock pacing at a fixed refresh interval. Sleeps out the remainder
/// of each interval; never exhausts on its own.
#[derive(Debug)]
pub struct DisplayClock {
    interval: Duration,
    start: Instant,
    next_deadline: Instant,
}

impl DisplayClock {
    pub fn new(fps: u32) -> Self {
        let interval = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        let now = Instant::now();
        Self {
            interval,
            start: now,
            next_deadline: now + interval,
        }
    }
}

impl FrameClock for DisplayClock {
    fn next_frame(&mut self) -> Option<f32> {
        let now = Instant::now();
        if now < self.next_deadline {
            thread::sleep(self.next_deadline - now);
        }
        self.next_deadline += self.interval;
        Some(self.start.elapsed().as_secs_f32())
    }
}

/// Fixed-increment clock for deterministic offline rendering.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    frame: u64,
    interval: f32,
    total_frames: Option<u64>,
}

impl VirtualClock {
    /// Unbounded virtual clock advancing `1/fps` seconds per frame.
    pub fn new(fps: u32) -> Self {
        Self {
            frame: 0,
            interval: 1.0 / fps.max(1) as f32,
            total_frames: None,
        }
    }

    /// Clock that exhausts after covering `duration_seconds`.
    pub fn bounded(fps: u32, duration_seconds: f32) -> Self {
        let interval = 1.0 / fps.max(1) as f32;
        let total = (duration_seconds.max(0.0) / interval).ceil() as u64;
        Self {
            frame: 0,
            interval,
            total_frames: Some(total),
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }
}

impl FrameClock for VirtualClock {
    fn next_frame(&mut self) -> Option<f32> {
        if let Some(total) = self.total_frames {
            if self.frame >= total {
                return None;
            }
        }
        let t = self.frame as f32 * self.interval;
        self.frame += 1;
        Some(t)
    }
}

/// Clonable stop request shared with whoever needs to tear the loop down.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Rearms the handle so the owning loop can be driven again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Drives the renderer registry: owns the surface, the tick counter and a
/// state store, and walks whichever clock it is given.
#[derive(Debug)]
pub struct FrameScheduler {
    canvas: Canvas,
    store: EffectStateStore,
    variant: EffectVariant,
    avatar: Option<Avatar>,
    tick: u64,
    stop: StopHandle,
}

impl FrameScheduler {
    pub fn new(variant: EffectVariant, width: u32, height: u32) -> Self {
        Self {
            canvas: Canvas::new(width, height),
            store: EffectStateStore::new(),
            variant,
            avatar: None,
            tick: 0,
            stop: StopHandle::default(),
        }
    }

    /// Scheduler with a caller-supplied store, used by the export pipeline
    /// to guarantee a fresh, independent state instance.
    pub fn with_store(
        variant: EffectVariant,
        width: u32,
        height: u32,
        store: EffectStateStore,
    ) -> Self {
        Self {
            canvas: Canvas::new(width, height),
            store,
            variant,
            avatar: None,
            tick: 0,
            stop: StopHandle::default(),
        }
    }

    pub fn set_avatar(&mut self, avatar: Option<Avatar>) {
        self.avatar = avatar;
    }

    /// Switches the active effect, discarding its previous state.
    pub fn set_variant(&mut self, variant: EffectVariant) {
        if variant != self.variant {
            self.store.reset(variant);
            self.variant = variant;
        }
    }

    pub fn variant(&self) -> EffectVariant {
        self.variant
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Sizes the surface to its container. Resizing discards the previous
    /// frame; geometry-dependent effect state reallocates on the next draw.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas.resize(width, height);
    }

    /// Handle that cancels the loop from outside; dropping the scheduler
    /// also ends it. Leaving the loop running against a torn-down surface
    /// is a leak, not a cosmetic issue.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs the tick loop: advance the clock, sample the spectrum, dispatch
    /// to the registry, hand the frame to `on_frame`. Stops when the clock
    /// exhausts, the stop handle fires, or `on_frame` returns `false`.
    pub fn run<C, F>(&mut self, clock: &mut C, sampler: &SpectralSampler, mut on_frame: F)
    where
        C: FrameClock,
        F: FnMut(&Canvas, u64, f32) -> bool,
    {
        while !self.stop.is_stopped() {
            let Some(elapsed) = clock.next_frame() else {
                break;
            };
            self.tick += 1;
            let spectrum = sampler.sample(elapsed);
            let state = self.store.state_for(self.variant);
            effects::render(
                self.variant,
                &mut self.canvas,
                &spectrum,
                elapsed,
                state,
                self.avatar.as_ref(),
            );
            if !on_frame(&self.canvas, self.tick, elapsed) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_counts_out_its_frames() {
        let mut clock = VirtualClock::bounded(60, 1.0);
        let mut frames = 0;
        let mut last = -1.0;
        while let Some(t) = clock.next_frame() {
            assert!(t > last);
            last = t;
            frames += 1;
        }
        assert_eq!(frames, 60);
    }

    #[test]
    fn virtual_clock_starts_at_zero_with_fixed_interval() {
        let mut clock = VirtualClock::new(60);
        assert_eq!(clock.next_frame(), Some(0.0));
        let second = clock.next_frame().unwrap();
        assert!((second - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn scheduler_renders_each_tick_and_stops_on_false() {
        let mut scheduler = FrameScheduler::new(EffectVariant::Bars, 64, 48);
        let sampler = SpectralSampler::detached(16);
        let mut clock = VirtualClock::new(60);
        let mut seen = 0u64;
        scheduler.run(&mut clock, &sampler, |_, tick, _| {
            seen = tick;
            tick < 5
        });
        assert_eq!(seen, 5);
        assert_eq!(scheduler.tick(), 5);
    }

    #[test]
    fn stop_handle_cancels_the_loop() {
        let mut scheduler = FrameScheduler::new(EffectVariant::Helix, 32, 32);
        let handle = scheduler.stop_handle();
        let sampler = SpectralSampler::detached(16);
        let mut clock = VirtualClock::new(60);
        scheduler.run(&mut clock, &sampler, |_, tick, _| {
            if tick >= 3 {
                handle.stop();
            }
            true
        });
        assert_eq!(scheduler.tick(), 3);
        // Once stopped, another run makes no further progress.
        scheduler.run(&mut clock, &sampler, |_, _, _| true);
        assert_eq!(scheduler.tick(), 3);
    }

    #[test]
    fn bounded_clock_ends_the_loop() {
        let mut scheduler = FrameScheduler::new(EffectVariant::Tunnel, 32, 32);
        let sampler = SpectralSampler::detached(16);
        let mut clock = VirtualClock::bounded(30, 0.5);
        scheduler.run(&mut clock, &sampler, |_, _, _| true);
        assert_eq!(scheduler.tick(), 15);
    }

    #[test]
    fn variant_switch_resets_that_variants_state() {
        let mut scheduler = FrameScheduler::new(EffectVariant::Bars, 64, 48);
        let sampler = SpectralSampler::detached(16);
        let mut clock = VirtualClock::new(60);
        scheduler.run(&mut clock, &sampler, |_, tick, _| tick < 3);
        scheduler.set_variant(EffectVariant::Tunnel);
        assert_eq!(scheduler.variant(), EffectVariant::Tunnel);
    }
}
