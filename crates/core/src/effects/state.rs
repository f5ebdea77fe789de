//! Shared building blocks for effect state, plus the tagged union that keys
//! per-variant data.

use super::{
    aurora::AuroraState, bars::BarsState, burst::BurstState, dashboard::DashboardState,
    helix::HelixState, pulse::PulseTraceState, rain::RainState, ring::RingState,
    shatter::ShatterState, spiral::SpiralState, storm::StormState, tunnel::TunnelState,
    waveform::WaveformState, EffectVariant,
};

/// A ballistic particle with a linearly decreasing life.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub hue: f32,
    pub life: f32,
    pub max_life: f32,
}

impl Particle {
    /// Integrates one tick of motion and decays life. Returns `false` once
    /// the particle is dead and should be removed.
    pub fn step(&mut self, gravity: f32, damping: f32, life_decay: f32) -> bool {
        self.vy += gravity;
        self.vx *= damping;
        self.vy *= damping;
        self.x += self.vx;
        self.y += self.vy;
        self.life -= life_decay;
        self.life > 0.0
    }

    /// Remaining life as a `[0, 1]` fraction of the starting life.
    pub fn life_fraction(&self) -> f32 {
        if self.max_life > 0.0 {
            (self.life / self.max_life).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Critically damped spring used for camera-rush style motion.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    pub position: f32,
    pub velocity: f32,
    rest: f32,
    stiffness: f32,
    damping: f32,
}

impl Spring {
    /// Builds a spring whose damping is set to the critical value for the
    /// given stiffness, so it settles without oscillating.
    pub fn critically_damped(rest: f32, stiffness: f32) -> Self {
        Self {
            position: rest,
            velocity: 0.0,
            rest,
            stiffness,
            damping: 2.0 * stiffness.max(0.0).sqrt(),
        }
    }

    pub fn kick(&mut self, impulse: f32) {
        if impulse.is_finite() {
            self.velocity += impulse;
        }
    }

    pub fn step(&mut self, dt: f32) {
        let accel = -self.stiffness * (self.position - self.rest) - self.damping * self.velocity;
        self.velocity += accel * dt;
        self.position += self.velocity * dt;
    }

    /// Clamps the position into a bounded range, killing velocity pushing
    /// past the bound.
    pub fn clamp(&mut self, min: f32, max: f32) {
        if self.position < min {
            self.position = min;
            self.velocity = self.velocity.max(0.0);
        } else if self.position > max {
            self.position = max;
            self.velocity = self.velocity.min(0.0);
        }
    }
}

/// Per-variant mutable state. Exactly one arm exists per renderer; handing
/// the wrong arm to a renderer is a programming bug, not a runtime
/// condition.
#[derive(Debug, Clone)]
pub enum EffectState {
    Bars(BarsState),
    Waveform(WaveformState),
    Dashboard(DashboardState),
    PulseTrace(PulseTraceState),
    RingSpectrum(RingState),
    SpiralGalaxy(SpiralState),
    Helix(HelixState),
    GlyphRain(RainState),
    Burst(BurstState),
    Aurora(AuroraState),
    Tunnel(TunnelState),
    Storm(StormState),
    Shatter(ShatterState),
}

impl EffectState {
    /// Constructs the default state bundle for a variant. `seed` feeds the
    /// variant's random stream where one exists, so equal seeds replay
    /// identical trajectories.
    pub fn new_for(variant: EffectVariant, seed: u64) -> Self {
        match variant {
            EffectVariant::Bars => Self::Bars(BarsState::new()),
            EffectVariant::Waveform => Self::Waveform(WaveformState::new()),
            EffectVariant::Dashboard => Self::Dashboard(DashboardState::new()),
            EffectVariant::PulseTrace => Self::PulseTrace(PulseTraceState::new(seed)),
            EffectVariant::RingSpectrum => Self::RingSpectrum(RingState::new()),
            EffectVariant::SpiralGalaxy => Self::SpiralGalaxy(SpiralState::new(seed)),
            EffectVariant::Helix => Self::Helix(HelixState::new()),
            EffectVariant::GlyphRain => Self::GlyphRain(RainState::new(seed)),
            EffectVariant::Burst => Self::Burst(BurstState::new(seed)),
            EffectVariant::Aurora => Self::Aurora(AuroraState::new()),
            EffectVariant::Tunnel => Self::Tunnel(TunnelState::new()),
            EffectVariant::Storm => Self::Storm(StormState::new(seed)),
            EffectVariant::Shatter => Self::Shatter(ShatterState::new(seed)),
        }
    }

    /// The variant this state bundle belongs to.
    pub fn variant(&self) -> EffectVariant {
        match self {
            Self::Bars(_) => EffectVariant::Bars,
            Self::Waveform(_) => EffectVariant::Waveform,
            Self::Dashboard(_) => EffectVariant::Dashboard,
            Self::PulseTrace(_) => EffectVariant::PulseTrace,
            Self::RingSpectrum(_) => EffectVariant::RingSpectrum,
            Self::SpiralGalaxy(_) => EffectVariant::SpiralGalaxy,
            Self::Helix(_) => EffectVariant::Helix,
            Self::GlyphRain(_) => EffectVariant::GlyphRain,
            Self::Burst(_) => EffectVariant::Burst,
            Self::Aurora(_) => EffectVariant::Aurora,
            Self::Tunnel(_) => EffectVariant::Tunnel,
            Self::Storm(_) => EffectVariant::Storm,
            Self::Shatter(_) => EffectVariant::Shatter,
        }
    }
}
