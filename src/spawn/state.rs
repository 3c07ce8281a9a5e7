/// Spawn Scheduler Data
///
/// Plain data driving spawn timing: the per-instance episode state, the
/// spawn mode variants, and the configuration a component compiles once and
/// hands to the scheduler.

use crate::error::{invalid_config, EngineResult};

/// Inclusive range of values a spawn parameter can evaluate to across all
/// of its modifiers. Used for emitter lifetime bounds and budget estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub start: f32,
    pub end: f32,
}

impl ValueRange {
    pub const ZERO: ValueRange = ValueRange {
        start: 0.0,
        end: 0.0,
    };

    pub const fn fixed(value: f32) -> Self {
        Self {
            start: value,
            end: value,
        }
    }
}

/// One spawn parameter: a base value the scheduler seeds evaluation buffers
/// with, the declared range its modifiers can reach, and an enabled flag.
/// Disabled duration and restart parameters read as infinite.
#[derive(Debug, Clone, Copy)]
pub struct SpawnParam {
    pub base: f32,
    pub range: ValueRange,
    pub enabled: bool,
}

impl SpawnParam {
    pub const fn fixed(value: f32) -> Self {
        Self {
            base: value,
            range: ValueRange::fixed(value),
            enabled: true,
        }
    }

    pub const fn varying(base: f32, start: f32, end: f32) -> Self {
        Self {
            base,
            range: ValueRange { start, end },
            enabled: true,
        }
    }

    pub const fn disabled(value: f32) -> Self {
        Self {
            base: value,
            range: ValueRange::fixed(value),
            enabled: false,
        }
    }
}

/// How a rate-mode amount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateMode {
    ParticlesPerSecond,
    SecondsPerParticle,
    ParticlesPerFrame,
}

/// How a distance-mode amount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMode {
    ParticlesPerMeter,
    MetersPerParticle,
}

/// Spawn amount interpretation, fixed at component compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// Amount is a total particle count, sustained over the episode
    /// duration, or an instant burst when the duration is zero.
    Count,
    /// Amount is a rate against elapsed time.
    Rate(RateMode),
    /// Amount is driven by the displacement of the emission anchor.
    Distance(DistanceMode),
    /// Count semantics over a spatial extent supplied by the component.
    Density,
}

/// Compiled spawn feature configuration.
#[derive(Debug, Clone, Copy)]
pub struct SpawnConfig {
    pub mode: SpawnMode,
    pub amount: SpawnParam,
    pub delay: SpawnParam,
    pub duration: SpawnParam,
    pub restart: SpawnParam,
}

impl SpawnConfig {
    /// Config with mode defaults: count-style modes default to an instant
    /// burst (zero duration), the others to an unbounded episode.
    pub fn new(mode: SpawnMode, amount: SpawnParam) -> Self {
        let duration = match mode {
            SpawnMode::Count | SpawnMode::Density => SpawnParam::fixed(0.0),
            _ => SpawnParam::disabled(f32::INFINITY),
        };
        Self {
            mode,
            amount,
            delay: SpawnParam::disabled(0.0),
            duration,
            restart: SpawnParam::disabled(f32::INFINITY),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.amount.base.is_nan() || self.amount.base < 0.0 {
            return Err(invalid_config("amount must be a non-negative number"));
        }
        if self.delay.base.is_nan() || self.delay.base < 0.0 {
            return Err(invalid_config("delay must be a non-negative number"));
        }
        if self.duration.base.is_nan() || self.duration.base < 0.0 {
            return Err(invalid_config("duration must be a non-negative number"));
        }
        if self.restart.base.is_nan() || self.restart.base <= 0.0 {
            return Err(invalid_config("restart interval must be positive"));
        }
        match self.mode {
            SpawnMode::Rate(RateMode::SecondsPerParticle)
            | SpawnMode::Distance(DistanceMode::MetersPerParticle)
                if self.amount.range.start <= 0.0 =>
            {
                Err(invalid_config(
                    "reciprocal amount modes need a positive amount range",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Per-frame simulation inputs supplied by the orchestration layer.
#[derive(Debug, Clone, Copy)]
pub struct FrameParams {
    pub delta_time: f32,
    /// Combined component and emitter particle-count scale.
    pub count_scale: f32,
    /// Upper bound on this component's particle lifetime.
    pub max_particle_life_time: f32,
    /// Emitter runs detached from its spawner (one-shot effect).
    pub is_independent: bool,
    /// This runtime is a sub-instance of a parent component.
    pub is_child: bool,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            delta_time: 0.0,
            count_scale: 1.0,
            max_particle_life_time: f32::INFINITY,
            is_independent: false,
            is_child: false,
        }
    }
}

/// Budget estimates a component accumulates from its features at compile
/// time; `SpawnScheduler::register` contributes the spawn share.
#[derive(Debug, Clone, Copy)]
pub struct ComponentParams {
    pub emitter_life_time: ValueRange,
    pub max_particle_life_time: f32,
    pub max_particle_spawn_rate: f32,
    pub max_particles_burst: u32,
}

impl Default for ComponentParams {
    fn default() -> Self {
        Self {
            emitter_life_time: ValueRange::ZERO,
            max_particle_life_time: 0.0,
            max_particle_spawn_rate: 0.0,
            max_particles_burst: 0,
        }
    }
}

/// Spawn timing state for one emitter sub-instance. Lives as long as the
/// instance; reinitialized on every episode restart.
#[derive(Debug, Clone, Copy)]
pub struct SpawnState {
    /// Target quantity for the current episode, before per-frame modifiers.
    pub amount: f32,
    /// Running fractional total emitted this episode; carries remainders
    /// across frames so non-integer rates average out correctly.
    pub spawned: f32,
    /// Episode length; infinite when the duration parameter is disabled.
    pub duration: f32,
    /// Time until the episode restarts; infinite when restart is disabled.
    pub restart: f32,
    /// Elapsed episode time; starts negative to represent a pending delay.
    pub timer: f32,
}

impl Default for SpawnState {
    fn default() -> Self {
        Self {
            amount: 0.0,
            spawned: 0.0,
            duration: f32::INFINITY,
            restart: f32::INFINITY,
            timer: 0.0,
        }
    }
}

impl SpawnState {
    /// Portion of this frame's delta that falls inside the episode's
    /// active window.
    #[inline]
    pub fn frame_slice(&self, dt: f32) -> f32 {
        let start_time = self.timer.max(0.0);
        let end_time = (self.timer + dt).min(self.duration);
        end_time - start_time
    }
}
