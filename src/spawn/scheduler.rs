/// Spawn Scheduler
///
/// Once per frame, converts each instance's amount curve into a whole
/// number of newborn particles with sub-frame birth times. Fractional
/// spawn amounts carry over between frames, so non-integer rates average
/// out exactly instead of truncating; each emitted batch carries the age
/// and life-fraction interpolation the store writes into the newborns.

use glam::Vec3;
use log::debug;

use crate::constants::particles::INVALID_ID;
use crate::container::{ParticleId, SpawnBatch};
use crate::error::EngineResult;
use crate::memory::FrameScratch;
use crate::spawn::state::{
    ComponentParams, DistanceMode, FrameParams, RateMode, SpawnConfig, SpawnMode, SpawnState,
};

/// Reciprocal with the degenerate case pinned to zero, so zero rates and
/// infinite durations produce zero spawn amounts instead of NaNs.
#[inline]
fn safe_rcp(value: f32) -> f32 {
    if value != 0.0 {
        1.0 / value
    } else {
        0.0
    }
}

/// Orchestration-layer seam: instance data and curve evaluation callbacks.
///
/// The `modify_init_*` hooks run when episodes start and receive one slot
/// per started instance, prefilled with the config base value. The update
/// hook runs every frame over all instances; its slice is padded to group
/// width with zeros so vectorized evaluators can process full groups.
pub trait SpawnHost {
    /// Parent particle id of an instance in the parent component's store.
    fn parent_id(&self, _instance: usize) -> ParticleId {
        INVALID_ID
    }

    /// Extra spawn delay the instance itself carries.
    fn start_delay(&self, _instance: usize) -> f32 {
        0.0
    }

    fn modify_init_amount(&self, _amounts: &mut [f32]) {}
    fn modify_init_delay(&self, _delays: &mut [f32]) {}
    fn modify_init_duration(&self, _durations: &mut [f32]) {}
    fn modify_init_restart(&self, _restarts: &mut [f32]) {}
    fn modify_update_amount(&self, _amounts: &mut [f32]) {}

    /// Current world-space emission anchor, sampled by distance mode.
    fn emit_position(&self, _instance: usize) -> Vec3 {
        Vec3::ZERO
    }

    /// Spatial extents (area, volume) that rescale density amounts.
    fn spatial_extents(&self, _amounts: &[f32], extents: &mut [f32]) {
        extents.fill(0.0);
    }
}

/// Per-component spawn feature runtime
pub struct SpawnScheduler {
    config: SpawnConfig,
    states: Vec<SpawnState>,
    /// Last sampled emission anchor per instance; only distance mode
    /// reads or refreshes these.
    anchors: Vec<Vec3>,
}

impl SpawnScheduler {
    pub fn new(config: SpawnConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            states: Vec::new(),
            anchors: Vec::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    #[inline]
    pub fn num_instances(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn states(&self) -> &[SpawnState] {
        &self.states
    }

    /// Contribute this feature's share of the component's budget estimates,
    /// fixed at compile time from the declared parameter ranges.
    pub fn register(&self, params: &mut ComponentParams) {
        params.emitter_life_time.start += self.config.delay.range.start;
        params.emitter_life_time.end += self.config.delay.range.end + self.config.duration.range.end;

        let amount = self.config.amount.range;
        match self.config.mode {
            SpawnMode::Count | SpawnMode::Density => {
                let spawn_time = params
                    .max_particle_life_time
                    .min(self.config.duration.range.start);
                if spawn_time > 0.0 {
                    params.max_particle_spawn_rate += amount.end / spawn_time;
                } else {
                    params.max_particles_burst += amount.end.ceil() as u32;
                }
            }
            SpawnMode::Rate(RateMode::ParticlesPerFrame) => {
                params.max_particles_burst += amount.end.ceil() as u32;
            }
            SpawnMode::Rate(RateMode::ParticlesPerSecond) => {
                params.max_particle_spawn_rate += amount.end;
            }
            SpawnMode::Rate(RateMode::SecondsPerParticle) => {
                params.max_particle_spawn_rate += safe_rcp(amount.start);
            }
            // Displacement-driven spawning has no static rate bound
            SpawnMode::Distance(_) => {}
        }
    }

    /// Create `count` fresh instances and run the start procedure on them.
    pub fn add_instances<H: SpawnHost>(
        &mut self,
        count: usize,
        host: &H,
        scratch: &mut FrameScratch,
    ) {
        let begin = self.states.len();
        self.states
            .resize_with(begin + count, SpawnState::default);
        self.anchors.resize(begin + count, Vec3::ZERO);
        self.start_instances(begin..begin + count, &[], host, scratch);
    }

    /// Drop one instance's spawn state. Instance indices shift the way the
    /// owning component's instance list does (swap with last).
    pub fn remove_instance(&mut self, instance: usize) {
        self.states.swap_remove(instance);
        self.anchors.swap_remove(instance);
    }

    /// (Re)initialize spawn state for a contiguous range and/or an explicit
    /// index list: evaluate delay/duration/restart/amount curves fresh and
    /// arm each instance's episode timers.
    pub fn start_instances<H: SpawnHost>(
        &mut self,
        range: std::ops::Range<usize>,
        indices: &[u32],
        host: &H,
        scratch: &mut FrameScratch,
    ) {
        let num_starts = range.len() + indices.len();
        if num_starts == 0 {
            return;
        }

        let mut amounts = scratch.take_floats(num_starts);
        let mut delays = scratch.take_floats(num_starts);
        let mut durations = scratch.take_floats(num_starts);
        let mut restarts = scratch.take_floats(num_starts);

        amounts[..num_starts].fill(self.config.amount.base);
        host.modify_init_amount(&mut amounts[..num_starts]);
        delays[..num_starts].fill(self.config.delay.base);
        if self.config.delay.enabled {
            host.modify_init_delay(&mut delays[..num_starts]);
        }
        if self.config.duration.enabled {
            durations[..num_starts].fill(self.config.duration.base);
            host.modify_init_duration(&mut durations[..num_starts]);
        }
        if self.config.restart.enabled {
            restarts[..num_starts].fill(self.config.restart.base);
            host.modify_init_restart(&mut restarts[..num_starts]);
        }

        for i in 0..num_starts {
            let instance = if i < range.len() {
                range.start + i
            } else {
                indices[i - range.len()] as usize
            };

            // Negative evaluated delays clamp to zero
            let delay = (delays[i] + host.start_delay(instance)).max(0.0);

            let state = &mut self.states[instance];
            state.timer = -delay;
            state.spawned = 0.0;
            state.amount = amounts[i];
            state.duration = if self.config.duration.enabled {
                durations[i]
            } else {
                f32::INFINITY
            };
            // Restart can never fire before the episode could finish
            state.restart = if self.config.restart.enabled {
                restarts[i].max(delay + state.duration)
            } else {
                f32::INFINITY
            };

            if matches!(self.config.mode, SpawnMode::Distance(_)) {
                self.anchors[instance] = host.emit_position(instance);
            }
        }

        scratch.give_floats(restarts);
        scratch.give_floats(durations);
        scratch.give_floats(delays);
        scratch.give_floats(amounts);
    }

    /// Run one frame of spawn timing over all instances, appending batch
    /// descriptors to `out`. Returns whether the owning runtime must be
    /// kept alive (an episode is still pending, running, or will restart).
    pub fn compute_frame_batches<H: SpawnHost>(
        &mut self,
        frame: &FrameParams,
        host: &H,
        scratch: &mut FrameScratch,
        out: &mut Vec<SpawnBatch>,
    ) -> bool {
        let num_instances = self.states.len();
        if num_instances == 0 {
            return false;
        }

        let mut alive = false;

        let is_independent = frame.is_independent && !frame.is_child;
        if is_independent {
            // An independent effect that could spawn forever would never
            // terminate on its own; suppress it
            let max_life_time = self.config.delay.range.end
                + self.config.duration.range.end
                + frame.max_particle_life_time;
            if !max_life_time.is_finite() {
                debug!("suppressing spawn for unbounded independent effect");
                return false;
            }
        } else if self.config.restart.enabled {
            let mut restarted = scratch.take_indices(num_instances);
            for (instance, state) in self.states.iter_mut().enumerate() {
                if state.restart.is_finite() {
                    alive = true;
                }
                state.restart -= frame.delta_time;
                if state.restart <= 0.0 {
                    restarted.push(instance as u32);
                }
            }
            if !restarted.is_empty() {
                debug!("restarting {} spawn instances", restarted.len());
                self.start_instances(0..0, &restarted, host, scratch);
            }
            scratch.give_indices(restarted);
        }

        let dt = frame.delta_time;
        let inv_dt = safe_rcp(dt);

        let mut amounts = scratch.take_floats(num_instances);
        for (slot, state) in amounts.iter_mut().zip(&self.states) {
            *slot = state.amount;
        }
        // Trailing padded slots stay zero for group-width curve evaluators
        host.modify_update_amount(&mut amounts);

        self.convert_amounts(frame, host, &mut amounts, scratch);

        for instance in 0..num_instances {
            let state = &mut self.states[instance];

            let start_time = state.timer.max(0.0);
            let end_time = (state.timer + dt).min(state.duration);
            let spawn_time = end_time - start_time;
            let spawned_amount = amounts[instance] * frame.count_scale;

            if state.timer <= state.duration {
                alive = true;
            }

            if spawn_time >= 0.0 && spawned_amount > 0.0 {
                let count =
                    ((state.spawned + spawned_amount).ceil() - state.spawned.ceil()) as u32;
                if count > 0 {
                    let age_increment = safe_rcp(spawned_amount) * spawn_time * inv_dt;
                    let mut batch = SpawnBatch {
                        count,
                        parent_id: host.parent_id(instance),
                        age_increment,
                        // Back-date to the start of the slice, then nudge by
                        // the fractional carry already accumulated
                        age_begin: (start_time - state.timer - dt) * inv_dt
                            + (state.spawned.ceil() - state.spawned) * age_increment,
                        ..SpawnBatch::default()
                    };

                    if state.duration.is_finite() {
                        batch.fraction_increment = safe_rcp(count as f32);
                        if state.duration > 0.0 {
                            let inv_duration = 1.0 / state.duration;
                            batch.fraction_begin = start_time * inv_duration;
                            let fraction_end = end_time * inv_duration;
                            batch.fraction_increment *= fraction_end - batch.fraction_begin;
                        }
                    }

                    out.push(batch);
                }
                state.spawned += spawned_amount;
            }

            state.timer += dt;
        }

        scratch.give_floats(amounts);
        alive
    }

    /// Mode-specific conversion from raw curve amounts to this-frame spawn
    /// amounts, selected once per component rather than per instance.
    fn convert_amounts<H: SpawnHost>(
        &mut self,
        frame: &FrameParams,
        host: &H,
        amounts: &mut [f32],
        scratch: &mut FrameScratch,
    ) {
        let num_instances = self.states.len();
        match self.config.mode {
            SpawnMode::Count => self.convert_count(frame, amounts),
            SpawnMode::Rate(RateMode::ParticlesPerFrame) => {}
            SpawnMode::Rate(mode) => {
                for (amount, state) in amounts.iter_mut().zip(&self.states) {
                    let slice = state.frame_slice(frame.delta_time);
                    *amount = slice
                        * match mode {
                            RateMode::ParticlesPerSecond => *amount,
                            _ => safe_rcp(*amount),
                        };
                }
            }
            SpawnMode::Distance(mode) => {
                for instance in 0..num_instances {
                    let position = host.emit_position(instance);
                    let travelled = (position - self.anchors[instance]).length();
                    self.anchors[instance] = position;
                    amounts[instance] = travelled
                        * match mode {
                            DistanceMode::ParticlesPerMeter => amounts[instance],
                            DistanceMode::MetersPerParticle => safe_rcp(amounts[instance]),
                        };
                }
            }
            SpawnMode::Density => {
                let mut extents = scratch.take_floats(num_instances);
                host.spatial_extents(&amounts[..num_instances], &mut extents[..num_instances]);
                amounts[..num_instances].copy_from_slice(&extents[..num_instances]);
                scratch.give_floats(extents);
                self.convert_count(frame, amounts);
            }
        }
    }

    fn convert_count(&mut self, frame: &FrameParams, amounts: &mut [f32]) {
        for (amount, state) in amounts.iter_mut().zip(&self.states) {
            let spawn_time = frame.max_particle_life_time.min(state.duration);
            if spawn_time > 0.0 {
                *amount *= state.frame_slice(frame.delta_time) * safe_rcp(spawn_time);
            } else {
                // Instant burst: whatever of the target is still unspawned
                *amount -= state.spawned;
            }
        }
    }
}
