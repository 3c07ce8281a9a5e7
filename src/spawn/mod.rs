/// Spawn Scheduler Subsystem
///
/// Per-instance spawn timing: converts amount curves (count, rate,
/// distance, density) into integer particle counts with fractional
/// carry-over and sub-frame age interpolation.

pub mod scheduler;
pub mod state;

pub use scheduler::{SpawnHost, SpawnScheduler};
pub use state::{
    ComponentParams, DistanceMode, FrameParams, RateMode, SpawnConfig, SpawnMode, SpawnParam,
    SpawnState, ValueRange,
};
