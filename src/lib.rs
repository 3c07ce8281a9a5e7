pub mod constants;
pub mod container;
pub mod error;
pub mod memory;
pub mod spawn;

pub use container::{ParticleAttr, ParticleId, ParticleStore, SpawnBatch};
pub use error::{EngineError, EngineResult};
pub use memory::FrameScratch;
pub use spawn::{
    ComponentParams, DistanceMode, FrameParams, RateMode, SpawnConfig, SpawnHost, SpawnMode,
    SpawnParam, SpawnScheduler, SpawnState,
};
