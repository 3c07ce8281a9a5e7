/// Particle Container Subsystem
///
/// Structure-of-arrays storage for particle data: a dynamic column per
/// attribute, lockstep growth, a two-phase spawn-region protocol and
/// compaction-based bulk removal.

pub mod attribute;
pub mod remove;
pub mod store;

pub use attribute::{AttrInfo, AttrMask, ParticleAttr, ATTR_COUNT};
pub use store::{ParticleStore, SpawnBatch};

/// Index of a particle within its store's live or spawn range.
pub type ParticleId = u32;
