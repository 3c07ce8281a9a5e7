/// Memory Subsystem
///
/// Frame-lifetime scratch buffers for the spawn pipeline.

pub mod frame_scratch;

pub use frame_scratch::FrameScratch;
