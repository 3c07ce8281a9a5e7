//! Particle core error handling
//!
//! The simulation hot path never returns errors: degenerate inputs (zero
//! delta time, infinite durations) take well-defined zero-effect branches,
//! and internal invariants are debug assertions. The recoverable error
//! surface is configuration validation at scheduler construction time.

use thiserror::Error;

/// Errors produced by the particle core
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid spawn configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Type alias for particle core results
pub type EngineResult<T> = Result<T, EngineError>;

/// Create a configuration validation error
pub fn invalid_config(reason: impl std::fmt::Display) -> EngineError {
    EngineError::InvalidConfig {
        reason: reason.to_string(),
    }
}
