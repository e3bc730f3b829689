//! Errors returned by sketch constructors, merges and the simulation harness.

use thiserror::Error;

/// Sketch error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    /// A constructor received an argument outside its supported range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// Two sketches of different kinds or configurations were combined.
    #[error("incompatible sketches: {lhs} vs {rhs}")]
    IncompatibleSketches { lhs: String, rhs: String },
    /// The requested code path exists only as a stub.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),
}

/// Simulation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Sketch(#[from] SketchError),
}
