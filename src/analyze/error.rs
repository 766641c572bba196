use thiserror::Error;

/// Errors that can occur while setting up or running grain detection.
///
/// Per-atom anomalies (unsolvable orientation, overfull neighbor shell,
/// out-of-bounds position in a non-periodic box) are deliberately not
/// errors; they are sentinels and counters on the snapshot.
#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    /// The simulation box has a zero or negative extent.
    #[error("simulation box size must be positive in every dimension, got {0:?}")]
    InvalidBoxSize([f64; 3]),

    /// The lattice parameter is zero or negative.
    #[error("lattice parameter must be positive, got {0} Å")]
    InvalidLatticeParameter(f64),

    /// The growth angular threshold is outside `(0, π)`.
    #[error("angular threshold must lie in (0, π) radians, got {0}")]
    InvalidAngularThreshold(f64),
}
