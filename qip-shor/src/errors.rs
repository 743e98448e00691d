use thiserror::Error;

/// An error from setting up a simulation.
///
/// Failing to find factors is not an error, see
/// [`FactorOutcome`](crate::post_processing::FactorOutcome).
#[derive(Debug, Error, PartialEq)]
pub enum ShorError {
    /// The number to factor is too small for the algorithm to make sense.
    #[error("composite number must be at least 3, got {0}")]
    CompositeTooSmall(u64),
    /// The work register cannot hold every residue.
    #[error("{required_bits} bits cannot hold residues modulo {composite}")]
    RegisterTooNarrow {
        /// Number to factor.
        composite: u64,
        /// Requested register width.
        required_bits: usize,
    },
    /// The phase estimate would not fit into a machine word.
    #[error("{required_bits} bits requested, at most {max} are supported")]
    RegisterTooWide {
        /// Requested register width.
        required_bits: usize,
        /// Largest supported width.
        max: usize,
    },
    /// Approximation was configured with a fidelity outside of `(0, 1]`.
    #[error("step fidelity must lie in (0, 1], got {0}")]
    InvalidFidelity(f64),
    /// A generic error.
    #[error("{0}")]
    Generic(String),
}

impl ShorError {
    /// Construct a new generic error.
    pub fn new<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Generic(msg.into())
    }
}

/// A result which may contain a simulation setup error.
pub type ShorResult<T> = Result<T, ShorError>;
