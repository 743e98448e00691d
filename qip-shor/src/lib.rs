#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    missing_docs
)]

//! Emulation of Shor's factoring algorithm on decision diagrams.
//!
//! Instead of decomposing the modular exponentiation into gates, the controlled multipliers are
//! assembled directly as operator diagrams from constant adders and boundary projectors. The
//! exponent register is read out through a semiclassical inverse Fourier transform, optionally
//! approximating the state along the way, and the sampled phase is turned into factors by a
//! continued fraction expansion.
//!
//! Qubit `0` is the lowest level of the diagrams. The work register sits on levels
//! `0..required_bits`, the exponent register on the `2 * required_bits` levels above it.
//!
//! # Example
//! ```
//! use qip_shor::prelude::*;
//!
//! # fn main() -> ShorResult<()> {
//! let config = ShorConfig::new(15)
//!     .with_coprime(7)
//!     .with_seed(42)
//!     .with_approximation(ApproximationPolicy::fidelity_driven(0.9, 2));
//! let mut sim = ShorSimulator::new(config)?;
//! sim.simulate(1);
//!
//! println!("{}", sim.sim_result());
//! let stats = sim.additional_statistics();
//! assert_eq!(stats["composite_number"], "15");
//! assert!(sim.final_fidelity() <= 1.0);
//! # Ok(())
//! # }
//! ```

#[macro_use]
mod rayon_helper;

/// Operators of the modular exponentiation.
pub mod arithmetic;
/// Parameters of a factoring run.
pub mod config;
/// Setup error types.
pub mod errors;
/// Superposition, exponentiation rounds and the inverse Fourier transform.
pub mod phase_estimation;
/// From a sampled phase to factors.
pub mod post_processing;
/// The factoring run.
pub mod simulator;
/// Batches of independent runs.
pub mod trials;
/// Integer and angle helpers.
pub mod utils;

pub use qip_dd;

/// Commonly used types and functions.
/// ```
/// use qip_shor::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ApproximationPolicy, ApproximationStrategy, ShorConfig};
    pub use crate::errors::*;
    pub use crate::post_processing::{FactorOutcome, PostProcessor};
    pub use crate::simulator::ShorSimulator;
    pub use crate::trials::{run_trials, TrialRecord, TrialSummary};
}
