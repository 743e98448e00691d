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

//! Decision diagrams for quantum states and operators.
//!
//! A state over `n` qubits is a weighted DAG with one level per qubit, where structurally
//! identical subtrees are stored once (hash-consing). Operators use the same structure with four
//! children per node, one for each block of the 2x2 split on that qubit.
//!
//! Nodes live in a [`Package`](package::Package) which owns the unique tables, the compute
//! caches and the reference counts. Handles ([`Edge`](edge::Edge)) are plain copyable values;
//! the caller decides which of them stay alive across a
//! [`garbage_collect`](package::Package::garbage_collect).
//!
//! ```
//! use qip_dd::prelude::*;
//!
//! let mut dd = Package::new(2);
//! let state = dd.make_zero_state(2);
//! dd.inc_ref(state);
//! let state = dd.apply_unitary_operation(&GateMatrix::h(), &[], 1, state);
//! let state = dd.apply_unitary_operation(&GateMatrix::x(), &[1], 0, state);
//!
//! // (|00> + |11>) / sqrt(2)
//! let amp = dd.amplitude(state, 0b11);
//! assert!((amp.re - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
//! assert_eq!(dd.amplitude(state, 0b01).norm(), 0.0);
//! ```

/// Approximation of states by dropping low-contribution nodes.
pub mod approximation;
/// Complex edge weights and their tolerance handling.
pub mod complex;
/// Handles into the node tables.
pub mod edge;
/// Single qubit gate matrices and their diagrams.
pub mod gates;
/// Sampling and deterministic walks over state diagrams.
pub mod measurement;
/// Node storage with hash-consing and reference counts.
pub mod node_table;
/// The package tying tables, caches and operations together.
pub mod package;

pub use num_complex::Complex64;

/// Commonly used types.
/// ```
/// use qip_dd::prelude::*;
/// ```
pub mod prelude {
    pub use super::edge::{Edge, MEdge, NodeId, Qubit, VEdge};
    pub use super::gates::GateMatrix;
    pub use super::package::{Package, PackageStats};
    pub use super::Complex64;
}
