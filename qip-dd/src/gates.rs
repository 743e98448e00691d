use crate::complex::approx_zero;
use crate::edge::{MEdge, Qubit, VEdge};
use crate::package::Package;
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

/// A single qubit gate, entries in row-major order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateMatrix(pub [Complex64; 4]);

impl GateMatrix {
    /// Make a gate from real entries.
    pub fn from_reals(m: [f64; 4]) -> Self {
        Self(m.map(|x| Complex64::new(x, 0.0)))
    }

    /// Pauli X.
    pub fn x() -> Self {
        Self::from_reals([0.0, 1.0, 1.0, 0.0])
    }

    /// Hadamard.
    pub fn h() -> Self {
        Self::from_reals([FRAC_1_SQRT_2, FRAC_1_SQRT_2, FRAC_1_SQRT_2, -FRAC_1_SQRT_2])
    }

    /// `diag(1, e^{i theta})`.
    pub fn phase(theta: f64) -> Self {
        Self::phase_from_parts(theta.cos(), theta.sin())
    }

    /// `diag(1, re + i im)`, for callers which computed the rotation themselves.
    pub fn phase_from_parts(re: f64, im: f64) -> Self {
        let zero = Complex64::new(0.0, 0.0);
        Self([Complex64::new(1.0, 0.0), zero, zero, Complex64::new(re, im)])
    }
}

impl Package {
    /// Build the operator applying `gate` to `target` when every qubit in `controls` is `|1>`.
    /// All other qubits are left alone.
    pub fn make_gate_dd(&mut self, gate: &GateMatrix, controls: &[Qubit], target: Qubit) -> MEdge {
        let mut em = gate.0.map(|w| {
            if approx_zero(w) {
                MEdge::zero()
            } else {
                MEdge::terminal(w)
            }
        });

        for z in (0..target).filter(|z| controls.contains(z)) {
            for row in 0..2 {
                for col in 0..2 {
                    let i = 2 * row + col;
                    let off = if row == col {
                        MEdge::one()
                    } else {
                        MEdge::zero()
                    };
                    em[i] = self.make_matrix_node(z, [off, MEdge::zero(), MEdge::zero(), em[i]]);
                }
            }
        }

        let mut e = self.make_matrix_node(target, em);
        let top = controls.iter().copied().max().unwrap_or(target);
        for z in (target + 1..=top).filter(|z| controls.contains(z)) {
            e = self.make_matrix_node(z, [MEdge::one(), MEdge::zero(), MEdge::zero(), e]);
        }
        e
    }

    /// Multiply `op` into `state`, taking a reference on the result and releasing `state`.
    pub fn apply_operation(&mut self, op: MEdge, state: VEdge) -> VEdge {
        let result = self.multiply_vector(op, state);
        self.inc_ref(result);
        self.dec_ref(state);
        self.garbage_collect(false);
        result
    }

    /// Build the gate and apply it with [`Package::apply_operation`].
    pub fn apply_unitary_operation(
        &mut self,
        gate: &GateMatrix,
        controls: &[Qubit],
        target: Qubit,
        state: VEdge,
    ) -> VEdge {
        let op = self.make_gate_dd(gate, controls, target);
        self.apply_operation(op, state)
    }
}
