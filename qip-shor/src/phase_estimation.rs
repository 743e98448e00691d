use crate::arithmetic::ModularArithmetic;
use crate::config::{ApproximationPolicy, ApproximationStrategy};
use crate::utils::{cosine, sine};
use qip_dd::prelude::*;
use tracing::debug;

/// Placement of the registers: the work register on levels `0..required_bits`, the exponent
/// register above it with exponent bit `k` on level `required_bits + k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterLayout {
    /// Width of the work register.
    pub required_bits: usize,
}

impl RegisterLayout {
    /// Width of the exponent register.
    pub fn exponent_bits(&self) -> usize {
        2 * self.required_bits
    }

    /// Total number of qubits.
    pub fn n_qubits(&self) -> usize {
        3 * self.required_bits
    }

    /// Level of exponent bit `k`.
    pub fn exponent_level(&self, k: usize) -> Qubit {
        (self.required_bits + k) as Qubit
    }

    /// Number of processed exponent qubits between two fidelity driven approximations.
    pub fn approximation_cadence(&self) -> usize {
        // log_0.9(0.5) is about 6
        (self.exponent_bits() + 5) / 6
    }
}

/// Running totals of the approximations applied to a state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ApproximationStats {
    /// Product of the fidelities of every approximation so far.
    pub fidelity: f64,
    /// Number of approximations applied.
    pub runs: usize,
}

impl Default for ApproximationStats {
    fn default() -> Self {
        Self {
            fidelity: 1.0,
            runs: 0,
        }
    }
}

/// The quantum part of the order finding: superposition, controlled modular multiplications and
/// the semiclassical inverse Fourier transform, all applied to a single live state.
///
/// Every replacement of the state references the new diagram before releasing the old one.
#[derive(Debug)]
pub struct PhaseEstimation<'a> {
    dd: &'a mut Package,
    layout: RegisterLayout,
    verbose: bool,
}

impl<'a> PhaseEstimation<'a> {
    /// Work on states of `dd` laid out as in `layout`.
    pub fn new(dd: &'a mut Package, layout: RegisterLayout, verbose: bool) -> Self {
        Self {
            dd,
            layout,
            verbose,
        }
    }

    fn h(&mut self, level: Qubit, state: &mut VEdge) {
        *state = self
            .dd
            .apply_unitary_operation(&GateMatrix::h(), &[], level, *state);
    }

    /// Hadamard on every exponent qubit.
    pub fn prepare_superposition(&mut self, state: &mut VEdge) {
        for k in (0..self.layout.exponent_bits()).rev() {
            self.h(self.layout.exponent_level(k), state);
        }
    }

    /// Multiply the work register by `multiplier` mod `modulus` wherever exponent bit `control`
    /// is set.
    pub fn exponentiation_round(
        &mut self,
        state: &mut VEdge,
        modulus: u64,
        multiplier: u64,
        control: usize,
    ) {
        let mut arith = ModularArithmetic::new(self.dd, modulus, self.layout.required_bits);
        let op = arith.modular_multiplier(multiplier);
        let op = arith.controlled(op, control, self.layout.exponent_bits());

        let next = self.dd.multiply_vector(op, *state);
        self.dd.inc_ref(next);
        self.dd.dec_ref(*state);
        *state = next;
        self.dd.garbage_collect(false);
    }

    /// Inverse Fourier transform of the exponent register without the final swaps, processing
    /// the most significant exponent qubit first. Afterwards exponent qubit `k` holds bit
    /// `exponent_bits - 1 - k` of the phase estimate.
    pub fn inverse_fourier_transform(
        &mut self,
        state: &mut VEdge,
        policy: &ApproximationPolicy,
        stats: &mut ApproximationStats,
    ) {
        let bits = self.layout.exponent_bits();
        let cadence = self.layout.approximation_cadence();
        let mut memory_threshold = policy.memory_threshold;

        for stage in 0..bits {
            let k = bits - 1 - stage;
            let target = self.layout.exponent_level(k);
            if self.verbose {
                debug!(
                    stage = stage + 1,
                    of = bits,
                    size = self.dd.size(*state),
                    "inverse Fourier transform stage"
                );
            }

            let mut q = 2.0;
            for j in k + 1..bits {
                let gate = GateMatrix::phase_from_parts(cosine(1.0, -q), sine(1.0, -q));
                let control = self.layout.exponent_level(j);
                *state = self
                    .dd
                    .apply_unitary_operation(&gate, &[control], target, *state);
                q *= 2.0;
            }

            if policy.is_enabled() && stats.runs < policy.step_count {
                let due = match policy.strategy {
                    ApproximationStrategy::FidelityDriven => (stage + 1) % cadence == 0,
                    ApproximationStrategy::MemoryDriven => {
                        let due = self.dd.size(*state) > memory_threshold;
                        if due {
                            memory_threshold *= 2;
                        }
                        due
                    }
                };
                if due {
                    let approx = self
                        .dd
                        .approximate_by_fidelity(*state, policy.step_fidelity, false);
                    *state = approx.state;
                    stats.fidelity *= approx.fidelity;
                    stats.runs += 1;
                }
            }

            self.h(target, state);
        }
    }
}

#[cfg(test)]
mod phase_estimation_tests {
    use super::*;

    #[test]
    fn test_cadence() {
        let cadence = |bits| RegisterLayout { required_bits: bits }.approximation_cadence();
        assert_eq!(cadence(1), 1);
        assert_eq!(cadence(3), 1);
        assert_eq!(cadence(4), 2);
        assert_eq!(cadence(9), 3);
        assert_eq!(cadence(10), 4);
    }

    #[test]
    fn test_superposition_is_uniform() {
        let layout = RegisterLayout { required_bits: 2 };
        let mut dd = Package::new(layout.n_qubits());
        let mut state = dd.make_zero_state(layout.n_qubits());
        dd.inc_ref(state);
        PhaseEstimation::new(&mut dd, layout, false).prepare_superposition(&mut state);
        for x in 0..16u64 {
            let amp = dd.amplitude(state, x << 2);
            assert!((amp.re - 0.25).abs() < 1e-10);
        }
        assert_eq!(dd.amplitude(state, 1).norm(), 0.0);
    }

    #[test]
    fn test_inverse_transform_recovers_phase() {
        // Prepare the Fourier state of y over the exponent register, the inverse transform has to
        // produce y with its bits reversed.
        let layout = RegisterLayout { required_bits: 1 };
        let bits = layout.exponent_bits();
        for y in 0..(1u64 << bits) {
            let mut dd = Package::new(layout.n_qubits());
            let mut state = dd.make_zero_state(layout.n_qubits());
            dd.inc_ref(state);
            let mut pe = PhaseEstimation::new(&mut dd, layout, false);
            pe.prepare_superposition(&mut state);
            for k in 0..bits {
                // Exponent bit k carries weight 2^k.
                let theta = 2.0 * std::f64::consts::PI * (y << k) as f64 / (1u64 << bits) as f64;
                let level = layout.exponent_level(k);
                state = pe
                    .dd
                    .apply_unitary_operation(&GateMatrix::phase(theta), &[], level, state);
            }
            let mut stats = ApproximationStats::default();
            pe.inverse_fourier_transform(&mut state, &ApproximationPolicy::exact(), &mut stats);

            let reversed = (0..bits).fold(0u64, |acc, k| acc | (((y >> k) & 1) << (bits - 1 - k)));
            let amp = dd.amplitude(state, reversed << layout.required_bits);
            assert!((amp.norm() - 1.0).abs() < 1e-9, "y = {}", y);
            assert_eq!(stats.runs, 0);
        }
    }
}
