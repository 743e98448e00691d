//! Modular arithmetic built directly as operator diagrams.
//!
//! Instead of decomposing the adders into gates, every operator here is assembled node by node.
//! The work register occupies levels `0..required_bits`, the adders use one extra level on top
//! for the overflow bit.

use qip_dd::prelude::*;

/// Builder for the operators of the modular exponentiation, modulo a fixed `modulus`.
///
/// Returned operators are not referenced, they stay valid until the next garbage collection of
/// the package.
#[derive(Debug)]
pub struct ModularArithmetic<'a> {
    dd: &'a mut Package,
    modulus: u64,
    required_bits: usize,
}

impl<'a> ModularArithmetic<'a> {
    /// Make a builder working modulo `modulus` on a register of `required_bits` qubits.
    pub fn new(dd: &'a mut Package, modulus: u64, required_bits: usize) -> Self {
        debug_assert!(modulus < 1 << required_bits);
        Self {
            dd,
            modulus,
            required_bits,
        }
    }

    /// The modulus.
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Projector onto the register values `x <= limit`, over `required_bits + 1` qubits.
    pub fn limit_to(&mut self, limit: u64) -> MEdge {
        let zero = MEdge::zero();
        let one = MEdge::one();
        let lowest = if limit & 1 == 1 {
            [one, zero, zero, one]
        } else {
            [one, zero, zero, zero]
        };
        let mut f = self.dd.make_matrix_node(0, lowest);

        for p in 1..=self.required_bits {
            let children = if (limit >> p) & 1 == 1 {
                // Below the limit as soon as this bit is clear, anything goes underneath.
                [self.dd.make_ident(), zero, zero, f]
            } else {
                [f, zero, zero, zero]
            };
            f = self.dd.make_matrix_node(p as Qubit, children);
        }
        f
    }

    /// Permutation `x -> x + a mod 2^(required_bits + 1)`.
    ///
    /// Two partial adders are grown level by level: `left` covers the inputs which produce no
    /// carry into the next level, `right` the inputs which do.
    pub fn add_const(&mut self, a: u64) -> MEdge {
        let zero = MEdge::zero();
        if a == 0 {
            return self.dd.make_ident();
        }
        debug_assert!(a < 1 << self.required_bits);

        let mut f = MEdge::one();
        let mut p = 0;
        while (a >> p) & 1 == 0 {
            f = self.dd.make_matrix_node(p as Qubit, [f, zero, zero, f]);
            p += 1;
        }

        let mut left = self.dd.make_matrix_node(p as Qubit, [zero, zero, f, zero]);
        let mut right = self.dd.make_matrix_node(p as Qubit, [zero, f, zero, zero]);
        p += 1;

        while p < self.required_bits {
            let level = p as Qubit;
            let (new_left, new_right) = if (a >> p) & 1 == 1 {
                (
                    self.dd.make_matrix_node(level, [zero, zero, left, zero]),
                    self.dd.make_matrix_node(level, [right, left, zero, right]),
                )
            } else {
                (
                    self.dd.make_matrix_node(level, [left, zero, right, left]),
                    self.dd.make_matrix_node(level, [zero, right, zero, zero]),
                )
            };
            left = new_left;
            right = new_right;
            p += 1;
        }

        self.dd.make_matrix_node(p as Qubit, [left, right, right, left])
    }

    /// Permutation `x -> x + a mod N` on the residues `x < N`, over `required_bits` qubits.
    ///
    /// Values which would wrap past the modulus are routed through `add_const(a)` followed by
    /// the inverse of `add_const(N)`, the others through `add_const(a)` alone.
    pub fn add_const_mod(&mut self, a: u64) -> MEdge {
        let n = self.modulus;
        debug_assert!(a < n);
        let add_a = self.add_const(a);
        let add_n = self.add_const(n);
        let below_n = self.limit_to(n - 1);
        let no_wrap = self.limit_to(n - 1 - a);

        let wrapping = self.dd.add(below_n, no_wrap.negated());

        let sub_n = self.dd.conjugate_transpose(add_n);
        let add_then_sub = self.dd.multiply(sub_n, add_a);
        let plain = self.dd.multiply(add_a, no_wrap);
        let wrapped = self.dd.multiply(add_then_sub, wrapping);
        let result = self.dd.add(plain, wrapped);

        // The overflow qubit starts and ends in |0>, keep only that block.
        self.zero_block(result, self.required_bits as Qubit)
    }

    fn zero_block(&self, e: MEdge, level: Qubit) -> MEdge {
        if e.is_zero() || self.dd.level(e) != level {
            return e;
        }
        self.dd.matrix_node(e.node).children[0].scaled(e.weight)
    }

    /// Projector onto the register values whose bit `bit` is set.
    fn bit_projector(&mut self, bit: usize) -> MEdge {
        let zero = MEdge::zero();
        let mut active = MEdge::one();
        for p in 0..self.required_bits {
            let children = if p == bit {
                [zero, zero, zero, active]
            } else {
                [active, zero, zero, active]
            };
            active = self.dd.make_matrix_node(p as Qubit, children);
        }
        active
    }

    /// Map `x -> a x mod N` on the residues `x < N`, built by double-and-add: for every bit `i`
    /// of `x` the accumulator is advanced by `a 2^i mod N` on the inputs with that bit set.
    ///
    /// The accumulator is referenced while it is rebuilt and garbage is collected after every
    /// bit.
    pub fn modular_multiplier(&mut self, a: u64) -> MEdge {
        let zero = MEdge::zero();
        let ident = self.dd.make_ident();

        // Start from the operator sending every input to 0.
        let mut f = MEdge::one();
        for p in 0..self.required_bits {
            f = self.dd.make_matrix_node(p as Qubit, [f, f, zero, zero]);
        }
        self.dd.inc_ref(f);

        let mut t = a % self.modulus;
        for i in 0..self.required_bits {
            let active = self.bit_projector(i);
            let inactive = self.dd.add(ident, active.negated());
            let passive = self.dd.multiply(f, inactive);
            let active = self.dd.multiply(f, active);

            let step = self.add_const_mod(t);
            let active = self.dd.multiply(step, active);

            let next = self.dd.add(active, passive);
            self.dd.inc_ref(next);
            self.dd.dec_ref(f);
            f = next;
            self.dd.garbage_collect(false);

            t = (2 * t) % self.modulus;
        }

        self.dd.dec_ref(f);
        f
    }

    /// Embed `op` (acting on the work register) into the full register, applied only when
    /// exponent qubit `control` is set. Exponent qubit `k` sits on level `required_bits + k`.
    pub fn controlled(&mut self, op: MEdge, control: usize, exponent_bits: usize) -> MEdge {
        let zero = MEdge::zero();
        let mut e = op;
        for k in 0..exponent_bits {
            let level = (self.required_bits + k) as Qubit;
            let children = if k == control {
                [self.dd.make_ident(), zero, zero, e]
            } else {
                [e, zero, zero, e]
            };
            e = self.dd.make_matrix_node(level, children);
        }
        e
    }
}

#[cfg(test)]
mod arithmetic_tests {
    use super::*;
    use crate::utils::gcd;

    fn apply(dd: &mut Package, op: MEdge, bits: usize, x: u64) -> Vec<Complex64> {
        let s = dd.make_basis_state(bits, x);
        let r = dd.multiply_vector(op, s);
        let mut v = dd.vector(r);
        v.resize(1 << bits, Complex64::new(0.0, 0.0));
        v
    }

    fn assert_basis(v: &[Complex64], expected: u64) {
        for (i, amp) in v.iter().enumerate() {
            let target = if i as u64 == expected { 1.0 } else { 0.0 };
            assert!(
                (amp - Complex64::new(target, 0.0)).norm() < 1e-9,
                "amplitude {} at {}, expected basis state {}",
                amp,
                i,
                expected
            );
        }
    }

    #[test]
    fn test_limit_to() {
        let bits = 4;
        let mut dd = Package::new(bits + 1);
        for limit in 0..(1 << bits) {
            let op = ModularArithmetic::new(&mut dd, 15, bits).limit_to(limit);
            for x in 0..(1u64 << (bits + 1)) {
                let expected = if x <= limit { 1.0 } else { 0.0 };
                let entry = dd.matrix_entry(op, bits + 1, x, x);
                assert!((entry.re - expected).abs() < 1e-12, "limit {} x {}", limit, x);
            }
        }
    }

    #[test]
    fn test_add_const() {
        let bits = 4;
        let mut dd = Package::new(bits + 1);
        for a in 0..(1u64 << bits) {
            let op = ModularArithmetic::new(&mut dd, 15, bits).add_const(a);
            for x in 0..(1u64 << (bits + 1)) {
                let v = apply(&mut dd, op, bits + 1, x);
                assert_basis(&v, (x + a) % (1 << (bits + 1)));
            }
        }
    }

    #[test]
    fn test_add_const_mod() {
        for n in [3u64, 5, 7, 11, 15] {
            let bits = crate::utils::bit_length(n);
            let mut dd = Package::new(bits);
            for a in 0..n {
                let op = ModularArithmetic::new(&mut dd, n, bits).add_const_mod(a);
                for x in 0..n {
                    let v = apply(&mut dd, op, bits, x);
                    assert_basis(&v, (x + a) % n);
                }
            }
        }
    }

    #[test]
    fn test_add_const_mod_round_trip() {
        for n in [3u64, 4, 9, 15, 21] {
            let bits = crate::utils::bit_length(n);
            let mut dd = Package::new(bits);
            for a in (1..n).filter(|a| gcd(*a, n) == 1) {
                let mut arith = ModularArithmetic::new(&mut dd, n, bits);
                assert_eq!(arith.modulus(), n);
                let forward = arith.add_const_mod(a);
                let back = arith.add_const_mod(n - a);
                let round_trip = dd.multiply(back, forward);
                for x in 0..n {
                    let v = apply(&mut dd, round_trip, bits, x);
                    assert_basis(&v, x);
                }
            }
        }
    }

    #[test]
    fn test_modular_multiplier() {
        for (n, a) in [(15u64, 7u64), (15, 2), (21, 5), (7, 3)] {
            let bits = crate::utils::bit_length(n);
            let mut dd = Package::new(bits);
            let op = ModularArithmetic::new(&mut dd, n, bits).modular_multiplier(a);
            for x in 0..n {
                let v = apply(&mut dd, op, bits, x);
                assert_basis(&v, a * x % n);
            }
        }
    }

    #[test]
    fn test_controlled_embedding() {
        let (n, a, bits) = (15u64, 7u64, 4usize);
        let total = 3 * bits;
        let mut dd = Package::new(total);
        let mut arith = ModularArithmetic::new(&mut dd, n, bits);
        let op = arith.modular_multiplier(a);
        let op = arith.controlled(op, 2, 2 * bits);

        // Control clear: nothing happens.
        let s = dd.make_basis_state(total, 4);
        let r = dd.multiply_vector(op, s);
        assert!((dd.amplitude(r, 4).re - 1.0).abs() < 1e-9);

        // Control set: the work register is multiplied.
        let control = 1u64 << (bits + 2);
        let s = dd.make_basis_state(total, control | 4);
        let r = dd.multiply_vector(op, s);
        assert!((dd.amplitude(r, control | (4 * a % n)).re - 1.0).abs() < 1e-9);
    }
}
