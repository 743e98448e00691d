use crate::complex::TOLERANCE;
use crate::edge::VEdge;
use crate::package::Package;
use num_complex::Complex64;
use rand::Rng;

impl Package {
    /// Sample a basis state from `state` according to the squared amplitudes.
    ///
    /// The returned string lists the highest qubit first. If `collapse` is set, `state` is
    /// replaced by the sampled basis state, taking a reference on the new state and releasing
    /// the old one.
    pub fn measure_all<R: Rng + ?Sized>(
        &mut self,
        state: &mut VEdge,
        collapse: bool,
        rng: &mut R,
    ) -> String {
        let n = (self.level(*state) + 1) as usize;
        let mut bits = vec![b'0'; n];
        let mut value = 0u64;
        let mut cur = *state;
        while !cur.is_terminal() {
            let node = self.vectors.node(cur.node);
            let [zero, one] = node.children;
            let p_zero = zero.weight.norm_sqr();
            let p_one = one.weight.norm_sqr();
            let threshold = p_zero / (p_zero + p_one);
            let r: f64 = rng.gen();
            if r < threshold {
                cur = zero;
            } else {
                bits[n - 1 - node.level as usize] = b'1';
                value |= 1 << node.level;
                cur = one;
            }
        }

        if collapse {
            let collapsed = self.make_basis_state(n, value);
            self.inc_ref(collapsed);
            self.dec_ref(*state);
            *state = collapsed;
        }
        bits.into_iter().map(char::from).collect()
    }

    /// Follow the more likely child at every node, preferring `|0>` when both are equally likely.
    /// Returns the amplitude of the reached basis state and its bitstring, highest qubit first.
    pub fn path_of_least_resistance(&self, state: VEdge) -> (Complex64, String) {
        let n = (self.level(state) + 1) as usize;
        let mut bits = vec![b'0'; n];
        let mut amp = state.weight;
        let mut cur = state;
        while !cur.is_terminal() {
            let node = self.vectors.node(cur.node);
            let [zero, one] = node.children;
            if one.weight.norm_sqr() > zero.weight.norm_sqr() + TOLERANCE {
                bits[n - 1 - node.level as usize] = b'1';
                cur = one;
            } else {
                cur = zero;
            }
            amp *= cur.weight;
        }
        (amp, bits.into_iter().map(char::from).collect())
    }
}
