use crate::complex::{approx_eq, approx_zero, one, snap, weight_key, WeightKey, TOLERANCE};
use crate::edge::{Edge, MEdge, NodeId, Qubit, VEdge};
use crate::node_table::{Node, NodeTable};
use num_complex::Complex64;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Node count above which a non-forced garbage collection actually runs.
pub const DEFAULT_GC_LIMIT: usize = 131_072;

/// Compute tables are dropped once they grow past this many entries.
const COMPUTE_TABLE_LIMIT: usize = 1 << 20;

type AddKey = (NodeId, WeightKey, NodeId, WeightKey);

/// Owner of all nodes, compute tables and reference counts.
///
/// Nothing here is shared between threads, a package belongs to a single simulation run.
#[derive(Debug)]
pub struct Package {
    n_qubits: usize,
    pub(crate) vectors: NodeTable<2>,
    pub(crate) matrices: NodeTable<4>,
    vector_add: HashMap<AddKey, VEdge>,
    matrix_add: HashMap<AddKey, MEdge>,
    vector_multiply: HashMap<(NodeId, NodeId), VEdge>,
    matrix_multiply: HashMap<(NodeId, NodeId), MEdge>,
    transpose: HashMap<NodeId, MEdge>,
    gc_limit: usize,
    gc_runs: usize,
}

/// Counters describing the node tables of a [`Package`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PackageStats {
    /// Vector nodes stored in the unique table.
    pub vector_nodes: usize,
    /// Matrix nodes stored in the unique table.
    pub matrix_nodes: usize,
    /// Vector nodes with a positive reference count.
    pub referenced_vector_nodes: usize,
    /// Matrix nodes with a positive reference count.
    pub referenced_matrix_nodes: usize,
    /// Peak number of stored vector nodes.
    pub peak_vector_nodes: usize,
    /// Peak number of stored matrix nodes.
    pub peak_matrix_nodes: usize,
    /// Number of garbage collections which ran.
    pub gc_runs: usize,
}

/// Access to the per-arity parts of a [`Package`], letting operations be written once for
/// vectors and matrices.
pub trait DiagramTables<const N: usize> {
    /// Node table for this arity.
    fn table(&self) -> &NodeTable<N>;
    /// Mutable node table for this arity.
    fn table_mut(&mut self) -> &mut NodeTable<N>;
    /// Compute table for additions.
    fn add_table(&mut self) -> &mut HashMap<AddKey, Edge<N>>;
    /// Canonicalizing node construction.
    fn make_node(&mut self, level: Qubit, children: [Edge<N>; N]) -> Edge<N>;
}

impl DiagramTables<2> for Package {
    fn table(&self) -> &NodeTable<2> {
        &self.vectors
    }
    fn table_mut(&mut self) -> &mut NodeTable<2> {
        &mut self.vectors
    }
    fn add_table(&mut self) -> &mut HashMap<AddKey, VEdge> {
        &mut self.vector_add
    }
    fn make_node(&mut self, level: Qubit, children: [VEdge; 2]) -> VEdge {
        self.make_vector_node(level, children)
    }
}

impl DiagramTables<4> for Package {
    fn table(&self) -> &NodeTable<4> {
        &self.matrices
    }
    fn table_mut(&mut self) -> &mut NodeTable<4> {
        &mut self.matrices
    }
    fn add_table(&mut self) -> &mut HashMap<AddKey, MEdge> {
        &mut self.matrix_add
    }
    fn make_node(&mut self, level: Qubit, children: [MEdge; 4]) -> MEdge {
        self.make_matrix_node(level, children)
    }
}

/// Index of the child with the largest magnitude, the lowest index wins a tie.
fn largest_child<const N: usize>(children: &[Edge<N>; N]) -> usize {
    let mut best = 0;
    let mut best_mag = children[0].weight.norm_sqr();
    for (i, c) in children.iter().enumerate().skip(1) {
        let mag = c.weight.norm_sqr();
        if mag > best_mag + TOLERANCE {
            best = i;
            best_mag = mag;
        }
    }
    best
}

fn clean_children<const N: usize>(children: &mut [Edge<N>; N]) -> bool {
    let mut all_zero = true;
    for c in children.iter_mut() {
        c.weight = snap(c.weight);
        if approx_zero(c.weight) {
            *c = Edge::zero();
        } else {
            all_zero = false;
        }
    }
    all_zero
}

impl Package {
    /// Make a package for states over `n_qubits` qubits.
    pub fn new(n_qubits: usize) -> Self {
        Self::new_with_gc_limit(n_qubits, DEFAULT_GC_LIMIT)
    }

    /// Make a package whose non-forced collections run once more than `gc_limit` nodes are
    /// stored.
    pub fn new_with_gc_limit(n_qubits: usize, gc_limit: usize) -> Self {
        Self {
            n_qubits,
            vectors: NodeTable::new(),
            matrices: NodeTable::new(),
            vector_add: HashMap::new(),
            matrix_add: HashMap::new(),
            vector_multiply: HashMap::new(),
            matrix_multiply: HashMap::new(),
            transpose: HashMap::new(),
            gc_limit,
            gc_runs: 0,
        }
    }

    /// Number of qubits this package was made for.
    pub fn n_qubits(&self) -> usize {
        self.n_qubits
    }

    /// A stored vector node.
    pub fn vector_node(&self, id: NodeId) -> &Node<2> {
        self.vectors.node(id)
    }

    /// A stored matrix node.
    pub fn matrix_node(&self, id: NodeId) -> &Node<4> {
        self.matrices.node(id)
    }

    /// Level of the node behind `e`, `-1` for the terminal.
    pub fn level<const N: usize>(&self, e: Edge<N>) -> Qubit
    where
        Self: DiagramTables<N>,
    {
        self.table().level(e)
    }

    /// Make (or find) the vector node with the given children. The returned edge carries the
    /// normalization factor: the children of the stored node have unit norm and the largest of
    /// them has a positive real weight.
    pub fn make_vector_node(&mut self, level: Qubit, mut children: [VEdge; 2]) -> VEdge {
        if clean_children(&mut children) {
            return VEdge::zero();
        }
        let norm = children
            .iter()
            .map(|c| c.weight.norm_sqr())
            .sum::<f64>()
            .sqrt();
        let max = children[largest_child(&children)].weight;
        let factor = snap(max / max.norm() * norm);
        for c in children.iter_mut() {
            if !c.is_zero() {
                c.weight = snap(c.weight / factor);
            }
        }
        let node = self.vectors.lookup_or_insert(level, children);
        Edge {
            node,
            weight: factor,
        }
    }

    /// Make (or find) the matrix node with the given children. The largest child of the stored
    /// node has weight one. A node acting as the identity on its level is skipped and the shared
    /// child returned instead.
    pub fn make_matrix_node(&mut self, level: Qubit, mut children: [MEdge; 4]) -> MEdge {
        if clean_children(&mut children) {
            return MEdge::zero();
        }
        let [e0, e1, e2, e3] = children;
        if e1.is_zero() && e2.is_zero() && e0.node == e3.node && approx_eq(e0.weight, e3.weight) {
            return e0;
        }
        let max = largest_child(&children);
        let factor = children[max].weight;
        for (i, c) in children.iter_mut().enumerate() {
            if i == max {
                c.weight = one();
            } else if !c.is_zero() {
                c.weight = snap(c.weight / factor);
            }
        }
        let node = self.matrices.lookup_or_insert(level, children);
        Edge {
            node,
            weight: factor,
        }
    }

    /// The identity operator on any number of qubits.
    pub fn make_ident(&self) -> MEdge {
        MEdge::one()
    }

    /// The state `|0...0>` over `n` qubits.
    pub fn make_zero_state(&mut self, n: usize) -> VEdge {
        self.make_basis_state(n, 0)
    }

    /// The computational basis state `|value>` over `n` qubits, qubit `i` holding bit `i`.
    pub fn make_basis_state(&mut self, n: usize, value: u64) -> VEdge {
        let mut e = VEdge::one();
        for level in 0..n {
            let children = if (value >> level) & 1 == 0 {
                [e, VEdge::zero()]
            } else {
                [VEdge::zero(), e]
            };
            e = self.make_vector_node(level as Qubit, children);
        }
        e
    }

    /// Children of `e` seen from `level`, with the weight of `e` folded in. Operators which skip
    /// `level` act as the identity on it.
    fn children_at<const N: usize>(&self, e: Edge<N>, level: Qubit) -> [Edge<N>; N]
    where
        Self: DiagramTables<N>,
    {
        let table = self.table();
        if table.level(e) == level {
            table.node(e.node).children.map(|c| c.scaled(e.weight))
        } else {
            debug_assert_eq!(N, 4, "vector diagrams never skip levels");
            let mut out = [Edge::zero(); N];
            out[0] = e;
            out[N - 1] = e;
            out
        }
    }

    /// Sum of two vectors or two operators.
    pub fn add<const N: usize>(&mut self, x: Edge<N>, y: Edge<N>) -> Edge<N>
    where
        Self: DiagramTables<N>,
    {
        if x.is_zero() {
            return y;
        }
        if y.is_zero() {
            return x;
        }
        if x.node == y.node {
            let weight = snap(x.weight + y.weight);
            return if approx_zero(weight) {
                Edge::zero()
            } else {
                Edge {
                    node: x.node,
                    weight,
                }
            };
        }
        let (x, y) = if x.node < y.node { (x, y) } else { (y, x) };
        let key = (
            x.node,
            weight_key(x.weight),
            y.node,
            weight_key(y.weight),
        );
        if let Some(r) = self.add_table().get(&key) {
            return *r;
        }

        let level = self.level(x).max(self.level(y));
        let cx = self.children_at(x, level);
        let cy = self.children_at(y, level);
        let mut children = [Edge::zero(); N];
        for i in 0..N {
            children[i] = self.add(cx[i], cy[i]);
        }
        let r = self.make_node(level, children);
        self.add_table().insert(key, r);
        r
    }

    /// Product of two operators, `a` applied after `b`.
    pub fn multiply(&mut self, a: MEdge, b: MEdge) -> MEdge {
        if a.is_zero() || b.is_zero() {
            return MEdge::zero();
        }
        if a.is_terminal() {
            return b.scaled(a.weight);
        }
        if b.is_terminal() {
            return a.scaled(b.weight);
        }
        let weight = a.weight * b.weight;
        let key = (a.node, b.node);
        if let Some(r) = self.matrix_multiply.get(&key) {
            return r.scaled(weight);
        }

        let level = self.level(a).max(self.level(b));
        let ac = self.children_at(a.unit(), level);
        let bc = self.children_at(b.unit(), level);
        let mut children = [MEdge::zero(); 4];
        for row in 0..2 {
            for col in 0..2 {
                let first = self.multiply(ac[2 * row], bc[col]);
                let second = self.multiply(ac[2 * row + 1], bc[2 + col]);
                children[2 * row + col] = self.add(first, second);
            }
        }
        let r = self.make_matrix_node(level, children);
        self.matrix_multiply.insert(key, r);
        r.scaled(weight)
    }

    /// Apply operator `m` to state `v`.
    pub fn multiply_vector(&mut self, m: MEdge, v: VEdge) -> VEdge {
        if m.is_zero() || v.is_zero() {
            return VEdge::zero();
        }
        if m.is_terminal() {
            return v.scaled(m.weight);
        }
        let level = self.level(v);
        debug_assert!(
            self.level(m) <= level,
            "operator spans more qubits than the state"
        );
        let weight = m.weight * v.weight;
        let key = (m.node, v.node);
        if let Some(r) = self.vector_multiply.get(&key) {
            return r.scaled(weight);
        }

        let mc = self.children_at(m.unit(), level);
        let vc = self.vectors.node(v.node).children;
        let mut children = [VEdge::zero(); 2];
        for (row, child) in children.iter_mut().enumerate() {
            let first = self.multiply_vector(mc[2 * row], vc[0]);
            let second = self.multiply_vector(mc[2 * row + 1], vc[1]);
            *child = self.add(first, second);
        }
        let r = self.make_vector_node(level, children);
        self.vector_multiply.insert(key, r);
        r.scaled(weight)
    }

    /// Conjugate transpose of an operator.
    pub fn conjugate_transpose(&mut self, m: MEdge) -> MEdge {
        if m.is_zero() {
            return MEdge::zero();
        }
        if m.is_terminal() {
            return MEdge::terminal(m.weight.conj());
        }
        if let Some(r) = self.transpose.get(&m.node) {
            return r.scaled(m.weight.conj());
        }
        let node = self.matrices.node(m.node);
        let level = node.level;
        let [c0, c1, c2, c3] = node.children;
        let children = [
            self.conjugate_transpose(c0),
            self.conjugate_transpose(c2),
            self.conjugate_transpose(c1),
            self.conjugate_transpose(c3),
        ];
        let r = self.make_matrix_node(level, children);
        self.transpose.insert(m.node, r);
        r.scaled(m.weight.conj())
    }

    /// Keep everything below `e` alive through garbage collections.
    pub fn inc_ref<const N: usize>(&mut self, e: Edge<N>)
    where
        Self: DiagramTables<N>,
    {
        self.table_mut().inc_ref(e)
    }

    /// Release a reference taken with [`Package::inc_ref`].
    pub fn dec_ref<const N: usize>(&mut self, e: Edge<N>)
    where
        Self: DiagramTables<N>,
    {
        self.table_mut().dec_ref(e)
    }

    /// Reclaim every node without references. Unless `force` is set this only happens once the
    /// tables hold more nodes than the collection limit. Returns the number of freed nodes.
    pub fn garbage_collect(&mut self, force: bool) -> usize {
        let stored = self.vectors.len() + self.matrices.len();
        if !force && stored < self.gc_limit {
            return 0;
        }
        let freed = self.vectors.collect() + self.matrices.collect();
        self.gc_runs += 1;
        if freed > 0 || self.compute_table_entries() > COMPUTE_TABLE_LIMIT {
            self.clear_compute_tables();
        }
        let remaining = self.vectors.len() + self.matrices.len();
        if !force && remaining * 10 > self.gc_limit * 9 {
            // Almost everything is still referenced, collecting again right away would not help.
            self.gc_limit *= 2;
        }
        trace!(freed, remaining, gc_limit = self.gc_limit, "garbage collection");
        freed
    }

    fn compute_table_entries(&self) -> usize {
        self.vector_add.len()
            + self.matrix_add.len()
            + self.vector_multiply.len()
            + self.matrix_multiply.len()
            + self.transpose.len()
    }

    /// Drop every cached operation result.
    pub fn clear_compute_tables(&mut self) {
        self.vector_add.clear();
        self.matrix_add.clear();
        self.vector_multiply.clear();
        self.matrix_multiply.clear();
        self.transpose.clear();
    }

    /// Number of distinct nodes reachable from `e`, the terminal included.
    pub fn size<const N: usize>(&self, e: Edge<N>) -> usize
    where
        Self: DiagramTables<N>,
    {
        let table = self.table();
        let mut visited = HashSet::new();
        let mut stack = vec![e.node];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) || id.is_terminal() {
                continue;
            }
            stack.extend(
                table
                    .node(id)
                    .children
                    .iter()
                    .filter(|c| !c.is_zero())
                    .map(|c| c.node),
            );
        }
        visited.len()
    }

    /// Counters of the node tables.
    pub fn stats(&self) -> PackageStats {
        PackageStats {
            vector_nodes: self.vectors.len(),
            matrix_nodes: self.matrices.len(),
            referenced_vector_nodes: self.vectors.referenced(),
            referenced_matrix_nodes: self.matrices.referenced(),
            peak_vector_nodes: self.vectors.peak(),
            peak_matrix_nodes: self.matrices.peak(),
            gc_runs: self.gc_runs,
        }
    }

    /// Amplitude of basis state `index` in `state`, qubit `i` being bit `i` of the index.
    pub fn amplitude(&self, state: VEdge, index: u64) -> Complex64 {
        let mut amp = state.weight;
        let mut cur = state;
        while !cur.is_terminal() {
            let node = self.vectors.node(cur.node);
            cur = node.children[((index >> node.level) & 1) as usize];
            amp *= cur.weight;
        }
        if cur.is_zero() {
            Complex64::new(0.0, 0.0)
        } else {
            amp
        }
    }

    /// Dense amplitudes of `state`, indexed like [`Package::amplitude`].
    /// Only meant for small states.
    pub fn vector(&self, state: VEdge) -> Vec<Complex64> {
        let n = (self.level(state) + 1) as u32;
        (0..1u64 << n).map(|i| self.amplitude(state, i)).collect()
    }

    /// Entry `(row, col)` of operator `m` acting on `n` qubits.
    pub fn matrix_entry(&self, m: MEdge, n: usize, row: u64, col: u64) -> Complex64 {
        let zero = Complex64::new(0.0, 0.0);
        if m.is_zero() {
            return zero;
        }
        let mut weight = m.weight;
        let mut cur = m;
        for level in (0..n as Qubit).rev() {
            let r = (row >> level) & 1;
            let c = (col >> level) & 1;
            if !cur.is_terminal() && self.matrices.level(cur) == level {
                cur = self.matrices.node(cur.node).children[(2 * r + c) as usize];
                if cur.is_zero() {
                    return zero;
                }
                weight *= cur.weight;
            } else if r != c {
                return zero;
            }
        }
        weight
    }

    /// Dense `2^n x 2^n` expansion of operator `m`. Only meant for small operators.
    pub fn matrix(&self, m: MEdge, n: usize) -> Vec<Vec<Complex64>> {
        (0..1u64 << n)
            .map(|row| {
                (0..1u64 << n)
                    .map(|col| self.matrix_entry(m, n, row, col))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod package_tests {
    use super::*;

    fn assert_close(a: Complex64, b: Complex64) {
        assert!((a - b).norm() < 1e-10, "{} != {}", a, b);
    }

    #[test]
    fn test_zero_state() {
        let mut dd = Package::new(3);
        assert_eq!(dd.n_qubits(), 3);
        let s = dd.make_zero_state(3);
        assert_eq!(dd.level(s), 2);
        assert_eq!(dd.size(s), 4);
        assert_close(dd.amplitude(s, 0), Complex64::new(1.0, 0.0));
        assert_close(dd.amplitude(s, 5), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_shared_nodes() {
        let mut dd = Package::new(2);
        let a = dd.make_basis_state(2, 0b10);
        let b = dd.make_basis_state(2, 0b10);
        assert_eq!(a, b);
        let c = dd.make_basis_state(2, 0b01);
        assert_ne!(a.node, c.node);
    }

    #[test]
    fn test_identity_is_skipped() {
        let mut dd = Package::new(2);
        let e = dd.make_matrix_node(0, [MEdge::one(), MEdge::zero(), MEdge::zero(), MEdge::one()]);
        assert_eq!(e, MEdge::one());
        let e = dd.make_matrix_node(1, [e, MEdge::zero(), MEdge::zero(), e]);
        assert_eq!(e, MEdge::one());
    }

    #[test]
    fn test_add_vectors() {
        let mut dd = Package::new(2);
        let a = dd.make_basis_state(2, 0b00);
        let b = dd.make_basis_state(2, 0b11);
        let s = dd.add(a, b);
        assert_close(dd.amplitude(s, 0b00), Complex64::new(1.0, 0.0));
        assert_close(dd.amplitude(s, 0b11), Complex64::new(1.0, 0.0));
        assert_close(dd.amplitude(s, 0b01), Complex64::new(0.0, 0.0));

        let d = dd.add(s, b.negated());
        assert_eq!(d.node, a.node);
        assert_close(d.weight, Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_multiply_against_dense() {
        let mut dd = Package::new(2);
        let x = [
            MEdge::zero(),
            MEdge::one(),
            MEdge::one(),
            MEdge::zero(),
        ];
        // X on qubit 1, identity on qubit 0.
        let x1 = dd.make_matrix_node(1, x);
        let s = dd.make_basis_state(2, 0b01);
        let r = dd.multiply_vector(x1, s);
        assert_close(dd.amplitude(r, 0b11), Complex64::new(1.0, 0.0));

        let xx = dd.multiply(x1, x1);
        assert_eq!(xx, MEdge::one());

        let dense = dd.matrix(x1, 2);
        assert_close(dense[0b10][0b00], Complex64::new(1.0, 0.0));
        assert_close(dense[0b11][0b01], Complex64::new(1.0, 0.0));
        assert_close(dense[0b01][0b01], Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_conjugate_transpose() {
        let mut dd = Package::new(1);
        let i = Complex64::new(0.0, 1.0);
        let m = dd.make_matrix_node(
            0,
            [
                MEdge::zero(),
                MEdge::terminal(i),
                MEdge::terminal(Complex64::new(2.0, 0.0)),
                MEdge::zero(),
            ],
        );
        let t = dd.conjugate_transpose(m);
        assert_close(dd.matrix_entry(t, 1, 0, 1), Complex64::new(2.0, 0.0));
        assert_close(dd.matrix_entry(t, 1, 1, 0), -i);
    }

    #[test]
    fn test_gc_respects_references() {
        let mut dd = Package::new(3);
        let keep = dd.make_zero_state(3);
        dd.inc_ref(keep);
        let _garbage = dd.make_basis_state(3, 0b111);
        let freed = dd.garbage_collect(true);
        assert_eq!(freed, 3);
        assert_eq!(dd.stats().vector_nodes, 3);
        assert_close(dd.amplitude(keep, 0), Complex64::new(1.0, 0.0));

        dd.dec_ref(keep);
        dd.garbage_collect(true);
        assert_eq!(dd.stats().vector_nodes, 0);
    }
}
