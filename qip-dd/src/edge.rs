use crate::complex::{self, approx_zero};
use num_complex::Complex64;

/// Level of a node. Qubit `0` is the lowest level, the terminal sits at `-1`.
pub type Qubit = i32;

/// Level of the terminal node.
pub const TERMINAL_LEVEL: Qubit = -1;

/// Index of a node inside the table for its arity.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The shared terminal, present in every table and never reclaimed.
    pub const TERMINAL: NodeId = NodeId(0);

    /// Whether this is the terminal.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A weighted reference to a node with `N` children.
///
/// `N = 2` edges describe state vectors, `N = 4` edges describe operators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge<const N: usize> {
    /// Target node.
    pub node: NodeId,
    /// Weight multiplied into everything below.
    pub weight: Complex64,
}

/// Edge into a state vector diagram.
pub type VEdge = Edge<2>;
/// Edge into an operator diagram.
pub type MEdge = Edge<4>;

impl<const N: usize> Edge<N> {
    /// The zero vector or zero operator.
    #[inline]
    pub fn zero() -> Self {
        Self {
            node: NodeId::TERMINAL,
            weight: complex::zero(),
        }
    }

    /// The terminal with weight one. As an operator this is the identity on every level below.
    #[inline]
    pub fn one() -> Self {
        Self::terminal(complex::one())
    }

    /// The terminal with the given weight.
    #[inline]
    pub fn terminal(weight: Complex64) -> Self {
        Self {
            node: NodeId::TERMINAL,
            weight,
        }
    }

    /// Whether this edge is (within tolerance) the zero edge.
    #[inline]
    pub fn is_zero(&self) -> bool {
        approx_zero(self.weight)
    }

    /// Whether this edge ends in the terminal.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.node.is_terminal()
    }

    /// Same node, weight multiplied by `factor`.
    #[inline]
    pub fn scaled(self, factor: Complex64) -> Self {
        Self {
            node: self.node,
            weight: self.weight * factor,
        }
    }

    /// Same node, negated weight.
    #[inline]
    pub fn negated(self) -> Self {
        Self {
            node: self.node,
            weight: -self.weight,
        }
    }

    /// Same node with unit weight.
    #[inline]
    pub(crate) fn unit(self) -> Self {
        Self {
            node: self.node,
            weight: complex::one(),
        }
    }
}
