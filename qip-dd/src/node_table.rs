use crate::complex::{weight_key, WeightKey};
use crate::edge::{Edge, NodeId, Qubit, TERMINAL_LEVEL};
use smallvec::SmallVec;
use std::collections::HashMap;

/// A node with `N` weighted children.
#[derive(Clone, Debug)]
pub struct Node<const N: usize> {
    /// Level (qubit) of the node.
    pub level: Qubit,
    /// Children in row-major block order.
    pub children: [Edge<N>; N],
    /// Number of live parents plus external references.
    pub ref_count: u32,
}

type NodeKey<const N: usize> = (Qubit, [(NodeId, WeightKey); N]);

/// Arena of nodes of one arity, hash-consed by level and children.
///
/// Slot `0` holds the terminal. Reclaimed slots are reused by later insertions, so an id which
/// was not kept alive through a collection may point to an unrelated node afterwards.
#[derive(Debug)]
pub struct NodeTable<const N: usize> {
    nodes: Vec<Node<N>>,
    unique: HashMap<NodeKey<N>, NodeId>,
    free: Vec<NodeId>,
    peak: usize,
}

impl<const N: usize> Default for NodeTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NodeTable<N> {
    /// Make a table containing only the terminal.
    pub fn new() -> Self {
        let terminal = Node {
            level: TERMINAL_LEVEL,
            children: [Edge::zero(); N],
            ref_count: 0,
        };
        Self {
            nodes: vec![terminal],
            unique: HashMap::new(),
            free: vec![],
            peak: 0,
        }
    }

    /// Get a node by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node<N> {
        &self.nodes[id.index()]
    }

    /// Level of the node an edge points to.
    #[inline]
    pub fn level(&self, e: Edge<N>) -> Qubit {
        self.nodes[e.node.index()].level
    }

    /// Find the node with the given level and (already normalized) children, inserting it if it
    /// does not exist yet.
    pub fn lookup_or_insert(&mut self, level: Qubit, children: [Edge<N>; N]) -> NodeId {
        let key = (level, children.map(|e| (e.node, weight_key(e.weight))));
        if let Some(id) = self.unique.get(&key) {
            return *id;
        }
        let node = Node {
            level,
            children,
            ref_count: 0,
        };
        let id = if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = node;
            id
        } else {
            self.nodes.push(node);
            NodeId((self.nodes.len() - 1) as u32)
        };
        self.unique.insert(key, id);
        self.peak = self.peak.max(self.unique.len());
        id
    }

    /// Increment the reference count of the node behind `e`. A node going from zero to one
    /// reference takes a reference on each of its children.
    pub fn inc_ref(&mut self, e: Edge<N>) {
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.push(e.node);
        while let Some(id) = stack.pop() {
            if id.is_terminal() {
                continue;
            }
            let node = &mut self.nodes[id.index()];
            node.ref_count = node.ref_count.saturating_add(1);
            if node.ref_count == 1 {
                stack.extend(node.children.iter().map(|c| c.node));
            }
        }
    }

    /// Decrement the reference count of the node behind `e`. A node going from one to zero
    /// references releases its children.
    pub fn dec_ref(&mut self, e: Edge<N>) {
        let mut stack: SmallVec<[NodeId; 32]> = SmallVec::new();
        stack.push(e.node);
        while let Some(id) = stack.pop() {
            if id.is_terminal() {
                continue;
            }
            let node = &mut self.nodes[id.index()];
            debug_assert!(node.ref_count > 0, "reference count underflow on {:?}", id);
            if node.ref_count == 0 {
                continue;
            }
            node.ref_count -= 1;
            if node.ref_count == 0 {
                stack.extend(node.children.iter().map(|c| c.node));
            }
        }
    }

    /// Remove every node without references from the unique table. Returns how many were freed.
    pub fn collect(&mut self) -> usize {
        let Self {
            nodes, unique, free, ..
        } = self;
        let before = unique.len();
        unique.retain(|_, id| {
            let keep = nodes[id.index()].ref_count > 0;
            if !keep {
                free.push(*id);
            }
            keep
        });
        before - unique.len()
    }

    /// Number of nodes currently in the unique table.
    pub fn len(&self) -> usize {
        self.unique.len()
    }

    /// Whether only the terminal is present.
    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    /// Number of nodes with a positive reference count.
    pub fn referenced(&self) -> usize {
        self.unique
            .values()
            .filter(|id| self.nodes[id.index()].ref_count > 0)
            .count()
    }

    /// Largest number of simultaneously stored nodes seen so far.
    pub fn peak(&self) -> usize {
        self.peak
    }
}

#[cfg(test)]
mod node_table_tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut table = NodeTable::<2>::new();
        let a = table.lookup_or_insert(0, [Edge::one(), Edge::zero()]);
        let b = table.lookup_or_insert(0, [Edge::one(), Edge::zero()]);
        let c = table.lookup_or_insert(0, [Edge::zero(), Edge::one()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_ref_counting_and_collect() {
        let mut table = NodeTable::<2>::new();
        let leaf = table.lookup_or_insert(0, [Edge::one(), Edge::zero()]);
        let leaf_edge = Edge {
            node: leaf,
            weight: Edge::<2>::one().weight,
        };
        let top = table.lookup_or_insert(1, [leaf_edge, Edge::zero()]);
        let top_edge = Edge {
            node: top,
            weight: leaf_edge.weight,
        };
        table.inc_ref(top_edge);
        assert_eq!(table.node(leaf).ref_count, 1);
        assert_eq!(table.collect(), 0);

        table.dec_ref(top_edge);
        assert_eq!(table.node(leaf).ref_count, 0);
        assert_eq!(table.collect(), 2);
        assert!(table.is_empty());

        // Freed slots are reused.
        let again = table.lookup_or_insert(0, [Edge::zero(), Edge::one()]);
        assert!(again == leaf || again == top);
    }
}
