use crate::edge::{NodeId, Qubit, VEdge};
use crate::package::Package;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Outcome of [`Package::approximate_by_fidelity`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Approximation {
    /// The (possibly) smaller state, already referenced.
    pub state: VEdge,
    /// Squared overlap between the old and the new state, the share of probability kept.
    pub fidelity: f64,
    /// How many nodes were cut from the diagram.
    pub removed_nodes: usize,
}

impl Package {
    /// Probability mass flowing through each node reachable from `state`, relative to the mass
    /// of the whole state.
    pub fn node_contributions(&self, state: VEdge) -> HashMap<NodeId, f64> {
        let mut contributions = HashMap::new();
        if state.is_zero() || state.is_terminal() {
            return contributions;
        }
        let by_level = self.nodes_by_level(state);
        contributions.insert(state.node, 1.0);
        for nodes in by_level.values().rev() {
            for id in nodes {
                let mass = contributions[id];
                for child in self.vectors.node(*id).children.iter() {
                    if child.is_zero() || child.is_terminal() {
                        continue;
                    }
                    *contributions.entry(child.node).or_insert(0.0) += mass * child.weight.norm_sqr();
                }
            }
        }
        contributions
    }

    fn nodes_by_level(&self, state: VEdge) -> BTreeMap<Qubit, Vec<NodeId>> {
        let mut by_level: BTreeMap<Qubit, Vec<NodeId>> = BTreeMap::new();
        let mut visited = HashSet::new();
        let mut stack = vec![state.node];
        while let Some(id) = stack.pop() {
            if id.is_terminal() || !visited.insert(id) {
                continue;
            }
            let node = self.vectors.node(id);
            by_level.entry(node.level).or_default().push(id);
            stack.extend(
                node.children
                    .iter()
                    .filter(|c| !c.is_zero())
                    .map(|c| c.node),
            );
        }
        for nodes in by_level.values_mut() {
            nodes.sort();
        }
        by_level
    }

    /// Shrink `state` by dropping the nodes which carry the least probability mass, as long as
    /// at least `target_fidelity` of the mass survives. Without `all_levels` only nodes on the
    /// widest level are candidates.
    ///
    /// The result is renormalized and referenced, `state` is released.
    pub fn approximate_by_fidelity(
        &mut self,
        state: VEdge,
        target_fidelity: f64,
        all_levels: bool,
    ) -> Approximation {
        let unchanged = Approximation {
            state,
            fidelity: 1.0,
            removed_nodes: 0,
        };
        let contributions = self.node_contributions(state);
        if contributions.is_empty() {
            return unchanged;
        }

        let mut candidates: Vec<(NodeId, f64)> = if all_levels {
            contributions.iter().map(|(id, c)| (*id, *c)).collect()
        } else {
            let by_level = self.nodes_by_level(state);
            let widest = by_level
                .iter()
                .max_by_key(|(level, nodes)| (nodes.len(), **level))
                .map(|(_, nodes)| nodes.clone())
                .unwrap_or_default();
            widest.into_iter().map(|id| (id, contributions[&id])).collect()
        };
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let budget = 1.0 - target_fidelity.clamp(0.0, 1.0);
        let mut removed_mass = 0.0;
        let mut removed = HashSet::new();
        for (id, c) in candidates {
            if id == state.node || removed_mass + c > budget {
                break;
            }
            removed_mass += c;
            removed.insert(id);
        }
        if removed.is_empty() {
            return unchanged;
        }

        let mut memo = HashMap::new();
        let rebuilt = self.rebuild_without(state, &removed, &mut memo);
        if rebuilt.is_zero() {
            return unchanged;
        }
        let fidelity = rebuilt.weight.norm_sqr() / state.weight.norm_sqr();
        let new_state = VEdge {
            node: rebuilt.node,
            weight: rebuilt.weight / rebuilt.weight.norm() * state.weight.norm(),
        };
        self.inc_ref(new_state);
        self.dec_ref(state);
        self.garbage_collect(false);
        debug!(
            removed = removed.len(),
            fidelity,
            size = self.size(new_state),
            "approximated state"
        );
        Approximation {
            state: new_state,
            fidelity,
            removed_nodes: removed.len(),
        }
    }

    fn rebuild_without(
        &mut self,
        e: VEdge,
        removed: &HashSet<NodeId>,
        memo: &mut HashMap<NodeId, VEdge>,
    ) -> VEdge {
        if e.is_zero() || e.is_terminal() {
            return e;
        }
        if removed.contains(&e.node) {
            return VEdge::zero();
        }
        if let Some(r) = memo.get(&e.node) {
            return r.scaled(e.weight);
        }
        let node = self.vectors.node(e.node);
        let level = node.level;
        let [c0, c1] = node.children;
        let children = [
            self.rebuild_without(c0, removed, memo),
            self.rebuild_without(c1, removed, memo),
        ];
        let r = self.make_vector_node(level, children);
        memo.insert(e.node, r);
        r.scaled(e.weight)
    }
}
