//! The pointer-flow graph (PFG): a directed graph over pointer handles
//! asserting `pts(u) ⊆ pts(v)` for every edge `u -> v` (§4.1).
//!
//! `add_edge` is idempotent, matching the PTA solver's expectation that
//! re-discovering an edge (e.g. re-linking a field access against an
//! already-linked object) is a cheap no-op.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

pub struct PointerFlowGraph<N> {
    succs: HashMap<N, HashSet<N>>,
}

impl<N: Copy + Eq + Hash> Default for PointerFlowGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy + Eq + Hash> PointerFlowGraph<N> {
    pub fn new() -> Self {
        PointerFlowGraph {
            succs: HashMap::new(),
        }
    }

    /// Adds the edge `source -> target`. Returns `true` iff the edge was
    /// not already present.
    pub fn add_edge(&mut self, source: N, target: N) -> bool {
        self.succs.entry(source).or_default().insert(target)
    }

    pub fn succs_of(&self, source: N) -> impl Iterator<Item = N> + '_ {
        self.succs
            .get(&source)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn has_edge(&self, source: N, target: N) -> bool {
        self.succs.get(&source).map(|s| s.contains(&target)).unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_edge_idempotent() {
        let mut pfg: PointerFlowGraph<u32> = PointerFlowGraph::new();
        assert!(pfg.add_edge(1, 2));
        assert!(!pfg.add_edge(1, 2));
        assert_eq!(pfg.succs_of(1).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn succs_of_unknown_node_is_empty() {
        let pfg: PointerFlowGraph<u32> = PointerFlowGraph::new();
        assert_eq!(pfg.succs_of(42).count(), 0);
    }
}
