// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Call graph: nodes are methods (`JMethod` for the context-insensitive
//! variant, `CSMethod` for the context-sensitive one), edges are
//! `(call site, call kind)` triples.

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::Graph;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::ir::method::CallKind;
use crate::util::chunked_queue::{self, ChunkedQueue};

pub type CGNodeId = NodeIndex<DefaultIx>;
pub type CGEdgeId = EdgeIndex<DefaultIx>;

pub trait CGFunction: Copy + Clone + PartialEq + Eq + Hash + Debug {}
impl<T: Copy + Clone + PartialEq + Eq + Hash + Debug> CGFunction for T {}

pub trait CGCallSite: Copy + Clone + PartialEq + Eq + Hash + Debug {}
impl<T: Copy + Clone + PartialEq + Eq + Hash + Debug> CGCallSite for T {}

#[derive(Debug)]
pub struct CallGraphNode<F: CGFunction> {
    pub func: F,
}

#[derive(Debug)]
pub struct CallGraphEdge<S: CGCallSite> {
    pub callsite: S,
    pub kind: CallKind,
}

/// A call graph over methods `F`, reached via call sites `S`. Both
/// `add_node` and `add_edge` are idempotent: adding something already
/// present is a no-op that reports `false`, matching the monotone
/// worklist discipline the solver relies on (§4.2/§4.3).
pub struct CallGraph<F: CGFunction, S: CGCallSite> {
    pub graph: Graph<CallGraphNode<F>, CallGraphEdge<S>>,
    pub func_nodes: HashMap<F, CGNodeId>,
    pub callsite_to_edges: HashMap<S, HashSet<CGEdgeId>>,
    reach_funcs: ChunkedQueue<F>,
}

impl<F: CGFunction, S: CGCallSite> Default for CallGraph<F, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: CGFunction, S: CGCallSite> CallGraph<F, S> {
    pub fn new() -> Self {
        CallGraph {
            graph: Graph::new(),
            func_nodes: HashMap::new(),
            callsite_to_edges: HashMap::new(),
            reach_funcs: ChunkedQueue::new(),
        }
    }

    /// Adds a reachable method node. Returns `true` iff it was new.
    pub fn add_reachable_method(&mut self, func: F) -> bool {
        if let Entry::Vacant(e) = self.func_nodes.entry(func) {
            let node_id = self.graph.add_node(CallGraphNode { func });
            e.insert(node_id);
            self.reach_funcs.push(func);
            true
        } else {
            false
        }
    }

    fn get_or_insert_node(&mut self, func: F) -> CGNodeId {
        match self.func_nodes.entry(func) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                self.reach_funcs.push(func);
                let node_id = self.graph.add_node(CallGraphNode { func });
                *v.insert(node_id)
            }
        }
    }

    pub fn get_callee_id_of_edge(&self, edge_id: CGEdgeId) -> Option<F> {
        let (_, callee_node) = self.graph.edge_endpoints(edge_id)?;
        self.graph.node_weight(callee_node).map(|n| n.func)
    }

    /// All callees reachable from `callsite` via any edge so far recorded.
    pub fn get_callees(&self, callsite: &S) -> HashSet<F> {
        match self.callsite_to_edges.get(callsite) {
            Some(edges) => edges
                .iter()
                .filter_map(|&e| self.get_callee_id_of_edge(e))
                .collect(),
            None => HashSet::new(),
        }
    }

    pub fn has_edge(&self, callsite: &S, callee: F) -> bool {
        self.get_callees(callsite).contains(&callee)
    }

    /// Adds a call-graph edge `caller --[callsite]--> callee`. Returns
    /// `true` iff an edge for this (callsite, callee) pair is new.
    pub fn add_edge(&mut self, callsite: S, kind: CallKind, caller: F, callee: F) -> bool {
        if self.has_edge(&callsite, callee) {
            return false;
        }
        let caller_node = self.get_or_insert_node(caller);
        let callee_node = self.get_or_insert_node(callee);
        let edge_id = self
            .graph
            .add_edge(caller_node, callee_node, CallGraphEdge { callsite, kind });
        self.callsite_to_edges
            .entry(callsite)
            .or_default()
            .insert(edge_id);
        true
    }

    pub fn is_reachable(&self, func: F) -> bool {
        self.func_nodes.contains_key(&func)
    }

    pub fn reach_funcs_iter(&self) -> chunked_queue::IterCopied<'_, F> {
        self.reach_funcs.iter_copied()
    }

    pub fn num_reachable(&self) -> usize {
        self.func_nodes.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_edge_is_idempotent() {
        let mut cg: CallGraph<u32, u32> = CallGraph::new();
        cg.add_reachable_method(1);
        assert!(cg.add_edge(100, CallKind::Virtual, 1, 2));
        assert!(!cg.add_edge(100, CallKind::Virtual, 1, 2));
        assert_eq!(cg.get_callees(&100).len(), 1);
    }

    #[test]
    fn virtual_call_can_reach_multiple_callees() {
        let mut cg: CallGraph<u32, u32> = CallGraph::new();
        cg.add_edge(100, CallKind::Virtual, 1, 2);
        cg.add_edge(100, CallKind::Virtual, 1, 3);
        let callees = cg.get_callees(&100);
        assert_eq!(callees, HashSet::from([2, 3]));
    }
}
