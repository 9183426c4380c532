//! Inter-procedural control-flow graph contract (§6, §4.5). A node is a
//! `(method, stmt)` pair; edges are classified into the four kinds the
//! inter-procedural CP solver transfers across.

use std::collections::HashMap;

use crate::graph::call_graph::CallGraph;
use crate::ir::program::Program;
use crate::ir::stmt::Stmt;
use crate::ir::types::{MethodId, StmtId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IcfgNode {
    pub method: MethodId,
    pub stmt: StmtId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IcfgEdgeKind {
    Normal,
    Call,
    CallToReturn,
    Return,
}

pub trait Icfg {
    fn entry_node(&self, method: MethodId) -> IcfgNode;
    fn nodes(&self) -> &[IcfgNode];
    fn out_edges(&self, node: IcfgNode) -> &[(IcfgEdgeKind, IcfgNode)];
    fn in_edges(&self, node: IcfgNode) -> &[(IcfgEdgeKind, IcfgNode)];
    fn containing_method(&self, node: IcfgNode) -> MethodId {
        node.method
    }
}

/// A concrete, in-memory `Icfg`, glued together from a program's
/// per-method CFGs and a resolved call graph (on-the-fly from the PTA
/// solver, or the standalone CHA builder in `graph::cha`). Test fixture
/// only, the same way `InMemoryProgram` is — it never discovers call
/// edges itself, only wires up the ones it is handed.
#[derive(Default)]
pub struct InMemoryIcfg {
    entries: HashMap<MethodId, IcfgNode>,
    nodes: Vec<IcfgNode>,
    out: HashMap<IcfgNode, Vec<(IcfgEdgeKind, IcfgNode)>>,
    r#in: HashMap<IcfgNode, Vec<(IcfgEdgeKind, IcfgNode)>>,
}

impl InMemoryIcfg {
    fn add_edge(&mut self, from: IcfgNode, kind: IcfgEdgeKind, to: IcfgNode) {
        let out_edges = self.out.entry(from).or_default();
        if !out_edges.iter().any(|&(k, n)| k == kind && n == to) {
            out_edges.push((kind, to));
        }
        let in_edges = self.r#in.entry(to).or_default();
        if !in_edges.iter().any(|&(k, n)| k == kind && n == from) {
            in_edges.push((kind, from));
        }
    }
}

impl Icfg for InMemoryIcfg {
    fn entry_node(&self, method: MethodId) -> IcfgNode {
        *self.entries.get(&method).expect("method not in this ICFG")
    }
    fn nodes(&self) -> &[IcfgNode] {
        &self.nodes
    }
    fn out_edges(&self, node: IcfgNode) -> &[(IcfgEdgeKind, IcfgNode)] {
        self.out.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }
    fn in_edges(&self, node: IcfgNode) -> &[(IcfgEdgeKind, IcfgNode)] {
        self.r#in.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Builds an `InMemoryIcfg` over every `reachable` method, connecting
/// call sites to callees per `call_graph` (§4.5):
///
/// - every non-call statement keeps its intra-procedural CFG successors
///   as `NORMAL` ICFG edges;
/// - a call site gets one `CALL` edge to each resolved callee's entry
///   node, one `CALL_TO_RETURN` edge to its own CFG fallthrough
///   successor (skipping the call), and one `RETURN` edge from every
///   `return` statement in each resolved callee back to that same
///   fallthrough successor.
///
/// A call site with zero resolved callees (an unreached dispatch target,
/// or a call the supplied graph simply never recorded) still keeps its
/// `CALL_TO_RETURN` edge, so the fallthrough is never severed.
pub fn build_icfg(
    program: &dyn Program,
    reachable: &[MethodId],
    call_graph: &CallGraph<MethodId, StmtId>,
) -> InMemoryIcfg {
    let mut icfg = InMemoryIcfg::default();

    for &m in reachable {
        let entry = program.cfg(m).entry();
        icfg.entries.insert(m, IcfgNode { method: m, stmt: entry });
        for &s in program.cfg(m).stmts() {
            icfg.nodes.push(IcfgNode { method: m, stmt: s });
        }
    }

    for &m in reachable {
        let cfg = program.cfg(m);
        let method = program.method(m);
        for &s in cfg.stmts() {
            let node = IcfgNode { method: m, stmt: s };
            let is_call = matches!(method.stmt(s), Stmt::Invoke(_));
            if !is_call {
                for &(_, to) in cfg.successors(s) {
                    icfg.add_edge(node, IcfgEdgeKind::Normal, IcfgNode { method: m, stmt: to });
                }
                continue;
            }
            let fallthroughs: Vec<StmtId> = cfg.successors(s).iter().map(|&(_, to)| to).collect();
            for &to in &fallthroughs {
                icfg.add_edge(node, IcfgEdgeKind::CallToReturn, IcfgNode { method: m, stmt: to });
            }
            for callee in call_graph.get_callees(&s) {
                if !reachable.contains(&callee) {
                    continue;
                }
                let callee_entry = icfg.entry_node(callee);
                icfg.add_edge(node, IcfgEdgeKind::Call, callee_entry);
                let callee_method = program.method(callee);
                for &ret_stmt in callee_method.stmts() {
                    if matches!(callee_method.stmt(ret_stmt), Stmt::Return { .. }) {
                        let ret_node = IcfgNode { method: callee, stmt: ret_stmt };
                        for &to in &fallthroughs {
                            icfg.add_edge(ret_node, IcfgEdgeKind::Return, IcfgNode { method: m, stmt: to });
                        }
                    }
                }
            }
        }
    }

    icfg
}
