//! Class-hierarchy-analysis call-graph construction (§4.3), standalone
//! and on-the-fly. Both share `resolve_kind`, the single-type dispatch
//! rule; the standalone builder additionally unions over every subtype
//! for virtual/interface sites.

use std::collections::HashSet;

use log::debug;

use crate::graph::call_graph::CallGraph;
use crate::ir::method::{CallKind, Method};
use crate::ir::program::Program;
use crate::ir::stmt::{Invoke, Stmt};
use crate::ir::types::{ClassId, MethodId, StmtId};

/// Resolves the callee of `call` when the receiver's runtime type is
/// known to be exactly `recv_class` (the on-the-fly case inside PTA, or
/// one term of the standalone union over subtypes). `None` is a
/// dispatch miss, not an error (§7, §9 Open Questions).
pub fn resolve_kind(program: &dyn Program, call: &Invoke, recv_class: ClassId) -> Option<MethodId> {
    let ch = program.class_hierarchy();
    match call.kind {
        CallKind::Static => Some(call.declaring_method),
        CallKind::Special => {
            let declaring_class = program.method(call.declaring_method).declaring_class();
            ch.dispatch(declaring_class, &call.subsignature)
        }
        CallKind::Virtual | CallKind::Interface => ch.dispatch(recv_class, &call.subsignature),
    }
}

/// Resolves every callee CHA can see for `call`: for `Static`/`Special`
/// this is a single target (or none); for `Virtual`/`Interface` it is
/// the union of dispatch over every subtype of the statically declared
/// receiver class, including the class itself (§4.3).
pub fn resolve_all(program: &dyn Program, call: &Invoke) -> Vec<MethodId> {
    match call.kind {
        CallKind::Static | CallKind::Special => {
            let declaring_class = program.method(call.declaring_method).declaring_class();
            resolve_kind(program, call, declaring_class).into_iter().collect()
        }
        CallKind::Virtual | CallKind::Interface => {
            let declaring_class = program.method(call.declaring_method).declaring_class();
            let ch = program.class_hierarchy();
            let mut out = Vec::new();
            for sub in ch.all_subtypes(declaring_class) {
                if let Some(m) = resolve_kind(program, call, sub) {
                    out.push(m);
                } else {
                    debug!("CHA dispatch miss for {:?} on subtype {:?}", call.subsignature, sub);
                }
            }
            out
        }
    }
}

/// Builds a standalone CHA call graph by BFS/DFS from `entry`, without
/// any pointer-analysis refinement: every virtual/interface call site
/// fans out to every CHA-resolvable subtype implementation.
pub fn build_cha(program: &dyn Program, entry: MethodId) -> CallGraph<MethodId, StmtId> {
    let mut cg = CallGraph::new();
    cg.add_reachable_method(entry);
    let mut worklist = vec![entry];
    let mut processed = HashSet::new();

    while let Some(caller) = worklist.pop() {
        if !processed.insert(caller) {
            continue;
        }
        let method = program.method(caller);
        for &stmt_id in method.stmts() {
            if let Stmt::Invoke(call) = method.stmt(stmt_id) {
                for callee in resolve_all(program, call) {
                    let was_reachable = cg.is_reachable(callee);
                    cg.add_edge(stmt_id, call.kind, caller, callee);
                    if !was_reachable {
                        worklist.push(callee);
                    }
                }
            }
        }
    }
    cg
}
