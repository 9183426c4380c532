//! Backward live-variable analysis (§4.7.1 supplement): the only
//! dependency of the dead-assignment rule in `deadcode::detector`, and
//! the one piece of dataflow machinery the distilled spec names but
//! leaves unspecified ("a standard backward fact system; not
//! respecified").

use std::collections::{HashMap, HashSet, VecDeque};

use crate::ir::cfg::Cfg;
use crate::ir::method::Method;
use crate::ir::types::{StmtId, VarId};

pub type LiveSet = HashSet<VarId>;

/// In/out live-variable sets per statement. The boundary (exit) fact is
/// the empty set; there is no separate representation for it; a
/// statement with no recorded `out` simply reads back empty, which is
/// exactly the boundary fact.
pub struct LivenessResult {
    in_sets: HashMap<StmtId, LiveSet>,
    out_sets: HashMap<StmtId, LiveSet>,
}

impl LivenessResult {
    pub fn live_in(&self, stmt: StmtId) -> LiveSet {
        self.in_sets.get(&stmt).cloned().unwrap_or_default()
    }

    pub fn live_out(&self, stmt: StmtId) -> LiveSet {
        self.out_sets.get(&stmt).cloned().unwrap_or_default()
    }
}

/// `in(s) = (out(s) \ {def(s)}) ∪ use(s)`; `out(s) = ⋃ in(succ)` over
/// `s`'s CFG successors. Standard backward worklist: a node is
/// reprocessed whenever one of its successors' `in` set changes.
pub fn solve_liveness(method: &dyn Method, cfg: &dyn Cfg) -> LivenessResult {
    let mut ins: HashMap<StmtId, LiveSet> = HashMap::new();
    let mut outs: HashMap<StmtId, LiveSet> = HashMap::new();

    let mut queued: HashSet<StmtId> = cfg.stmts().iter().copied().collect();
    let mut worklist: VecDeque<StmtId> = cfg.stmts().iter().copied().collect();

    while let Some(stmt_id) = worklist.pop_front() {
        queued.remove(&stmt_id);

        let mut out_set = LiveSet::new();
        for &(_, succ) in cfg.successors(stmt_id) {
            if let Some(succ_in) = ins.get(&succ) {
                out_set.extend(succ_in.iter().copied());
            }
        }

        let stmt = method.stmt(stmt_id);
        let mut in_set = out_set.clone();
        if let Some(def) = stmt.def() {
            in_set.remove(&def);
        }
        for used in stmt.uses() {
            in_set.insert(used);
        }

        outs.insert(stmt_id, out_set);
        let changed = ins.get(&stmt_id).map(|prev| *prev != in_set).unwrap_or(true);
        if changed {
            ins.insert(stmt_id, in_set);
            for &pred in cfg.predecessors(stmt_id) {
                if queued.insert(pred) {
                    worklist.push_back(pred);
                }
            }
        }
    }

    LivenessResult { in_sets: ins, out_sets: outs }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::program::{MethodBuilder, ProgramBuilder};
    use crate::ir::stmt::{BinOp, RValue, Stmt};
    use crate::ir::types::Type;

    /// `x = 1; y = x + 1; return y;` — `x` is live only between its
    /// definition and the statement that consumes it.
    #[test]
    fn variable_dies_after_its_last_use() {
        let mut b = ProgramBuilder::new();
        let class = b.new_class();
        b.add_class(class, None);
        let m = b.new_method_id();
        let mut mb = MethodBuilder::new(m, class, "m()", "C.m()", true);
        let x = b.new_var(Type::Int);
        let y = b.new_var(Type::Int);
        let s1 = b.new_stmt_id();
        mb.add_stmt(s1, Stmt::Assign { lhs: x, rhs: RValue::IntConst(1) });
        let s2 = b.new_stmt_id();
        mb.add_stmt(
            s2,
            Stmt::Assign {
                lhs: y,
                rhs: RValue::Binary(BinOp::Add, Box::new(RValue::Var(x)), Box::new(RValue::IntConst(1))),
            },
        );
        let s3 = b.new_stmt_id();
        mb.add_stmt(s3, Stmt::Return { var: Some(y) });
        b.add_method(mb);
        let program = b.build();

        let liveness = solve_liveness(program.method(m), program.cfg(m));
        assert!(liveness.live_out(s1).contains(&x));
        assert!(!liveness.live_out(s2).contains(&x));
        assert!(liveness.live_in(s3).contains(&y));
        assert!(liveness.live_out(s3).is_empty());
    }

    /// `x = 1; x = 2; return x;` — the first assignment's value is
    /// never read: `x` is not live immediately after it.
    #[test]
    fn overwritten_before_any_use_is_not_live() {
        let mut b = ProgramBuilder::new();
        let class = b.new_class();
        b.add_class(class, None);
        let m = b.new_method_id();
        let mut mb = MethodBuilder::new(m, class, "m()", "C.m()", true);
        let x = b.new_var(Type::Int);
        let s1 = b.new_stmt_id();
        mb.add_stmt(s1, Stmt::Assign { lhs: x, rhs: RValue::IntConst(1) });
        let s2 = b.new_stmt_id();
        mb.add_stmt(s2, Stmt::Assign { lhs: x, rhs: RValue::IntConst(2) });
        let s3 = b.new_stmt_id();
        mb.add_stmt(s3, Stmt::Return { var: Some(x) });
        b.add_method(mb);
        let program = b.build();

        let liveness = solve_liveness(program.method(m), program.cfg(m));
        assert!(!liveness.live_out(s1).contains(&x));
        assert!(liveness.live_out(s2).contains(&x));
    }
}
