//! Dead-code detection (§4.7): unreachable-code/branch DFS, plus a
//! dead-assignment check built on live-variable analysis. Runs after
//! constant propagation, reusing its `in` facts to decide statically
//! taken branches.

use std::collections::HashSet;

use crate::cp::evaluator::evaluate;
use crate::cp::lattice::{CPFact, Value};
use crate::cp::DataflowResult;
use crate::deadcode::liveness::solve_liveness;
use crate::ir::cfg::{Cfg, CfgEdgeKind};
use crate::ir::method::Method;
use crate::ir::stmt::Stmt;
use crate::ir::types::StmtId;
use crate::util::bit_vec::Idx;

/// Every dead statement id in `method`, in ascending program order (§6:
/// "ordered set of statement indices"). Entry and exit (`return`)
/// statements are never reported (§4.7).
pub fn detect_dead_code(method: &dyn Method, cfg: &dyn Cfg, cp: &DataflowResult<StmtId, CPFact>) -> Vec<StmtId> {
    // §4.7 describes two DFS passes — plain reachability, then a second
    // pass honoring statically-decided branches — whose dead sets are
    // unioned. The second pass only ever takes a subset of the first
    // pass's edges, so its reachable set is already a subset of the
    // first pass's; the union of the two complements therefore equals
    // the complement of the second pass alone. One DFS suffices.
    let live_stmts = reachable_honoring_branches(method, cfg, cp);
    let liveness = solve_liveness(method, cfg);

    let mut dead: HashSet<StmtId> = HashSet::new();
    for &stmt_id in cfg.stmts() {
        if !live_stmts.contains(&stmt_id) {
            dead.insert(stmt_id);
        }
    }

    for &stmt_id in cfg.stmts() {
        if dead.contains(&stmt_id) {
            continue;
        }
        let stmt = method.stmt(stmt_id);
        let Some(lhs) = stmt.def() else { continue };
        if !stmt.is_side_effect_free_rhs() {
            continue;
        }
        if !liveness.live_out(stmt_id).contains(&lhs) {
            dead.insert(stmt_id);
        }
    }

    dead.remove(&cfg.entry());
    for &stmt_id in cfg.stmts() {
        if matches!(method.stmt(stmt_id), Stmt::Return { .. }) {
            dead.remove(&stmt_id);
        }
    }

    let mut out: Vec<StmtId> = dead.into_iter().collect();
    out.sort_by_key(|s| s.index());
    out
}

/// DFS from `cfg.entry()`, taking only the edge(s) a constant `if`/
/// `switch` condition statically decides (§4.7 pass 2); a non-constant
/// condition keeps every outgoing edge, same as plain reachability.
fn reachable_honoring_branches(method: &dyn Method, cfg: &dyn Cfg, cp: &DataflowResult<StmtId, CPFact>) -> HashSet<StmtId> {
    let mut visited: HashSet<StmtId> = HashSet::new();
    let mut stack = vec![cfg.entry()];

    while let Some(stmt_id) = stack.pop() {
        if !visited.insert(stmt_id) {
            continue;
        }
        let stmt = method.stmt(stmt_id);
        let succs = cfg.successors(stmt_id);
        let in_fact = cp.in_fact(stmt_id);

        match stmt {
            Stmt::If { cond } => {
                let value = in_fact.map(|f| evaluate(cond, f)).unwrap_or(Value::Nac);
                match value.as_const() {
                    Some(c) => {
                        let taken = if c != 0 { CfgEdgeKind::IfTrue } else { CfgEdgeKind::IfFalse };
                        for &(kind, to) in succs {
                            if kind == taken {
                                stack.push(to);
                            }
                        }
                    }
                    None => {
                        for &(_, to) in succs {
                            stack.push(to);
                        }
                    }
                }
            }
            Stmt::Switch { subject, cases } => {
                let value = in_fact.map(|f| evaluate(subject, f)).unwrap_or(Value::Nac);
                match value.as_const() {
                    Some(c) => {
                        let has_case = cases.contains(&c);
                        for &(kind, to) in succs {
                            let take = match kind {
                                CfgEdgeKind::SwitchCase(v) => v == c,
                                CfgEdgeKind::SwitchDefault => !has_case,
                                _ => false,
                            };
                            if take {
                                stack.push(to);
                            }
                        }
                    }
                    None => {
                        for &(_, to) in succs {
                            stack.push(to);
                        }
                    }
                }
            }
            _ => {
                for &(_, to) in succs {
                    stack.push(to);
                }
            }
        }
    }

    visited
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cp::intra::solve_intra;
    use crate::ir::cfg::CfgEdgeKind as Edge;
    use crate::ir::program::{MethodBuilder, ProgramBuilder};
    use crate::ir::stmt::{BinOp, RValue};
    use crate::ir::types::Type;

    /// §8 scenario 4: `if (1 < 0) dead(); else live();` — modeled with
    /// plain assignments standing in for the two call-sites' effects:
    /// the `then` arm is dead code, the `else` arm is not.
    #[test]
    fn unreachable_branch_is_marked_dead() {
        let mut b = ProgramBuilder::new();
        let class = b.new_class();
        b.add_class(class, None);
        let m = b.new_method_id();
        let mut mb = MethodBuilder::new(m, class, "m()", "C.m()", true);
        let a = b.new_var(Type::Int);

        let if_stmt = b.new_stmt_id();
        let then_stmt = b.new_stmt_id();
        let else_stmt = b.new_stmt_id();
        let ret_stmt = b.new_stmt_id();

        mb.add_stmt(
            if_stmt,
            Stmt::If {
                cond: RValue::Binary(BinOp::Lt, Box::new(RValue::IntConst(1)), Box::new(RValue::IntConst(0))),
            },
        );
        mb.add_edge(if_stmt, Edge::IfTrue, then_stmt);
        mb.add_edge(if_stmt, Edge::IfFalse, else_stmt);
        mb.add_stmt(then_stmt, Stmt::Assign { lhs: a, rhs: RValue::IntConst(1) });
        mb.add_edge(then_stmt, Edge::Normal, ret_stmt);
        mb.add_stmt(else_stmt, Stmt::Assign { lhs: a, rhs: RValue::IntConst(2) });
        mb.add_edge(else_stmt, Edge::Normal, ret_stmt);
        mb.add_stmt(ret_stmt, Stmt::Return { var: Some(a) });
        b.add_method(mb);
        let program = b.build();

        let cp_result = solve_intra(&program, m);
        let dead = detect_dead_code(program.method(m), program.cfg(m), &cp_result);

        assert!(dead.contains(&then_stmt));
        assert!(!dead.contains(&else_stmt));
        assert!(!dead.contains(&if_stmt));
        assert!(!dead.contains(&ret_stmt));
    }

    /// `x = 1; x = 2; return x;` — the first assignment is a dead store.
    #[test]
    fn dead_assignment_is_reported() {
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

        let cp_result = solve_intra(&program, m);
        let dead = detect_dead_code(program.method(m), program.cfg(m), &cp_result);
        assert_eq!(dead, vec![s1]);
    }

    /// `a = read(); b = a / 0;` is unreachable-safe (division by a
    /// literal zero always folds to `UNDEF`, never panics) and is not
    /// itself dead code — only the live-variable/branch rules mark
    /// statements dead, not side effects of evaluation.
    #[test]
    fn divide_by_constant_zero_does_not_crash_the_detector() {
        let mut b = ProgramBuilder::new();
        let class = b.new_class();
        b.add_class(class, None);
        let m = b.new_method_id();
        let mut mb = MethodBuilder::new(m, class, "m()", "C.m()", true);
        let a = b.new_var(Type::Int);
        let bv = b.new_var(Type::Int);
        mb.add_param(a);
        let s1 = b.new_stmt_id();
        mb.add_stmt(
            s1,
            Stmt::Assign {
                lhs: bv,
                rhs: RValue::Binary(BinOp::Div, Box::new(RValue::Var(a)), Box::new(RValue::IntConst(0))),
            },
        );
        let s2 = b.new_stmt_id();
        mb.add_stmt(s2, Stmt::Return { var: Some(bv) });
        b.add_method(mb);
        let program = b.build();

        let cp_result = solve_intra(&program, m);
        assert_eq!(cp_result.out_fact(s1).unwrap().get(bv), Value::Undef);
        let dead = detect_dead_code(program.method(m), program.cfg(m), &cp_result);
        assert!(!dead.contains(&s1));
    }
}
