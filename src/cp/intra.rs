//! Intra-procedural constant propagation (§4.4): a forward worklist
//! solver over a single method's CFG.

use std::collections::VecDeque;

use crate::cp::evaluator::evaluate;
use crate::cp::lattice::{CPFact, Value};
use crate::cp::DataflowResult;
use crate::ir::cfg::Cfg;
use crate::ir::method::Method;
use crate::ir::program::Program;
use crate::ir::stmt::Stmt;
use crate::ir::types::{MethodId, StmtId, VarId};

/// The definition-update half of §4.4's transfer rule: `out := in` with
/// `lhs ↦ evaluate(rhs, in)` (or `UNDEF` if `lhs` cannot hold an
/// integer). Shared with the inter-procedural solver, which only
/// special-cases call, field and array statements before falling back
/// to this for everything else (§4.5 "elsewhere: same as intra
/// transfer"). Returns `None` for statements that define no variable.
pub fn basic_def_value(program: &dyn Program, stmt: &Stmt, in_fact: &CPFact) -> Option<(VarId, Value)> {
    let lhs = stmt.def()?;
    if !program.var_type(lhs).can_hold_int() {
        return Some((lhs, Value::Undef));
    }
    let value = match stmt {
        Stmt::Copy { rhs, .. } => in_fact.get(*rhs),
        Stmt::Assign { rhs, .. } => evaluate(rhs, in_fact),
        // New, field/array loads without the alias extension, and
        // invoke results: "other expression kinds... NAC" (§4.4).
        _ => Value::Nac,
    };
    Some((lhs, value))
}

/// Runs the intra-procedural solver over `method`'s CFG, returning the
/// in/out fact at every statement. Every parameter that can hold an
/// integer is preset to `NAC` at the entry (§4.4's boundary fact); the
/// intra solver has no notion of a caller, so this is the only way a
/// parameter ever becomes more precise than `UNDEF`.
pub fn solve_intra(program: &dyn Program, method_id: MethodId) -> DataflowResult<StmtId, CPFact> {
    let method = program.method(method_id);
    let cfg = program.cfg(method_id);
    let mut result: DataflowResult<StmtId, CPFact> = DataflowResult::new();

    let mut boundary = CPFact::new();
    for &p in method.params() {
        if program.var_type(p).can_hold_int() {
            boundary.update(p, Value::Nac);
        }
    }

    let entry = cfg.entry();
    let mut worklist: VecDeque<StmtId> = VecDeque::new();
    worklist.push_back(entry);

    while let Some(stmt_id) = worklist.pop_front() {
        let mut in_fact = if stmt_id == entry { boundary.clone() } else { CPFact::new() };
        for &pred in cfg.predecessors(stmt_id) {
            if let Some(pred_out) = result.out_fact(pred) {
                in_fact.meet_into(pred_out);
            }
        }

        let already_visited = result.out_fact(stmt_id).is_some();
        let changed_in = match result.in_fact(stmt_id) {
            None => true,
            Some(prev) => !prev.equals(&in_fact),
        };
        result.set_in(stmt_id, in_fact.clone());
        if already_visited && !changed_in {
            continue;
        }

        let mut out = in_fact.clone();
        if let Some((lhs, value)) = basic_def_value(program, method.stmt(stmt_id), &in_fact) {
            out.update(lhs, value);
        }

        let changed_out = match result.out_fact(stmt_id) {
            None => true,
            Some(prev) => !prev.equals(&out),
        };
        result.set_out(stmt_id, out);

        if changed_out {
            for &(_, succ) in cfg.successors(stmt_id) {
                worklist.push_back(succ);
            }
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::cfg::CfgEdgeKind;
    use crate::ir::program::{MethodBuilder, ProgramBuilder};
    use crate::ir::stmt::{BinOp, RValue};
    use crate::ir::types::Type;

    /// `x = 3; y = x + 4;` — straight line, no branches.
    #[test]
    fn straight_line_folds_constants() {
        let mut b = ProgramBuilder::new();
        let class = b.new_class();
        b.add_class(class, None);
        let m = b.new_method_id();
        let mut mb = MethodBuilder::new(m, class, "m()", "C.m()", true);
        let x = b.new_var(Type::Int);
        let y = b.new_var(Type::Int);
        let s1 = b.new_stmt_id();
        mb.add_stmt(s1, Stmt::Assign { lhs: x, rhs: RValue::IntConst(3) });
        let s2 = b.new_stmt_id();
        mb.add_stmt(
            s2,
            Stmt::Assign {
                lhs: y,
                rhs: RValue::Binary(BinOp::Add, Box::new(RValue::Var(x)), Box::new(RValue::IntConst(4))),
            },
        );
        let s3 = b.new_stmt_id();
        mb.add_stmt(s3, Stmt::Return { var: Some(y) });
        b.add_method(mb);
        let program = b.build();

        let result = solve_intra(&program, m);
        assert_eq!(result.out_fact(s2).unwrap().get(y), Value::Const(7));
    }

    /// A parameter that can hold an int starts life as `NAC`, not `UNDEF`.
    #[test]
    fn int_parameter_is_nac_at_entry() {
        let mut b = ProgramBuilder::new();
        let class = b.new_class();
        b.add_class(class, None);
        let m = b.new_method_id();
        let mut mb = MethodBuilder::new(m, class, "m(int)", "C.m(int)", true);
        let p = b.new_var(Type::Int);
        mb.add_param(p);
        let s1 = b.new_stmt_id();
        mb.add_stmt(s1, Stmt::Return { var: Some(p) });
        b.add_method(mb);
        let program = b.build();

        let result = solve_intra(&program, m);
        assert_eq!(result.in_fact(s1).unwrap().get(p), Value::Nac);
    }

    /// `if (1 < 0) a = 1; else a = 2;` — both arms still get folded
    /// individually; the join at a successor after the branch is what
    /// dead-code detection (§4.7) builds on top of, not this solver.
    #[test]
    fn branch_arms_each_fold_independently() {
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
        mb.add_edge(if_stmt, CfgEdgeKind::IfTrue, then_stmt);
        mb.add_edge(if_stmt, CfgEdgeKind::IfFalse, else_stmt);
        mb.add_stmt(then_stmt, Stmt::Assign { lhs: a, rhs: RValue::IntConst(1) });
        mb.add_edge(then_stmt, CfgEdgeKind::Normal, ret_stmt);
        mb.add_stmt(else_stmt, Stmt::Assign { lhs: a, rhs: RValue::IntConst(2) });
        mb.add_edge(else_stmt, CfgEdgeKind::Normal, ret_stmt);
        mb.add_stmt(ret_stmt, Stmt::Return { var: Some(a) });
        b.add_method(mb);
        let program = b.build();

        let result = solve_intra(&program, m);
        assert_eq!(result.out_fact(then_stmt).unwrap().get(a), Value::Const(1));
        assert_eq!(result.out_fact(else_stmt).unwrap().get(a), Value::Const(2));
        assert_eq!(result.in_fact(ret_stmt).unwrap().get(a), Value::Nac);
    }
}
