//! Boundary scenarios (§8): empty method, allocation-only method,
//! direct recursion, and mutual recursion. Each exercises the solver's
//! termination on cyclic call graphs and reachable-method bookkeeping
//! rather than any particular points-to result.

use wpta::ir::method::CallKind;
use wpta::ir::class_hierarchy::Subsignature;
use wpta::ir::program::{invoke, MethodBuilder, ProgramBuilder};
use wpta::ir::stmt::Stmt;
use wpta::ir::types::Type;
use wpta::pta::solver::PointerAnalysisSolver;

/// An empty method: a single `return;` and nothing else. The solver
/// must mark it reachable and terminate without visiting any field,
/// array or call rules.
#[test]
fn empty_method_is_reachable_and_terminates() {
    let mut b = ProgramBuilder::new();
    let class = b.new_class();
    b.add_class(class, None);
    let m = b.new_method_id();
    let mut mb = MethodBuilder::new(m, class, "empty()", "C.empty()", true);
    let s = b.new_stmt_id();
    mb.add_stmt(s, Stmt::Return { var: None });
    b.add_method(mb);
    let program = b.build();

    let result = PointerAnalysisSolver::new_context_insensitive(&program).solve(m);
    assert_eq!(result.reachable_methods(), std::collections::HashSet::from([m]));
    assert!(result.taint_flows().is_empty());
}

/// A method with only a single `new`, never stored anywhere read again:
/// the allocation is still witnessed in `x`'s points-to set even though
/// nothing downstream ever uses it.
#[test]
fn method_with_only_a_new_records_the_allocation() {
    let mut b = ProgramBuilder::new();
    let class = b.new_class();
    b.add_class(class, None);
    let m = b.new_method_id();
    let mut mb = MethodBuilder::new(m, class, "m()", "C.m()", true);
    let x = b.new_var(Type::Class(class));
    let s_new = b.new_stmt_id();
    mb.add_stmt(s_new, Stmt::New { lhs: x, class });
    let s_ret = b.new_stmt_id();
    mb.add_stmt(s_ret, Stmt::Return { var: None });
    b.register_alloc(s_new, class);
    b.add_method(mb);
    let program = b.build();

    let result = PointerAnalysisSolver::new_context_insensitive(&program).solve(m);
    let pts = result.ci_pts_var(x);
    assert_eq!(pts.len(), 1);
}

/// Direct recursion: `m()` calls itself unconditionally. The solver must
/// not loop forever discovering the same call-graph edge repeatedly
/// (`addReachable`/`add_edge` idempotence, §4.2/§9).
#[test]
fn direct_recursion_terminates() {
    let mut b = ProgramBuilder::new();
    let class = b.new_class();
    b.add_class(class, None);
    let m = b.new_method_id();
    let mut mb = MethodBuilder::new(m, class, "m()", "C.m()", true);
    let s_call = b.new_stmt_id();
    mb.add_stmt(
        s_call,
        Stmt::Invoke(invoke(s_call, CallKind::Static, m, Subsignature::from("m()"), None, vec![], None)),
    );
    let s_ret = b.new_stmt_id();
    mb.add_stmt(s_ret, Stmt::Return { var: None });
    b.add_method(mb);
    let program = b.build();

    let result = PointerAnalysisSolver::new_context_insensitive(&program).solve(m);
    assert_eq!(result.reachable_methods(), std::collections::HashSet::from([m]));
    let callees = result.callees_at(s_call);
    assert_eq!(callees, std::collections::HashSet::from([m]));
}

/// Mutual recursion: `a()` calls `b()`, `b()` calls `a()`. Both stay
/// reachable and the solver still terminates.
#[test]
fn mutual_recursion_terminates() {
    let mut b = ProgramBuilder::new();
    let class = b.new_class();
    b.add_class(class, None);

    let m_a = b.new_method_id();
    let m_b = b.new_method_id();

    let mut mb_a = MethodBuilder::new(m_a, class, "a()", "C.a()", true);
    let s_call_b = b.new_stmt_id();
    mb_a.add_stmt(
        s_call_b,
        Stmt::Invoke(invoke(s_call_b, CallKind::Static, m_b, Subsignature::from("b()"), None, vec![], None)),
    );
    let s_ret_a = b.new_stmt_id();
    mb_a.add_stmt(s_ret_a, Stmt::Return { var: None });
    b.add_method(mb_a);

    let mut mb_b = MethodBuilder::new(m_b, class, "b()", "C.b()", true);
    let s_call_a = b.new_stmt_id();
    mb_b.add_stmt(
        s_call_a,
        Stmt::Invoke(invoke(s_call_a, CallKind::Static, m_a, Subsignature::from("a()"), None, vec![], None)),
    );
    let s_ret_b = b.new_stmt_id();
    mb_b.add_stmt(s_ret_b, Stmt::Return { var: None });
    b.add_method(mb_b);

    let program = b.build();
    let result = PointerAnalysisSolver::new_context_insensitive(&program).solve(m_a);

    assert_eq!(result.reachable_methods(), std::collections::HashSet::from([m_a, m_b]));
}

/// The context-sensitive variant over the same mutually-recursive
/// program: the context universe is unbounded in principle (each
/// recursive call extends the call-site chain) but `k`-call-site
/// truncation (§9 "Context-selector arity") keeps it finite, so the
/// solver still reaches a fixed point.
#[test]
fn mutual_recursion_terminates_context_sensitively() {
    let mut b = ProgramBuilder::new();
    let class = b.new_class();
    b.add_class(class, None);

    let m_a = b.new_method_id();
    let m_b = b.new_method_id();

    let mut mb_a = MethodBuilder::new(m_a, class, "a()", "C.a()", true);
    let s_call_b = b.new_stmt_id();
    mb_a.add_stmt(
        s_call_b,
        Stmt::Invoke(invoke(s_call_b, CallKind::Static, m_b, Subsignature::from("b()"), None, vec![], None)),
    );
    let s_ret_a = b.new_stmt_id();
    mb_a.add_stmt(s_ret_a, Stmt::Return { var: None });
    b.add_method(mb_a);

    let mut mb_b = MethodBuilder::new(m_b, class, "b()", "C.b()", true);
    let s_call_a = b.new_stmt_id();
    mb_b.add_stmt(
        s_call_a,
        Stmt::Invoke(invoke(s_call_a, CallKind::Static, m_a, Subsignature::from("a()"), None, vec![], None)),
    );
    let s_ret_b = b.new_stmt_id();
    mb_b.add_stmt(s_ret_b, Stmt::Return { var: None });
    b.add_method(mb_b);

    let program = b.build();
    let result = PointerAnalysisSolver::new_context_sensitive(&program, 2).solve(m_a);

    let reachable = result.reachable_methods();
    assert!(reachable.contains(&m_a));
    assert!(reachable.contains(&m_b));
}
