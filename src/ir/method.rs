//! Method contract (§6 `IR` collaborator: per-method access to
//! statements, parameters, `this`, return variables, and for each
//! variable the sets of statements that store/load a field or array
//! through it, or invoke through it as receiver).

use crate::ir::class_hierarchy::Subsignature;
use crate::ir::stmt::Stmt;
use crate::ir::types::{ClassId, MethodId, StmtId, VarId};

/// The kind of a call site, classified the way CHA needs to dispatch it
/// (§4.3).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Resolved directly to the declaring class's method, no dispatch.
    Static,
    /// Constructors, private methods, `super` calls: dispatch starts at
    /// the declaring class, not the receiver's runtime class.
    Special,
    /// Ordinary virtual dispatch on a class receiver.
    Virtual,
    /// Virtual dispatch on an interface-typed receiver.
    Interface,
}

pub trait Method {
    fn id(&self) -> MethodId;
    fn declaring_class(&self) -> ClassId;
    fn subsignature(&self) -> &Subsignature;
    fn is_abstract(&self) -> bool;
    fn is_static(&self) -> bool;
    /// Parameters in declaration order (does not include `this`).
    fn params(&self) -> &[VarId];
    fn this_var(&self) -> Option<VarId>;
    /// Every variable that is returned from some `return` statement in
    /// the method body (multiple return statements may return different
    /// variables; §4.5 RETURN edge transfer meets over all of them).
    fn return_vars(&self) -> &[VarId];
    /// Ordered statement ids making up the method body.
    fn stmts(&self) -> &[StmtId];
    /// Fetches the statement data for one of this method's own ids.
    fn stmt(&self, id: StmtId) -> &Stmt;

    fn is_abstract_or_native(&self) -> bool {
        self.is_abstract()
    }

    /// Every `x.f = y` statement in this method with `x == var` (§4.2
    /// rule 1, deferred until `var`'s points-to set grows).
    fn stores_field_of(&self, var: VarId) -> Vec<StmtId> {
        self.stmts()
            .iter()
            .copied()
            .filter(|&id| matches!(self.stmt(id), Stmt::InstanceStore { base, .. } if *base == var))
            .collect()
    }

    /// Every `z = x.f` statement in this method with `x == var` (§4.2
    /// rule 2).
    fn loads_field_of(&self, var: VarId) -> Vec<StmtId> {
        self.stmts()
            .iter()
            .copied()
            .filter(|&id| matches!(self.stmt(id), Stmt::InstanceLoad { base, .. } if *base == var))
            .collect()
    }

    /// Every `x[i] = y` statement in this method with `x == var` (§4.2
    /// rule 3).
    fn stores_array_of(&self, var: VarId) -> Vec<StmtId> {
        self.stmts()
            .iter()
            .copied()
            .filter(|&id| matches!(self.stmt(id), Stmt::ArrayStore { base, .. } if *base == var))
            .collect()
    }

    /// Every `z = x[i]` statement in this method with `x == var` (§4.2
    /// rule 4).
    fn loads_array_of(&self, var: VarId) -> Vec<StmtId> {
        self.stmts()
            .iter()
            .copied()
            .filter(|&id| matches!(self.stmt(id), Stmt::ArrayLoad { base, .. } if *base == var))
            .collect()
    }

    /// Every `Invoke` statement in this method with `var` as receiver
    /// (§4.2 rule 5).
    fn invokes_with_receiver(&self, var: VarId) -> Vec<StmtId> {
        self.stmts()
            .iter()
            .copied()
            .filter(|&id| matches!(self.stmt(id), Stmt::Invoke(call) if call.receiver == Some(var)))
            .collect()
    }
}
