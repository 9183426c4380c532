//! Statement and expression shapes. Modeled as a closed sum type
//! (§9 "dynamic dispatch in the source pattern... a closed sum type,
//! implemented as a tagged variant with an exhaustive match") rather than
//! open polymorphism, since every analysis in this crate needs to match
//! exhaustively on statement/expression kind.

use crate::ir::class_hierarchy::Subsignature;
use crate::ir::method::CallKind;
use crate::ir::types::{FieldId, MethodId, StmtId, VarId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    UShr,
    Or,
    And,
    Xor,
}

impl BinOp {
    pub fn is_divide(&self) -> bool {
        matches!(self, BinOp::Div | BinOp::Rem)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RValue {
    Var(VarId),
    IntConst(i32),
    Binary(BinOp, Box<RValue>, Box<RValue>),
    /// Anything this engine does not model precisely (casts, floats,
    /// reference equality, ...): falls through to NAC per §4.4.
    Opaque,
}

/// A single call-site's static shape: which method (by subsignature on
/// the receiver's declared type, used for dispatch), its kind, receiver
/// and arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Invoke {
    pub call_site: StmtId,
    pub kind: CallKind,
    /// The method as statically declared at the call site; for
    /// `Virtual`/`Interface` sites this is redispatched from the
    /// receiver's points-to type at solve time (§4.2/§4.3).
    pub declaring_method: MethodId,
    pub subsignature: Subsignature,
    pub receiver: Option<VarId>,
    pub args: Vec<VarId>,
    pub result: Option<VarId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// `x = new T()`.
    New { lhs: VarId, class: crate::ir::types::ClassId },
    /// `x = y` (local copy).
    Copy { lhs: VarId, rhs: VarId },
    /// `x = <int literal>` or `x = <binary expr>`.
    Assign { lhs: VarId, rhs: RValue },
    /// `T.f = y`.
    StaticStore { field: FieldId, rhs: VarId },
    /// `x = T.f`.
    StaticLoad { lhs: VarId, field: FieldId },
    /// `x.f = y`.
    InstanceStore { base: VarId, field: FieldId, rhs: VarId },
    /// `x = base.f`.
    InstanceLoad { lhs: VarId, base: VarId, field: FieldId },
    /// `base[i] = y`.
    ArrayStore { base: VarId, index: RValue, rhs: VarId },
    /// `x = base[i]`.
    ArrayLoad { lhs: VarId, base: VarId, index: RValue },
    Invoke(Invoke),
    /// Conditional branch; successors are resolved by the CFG (`IF_TRUE`
    /// / `IF_FALSE` edges), this only carries the evaluated condition.
    If { cond: RValue },
    /// Multi-way branch on an integer subject (`SWITCH_CASE(v)` edges).
    Switch { subject: RValue, cases: Vec<i32> },
    Return { var: Option<VarId> },
    Goto,
    Nop,
}

impl Stmt {
    /// The variable this statement defines, if it is a definition.
    pub fn def(&self) -> Option<VarId> {
        match self {
            Stmt::New { lhs, .. }
            | Stmt::Copy { lhs, .. }
            | Stmt::Assign { lhs, .. }
            | Stmt::StaticLoad { lhs, .. }
            | Stmt::InstanceLoad { lhs, .. }
            | Stmt::ArrayLoad { lhs, .. } => Some(*lhs),
            Stmt::Invoke(call) => call.result,
            _ => None,
        }
    }

    /// Every variable read by this statement (condition, receiver,
    /// arguments, RHS operands). Used by live-variable analysis (§4.7.1).
    pub fn uses(&self) -> Vec<VarId> {
        fn rvalue_uses(rv: &RValue, out: &mut Vec<VarId>) {
            match rv {
                RValue::Var(v) => out.push(*v),
                RValue::IntConst(_) | RValue::Opaque => {}
                RValue::Binary(_, l, r) => {
                    rvalue_uses(l, out);
                    rvalue_uses(r, out);
                }
            }
        }
        let mut out = Vec::new();
        match self {
            Stmt::New { .. } => {}
            Stmt::Copy { rhs, .. } => out.push(*rhs),
            Stmt::Assign { rhs, .. } => rvalue_uses(rhs, &mut out),
            Stmt::StaticStore { rhs, .. } => out.push(*rhs),
            Stmt::StaticLoad { .. } => {}
            Stmt::InstanceStore { base, rhs, .. } => {
                out.push(*base);
                out.push(*rhs);
            }
            Stmt::InstanceLoad { base, .. } => out.push(*base),
            Stmt::ArrayStore { base, index, rhs, .. } => {
                out.push(*base);
                rvalue_uses(index, &mut out);
                out.push(*rhs);
            }
            Stmt::ArrayLoad { base, index, .. } => {
                out.push(*base);
                rvalue_uses(index, &mut out);
            }
            Stmt::Invoke(call) => {
                out.extend(call.receiver);
                out.extend(call.args.iter().copied());
            }
            Stmt::If { cond } => rvalue_uses(cond, &mut out),
            Stmt::Switch { subject, .. } => rvalue_uses(subject, &mut out),
            Stmt::Return { var } => out.extend(*var),
            Stmt::Goto | Stmt::Nop => {}
        }
        out
    }

    /// Side-effect-free per §4.7's dead-assignment rule: not `new`, not
    /// a cast (we have none), not a field/array access; arithmetic is
    /// side-effect-free unless it may divide by zero.
    pub fn is_side_effect_free_rhs(&self) -> bool {
        match self {
            Stmt::Copy { .. } => true,
            Stmt::Assign { rhs, .. } => rvalue_is_pure(rhs),
            _ => false,
        }
    }
}

fn rvalue_is_pure(rv: &RValue) -> bool {
    match rv {
        RValue::Var(_) | RValue::IntConst(_) => true,
        RValue::Opaque => false,
        RValue::Binary(op, l, r) => !op.is_divide() && rvalue_is_pure(l) && rvalue_is_pure(r),
    }
}
