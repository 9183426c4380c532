//! Pointer variants (§3): `VarPtr`, `InstanceFieldPtr`, `ArrayIndexPtr`,
//! `StaticFieldPtr`. Each is a plain `Copy` value over already-interned
//! handles (`ContextId`, `CSObjId`), so value equality is canonical
//! identity — no further interning layer is needed to get
//! "pointer-identity" comparisons.

use crate::ir::types::{FieldId, VarId};
use crate::pta::context::ContextId;
use crate::pta::cs_obj::CSObjId;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Pointer {
    Var(ContextId, VarId),
    InstanceField(CSObjId, FieldId),
    ArrayIndex(CSObjId),
    StaticField(FieldId),
}

impl Pointer {
    pub fn as_var(&self) -> Option<(ContextId, VarId)> {
        match self {
            Pointer::Var(ctx, v) => Some((*ctx, *v)),
            _ => None,
        }
    }
}
