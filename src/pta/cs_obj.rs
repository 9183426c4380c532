//! Canonicalization of heap objects and context-qualified records:
//! `ObjId` (interned `Obj`), `CSObjId` (interned `(Context, Obj)`
//! pair), and the plain `CSMethod`/`CSCallSite` value types (§3, §9).
//!
//! `CSMethod`/`CSCallSite` don't need their own interning layer: they
//! are two-word `Copy` structs over already-interned handles, so value
//! equality already gives pointer-identity-cheap comparison and
//! hashing without a further arena.

use crate::define_index;
use crate::ir::heap::Obj;
use crate::ir::types::{MethodId, StmtId};
use crate::pta::context::ContextId;
use crate::util::index::Interner;

define_index!(ObjId);
define_index!(CSObjId);

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSObjKey {
    pub context: ContextId,
    pub obj: ObjId,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSMethod {
    pub context: ContextId,
    pub method: MethodId,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSCallSite {
    pub context: ContextId,
    pub call_site: StmtId,
}

/// Owns the `Obj` and `CSObj` hash-consing arenas.
#[derive(Default)]
pub struct CSManager {
    obj_interner: Interner<ObjId, Obj>,
    cs_obj_interner: Interner<CSObjId, CSObjKey>,
}

impl CSManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_obj(&mut self, obj: Obj) -> ObjId {
        self.obj_interner.intern(obj)
    }

    pub fn get_obj(&self, id: ObjId) -> &Obj {
        self.obj_interner.get(id)
    }

    pub fn intern_cs_obj(&mut self, context: ContextId, obj: ObjId) -> CSObjId {
        self.cs_obj_interner.intern(CSObjKey { context, obj })
    }

    pub fn get_cs_obj(&self, id: CSObjId) -> CSObjKey {
        *self.cs_obj_interner.get(id)
    }
}
