//! Contexts: opaque, totally-ordered, canonicalized values produced by a
//! pluggable `ContextSelector` (§3). The bundled policy is k-call-site
//! sensitivity: a context is the most recent `k` call-site statements,
//! hash-consed into a `ContextId` arena so that equality is a `u32`
//! comparison (§9 "Identity and canonicalization").

use crate::define_index;
use crate::ir::types::{MethodId, StmtId};
use crate::pta::cs_obj::{CSCallSite, CSMethod, CSObjId, ObjId};
use crate::util::index::Interner;

define_index!(ContextId);

/// Hash-consing arena for call-site chains. Two chains with equal
/// content always map to the same `ContextId`.
pub struct ContextManager {
    interner: Interner<ContextId, Vec<StmtId>>,
    empty: ContextId,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextManager {
    pub fn new() -> Self {
        let mut interner = Interner::new();
        let empty = interner.intern(Vec::new());
        ContextManager { interner, empty }
    }

    pub fn empty(&self) -> ContextId {
        self.empty
    }

    pub fn intern(&mut self, chain: Vec<StmtId>) -> ContextId {
        self.interner.intern(chain)
    }

    pub fn chain(&self, id: ContextId) -> &[StmtId] {
        self.interner.get(id)
    }
}

/// §3's `ContextSelector`: `emptyContext()`, `selectHeapContext`,
/// `selectContext` (static calls) and `selectContext` with a receiver
/// (dynamic calls) — both arities are required per §9 Open Questions.
pub trait ContextSelector {
    fn empty_context(&self) -> ContextId;
    fn select_heap_context(&mut self, caller: CSMethod, obj: ObjId) -> ContextId;
    fn select_context(&mut self, cs_callsite: CSCallSite, method: MethodId) -> ContextId;
    fn select_context_with_recv(&mut self, cs_callsite: CSCallSite, recv: CSObjId, method: MethodId) -> ContextId;
}

/// The context-insensitive variant: a singleton context universe and no
/// CS canonicalization (§4.2 "CI variant").
pub struct CiContextSelector {
    mgr: ContextManager,
}

impl Default for CiContextSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl CiContextSelector {
    pub fn new() -> Self {
        CiContextSelector { mgr: ContextManager::new() }
    }
}

impl ContextSelector for CiContextSelector {
    fn empty_context(&self) -> ContextId {
        self.mgr.empty()
    }
    fn select_heap_context(&mut self, _caller: CSMethod, _obj: ObjId) -> ContextId {
        self.mgr.empty()
    }
    fn select_context(&mut self, _cs_callsite: CSCallSite, _method: MethodId) -> ContextId {
        self.mgr.empty()
    }
    fn select_context_with_recv(&mut self, _cs_callsite: CSCallSite, _recv: CSObjId, _method: MethodId) -> ContextId {
        self.mgr.empty()
    }
}

/// k-call-site-sensitive (k-CFA) selector: a context is the caller's
/// context with the call site appended, truncated to the last `k`
/// entries. The heap context of an allocation is the allocating
/// method's own context (object creation does not add a further call
/// site) — a simple, common policy for call-site sensitivity (Open
/// Question: the distilled spec leaves the exact heap-context policy
/// unspecified beyond "supplied by the selector").
pub struct KCallSiteSelector {
    k: usize,
    mgr: ContextManager,
}

impl KCallSiteSelector {
    pub fn new(k: usize) -> Self {
        KCallSiteSelector { k, mgr: ContextManager::new() }
    }

    fn extend(&mut self, caller_context: ContextId, call_site: StmtId) -> ContextId {
        let mut chain = self.mgr.chain(caller_context).to_vec();
        chain.push(call_site);
        if chain.len() > self.k {
            let excess = chain.len() - self.k;
            chain.drain(0..excess);
        }
        self.mgr.intern(chain)
    }
}

impl ContextSelector for KCallSiteSelector {
    fn empty_context(&self) -> ContextId {
        self.mgr.empty()
    }
    fn select_heap_context(&mut self, caller: CSMethod, _obj: ObjId) -> ContextId {
        caller.context
    }
    fn select_context(&mut self, cs_callsite: CSCallSite, _method: MethodId) -> ContextId {
        self.extend(cs_callsite.context, cs_callsite.call_site)
    }
    fn select_context_with_recv(&mut self, cs_callsite: CSCallSite, _recv: CSObjId, _method: MethodId) -> ContextId {
        self.extend(cs_callsite.context, cs_callsite.call_site)
    }
}
