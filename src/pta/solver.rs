//! The pointer-analysis fixed-point solver (§4.2): a single algorithm
//! shared by the context-insensitive and context-sensitive variants,
//! differing only in which [`ContextSelector`] drives it. The taint
//! pipeline (§4.6) is co-iterated inside the same worklist loop.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info};

use crate::graph::call_graph::CallGraph;
use crate::graph::cha;
use crate::graph::pfg::PointerFlowGraph;
use crate::ir::heap::Obj;
use crate::ir::method::{CallKind, Method};
use crate::ir::program::Program;
use crate::ir::stmt::{Invoke, Stmt};
use crate::ir::types::{ClassId, MethodId, StmtId, VarId};
use crate::pta::context::{CiContextSelector, ContextId, ContextSelector, KCallSiteSelector};
use crate::pta::cs_obj::{CSCallSite, CSManager, CSMethod, CSObjId, CSObjKey, ObjId};
use crate::pta::pointer::Pointer;
use crate::pta::taint::{TaintConfig, TaintFlow, BASE, RESULT};
use crate::pta::PTAType;
use crate::pts_set::points_to::{HybridPointsToSet, PointsToSet};
use crate::util::options::AnalysisOptions;

struct TaintRuntime {
    config: TaintConfig,
    /// Every call site whose argument list includes this pointer, with
    /// the argument's position (§4.6 `argInvokeMap`).
    arg_index: HashMap<Pointer, Vec<(CSMethod, StmtId, usize)>>,
    /// Every call site whose receiver is this pointer (§4.6 `invokeBaseObjMap`).
    base_index: HashMap<Pointer, Vec<(CSMethod, StmtId)>>,
    flows: HashSet<TaintFlow>,
}

/// Owns the PFG, call graph, points-to store and worklist for one solve.
/// Consumed by [`PointerAnalysisSolver::solve`], which returns a
/// read-only [`PointerAnalysisResult`].
pub struct PointerAnalysisSolver<'p> {
    program: &'p dyn Program,
    context_selector: Box<dyn ContextSelector>,
    cs_manager: CSManager,
    pfg: PointerFlowGraph<Pointer>,
    call_graph: CallGraph<CSMethod, CSCallSite>,
    pts: HashMap<Pointer, HybridPointsToSet<CSObjId>>,
    worklist: VecDeque<(Pointer, HybridPointsToSet<CSObjId>)>,
    reachable: HashSet<CSMethod>,
    reachable_order: Vec<CSMethod>,
    /// `VarId`s are unique across the whole program (never reused across
    /// methods, per `ir::program`'s `ProgramBuilder::new_var`), so a
    /// variable's owning method can be recorded once and reused for
    /// every context it is later seen under.
    var_owner: HashMap<VarId, MethodId>,
    taint: Option<TaintRuntime>,
}

impl<'p> PointerAnalysisSolver<'p> {
    pub fn new_context_insensitive(program: &'p dyn Program) -> Self {
        Self::new_inner(program, Box::new(CiContextSelector::new()))
    }

    pub fn new_context_sensitive(program: &'p dyn Program, k: usize) -> Self {
        Self::new_inner(program, Box::new(KCallSiteSelector::new(k)))
    }

    /// Builds a solver matching `options.pta_type`/`options.context_depth`
    /// (§6 `AnalysisOptions`).
    pub fn from_options(program: &'p dyn Program, options: &AnalysisOptions) -> Self {
        match options.pta_type {
            PTAType::ContextInsensitive => Self::new_context_insensitive(program),
            PTAType::CallSiteSensitive => Self::new_context_sensitive(program, options.context_depth as usize),
        }
    }

    fn new_inner(program: &'p dyn Program, selector: Box<dyn ContextSelector>) -> Self {
        PointerAnalysisSolver {
            program,
            context_selector: selector,
            cs_manager: CSManager::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            pts: HashMap::new(),
            worklist: VecDeque::new(),
            reachable: HashSet::new(),
            reachable_order: Vec::new(),
            var_owner: HashMap::new(),
            taint: None,
        }
    }

    /// Enables the taint pipeline (§4.6), co-iterated with this solve.
    pub fn with_taint_config(mut self, config: TaintConfig) -> Self {
        self.taint = Some(TaintRuntime {
            config,
            arg_index: HashMap::new(),
            base_index: HashMap::new(),
            flows: HashSet::new(),
        });
        self
    }

    /// Runs the solve to a fixed point starting from `entry`, in the
    /// empty context (§4.2 "Initialization").
    pub fn solve(mut self, entry: MethodId) -> PointerAnalysisResult {
        let empty = self.context_selector.empty_context();
        let entry_cs = CSMethod { context: empty, method: entry };
        self.add_reachable(entry_cs);
        self.drain_worklist();
        info!(
            "pta solve finished: {} reachable methods, {} taint flows",
            self.reachable.len(),
            self.taint.as_ref().map(|t| t.flows.len()).unwrap_or(0)
        );
        self.finish()
    }

    fn enqueue(&mut self, pointer: Pointer, delta: HybridPointsToSet<CSObjId>) {
        if !delta.is_empty() {
            self.worklist.push_back((pointer, delta));
        }
    }

    fn enqueue_one(&mut self, pointer: Pointer, obj: CSObjId) {
        let mut set = HybridPointsToSet::new();
        set.insert(obj);
        self.enqueue(pointer, set);
    }

    /// `PFG.addEdge` (§4.1): idempotent; on a genuinely new edge,
    /// propagates the source's current points-to snapshot.
    fn add_pfg_edge(&mut self, source: Pointer, target: Pointer) {
        if self.pfg.add_edge(source, target) {
            if let Some(pts) = self.pts.get(&source) {
                if !pts.is_empty() {
                    self.enqueue(target, pts.clone());
                }
            }
        }
    }

    fn class_of_obj(&self, obj_id: ObjId) -> Option<ClassId> {
        match self.cs_manager.get_obj(obj_id) {
            Obj::Alloc(stmt_id) => Some(self.program.heap_model().class_of(*stmt_id)),
            Obj::Taint { .. } => None,
        }
    }

    fn record_var_owners(&mut self, method_id: MethodId) {
        let program = self.program;
        let method = program.method(method_id);
        for &v in method.params() {
            self.var_owner.entry(v).or_insert(method_id);
        }
        if let Some(t) = method.this_var() {
            self.var_owner.entry(t).or_insert(method_id);
        }
        for &v in method.return_vars() {
            self.var_owner.entry(v).or_insert(method_id);
        }
        for &sid in method.stmts() {
            let stmt = method.stmt(sid);
            if let Some(d) = stmt.def() {
                self.var_owner.entry(d).or_insert(method_id);
            }
            for u in stmt.uses() {
                self.var_owner.entry(u).or_insert(method_id);
            }
        }
    }

    /// `addReachable(csMethod)` (§4.2): visits every statement once,
    /// applying the rules that don't need to wait on a receiver's
    /// points-to set to grow.
    fn add_reachable(&mut self, cs_method: CSMethod) {
        if !self.reachable.insert(cs_method) {
            return;
        }
        self.reachable_order.push(cs_method);
        self.record_var_owners(cs_method.method);

        let program = self.program;
        let method = program.method(cs_method.method);
        let c = cs_method.context;
        let stmt_ids: Vec<StmtId> = method.stmts().to_vec();

        for stmt_id in stmt_ids {
            match method.stmt(stmt_id) {
                Stmt::New { lhs, .. } => {
                    let obj_id = self.cs_manager.intern_obj(Obj::Alloc(stmt_id));
                    let heap_ctx = self.context_selector.select_heap_context(cs_method, obj_id);
                    let csobj = self.cs_manager.intern_cs_obj(heap_ctx, obj_id);
                    self.enqueue_one(Pointer::Var(c, *lhs), csobj);
                }
                Stmt::Copy { lhs, rhs } => {
                    self.add_pfg_edge(Pointer::Var(c, *rhs), Pointer::Var(c, *lhs));
                }
                Stmt::StaticStore { field, rhs } => {
                    self.add_pfg_edge(Pointer::Var(c, *rhs), Pointer::StaticField(*field));
                }
                Stmt::StaticLoad { lhs, field } => {
                    self.add_pfg_edge(Pointer::StaticField(*field), Pointer::Var(c, *lhs));
                }
                Stmt::Invoke(call) => {
                    self.record_taint_bindings(cs_method, stmt_id, call);
                    if call.kind == CallKind::Static {
                        self.process_static_call(cs_method, call);
                    }
                    self.run_taint_call_rules(cs_method, stmt_id);
                }
                _ => {}
            }
        }
    }

    /// Static calls (and the static half of "process-call") don't wait
    /// on a receiver: process immediately (§4.2).
    fn process_static_call(&mut self, cs_method: CSMethod, call: &Invoke) {
        let program = self.program;
        let c = cs_method.context;
        let target_method_id = call.declaring_method;
        if program.method(target_method_id).is_abstract() {
            return;
        }
        let cs_callsite = CSCallSite { context: c, call_site: call.call_site };
        let c_t = self.context_selector.select_context(cs_callsite, target_method_id);
        let cs_target = CSMethod { context: c_t, method: target_method_id };
        let is_new = self.call_graph.add_edge(cs_callsite, call.kind, cs_method, cs_target);
        if is_new {
            self.add_reachable(cs_target);
            self.link_call_args_and_return(c, c_t, call, target_method_id);
        }
    }

    /// Rule 5 of the main loop: a dynamic call `r = x.m(args)` whose
    /// receiver variable just gained `csobj` in its points-to set.
    fn process_dynamic_call(&mut self, cs_method: CSMethod, call: &Invoke, csobj: CSObjId) {
        let program = self.program;
        let c = cs_method.context;
        let obj_key = self.cs_manager.get_cs_obj(csobj);
        let recv_class = match self.class_of_obj(obj_key.obj) {
            Some(class) => class,
            // A taint object reached a call's receiver position: it has
            // no class to dispatch against, so there is nothing CHA can
            // resolve here. Not an error (§7).
            None => return,
        };
        let target_method_id = match cha::resolve_kind(program, call, recv_class) {
            Some(m) => m,
            None => {
                debug!("dispatch miss for {:?} on {:?}", call.subsignature, recv_class);
                return;
            }
        };
        if program.method(target_method_id).is_abstract() {
            return;
        }
        let cs_callsite = CSCallSite { context: c, call_site: call.call_site };
        let c_t = self.context_selector.select_context_with_recv(cs_callsite, csobj, target_method_id);
        let cs_target = CSMethod { context: c_t, method: target_method_id };

        if let Some(this_var) = program.method(target_method_id).this_var() {
            self.enqueue_one(Pointer::Var(c_t, this_var), csobj);
        }

        let is_new = self.call_graph.add_edge(cs_callsite, call.kind, cs_method, cs_target);
        if is_new {
            self.add_reachable(cs_target);
            self.link_call_args_and_return(c, c_t, call, target_method_id);
        }
    }

    fn link_call_args_and_return(&mut self, c: ContextId, c_t: ContextId, call: &Invoke, target_method_id: MethodId) {
        let program = self.program;
        let target_method = program.method(target_method_id);
        let params = target_method.params();
        assert_eq!(
            params.len(),
            call.args.len(),
            "argument count {} does not match parameter count {} at call site {:?} (collaborator contract violation, §7)",
            call.args.len(),
            params.len(),
            call.call_site
        );
        for (i, &param) in params.iter().enumerate() {
            self.add_pfg_edge(Pointer::Var(c, call.args[i]), Pointer::Var(c_t, param));
        }
        if let Some(result) = call.result {
            for &ret_var in target_method.return_vars() {
                self.add_pfg_edge(Pointer::Var(c_t, ret_var), Pointer::Var(c, result));
            }
        }
    }

    /// Rules 1-4 (field/array edges) plus rule 5 (dynamic calls) of the
    /// main loop, for every `csobj` newly added to `VarPtr(ctx, var)`.
    fn process_var_delta(&mut self, ctx: ContextId, var: VarId, delta: &HybridPointsToSet<CSObjId>) {
        let method_id = match self.var_owner.get(&var) {
            Some(m) => *m,
            None => return,
        };
        let program = self.program;
        let method = program.method(method_id);
        let stores_field = method.stores_field_of(var);
        let loads_field = method.loads_field_of(var);
        let stores_array = method.stores_array_of(var);
        let loads_array = method.loads_array_of(var);
        let invokes = method.invokes_with_receiver(var);

        for csobj in delta.iter() {
            for &sid in &stores_field {
                if let Stmt::InstanceStore { field, rhs, .. } = method.stmt(sid) {
                    self.add_pfg_edge(Pointer::Var(ctx, *rhs), Pointer::InstanceField(csobj, *field));
                }
            }
            for &sid in &loads_field {
                if let Stmt::InstanceLoad { lhs, field, .. } = method.stmt(sid) {
                    self.add_pfg_edge(Pointer::InstanceField(csobj, *field), Pointer::Var(ctx, *lhs));
                }
            }
            for &sid in &stores_array {
                if let Stmt::ArrayStore { rhs, .. } = method.stmt(sid) {
                    self.add_pfg_edge(Pointer::Var(ctx, *rhs), Pointer::ArrayIndex(csobj));
                }
            }
            for &sid in &loads_array {
                if let Stmt::ArrayLoad { lhs, .. } = method.stmt(sid) {
                    self.add_pfg_edge(Pointer::ArrayIndex(csobj), Pointer::Var(ctx, *lhs));
                }
            }
            for &sid in &invokes {
                if let Stmt::Invoke(call) = method.stmt(sid) {
                    let cs_method = CSMethod { context: ctx, method: method_id };
                    self.process_dynamic_call(cs_method, call, csobj);
                }
            }
        }
    }

    /// The main worklist loop (§4.2, §5 ordering guarantees).
    fn drain_worklist(&mut self) {
        while let Some((n, incoming)) = self.worklist.pop_front() {
            let mut delta = incoming;
            if let Some(existing) = self.pts.get(&n) {
                delta.subtract(existing);
            }
            if delta.is_empty() {
                continue;
            }
            self.pts.entry(n).or_insert_with(HybridPointsToSet::new).union(&delta);

            let succs: Vec<Pointer> = self.pfg.succs_of(n).collect();
            for succ in succs {
                self.enqueue(succ, delta.clone());
            }

            if let Pointer::Var(ctx, var) = n {
                self.process_var_delta(ctx, var, &delta);
                self.run_taint_var_hooks(n);
            }
        }
    }

    // --- Taint pipeline (§4.6), co-iterated with the loop above. ---

    fn record_taint_bindings(&mut self, cs_method: CSMethod, stmt_id: StmtId, call: &Invoke) {
        let taint = match self.taint.as_mut() {
            Some(t) => t,
            None => return,
        };
        let ctx = cs_method.context;
        for (i, &arg) in call.args.iter().enumerate() {
            taint.arg_index.entry(Pointer::Var(ctx, arg)).or_default().push((cs_method, stmt_id, i));
        }
        if let Some(recv) = call.receiver {
            taint.base_index.entry(Pointer::Var(ctx, recv)).or_default().push((cs_method, stmt_id));
        }
    }

    fn run_taint_var_hooks(&mut self, pointer: Pointer) {
        if self.taint.is_none() {
            return;
        }
        let sites: Vec<(CSMethod, StmtId)> = {
            let taint = self.taint.as_ref().unwrap();
            let mut v = Vec::new();
            if let Some(xs) = taint.arg_index.get(&pointer) {
                v.extend(xs.iter().map(|(m, s, _)| (*m, *s)));
            }
            if let Some(xs) = taint.base_index.get(&pointer) {
                v.extend(xs.iter().copied());
            }
            v
        };
        for (cs_method, stmt_id) in sites {
            self.run_taint_call_rules(cs_method, stmt_id);
        }
    }

    /// Runs the source, transfer and sink rules for one call site.
    /// Called once when the site is first seen, then again every time a
    /// variable it reads (argument or receiver) gains new points-to
    /// facts (§4.6 "co-iteration").
    fn run_taint_call_rules(&mut self, cs_method: CSMethod, stmt_id: StmtId) {
        if self.taint.is_none() {
            return;
        }
        let program = self.program;
        let method = program.method(cs_method.method);
        let call = match method.stmt(stmt_id) {
            Stmt::Invoke(call) => call.clone(),
            _ => return,
        };
        let ctx = cs_method.context;
        let sig = program.signature(call.declaring_method).to_string();

        let sources = self.taint.as_ref().unwrap().config.sources_for(&sig).to_vec();
        if let Some(result_var) = call.result {
            for src in &sources {
                let obj_id = self.cs_manager.intern_obj(Obj::Taint {
                    source_call: stmt_id,
                    taint_type: src.taint_type.clone(),
                });
                let empty_ctx = self.context_selector.empty_context();
                let csobj = self.cs_manager.intern_cs_obj(empty_ctx, obj_id);
                self.enqueue_one(Pointer::Var(ctx, result_var), csobj);
            }
        }

        let transfers = self.taint.as_ref().unwrap().config.transfers_for(&sig).to_vec();
        for tr in &transfers {
            match (tr.from, tr.to) {
                (BASE, RESULT) => {
                    if let (Some(recv), Some(result_var)) = (call.receiver, call.result) {
                        self.propagate_tainted(ctx, recv, ctx, result_var, &tr.taint_type);
                    }
                }
                (k, BASE) if k >= 0 => {
                    if let (Some(&arg), Some(recv)) = (call.args.get(k as usize), call.receiver) {
                        self.propagate_tainted(ctx, arg, ctx, recv, &tr.taint_type);
                    }
                }
                (k, RESULT) if k >= 0 => {
                    if let (Some(&arg), Some(result_var)) = (call.args.get(k as usize), call.result) {
                        self.propagate_tainted(ctx, arg, ctx, result_var, &tr.taint_type);
                    }
                }
                _ => {}
            }
        }

        let sinks = self.taint.as_ref().unwrap().config.sinks_for(&sig).to_vec();
        for sink in &sinks {
            if let Some(&arg_var) = call.args.get(sink.index as usize) {
                let pointer = Pointer::Var(ctx, arg_var);
                if let Some(pts) = self.pts.get(&pointer) {
                    let objs: Vec<CSObjId> = pts.iter().collect();
                    for csobj in objs {
                        let key = self.cs_manager.get_cs_obj(csobj);
                        if let Obj::Taint { source_call, .. } = self.cs_manager.get_obj(key.obj) {
                            let flow = TaintFlow { source: *source_call, sink_call: stmt_id, arg_index: sink.index };
                            self.taint.as_mut().unwrap().flows.insert(flow);
                        }
                    }
                }
            }
        }
    }

    fn propagate_tainted(&mut self, from_ctx: ContextId, from_var: VarId, to_ctx: ContextId, to_var: VarId, ty: &str) {
        let from_ptr = Pointer::Var(from_ctx, from_var);
        let objs: Vec<CSObjId> = match self.pts.get(&from_ptr) {
            Some(s) => s.iter().collect(),
            None => return,
        };
        for csobj in objs {
            let key = self.cs_manager.get_cs_obj(csobj);
            if let Obj::Taint { taint_type, .. } = self.cs_manager.get_obj(key.obj) {
                if taint_type == ty {
                    self.enqueue_one(Pointer::Var(to_ctx, to_var), csobj);
                }
            }
        }
    }

    fn finish(self) -> PointerAnalysisResult {
        let taint_flows = self.taint.map(|t| t.flows.into_iter().collect()).unwrap_or_default();
        PointerAnalysisResult {
            cs_manager: self.cs_manager,
            pts: self.pts,
            call_graph: self.call_graph,
            reachable: self.reachable_order,
            taint_flows,
        }
    }
}

/// Read-only view over a completed solve (§6 `PointerAnalysisResult`).
/// Queried only after `solve()` returns (§5).
pub struct PointerAnalysisResult {
    cs_manager: CSManager,
    pts: HashMap<Pointer, HybridPointsToSet<CSObjId>>,
    call_graph: CallGraph<CSMethod, CSCallSite>,
    reachable: Vec<CSMethod>,
    taint_flows: Vec<TaintFlow>,
}

/// The CI variant returns the same result shape (§4.2: "CI variant:
/// identical algorithm with a singleton context universe"), so this is
/// a type alias rather than a separate type (§6 `CIPTAResult`).
pub type CIPTAResult = PointerAnalysisResult;

impl PointerAnalysisResult {
    pub fn pts_cs_var(&self, ctx: ContextId, var: VarId) -> Vec<CSObjId> {
        self.pts.get(&Pointer::Var(ctx, var)).map(|s| s.iter().collect()).unwrap_or_default()
    }

    /// Context-insensitive points-to of `var`: union over every context
    /// this variable was ever seen under, with contexts stripped (used
    /// by the alias-aware inter-procedural CP extension, §4.5).
    pub fn ci_pts_var(&self, var: VarId) -> HashSet<ObjId> {
        let mut out = HashSet::new();
        for (p, set) in &self.pts {
            if let Pointer::Var(_, v) = p {
                if *v == var {
                    for csobj in set.iter() {
                        out.insert(self.cs_manager.get_cs_obj(csobj).obj);
                    }
                }
            }
        }
        out
    }

    /// The full context-insensitive points-to map, flattened once
    /// (§4.5 "using the context-insensitive points-to result").
    pub fn ci_points_to_map(&self) -> HashMap<VarId, HashSet<ObjId>> {
        let mut map: HashMap<VarId, HashSet<ObjId>> = HashMap::new();
        for (p, set) in &self.pts {
            if let Pointer::Var(_, v) = p {
                let entry = map.entry(*v).or_default();
                for csobj in set.iter() {
                    entry.insert(self.cs_manager.get_cs_obj(csobj).obj);
                }
            }
        }
        map
    }

    pub fn obj(&self, id: ObjId) -> &Obj {
        self.cs_manager.get_obj(id)
    }

    pub fn cs_obj(&self, id: CSObjId) -> CSObjKey {
        self.cs_manager.get_cs_obj(id)
    }

    pub fn call_graph(&self) -> &CallGraph<CSMethod, CSCallSite> {
        &self.call_graph
    }

    /// Every method resolved as a callee of `call_site`, across every
    /// context that call site was ever analyzed under. Context-qualified
    /// callers query `call_graph()` directly; this is the
    /// context-insensitive view §6 describes for `CIPTAResult`.
    pub fn callees_at(&self, call_site: StmtId) -> HashSet<MethodId> {
        let mut out = HashSet::new();
        for (cs, edges) in &self.call_graph.callsite_to_edges {
            if cs.call_site != call_site {
                continue;
            }
            for &edge in edges {
                if let Some(callee) = self.call_graph.get_callee_id_of_edge(edge) {
                    out.insert(callee.method);
                }
            }
        }
        out
    }

    pub fn reachable_methods(&self) -> HashSet<MethodId> {
        self.reachable.iter().map(|m| m.method).collect()
    }

    pub fn taint_flows(&self) -> &[TaintFlow] {
        &self.taint_flows
    }
}
