//! A concrete, in-memory `Program` implementation: a small builder API
//! for constructing classes, methods and statement bodies programmatically,
//! used by the bundled sample programs and the end-to-end tests. This is
//! a test fixture, not a front end — it never parses source text or
//! class files.

use std::collections::HashMap;

use crate::ir::cfg::{Cfg, CfgEdgeKind};
use crate::ir::class_hierarchy::{ClassHierarchy, InMemoryClassHierarchy, Subsignature};
use crate::ir::heap::HeapModel;
use crate::ir::method::{CallKind, Method};
use crate::ir::stmt::{Invoke, Stmt};
use crate::ir::types::{ClassId, FieldId, MethodId, StmtId, Type, VarId};

/// Bundles the collaborators §6 lists as separate traits into one value
/// the solvers can hold a single reference to.
pub trait Program {
    fn method(&self, id: MethodId) -> &dyn Method;
    fn cfg(&self, id: MethodId) -> &dyn Cfg;
    fn class_hierarchy(&self) -> &dyn ClassHierarchy;
    fn heap_model(&self) -> &dyn HeapModel;
    fn field_type(&self, field: FieldId) -> Type;
    fn methods(&self) -> Vec<MethodId>;
    /// The method's full signature string, e.g. `"Attacker.getSecret()"`,
    /// used to match the taint configuration document (§6) by name.
    fn signature(&self, id: MethodId) -> &str;
    /// The declared type of a local variable (used to decide whether
    /// the CP boundary fact / definitions can hold an integer, §4.4).
    /// Variable ids are unique across the whole program, not just within
    /// one method, so this lives on `Program` rather than `Method`.
    fn var_type(&self, var: VarId) -> Type;
}

pub struct InMemoryMethod {
    id: MethodId,
    declaring_class: ClassId,
    subsignature: Subsignature,
    full_signature: String,
    is_static: bool,
    is_abstract: bool,
    params: Vec<VarId>,
    this_var: Option<VarId>,
    return_vars: Vec<VarId>,
    stmt_order: Vec<StmtId>,
    stmts: HashMap<StmtId, Stmt>,
}

impl Method for InMemoryMethod {
    fn id(&self) -> MethodId {
        self.id
    }
    fn declaring_class(&self) -> ClassId {
        self.declaring_class
    }
    fn subsignature(&self) -> &Subsignature {
        &self.subsignature
    }
    fn is_abstract(&self) -> bool {
        self.is_abstract
    }
    fn is_static(&self) -> bool {
        self.is_static
    }
    fn params(&self) -> &[VarId] {
        &self.params
    }
    fn this_var(&self) -> Option<VarId> {
        self.this_var
    }
    fn return_vars(&self) -> &[VarId] {
        &self.return_vars
    }
    fn stmts(&self) -> &[StmtId] {
        &self.stmt_order
    }
    fn stmt(&self, id: StmtId) -> &Stmt {
        self.stmts.get(&id).expect("stmt id not owned by this method")
    }
}

impl InMemoryMethod {
    pub fn full_signature(&self) -> &str {
        &self.full_signature
    }
}

pub struct InMemoryCfg {
    entry: StmtId,
    stmt_order: Vec<StmtId>,
    succs: HashMap<StmtId, Vec<(CfgEdgeKind, StmtId)>>,
    preds: HashMap<StmtId, Vec<StmtId>>,
}

impl Cfg for InMemoryCfg {
    fn entry(&self) -> StmtId {
        self.entry
    }
    fn stmts(&self) -> &[StmtId] {
        &self.stmt_order
    }
    fn successors(&self, stmt: StmtId) -> &[(CfgEdgeKind, StmtId)] {
        self.succs.get(&stmt).map(|v| v.as_slice()).unwrap_or(&[])
    }
    fn predecessors(&self, stmt: StmtId) -> &[StmtId] {
        self.preds.get(&stmt).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Builds one method's statement list, variables and control-flow
/// edges. Statements are appended in program order; a plain
/// `Normal` fallthrough edge is inferred for any statement that was not
/// given explicit outgoing edges and is not a `Return`.
pub struct MethodBuilder {
    id: MethodId,
    declaring_class: ClassId,
    subsignature: Subsignature,
    full_signature: String,
    is_static: bool,
    is_abstract: bool,
    params: Vec<VarId>,
    this_var: Option<VarId>,
    return_vars: Vec<VarId>,
    stmt_order: Vec<StmtId>,
    stmts: HashMap<StmtId, Stmt>,
    cfg_edges: HashMap<StmtId, Vec<(CfgEdgeKind, StmtId)>>,
}

impl MethodBuilder {
    pub fn new(
        id: MethodId,
        declaring_class: ClassId,
        subsignature: impl Into<String>,
        full_signature: impl Into<String>,
        is_static: bool,
    ) -> Self {
        MethodBuilder {
            id,
            declaring_class,
            subsignature: subsignature.into(),
            full_signature: full_signature.into(),
            is_static,
            is_abstract: false,
            params: Vec::new(),
            this_var: None,
            return_vars: Vec::new(),
            stmt_order: Vec::new(),
            stmts: HashMap::new(),
            cfg_edges: HashMap::new(),
        }
    }

    pub fn mark_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn set_this(&mut self, v: VarId) {
        self.this_var = Some(v);
    }

    pub fn add_param(&mut self, v: VarId) {
        self.params.push(v);
    }

    /// Reserves a statement id without content, to be filled in later
    /// via `set_stmt` — needed to build forward control-flow edges
    /// (an `if` branching to a statement defined further down).
    pub fn reserve_stmt(&mut self, id: StmtId) {
        self.stmt_order.push(id);
        self.stmts.insert(id, Stmt::Nop);
    }

    pub fn set_stmt(&mut self, id: StmtId, stmt: Stmt) {
        if let Stmt::Return { var } = &stmt {
            if let Some(v) = var {
                self.return_vars.push(*v);
            }
        }
        self.stmts.insert(id, stmt);
    }

    pub fn add_stmt(&mut self, id: StmtId, stmt: Stmt) -> StmtId {
        self.reserve_stmt(id);
        self.set_stmt(id, stmt);
        id
    }

    pub fn add_edge(&mut self, from: StmtId, kind: CfgEdgeKind, to: StmtId) {
        self.cfg_edges.entry(from).or_default().push((kind, to));
    }

    /// Finalizes this method, inferring `Normal` fallthrough edges for
    /// any statement without explicit outgoing edges (other than
    /// `Return`, which has none).
    pub fn finish(self) -> (InMemoryMethod, InMemoryCfg) {
        let entry = *self.stmt_order.first().expect("method has no statements");
        let mut succs: HashMap<StmtId, Vec<(CfgEdgeKind, StmtId)>> = self.cfg_edges.clone();
        for (i, &id) in self.stmt_order.iter().enumerate() {
            if succs.contains_key(&id) {
                continue;
            }
            if matches!(self.stmts.get(&id), Some(Stmt::Return { .. })) {
                continue;
            }
            if let Some(&next) = self.stmt_order.get(i + 1) {
                succs.insert(id, vec![(CfgEdgeKind::Normal, next)]);
            }
        }
        let mut preds: HashMap<StmtId, Vec<StmtId>> = HashMap::new();
        for (&from, tos) in &succs {
            for &(_, to) in tos {
                preds.entry(to).or_default().push(from);
            }
        }
        let method = InMemoryMethod {
            id: self.id,
            declaring_class: self.declaring_class,
            subsignature: self.subsignature,
            full_signature: self.full_signature,
            is_static: self.is_static,
            is_abstract: self.is_abstract,
            params: self.params,
            this_var: self.this_var,
            return_vars: self.return_vars,
            stmt_order: self.stmt_order.clone(),
            stmts: self.stmts,
        };
        let cfg = InMemoryCfg {
            entry,
            stmt_order: self.stmt_order,
            succs,
            preds,
        };
        (method, cfg)
    }
}

#[derive(Default)]
pub struct InMemoryHeapModel {
    class_of: HashMap<StmtId, ClassId>,
}

impl InMemoryHeapModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, alloc_stmt: StmtId, class: ClassId) {
        self.class_of.insert(alloc_stmt, class);
    }
}

impl HeapModel for InMemoryHeapModel {
    fn class_of(&self, stmt: StmtId) -> ClassId {
        *self.class_of.get(&stmt).expect("unregistered allocation site")
    }
}

/// Assembles an `InMemoryProgram` from methods/CFGs built with
/// `MethodBuilder`, a class hierarchy and a heap model.
pub struct ProgramBuilder {
    methods: HashMap<MethodId, InMemoryMethod>,
    cfgs: HashMap<MethodId, InMemoryCfg>,
    class_hierarchy: InMemoryClassHierarchy,
    heap_model: InMemoryHeapModel,
    field_types: HashMap<FieldId, Type>,
    var_types: HashMap<VarId, Type>,
    next_stmt: u32,
    next_method: u32,
    next_class: u32,
    next_field: u32,
    next_var: u32,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            methods: HashMap::new(),
            cfgs: HashMap::new(),
            class_hierarchy: InMemoryClassHierarchy::new(),
            heap_model: InMemoryHeapModel::new(),
            field_types: HashMap::new(),
            var_types: HashMap::new(),
            next_stmt: 0,
            next_method: 0,
            next_class: 0,
            next_field: 0,
            next_var: 0,
        }
    }

    /// Allocates a fresh, globally unique `VarId`. Variable ids are
    /// shared across the whole program rather than reset per method, so
    /// that a `Pointer::Var(context, var)` — which carries no separate
    /// "containing method" — cannot alias two unrelated locals just
    /// because they happen to share a context.
    pub fn new_var(&mut self, ty: Type) -> VarId {
        let v = VarId::new(self.next_var as usize);
        self.next_var += 1;
        self.var_types.insert(v, ty);
        v
    }

    pub fn new_class(&mut self) -> ClassId {
        let c = ClassId::new(self.next_class as usize);
        self.next_class += 1;
        c
    }

    pub fn new_field(&mut self, ty: Type) -> FieldId {
        let f = FieldId::new(self.next_field as usize);
        self.next_field += 1;
        self.field_types.insert(f, ty);
        f
    }

    pub fn new_method_id(&mut self) -> MethodId {
        let m = MethodId::new(self.next_method as usize);
        self.next_method += 1;
        m
    }

    pub fn new_stmt_id(&mut self) -> StmtId {
        let s = StmtId::new(self.next_stmt as usize);
        self.next_stmt += 1;
        s
    }

    pub fn add_class(&mut self, class: ClassId, super_class: Option<ClassId>) {
        self.class_hierarchy.add_class(class, super_class);
    }

    pub fn add_interface(&mut self, iface: ClassId, super_iface: Option<ClassId>) {
        self.class_hierarchy.add_interface(iface, super_iface);
    }

    pub fn add_implementor(&mut self, iface: ClassId, class: ClassId) {
        self.class_hierarchy.add_implementor(iface, class);
    }

    pub fn register_alloc(&mut self, stmt: StmtId, class: ClassId) {
        self.heap_model.register(stmt, class);
    }

    pub fn add_method(&mut self, builder: MethodBuilder) {
        let id = builder.id;
        let class = builder.declaring_class;
        let subsig = builder.subsignature.clone();
        let is_abstract = builder.is_abstract;
        let (method, cfg) = builder.finish();
        if !is_abstract {
            self.class_hierarchy.add_declared_method(class, subsig, id);
        } else {
            // Abstract methods are still declared (so CHA can see the
            // subsignature exists on this class), but `dispatch` only
            // returns non-abstract implementations: we register them
            // under a class hierarchy lookup but the solver checks
            // `is_abstract()` before treating a resolved method as
            // callable — see `graph::cha::dispatch`.
        }
        self.methods.insert(id, method);
        self.cfgs.insert(id, cfg);
    }

    pub fn build(self) -> InMemoryProgram {
        InMemoryProgram {
            methods: self.methods,
            cfgs: self.cfgs,
            class_hierarchy: self.class_hierarchy,
            heap_model: self.heap_model,
            field_types: self.field_types,
            var_types: self.var_types,
        }
    }
}

pub struct InMemoryProgram {
    methods: HashMap<MethodId, InMemoryMethod>,
    cfgs: HashMap<MethodId, InMemoryCfg>,
    class_hierarchy: InMemoryClassHierarchy,
    heap_model: InMemoryHeapModel,
    field_types: HashMap<FieldId, Type>,
    var_types: HashMap<VarId, Type>,
}

impl Program for InMemoryProgram {
    fn method(&self, id: MethodId) -> &dyn Method {
        self.methods.get(&id).expect("unknown method id")
    }
    fn cfg(&self, id: MethodId) -> &dyn Cfg {
        self.cfgs.get(&id).expect("unknown method id")
    }
    fn class_hierarchy(&self) -> &dyn ClassHierarchy {
        &self.class_hierarchy
    }
    fn heap_model(&self) -> &dyn HeapModel {
        &self.heap_model
    }
    fn field_type(&self, field: FieldId) -> Type {
        self.field_types.get(&field).cloned().unwrap_or(Type::Void)
    }
    fn methods(&self) -> Vec<MethodId> {
        self.methods.keys().copied().collect()
    }
    fn signature(&self, id: MethodId) -> &str {
        self.methods.get(&id).expect("unknown method id").full_signature()
    }
    fn var_type(&self, var: VarId) -> Type {
        self.var_types.get(&var).cloned().unwrap_or(Type::Void)
    }
}

/// Convenience for building a static call's `Invoke` shape shared by
/// every sample program / test helper.
pub fn invoke(
    call_site: StmtId,
    kind: CallKind,
    declaring_method: MethodId,
    subsignature: impl Into<String>,
    receiver: Option<VarId>,
    args: Vec<VarId>,
    result: Option<VarId>,
) -> Invoke {
    Invoke {
        call_site,
        kind,
        declaring_method,
        subsignature: subsignature.into(),
        receiver,
        args,
        result,
    }
}
