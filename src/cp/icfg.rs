//! Inter-procedural constant propagation with the alias-aware field and
//! array extension (§4.5). Requires a completed context-insensitive
//! pointer-analysis result — unlike the intra solver, a call site's
//! parameter passing and a field/array access's aliasing are both
//! resolved through it rather than folded to `NAC`.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::cp::evaluator::evaluate;
use crate::cp::intra::basic_def_value;
use crate::cp::lattice::{CPFact, Value};
use crate::cp::DataflowResult;
use crate::ir::icfg::{Icfg, IcfgEdgeKind, IcfgNode};
use crate::ir::method::Method;
use crate::ir::program::Program;
use crate::ir::stmt::Stmt;
use crate::ir::types::{FieldId, MethodId, VarId};
use crate::pta::cs_obj::ObjId;
use crate::pta::solver::PointerAnalysisResult;

/// The alias-aware object-keyed state of §4.5: `objFieldConst`,
/// `objElemConst`, and the reverse-points-to-derived indexes used to
/// decide which load nodes must be re-enqueued when a store changes a
/// cell they could read from.
///
/// Simplification from the literal spec, recorded here rather than left
/// implicit: reads are *pulled* fresh from `objFieldConst`/`objElemConst`
/// at the load site (`read_instance_field`/`read_static_field`/
/// `read_array`) rather than cached in a separate `fieldAccessConst`
/// table that stores push updates into. Both converge to the same least
/// fixed point because the points-to sets this extension consumes are
/// already final (a prior, already-solved CI result, not one co-iterated
/// with this solver) — `objFieldConst`/`objElemConst` are the only state
/// that still changes during this solve, and a pull always sees their
/// latest value. The reverse indexes below exist solely to know which
/// load nodes to re-enqueue on a store, which the pull model still
/// needs; for arrays this index is var/object-grained rather than
/// per-observed-index-grained (the literal spec's `(Obj, indexValue)`
/// observer set), a sound over-approximation — see DESIGN.md.
pub struct AliasCpContext {
    ci_pts: HashMap<VarId, HashSet<ObjId>>,
    rpts: HashMap<ObjId, HashSet<VarId>>,
    obj_field_const: HashMap<(Option<ObjId>, FieldId), Value>,
    obj_elem_const: HashMap<(ObjId, Value), Value>,
    instance_load_nodes: HashMap<(VarId, FieldId), Vec<IcfgNode>>,
    static_load_nodes: HashMap<FieldId, Vec<IcfgNode>>,
    array_load_nodes: HashMap<VarId, Vec<IcfgNode>>,
}

impl AliasCpContext {
    pub fn new(program: &dyn Program, reachable: &[MethodId], pta: &PointerAnalysisResult) -> Self {
        let mut ci_pts: HashMap<VarId, HashSet<ObjId>> = HashMap::new();
        let mut rpts: HashMap<ObjId, HashSet<VarId>> = HashMap::new();
        for (var, objs) in pta.ci_points_to_map() {
            for &o in &objs {
                rpts.entry(o).or_default().insert(var);
            }
            ci_pts.insert(var, objs);
        }

        let mut instance_load_nodes: HashMap<(VarId, FieldId), Vec<IcfgNode>> = HashMap::new();
        let mut static_load_nodes: HashMap<FieldId, Vec<IcfgNode>> = HashMap::new();
        let mut array_load_nodes: HashMap<VarId, Vec<IcfgNode>> = HashMap::new();
        for &m in reachable {
            let method = program.method(m);
            for &s in method.stmts() {
                let node = IcfgNode { method: m, stmt: s };
                match method.stmt(s) {
                    Stmt::InstanceLoad { base, field, .. } => {
                        instance_load_nodes.entry((*base, *field)).or_default().push(node);
                    }
                    Stmt::StaticLoad { field, .. } => {
                        static_load_nodes.entry(*field).or_default().push(node);
                    }
                    Stmt::ArrayLoad { base, .. } => {
                        array_load_nodes.entry(*base).or_default().push(node);
                    }
                    _ => {}
                }
            }
        }

        AliasCpContext {
            ci_pts,
            rpts,
            obj_field_const: HashMap::new(),
            obj_elem_const: HashMap::new(),
            instance_load_nodes,
            static_load_nodes,
            array_load_nodes,
        }
    }

    fn pts(&self, var: VarId) -> HashSet<ObjId> {
        self.ci_pts.get(&var).cloned().unwrap_or_default()
    }

    /// `z = x.f`: meet over `o ∈ pts(x)` of `objFieldConst[(Some(o), f)]`.
    pub fn read_instance_field(&self, base: VarId, field: FieldId) -> Value {
        let mut v = Value::Undef;
        for o in self.pts(base) {
            v = v.meet(self.obj_field_const.get(&(Some(o), field)).copied().unwrap_or(Value::Undef));
        }
        v
    }

    pub fn read_static_field(&self, field: FieldId) -> Value {
        self.obj_field_const.get(&(None, field)).copied().unwrap_or(Value::Undef)
    }

    /// `getElem(o, iv)` (§4.5): a wildcard write at unknown index is
    /// visible to every read regardless of its own index, per the
    /// documented Open Question treating `(o, UNDEF)` as the canonical
    /// wildcard cell.
    fn get_elem(&self, obj: ObjId, index: Value) -> Value {
        let wildcard = |key: (ObjId, Value), ctx: &Self| ctx.obj_elem_const.get(&key).copied().unwrap_or(Value::Undef);
        match index {
            Value::Undef => Value::Undef,
            Value::Nac => wildcard((obj, Value::Nac), self).meet(wildcard((obj, Value::Undef), self)),
            Value::Const(_) => wildcard((obj, Value::Nac), self).meet(wildcard((obj, index), self)),
        }
    }

    pub fn read_array(&self, base: VarId, index: Value) -> Value {
        let mut v = Value::Undef;
        for o in self.pts(base) {
            v = v.meet(self.get_elem(o, index));
        }
        v
    }

    /// `x.f = y`. Returns the load nodes that must be re-enqueued because
    /// this store changed a cell they may read from.
    pub fn write_instance_field(&mut self, base: VarId, field: FieldId, value: Value, dirty: &mut Vec<IcfgNode>) {
        for o in self.pts(base) {
            let key = (Some(o), field);
            let prev = self.obj_field_const.get(&key).copied().unwrap_or(Value::Undef);
            let merged = prev.meet(value);
            if merged == prev {
                continue;
            }
            self.obj_field_const.insert(key, merged);
            if let Some(aliases) = self.rpts.get(&o) {
                for &v in aliases {
                    if let Some(nodes) = self.instance_load_nodes.get(&(v, field)) {
                        dirty.extend(nodes.iter().copied());
                    }
                }
            }
        }
    }

    pub fn write_static_field(&mut self, field: FieldId, value: Value, dirty: &mut Vec<IcfgNode>) {
        let key = (None, field);
        let prev = self.obj_field_const.get(&key).copied().unwrap_or(Value::Undef);
        let merged = prev.meet(value);
        if merged == prev {
            return;
        }
        self.obj_field_const.insert(key, merged);
        if let Some(nodes) = self.static_load_nodes.get(&field) {
            dirty.extend(nodes.iter().copied());
        }
    }

    /// `x[i] = y`. A write at an `UNDEF` index is skipped entirely (§4.5
    /// "skip if iv = UNDEF") — an index that cannot even be evaluated to
    /// `NAC` yet tells us nothing sound to record.
    pub fn write_array(&mut self, base: VarId, index: Value, value: Value, dirty: &mut Vec<IcfgNode>) {
        if index.is_undef() {
            return;
        }
        for o in self.pts(base) {
            let mut changed = false;
            changed |= self.merge_elem_cell(o, index, value);
            if let Value::Nac = index {
                changed |= self.merge_elem_cell(o, Value::Undef, value);
            }
            if changed {
                if let Some(aliases) = self.rpts.get(&o) {
                    for &v in aliases {
                        if let Some(nodes) = self.array_load_nodes.get(&v) {
                            dirty.extend(nodes.iter().copied());
                        }
                    }
                }
            }
        }
    }

    fn merge_elem_cell(&mut self, obj: ObjId, index_key: Value, value: Value) -> bool {
        let key = (obj, index_key);
        let prev = self.obj_elem_const.get(&key).copied().unwrap_or(Value::Undef);
        let merged = prev.meet(value);
        if merged == prev {
            return false;
        }
        self.obj_elem_const.insert(key, merged);
        true
    }
}

/// The inter-procedural CP solver (§4.5): a forward worklist over an
/// `Icfg`, sharing `basic_def_value` with the intra solver for every
/// statement kind that isn't a call, field access or array access.
pub struct InterCPSolver<'p> {
    program: &'p dyn Program,
    icfg: &'p dyn Icfg,
    alias: AliasCpContext,
}

impl<'p> InterCPSolver<'p> {
    pub fn new(program: &'p dyn Program, icfg: &'p dyn Icfg, reachable: &[MethodId], pta: &PointerAnalysisResult) -> Self {
        InterCPSolver {
            program,
            icfg,
            alias: AliasCpContext::new(program, reachable, pta),
        }
    }

    /// Node transfer (§4.5): identity at a call (parameter passing is the
    /// `CALL` edge's job); the alias-aware rules at field/array accesses;
    /// `basic_def_value` everywhere else.
    fn node_transfer(&mut self, node: IcfgNode, in_fact: &CPFact, dirty: &mut Vec<IcfgNode>) -> CPFact {
        let method = self.program.method(node.method);
        let stmt = method.stmt(node.stmt);
        let mut out = in_fact.clone();
        match stmt {
            Stmt::Invoke(_) => {}
            Stmt::InstanceLoad { lhs, base, field } => {
                out.update(*lhs, self.alias.read_instance_field(*base, *field));
            }
            Stmt::StaticLoad { lhs, field } => {
                out.update(*lhs, self.alias.read_static_field(*field));
            }
            Stmt::ArrayLoad { lhs, base, index } => {
                let iv = evaluate(index, in_fact);
                out.update(*lhs, self.alias.read_array(*base, iv));
            }
            Stmt::InstanceStore { base, field, rhs } => {
                let v = in_fact.get(*rhs);
                self.alias.write_instance_field(*base, *field, v, dirty);
            }
            Stmt::StaticStore { field, rhs } => {
                let v = in_fact.get(*rhs);
                self.alias.write_static_field(*field, v, dirty);
            }
            Stmt::ArrayStore { base, index, rhs } => {
                let iv = evaluate(index, in_fact);
                let v = in_fact.get(*rhs);
                self.alias.write_array(*base, iv, v, dirty);
            }
            _ => {
                if let Some((lhs, value)) = basic_def_value(self.program, stmt, in_fact) {
                    out.update(lhs, value);
                }
            }
        }
        out
    }

    /// Edge transfer (§4.5), applied to the source node's `out` fact.
    fn edge_transfer(&self, kind: IcfgEdgeKind, from: IcfgNode, to: IcfgNode, out_fact: &CPFact) -> CPFact {
        match kind {
            IcfgEdgeKind::Normal => out_fact.clone(),
            IcfgEdgeKind::CallToReturn => {
                let mut f = out_fact.clone();
                if let Stmt::Invoke(call) = self.program.method(from.method).stmt(from.stmt) {
                    if let Some(lhs) = call.result {
                        f.update(lhs, Value::Undef);
                    }
                }
                f
            }
            IcfgEdgeKind::Call => {
                let mut f = CPFact::new();
                let caller_method = self.program.method(from.method);
                if let Stmt::Invoke(call) = caller_method.stmt(from.stmt) {
                    let callee_method = self.program.method(to.method);
                    for (i, &arg) in call.args.iter().enumerate() {
                        if let Some(&param) = callee_method.params().get(i) {
                            f.update(param, out_fact.get(arg));
                        }
                    }
                }
                f
            }
            IcfgEdgeKind::Return => {
                // `to` is the caller's post-call statement, not the call
                // site itself; recover the call site from the
                // `CALL_TO_RETURN` edge that shares the same target.
                let call_node = self
                    .icfg
                    .in_edges(to)
                    .iter()
                    .find(|&&(k, _)| k == IcfgEdgeKind::CallToReturn)
                    .map(|&(_, n)| n);
                let mut f = CPFact::new();
                if let Some(call_node) = call_node {
                    if let Stmt::Invoke(call) = self.program.method(call_node.method).stmt(call_node.stmt) {
                        if let Some(lhs) = call.result {
                            let callee_method = self.program.method(from.method);
                            let mut v = Value::Undef;
                            for &r in callee_method.return_vars() {
                                v = v.meet(out_fact.get(r));
                            }
                            f.update(lhs, v);
                        }
                    }
                }
                f
            }
        }
    }

    /// Runs to a fixed point starting from `entry`'s ICFG entry node. Per
    /// §4.4's inter-procedural carve-out, only `entry`'s own parameters
    /// are preset to `NAC`; every other reachable method's parameters
    /// start `UNDEF` and are filled in solely by `CALL`-edge transfers
    /// (§5's entry/non-entry seeding, see the module doc on
    /// [`DataflowResult`] for why no other node needs pre-populating).
    pub fn solve(&mut self, entry: MethodId) -> DataflowResult<IcfgNode, CPFact> {
        let mut result: DataflowResult<IcfgNode, CPFact> = DataflowResult::new();
        let entry_node = self.icfg.entry_node(entry);

        let mut boundary = CPFact::new();
        for &p in self.program.method(entry).params() {
            if self.program.var_type(p).can_hold_int() {
                boundary.update(p, Value::Nac);
            }
        }

        let mut worklist: VecDeque<IcfgNode> = VecDeque::new();
        worklist.push_back(entry_node);

        while let Some(node) = worklist.pop_front() {
            let mut in_fact = if node == entry_node { boundary.clone() } else { CPFact::new() };
            for &(kind, pred) in self.icfg.in_edges(node) {
                if let Some(pred_out) = result.out_fact(pred) {
                    let transferred = self.edge_transfer(kind, pred, node, pred_out);
                    in_fact.meet_into(&transferred);
                }
            }

            let already_visited = result.out_fact(node).is_some();
            let changed_in = match result.in_fact(node) {
                None => true,
                Some(prev) => !prev.equals(&in_fact),
            };
            result.set_in(node, in_fact.clone());
            if already_visited && !changed_in {
                continue;
            }

            let mut dirty = Vec::new();
            let new_out = self.node_transfer(node, &in_fact, &mut dirty);
            let changed_out = match result.out_fact(node) {
                None => true,
                Some(prev) => !prev.equals(&new_out),
            };
            result.set_out(node, new_out);

            if changed_out {
                for &(_, succ) in self.icfg.out_edges(node) {
                    worklist.push_back(succ);
                }
            }
            worklist.extend(dirty);
        }

        result
    }
}
