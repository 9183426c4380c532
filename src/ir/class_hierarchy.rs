//! Class-hierarchy contract (§6 `ClassHierarchy` collaborator) plus one
//! concrete in-memory implementation used by tests and by the bundled
//! sample program.

use std::collections::{HashMap, HashSet};

use crate::ir::types::{ClassId, MethodId};

/// A declared-method subsignature: name + erased parameter arity is
/// enough to disambiguate overloads for the purposes of this engine
/// (overload resolution by full parameter types is left to the IR
/// collaborator that assigns `MethodId`s).
pub type Subsignature = String;

pub trait ClassHierarchy {
    fn is_interface(&self, class: ClassId) -> bool;
    fn super_class(&self, class: ClassId) -> Option<ClassId>;
    fn direct_subclasses(&self, class: ClassId) -> &[ClassId];
    fn direct_subinterfaces(&self, iface: ClassId) -> &[ClassId];
    fn direct_implementors(&self, iface: ClassId) -> &[ClassId];

    /// The method declared directly on `class` with the given
    /// subsignature, if any (no superclass lookup).
    fn declared_method(&self, class: ClassId, subsig: &Subsignature) -> Option<MethodId>;

    /// `dispatch(class, subsig)`: walk from `class` up through
    /// superclasses looking for a declared, non-abstract method with
    /// `subsig`. Returns `None` if none is found up to the root — a
    /// dispatch miss, not an error (§7, §9 Open Questions).
    fn dispatch(&self, class: ClassId, subsig: &Subsignature) -> Option<MethodId> {
        let mut cur = Some(class);
        while let Some(c) = cur {
            if let Some(m) = self.declared_method(c, subsig) {
                return Some(m);
            }
            cur = self.super_class(c);
        }
        None
    }

    /// All subtypes of `class` (transitive), including `class` itself.
    /// Subinterfaces are folded into the same transitive walk as
    /// subclasses, which over-approximates interface hierarchies but is
    /// the documented, intentional behavior (§9 Open Questions: CHA
    /// dispatch treating subinterfaces as subclasses).
    fn all_subtypes(&self, class: ClassId) -> HashSet<ClassId> {
        let mut seen = HashSet::new();
        let mut worklist = vec![class];
        while let Some(c) = worklist.pop() {
            if !seen.insert(c) {
                continue;
            }
            for &sub in self.direct_subclasses(c) {
                worklist.push(sub);
            }
            for &sub in self.direct_subinterfaces(c) {
                worklist.push(sub);
            }
            for &sub in self.direct_implementors(c) {
                worklist.push(sub);
            }
        }
        seen
    }
}

#[derive(Default)]
pub struct InMemoryClassHierarchy {
    interfaces: HashSet<ClassId>,
    super_classes: HashMap<ClassId, ClassId>,
    subclasses: HashMap<ClassId, Vec<ClassId>>,
    subinterfaces: HashMap<ClassId, Vec<ClassId>>,
    implementors: HashMap<ClassId, Vec<ClassId>>,
    declared_methods: HashMap<(ClassId, Subsignature), MethodId>,
}

impl InMemoryClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: ClassId, super_class: Option<ClassId>) {
        if let Some(sup) = super_class {
            self.super_classes.insert(class, sup);
            self.subclasses.entry(sup).or_default().push(class);
        }
    }

    pub fn add_interface(&mut self, iface: ClassId, super_iface: Option<ClassId>) {
        self.interfaces.insert(iface);
        if let Some(sup) = super_iface {
            self.subinterfaces.entry(sup).or_default().push(iface);
        }
    }

    pub fn add_implementor(&mut self, iface: ClassId, class: ClassId) {
        self.implementors.entry(iface).or_default().push(class);
    }

    pub fn add_declared_method(&mut self, class: ClassId, subsig: impl Into<String>, method: MethodId) {
        self.declared_methods.insert((class, subsig.into()), method);
    }
}

impl ClassHierarchy for InMemoryClassHierarchy {
    fn is_interface(&self, class: ClassId) -> bool {
        self.interfaces.contains(&class)
    }

    fn super_class(&self, class: ClassId) -> Option<ClassId> {
        self.super_classes.get(&class).copied()
    }

    fn direct_subclasses(&self, class: ClassId) -> &[ClassId] {
        self.subclasses.get(&class).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn direct_subinterfaces(&self, iface: ClassId) -> &[ClassId] {
        self.subinterfaces.get(&iface).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn direct_implementors(&self, iface: ClassId) -> &[ClassId] {
        self.implementors.get(&iface).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn declared_method(&self, class: ClassId, subsig: &Subsignature) -> Option<MethodId> {
        self.declared_methods.get(&(class, subsig.clone())).copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::bit_vec::Idx;

    #[test]
    fn dispatch_walks_up_to_superclass() {
        let a = ClassId::new(0);
        let b = ClassId::new(1);
        let mut ch = InMemoryClassHierarchy::new();
        ch.add_class(b, Some(a));
        ch.add_declared_method(a, "m()", MethodId::new(7));
        assert_eq!(ch.dispatch(b, &"m()".to_string()), Some(MethodId::new(7)));
    }

    #[test]
    fn dispatch_miss_returns_none() {
        let a = ClassId::new(0);
        let ch = InMemoryClassHierarchy::new();
        assert_eq!(ch.dispatch(a, &"missing()".to_string()), None);
    }
}
