//! The three-point integer constant lattice (§3 `Value`) and the fact
//! map built on top of it (§3 `CPFact`).

use std::collections::HashMap;
use std::collections::hash_map::Iter;

use crate::ir::types::VarId;

/// `UNDEF` (bottom, no information), `CONST(i32)` (a single concrete
/// value), `NAC` (top, "not a constant"). Total, commutative,
/// associative meet: `NAC ⊓ x = NAC`; `UNDEF ⊓ x = x`; `c ⊓ c = c`;
/// `c ⊓ c' = NAC` for distinct constants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Undef,
    Const(i32),
    Nac,
}

impl Value {
    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    pub fn is_nac(&self) -> bool {
        matches!(self, Value::Nac)
    }

    pub fn as_const(&self) -> Option<i32> {
        match self {
            Value::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// `meet(a, b)` per §3.
    pub fn meet(self, other: Value) -> Value {
        match (self, other) {
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            (Value::Undef, x) | (x, Value::Undef) => x,
            (Value::Const(a), Value::Const(b)) => {
                if a == b {
                    Value::Const(a)
                } else {
                    Value::Nac
                }
            }
        }
    }
}

/// Mapping from variable identity to [`Value`], with the invariant that
/// an absent key denotes `UNDEF` (§3). `update`ing a variable to
/// `UNDEF` removes its entry rather than storing it explicitly, so that
/// two facts with the same "real" information always compare `equal`
/// regardless of which keys happen to have been touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CPFact {
    values: HashMap<VarId, Value>,
}

impl CPFact {
    pub fn new() -> Self {
        CPFact::default()
    }

    pub fn get(&self, var: VarId) -> Value {
        self.values.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Sets `var` to `value`. Setting it to `UNDEF` removes the key
    /// (absent key ≡ `UNDEF`, §3).
    pub fn update(&mut self, var: VarId, value: Value) {
        if value.is_undef() {
            self.values.remove(&var);
        } else {
            self.values.insert(var, value);
        }
    }

    pub fn copy_from(&mut self, other: &CPFact) {
        self.values = other.values.clone();
    }

    pub fn equals(&self, other: &CPFact) -> bool {
        self.values == other.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, VarId, Value> {
        self.values.iter()
    }

    /// `meetInto`: mutates `self` to `meet(self, fact)` over the union
    /// of keys present in either fact. Returns whether `self` changed.
    pub fn meet_into(&mut self, fact: &CPFact) -> bool {
        let mut changed = false;
        for (&var, &v) in fact.iter() {
            let merged = self.get(var).meet(v);
            if merged != self.get(var) {
                changed = true;
            }
            self.update(var, merged);
        }
        changed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::bit_vec::Idx;

    #[test]
    fn meet_is_commutative_associative_idempotent() {
        let values = [Value::Undef, Value::Const(1), Value::Const(2), Value::Nac];
        for &a in &values {
            for &b in &values {
                assert_eq!(a.meet(b), b.meet(a));
                for &c in &values {
                    assert_eq!(a.meet(b).meet(c), a.meet(b.meet(c)));
                }
            }
            assert_eq!(a.meet(a), a);
        }
    }

    #[test]
    fn nac_absorbs_undef_identity() {
        assert_eq!(Value::Nac.meet(Value::Const(5)), Value::Nac);
        assert_eq!(Value::Undef.meet(Value::Const(5)), Value::Const(5));
        assert_eq!(Value::Const(3).meet(Value::Const(4)), Value::Nac);
    }

    #[test]
    fn absent_key_is_undef_and_update_to_undef_removes() {
        let mut fact = CPFact::new();
        let v = VarId::new(0);
        assert_eq!(fact.get(v), Value::Undef);
        fact.update(v, Value::Const(1));
        assert_eq!(fact.get(v), Value::Const(1));
        fact.update(v, Value::Undef);
        assert!(fact.is_empty());
    }

    #[test]
    fn meet_into_merges_pointwise() {
        let mut a = CPFact::new();
        let v0 = VarId::new(0);
        let v1 = VarId::new(1);
        a.update(v0, Value::Const(1));
        let mut b = CPFact::new();
        b.update(v0, Value::Const(1));
        b.update(v1, Value::Const(2));
        let changed = a.meet_into(&b);
        assert!(changed);
        assert_eq!(a.get(v0), Value::Const(1));
        assert_eq!(a.get(v1), Value::Const(2));
        assert!(!a.meet_into(&b));
    }
}
