//! Expression evaluation in the three-point lattice (§4.4 `evaluate`).

use crate::cp::lattice::{CPFact, Value};
use crate::ir::stmt::{BinOp, RValue};

/// `evaluate(e, in)`: variables read from `in`, literals lift to
/// `CONST`, binary expressions fold per the rules below, anything else
/// (object creation, casts, field/array access without the
/// alias-aware extension) falls through to `NAC`.
pub fn evaluate(expr: &RValue, fact: &CPFact) -> Value {
    match expr {
        RValue::Var(v) => fact.get(*v),
        RValue::IntConst(c) => Value::Const(*c),
        RValue::Opaque => Value::Nac,
        RValue::Binary(op, lhs, rhs) => {
            let a = evaluate(lhs, fact);
            let b = evaluate(rhs, fact);
            evaluate_binary(*op, a, b)
        }
    }
}

/// Folds `a op b` in the lattice. Division/remainder by a constant
/// zero is `UNDEF` regardless of `a` (even `NAC`), checked before the
/// general `NAC` propagation rule (§4.4).
fn evaluate_binary(op: BinOp, a: Value, b: Value) -> Value {
    if op.is_divide() {
        if let Value::Const(0) = b {
            return Value::Undef;
        }
    }
    if a.is_nac() || b.is_nac() {
        return Value::Nac;
    }
    match (a, b) {
        (Value::Const(x), Value::Const(y)) => apply_const(op, x, y),
        _ => Value::Undef,
    }
}

/// Applies `op` to two known constants, signed 32-bit two's-complement
/// with wrap-around. `/` and `%` on a zero divisor are handled by the
/// caller before this is reached.
fn apply_const(op: BinOp, a: i32, b: i32) -> Value {
    let v = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Value::Undef;
            }
            a.wrapping_div(b)
        }
        BinOp::Rem => {
            if b == 0 {
                return Value::Undef;
            }
            a.wrapping_rem(b)
        }
        BinOp::Eq => bool_to_int(a == b),
        BinOp::Ne => bool_to_int(a != b),
        BinOp::Lt => bool_to_int(a < b),
        BinOp::Gt => bool_to_int(a > b),
        BinOp::Le => bool_to_int(a <= b),
        BinOp::Ge => bool_to_int(a >= b),
        BinOp::Shl => a.wrapping_shl(shift_amount(b)),
        BinOp::Shr => a.wrapping_shr(shift_amount(b)),
        BinOp::UShr => ((a as u32).wrapping_shr(shift_amount(b))) as i32,
        BinOp::Or => a | b,
        BinOp::And => a & b,
        BinOp::Xor => a ^ b,
    };
    Value::Const(v)
}

fn bool_to_int(b: bool) -> i32 {
    if b {
        1
    } else {
        0
    }
}

/// Shift counts are masked to the low 5 bits, matching the IR's source
/// language semantics for 32-bit shifts (a shift amount of 32 is a
/// no-op, not undefined behavior).
fn shift_amount(b: i32) -> u32 {
    (b as u32) & 0x1f
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::bit_vec::Idx;
    use crate::ir::types::VarId;

    fn konst(v: i32) -> RValue {
        RValue::IntConst(v)
    }

    #[test]
    fn variable_reads_from_fact() {
        let mut fact = CPFact::new();
        let v = VarId::new(0);
        fact.update(v, Value::Const(7));
        assert_eq!(evaluate(&RValue::Var(v), &fact), Value::Const(7));
    }

    #[test]
    fn divide_by_constant_zero_is_undef_even_with_nac_dividend() {
        let fact = CPFact::new();
        let v = VarId::new(0);
        let mut nac_fact = fact.clone();
        nac_fact.update(v, Value::Nac);
        let expr = RValue::Binary(BinOp::Div, Box::new(RValue::Var(v)), Box::new(konst(0)));
        assert_eq!(evaluate(&expr, &nac_fact), Value::Undef);
    }

    #[test]
    fn rem_by_nonzero_const_folds() {
        let fact = CPFact::new();
        let expr = RValue::Binary(BinOp::Rem, Box::new(konst(7)), Box::new(konst(3)));
        assert_eq!(evaluate(&expr, &fact), Value::Const(1));
    }

    #[test]
    fn nac_propagates_when_not_dividing_by_zero() {
        let fact = CPFact::new();
        let v = VarId::new(1);
        let mut f = fact.clone();
        f.update(v, Value::Nac);
        let expr = RValue::Binary(BinOp::Add, Box::new(RValue::Var(v)), Box::new(konst(1)));
        assert_eq!(evaluate(&expr, &f), Value::Nac);
    }

    #[test]
    fn relational_ops_yield_one_or_zero() {
        let fact = CPFact::new();
        let lt = RValue::Binary(BinOp::Lt, Box::new(konst(1)), Box::new(konst(0)));
        assert_eq!(evaluate(&lt, &fact), Value::Const(0));
        let le = RValue::Binary(BinOp::Le, Box::new(konst(1)), Box::new(konst(1)));
        assert_eq!(evaluate(&le, &fact), Value::Const(1));
    }

    #[test]
    fn signed_overflow_wraps() {
        let fact = CPFact::new();
        let expr = RValue::Binary(BinOp::Add, Box::new(konst(i32::MAX)), Box::new(konst(1)));
        assert_eq!(evaluate(&expr, &fact), Value::Const(i32::MIN));
    }

    #[test]
    fn unsigned_shift_right_clears_sign_bit() {
        let fact = CPFact::new();
        let expr = RValue::Binary(BinOp::UShr, Box::new(konst(-1)), Box::new(konst(28)));
        assert_eq!(evaluate(&expr, &fact), Value::Const(0xF));
    }

    #[test]
    fn undef_without_nac_folds_to_undef() {
        let fact = CPFact::new();
        let v = VarId::new(2);
        let expr = RValue::Binary(BinOp::Add, Box::new(RValue::Var(v)), Box::new(konst(1)));
        assert_eq!(evaluate(&expr, &fact), Value::Undef);
    }

    #[test]
    fn opaque_is_nac() {
        let fact = CPFact::new();
        assert_eq!(evaluate(&RValue::Opaque, &fact), Value::Nac);
    }
}
