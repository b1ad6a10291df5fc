//! Arithmetic, comparison and bitwise operators with Java's numeric
//! promotion. `&&`, `||` and string `+` are evaluated by the interpreter.

use crate::builtins::exception;
use crate::error::{Exec, Unwind};
use crate::value::Value;
use lpg_ast::{BinaryOp, UnaryOp};

/// The promoted operand type of a binary numeric operation.
enum Promoted {
    Int(i32, i32),
    Long(i64, i64),
    Double(f64, f64),
}

fn promote(left: &Value, right: &Value) -> Option<Promoted> {
    match (left, right) {
        (Value::Double(_), _) | (_, Value::Double(_)) => Some(Promoted::Double(left.as_f64()?, right.as_f64()?)),
        (Value::Long(_), _) | (_, Value::Long(_)) => Some(Promoted::Long(left.as_long()?, right.as_long()?)),
        _ => Some(Promoted::Int(left.as_int()?, right.as_int()?)),
    }
}

fn operand_error(op: BinaryOp, left: &Value, right: &Value) -> Unwind {
    Unwind::Error(crate::EvalError::Unsupported(format!(
        "'{}' on {} and {}",
        op.as_str(),
        left.kind(),
        right.kind()
    )))
}

fn divide_by_zero() -> Unwind {
    exception("ArithmeticException", "/ by zero".to_string())
}

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Exec<Value> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left.same(right))),
        BinaryOp::Ne => return Ok(Value::Bool(!left.same(right))),
        BinaryOp::And | BinaryOp::Or => {
            return match (left.as_bool(), right.as_bool()) {
                (Some(a), Some(b)) => Ok(Value::Bool(if op == BinaryOp::And { a && b } else { a || b })),
                _ => Err(operand_error(op, left, right)),
            }
        }
        _ => {}
    }

    if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
        return match op {
            BinaryOp::BitAnd => Ok(Value::Bool(a & b)),
            BinaryOp::BitOr => Ok(Value::Bool(a | b)),
            BinaryOp::BitXor => Ok(Value::Bool(a ^ b)),
            _ => Err(operand_error(op, left, right)),
        };
    }

    if matches!(op, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr) {
        return shift(op, left, right).ok_or_else(|| operand_error(op, left, right));
    }

    let promoted = promote(left, right).ok_or_else(|| operand_error(op, left, right))?;
    match promoted {
        Promoted::Int(a, b) => int_op(op, a, b).map(|r| r.map_or_else(|| Value::Bool(compare(op, a, b)), Value::Int)),
        Promoted::Long(a, b) => long_op(op, a, b).map(|r| r.map_or_else(|| Value::Bool(compare(op, a, b)), Value::Long)),
        Promoted::Double(a, b) => Ok(double_op(op, a, b)),
    }
}

fn compare<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

/// `Ok(None)` for comparisons.
fn int_op(op: BinaryOp, a: i32, b: i32) -> Exec<Option<i32>> {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div if b == 0 => return Err(divide_by_zero()),
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Rem if b == 0 => return Err(divide_by_zero()),
        BinaryOp::Rem => a.wrapping_rem(b),
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn long_op(op: BinaryOp, a: i64, b: i64) -> Exec<Option<i64>> {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div if b == 0 => return Err(divide_by_zero()),
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Rem if b == 0 => return Err(divide_by_zero()),
        BinaryOp::Rem => a.wrapping_rem(b),
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn double_op(op: BinaryOp, a: f64, b: f64) -> Value {
    match op {
        BinaryOp::Add => Value::Double(a + b),
        BinaryOp::Sub => Value::Double(a - b),
        BinaryOp::Mul => Value::Double(a * b),
        BinaryOp::Div => Value::Double(a / b),
        BinaryOp::Rem => Value::Double(a % b),
        _ => Value::Bool(compare(op, a, b)),
    }
}

/// Shifts take the left operand's width; the distance is masked.
fn shift(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    let distance = right.as_long()?;
    match left {
        Value::Long(a) => {
            let n = (distance & 0x3f) as u32;
            Some(Value::Long(match op {
                BinaryOp::Shl => a.wrapping_shl(n),
                BinaryOp::Shr => a.wrapping_shr(n),
                _ => ((*a as u64) >> n) as i64,
            }))
        }
        other => {
            let a = other.as_int()?;
            let n = (distance & 0x1f) as u32;
            Some(Value::Int(match op {
                BinaryOp::Shl => a.wrapping_shl(n),
                BinaryOp::Shr => a.wrapping_shr(n),
                _ => ((a as u32) >> n) as i32,
            }))
        }
    }
}

/// Unary operators other than increments, which need a place.
pub(crate) fn unary(op: UnaryOp, operand: &Value) -> Exec<Value> {
    let unsupported = || {
        Unwind::Error(crate::EvalError::Unsupported(format!(
            "'{}' on {}",
            op.as_str(),
            operand.kind()
        )))
    };
    match (op, operand) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Plus, Value::Char(c)) => Ok(Value::Int(*c as i32)),
        (UnaryOp::Plus, value) if value.as_f64().is_some() => Ok(value.clone()),
        (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (UnaryOp::Neg, Value::Char(c)) => Ok(Value::Int(-(*c as i32))),
        (UnaryOp::Neg, Value::Long(l)) => Ok(Value::Long(l.wrapping_neg())),
        (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
        (UnaryOp::BitNot, Value::Int(i)) => Ok(Value::Int(!i)),
        (UnaryOp::BitNot, Value::Long(l)) => Ok(Value::Long(!l)),
        _ => Err(unsupported()),
    }
}

/// `value + 1` or `value - 1`, keeping the operand's type.
pub(crate) fn step(value: &Value, up: bool) -> Exec<Value> {
    let delta = if up { 1 } else { -1 };
    match value {
        Value::Int(i) => Ok(Value::Int(i.wrapping_add(delta))),
        Value::Long(l) => Ok(Value::Long(l.wrapping_add(i64::from(delta)))),
        Value::Double(d) => Ok(Value::Double(d + f64::from(delta))),
        Value::Char(c) => {
            let next = (*c as i32 + delta) as u32;
            Ok(Value::Char(char::from_u32(next).unwrap_or('\0')))
        }
        other => Err(crate::error::mismatch("number", other)),
    }
}

/// Narrowing and widening for primitive casts.
pub(crate) fn convert(value: &Value, target: &str) -> Option<Value> {
    let converted = match (target, value) {
        ("int", Value::Double(d)) => Value::Int(*d as i32),
        ("int", v) => Value::Int(v.as_long()? as i32),
        ("long", Value::Double(d)) => Value::Long(*d as i64),
        ("long", v) => Value::Long(v.as_long()?),
        ("short", v) => Value::Int(i32::from(v.as_long()? as i16)),
        ("byte", v) => Value::Int(i32::from(v.as_long()? as i8)),
        ("double" | "float", v) => Value::Double(v.as_f64()?),
        ("char", v) => Value::Char(char::from_u32(v.as_long()? as u32 & 0xffff).unwrap_or('\0')),
        ("boolean", Value::Bool(b)) => Value::Bool(*b),
        _ => return None,
    };
    Some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arithmetic_wraps() {
        assert_eq!(binary(BinaryOp::Add, &Value::Int(i32::MAX), &Value::Int(1)).unwrap(), Value::Int(i32::MIN));
        assert_eq!(binary(BinaryOp::Div, &Value::Int(7), &Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!(binary(BinaryOp::Rem, &Value::Int(-7), &Value::Int(2)).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_promotion_to_long_and_double() {
        assert!(matches!(binary(BinaryOp::Mul, &Value::Int(2), &Value::Long(3)).unwrap(), Value::Long(6)));
        assert!(matches!(binary(BinaryOp::Add, &Value::Int(1), &Value::Double(0.5)).unwrap(), Value::Double(d) if d == 1.5));
    }

    #[test]
    fn test_integer_division_by_zero_throws() {
        assert!(matches!(binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0)), Err(Unwind::Throw(_))));
        assert!(matches!(binary(BinaryOp::Div, &Value::Double(1.0), &Value::Double(0.0)).unwrap(), Value::Double(d) if d.is_infinite()));
    }

    #[test]
    fn test_comparisons_and_char_arithmetic() {
        assert_eq!(binary(BinaryOp::Lt, &Value::Char('a'), &Value::Int(98)).unwrap(), Value::Bool(true));
        assert_eq!(binary(BinaryOp::Ge, &Value::Long(2), &Value::Int(3)).unwrap(), Value::Bool(false));
        assert_eq!(step(&Value::Char('a'), true).unwrap(), Value::Char('b'));
    }

    #[test]
    fn test_shifts_use_left_width() {
        assert_eq!(binary(BinaryOp::UShr, &Value::Int(-1), &Value::Int(28)).unwrap(), Value::Int(15));
        assert!(matches!(binary(BinaryOp::Shl, &Value::Long(1), &Value::Int(40)).unwrap(), Value::Long(l) if l == 1 << 40));
    }
}
