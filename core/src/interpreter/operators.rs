//! Binary, unary and comparison operator implementations.
//!
//! Errors come back as bare [`RuntimeErrorKind`]s; the interpreter attaches
//! the stack.

use core::cmp::Ordering;

use crate::errors::RuntimeErrorKind;
use crate::parser::{BinaryOp, ComparisonOp, UnaryOp};
use crate::values::Value;

pub(super) fn eval_unary(op: UnaryOp, value: &Value) -> Result<Value, RuntimeErrorKind> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Int(i)) => Ok(match i.checked_neg() {
            Some(negated) => Value::Int(negated),
            None => Value::Float(-(*i as f64)),
        }),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, other) => Err(type_error(format!(
            "bad operand type for unary -: {}",
            other.type_name()
        ))),
    }
}

pub(super) fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeErrorKind> {
    if op == BinaryOp::Add && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_))) {
        return Ok(Value::Str(left.to_text() + &right.to_text()));
    }

    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_binary_int(op, *a, *b),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(eval_binary_float(op, a, b))),
            _ => Err(type_error(format!(
                "unsupported operand types for {}: {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

/// Integer arithmetic. Results that do not fit an integer fall back to floats,
/// which includes division by zero (`1 / 0` is `Infinity`, `1 % 0` is `NaN`).
fn eval_binary_int(op: BinaryOp, left: i64, right: i64) -> Result<Value, RuntimeErrorKind> {
    let exact = match op {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Sub => left.checked_sub(right),
        BinaryOp::Mul => left.checked_mul(right),
        BinaryOp::Div => match left.checked_rem(right) {
            Some(0) => left.checked_div(right),
            _ => None,
        },
        BinaryOp::Rem => left.checked_rem(right),
    };
    Ok(match exact {
        Some(value) => Value::Int(value),
        None => Value::Float(eval_binary_float(op, left as f64, right as f64)),
    })
}

/// Float arithmetic. Follows IEEE 754, so division by zero gives an infinity.
fn eval_binary_float(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Rem => left % right,
    }
}

pub(super) fn eval_comparison(
    op: ComparisonOp,
    left: &Value,
    right: &Value,
) -> Result<Value, RuntimeErrorKind> {
    let result = match op {
        ComparisonOp::Eq => left == right,
        ComparisonOp::Neq => left != right,
        ComparisonOp::Lt | ComparisonOp::Gt | ComparisonOp::Le | ComparisonOp::Ge => {
            let ordering = order(left, right).ok_or_else(|| {
                type_error(format!(
                    "cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            match op {
                ComparisonOp::Lt => ordering == Some(Ordering::Less),
                ComparisonOp::Gt => ordering == Some(Ordering::Greater),
                ComparisonOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            }
        }
    };
    Ok(Value::Bool(result))
}

/// `None` when the values cannot be ordered at all; `Some(None)` when they
/// can but are unordered, like a comparison involving NaN.
fn order(left: &Value, right: &Value) -> Option<Option<Ordering>> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(Some(a.cmp(b))),
        (Value::Str(a), Value::Str(b)) => Some(Some(a.cmp(b))),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Some(a.partial_cmp(&b)),
            _ => None,
        },
    }
}

fn type_error(message: String) -> RuntimeErrorKind {
    RuntimeErrorKind::Type { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(op: BinaryOp, a: i64, b: i64) -> Value {
        eval_binary(op, &Value::Int(a), &Value::Int(b)).unwrap()
    }

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(int(BinaryOp::Add, 2, 3), Value::Int(5));
        assert_eq!(int(BinaryOp::Sub, 3, 10), Value::Int(-7));
        assert_eq!(int(BinaryOp::Mul, -2, 5), Value::Int(-10));
        assert_eq!(int(BinaryOp::Rem, 7, 4), Value::Int(3));
    }

    #[test]
    fn test_int_division_is_exact_or_float() {
        assert!(matches!(int(BinaryOp::Div, 8, 2), Value::Int(4)));
        assert!(matches!(int(BinaryOp::Div, 7, 2), Value::Float(f) if f == 3.5));
    }

    #[test]
    fn test_int_overflow_falls_back_to_float() {
        assert!(matches!(int(BinaryOp::Add, i64::MAX, 1), Value::Float(_)));
        assert!(matches!(int(BinaryOp::Div, i64::MIN, -1), Value::Float(_)));
    }

    #[test]
    fn test_division_by_zero_promotes_to_float() {
        assert!(matches!(int(BinaryOp::Div, 1, 0), Value::Float(f) if f == f64::INFINITY));
        assert!(matches!(int(BinaryOp::Div, -1, 0), Value::Float(f) if f == f64::NEG_INFINITY));
        assert!(matches!(int(BinaryOp::Div, 0, 0), Value::Float(f) if f.is_nan()));
        assert!(matches!(int(BinaryOp::Rem, 1, 0), Value::Float(f) if f.is_nan()));

        let inf = eval_binary(BinaryOp::Div, &Value::Float(1.0), &Value::Int(0)).unwrap();
        assert!(matches!(inf, Value::Float(f) if f.is_infinite()));
    }

    #[test]
    fn test_string_concatenation() {
        let value = eval_binary(BinaryOp::Add, &Value::from("n = "), &Value::Int(3)).unwrap();
        assert_eq!(value, Value::from("n = 3"));

        let value = eval_binary(BinaryOp::Add, &Value::Null, &Value::from("!")).unwrap();
        assert_eq!(value, Value::from("null!"));
    }

    #[test]
    fn test_type_errors() {
        let err = eval_binary(BinaryOp::Sub, &Value::from("a"), &Value::Int(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: unsupported operand types for -: string and number"
        );
        assert!(eval_unary(UnaryOp::Neg, &Value::Array(vec![])).is_err());
    }

    #[test]
    fn test_comparisons() {
        let cmp = |op, a: Value, b: Value| eval_comparison(op, &a, &b).unwrap();
        assert_eq!(cmp(ComparisonOp::Lt, Value::Int(1), Value::Float(1.5)), Value::Bool(true));
        assert_eq!(cmp(ComparisonOp::Ge, Value::from("b"), Value::from("a")), Value::Bool(true));
        assert_eq!(cmp(ComparisonOp::Eq, Value::Int(1), Value::Float(1.0)), Value::Bool(true));
        assert_eq!(cmp(ComparisonOp::Neq, Value::Null, Value::Bool(false)), Value::Bool(true));
        assert_eq!(
            cmp(ComparisonOp::Lt, Value::Float(f64::NAN), Value::Int(1)),
            Value::Bool(false)
        );
        assert!(eval_comparison(ComparisonOp::Lt, &Value::Null, &Value::Int(1)).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(eval_unary(UnaryOp::Not, &Value::from("")).unwrap(), Value::Bool(true));
        assert_eq!(eval_unary(UnaryOp::Neg, &Value::Int(5)).unwrap(), Value::Int(-5));
    }
}
