//! Arithmetic and the numeric builtins.

use super::value::{ExprError, ExprResult, Value};

pub(super) fn add(a: &Value, b: &Value) -> ExprResult<Value> {
    binary(a, b, i64::checked_add, |x, y| x + y)
}

pub(super) fn sub(a: &Value, b: &Value) -> ExprResult<Value> {
    binary(a, b, i64::checked_sub, |x, y| x - y)
}

pub(super) fn mul(a: &Value, b: &Value) -> ExprResult<Value> {
    binary(a, b, i64::checked_mul, |x, y| x * y)
}

/// Division always yields a double; integer division in XSD produces a
/// decimal, which the evaluator models as double.
pub(super) fn div(a: &Value, b: &Value) -> ExprResult<Value> {
    let denominator = b.as_double()?;
    if denominator == 0.0 && matches!((a, b), (Value::Integer(_), Value::Integer(_))) {
        return Err(ExprError);
    }
    Ok(Value::Double(a.as_double()? / denominator))
}

pub(super) fn negate(value: &Value) -> ExprResult<Value> {
    match value {
        Value::Integer(x) => x.checked_neg().map(Value::Integer).ok_or(ExprError),
        Value::Double(x) => Ok(Value::Double(-x)),
        _ => Err(ExprError),
    }
}

fn binary(
    a: &Value,
    b: &Value,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    double_op: impl Fn(f64, f64) -> f64,
) -> ExprResult<Value> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            int_op(*x, *y).map(Value::Integer).ok_or(ExprError)
        }
        _ => Ok(Value::Double(double_op(a.as_double()?, b.as_double()?))),
    }
}

pub(super) fn abs(value: &Value) -> ExprResult<Value> {
    match value {
        Value::Integer(x) => x.checked_abs().map(Value::Integer).ok_or(ExprError),
        Value::Double(x) => Ok(Value::Double(x.abs())),
        _ => Err(ExprError),
    }
}

pub(super) fn round(value: &Value) -> ExprResult<Value> {
    match value {
        Value::Integer(x) => Ok(Value::Integer(*x)),
        Value::Double(x) => Ok(Value::Double(x.round())),
        _ => Err(ExprError),
    }
}

pub(super) fn ceil(value: &Value) -> ExprResult<Value> {
    match value {
        Value::Integer(x) => Ok(Value::Integer(*x)),
        Value::Double(x) => Ok(Value::Double(x.ceil())),
        _ => Err(ExprError),
    }
}

pub(super) fn floor(value: &Value) -> ExprResult<Value> {
    match value {
        Value::Integer(x) => Ok(Value::Integer(*x)),
        Value::Double(x) => Ok(Value::Double(x.floor())),
        _ => Err(ExprError),
    }
}

/// `RAND()`: 0 ≤ x < 1.
pub(super) fn rand() -> Value {
    Value::Double(rand::random::<f64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_stays_integer() {
        assert_eq!(
            add(&Value::Integer(2), &Value::Integer(3)).unwrap(),
            Value::Integer(5)
        );
        assert_eq!(
            mul(&Value::Integer(2), &Value::Double(1.5)).unwrap(),
            Value::Double(3.0)
        );
    }

    #[test]
    fn integer_overflow_is_a_row_error() {
        assert!(add(&Value::Integer(i64::MAX), &Value::Integer(1)).is_err());
    }

    #[test]
    fn division_by_integer_zero_fails() {
        assert!(div(&Value::Integer(1), &Value::Integer(0)).is_err());
        assert_eq!(
            div(&Value::Integer(7), &Value::Integer(2)).unwrap(),
            Value::Double(3.5)
        );
    }

    #[test]
    fn rounding_family() {
        assert_eq!(round(&Value::Double(2.5)).unwrap(), Value::Double(3.0));
        assert_eq!(ceil(&Value::Double(2.1)).unwrap(), Value::Double(3.0));
        assert_eq!(floor(&Value::Double(2.9)).unwrap(), Value::Double(2.0));
        assert_eq!(abs(&Value::Integer(-4)).unwrap(), Value::Integer(4));
    }
}
