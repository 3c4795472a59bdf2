//! The XSD constructor functions (casts).

use super::value::{ExprError, ExprResult, Value};
use quadflow_model::vocab::xsd;

/// Dispatches a cast by datatype IRI. Returns `None` when the IRI is not a
/// supported constructor.
pub(super) fn cast_by_iri(iri: &str, value: &Value) -> Option<ExprResult<Value>> {
    match iri {
        xsd::INTEGER => Some(to_integer(value)),
        xsd::DECIMAL | xsd::DOUBLE | xsd::FLOAT => Some(to_double(value)),
        xsd::BOOLEAN => Some(to_boolean(value)),
        xsd::STRING => Some(to_string(value)),
        _ => None,
    }
}

/// `xsd:integer`: a string lexical form carrying `.`, `e` or `E` is
/// rejected rather than truncated.
fn to_integer(value: &Value) -> ExprResult<Value> {
    match value {
        Value::Integer(x) => Ok(Value::Integer(*x)),
        Value::Double(x) => {
            if x.is_finite() {
                Ok(Value::Integer(*x as i64))
            } else {
                Err(ExprError)
            }
        }
        Value::Boolean(x) => Ok(Value::Integer(i64::from(*x))),
        Value::Str(_) => {
            let content = value.string_content()?;
            let content = content.trim();
            if content.contains(['.', 'e', 'E']) {
                return Err(ExprError);
            }
            content.parse().map(Value::Integer).map_err(|_| ExprError)
        }
        _ => Err(ExprError),
    }
}

fn to_double(value: &Value) -> ExprResult<Value> {
    match value {
        Value::Integer(x) => Ok(Value::Double(*x as f64)),
        Value::Double(x) => Ok(Value::Double(*x)),
        Value::Boolean(x) => Ok(Value::Double(if *x { 1.0 } else { 0.0 })),
        Value::Str(_) => {
            let content = value.string_content()?;
            content
                .trim()
                .parse()
                .map(Value::Double)
                .map_err(|_| ExprError)
        }
        _ => Err(ExprError),
    }
}

fn to_boolean(value: &Value) -> ExprResult<Value> {
    match value {
        Value::Boolean(x) => Ok(Value::Boolean(*x)),
        Value::Integer(x) => Ok(Value::Boolean(*x != 0)),
        Value::Double(x) => Ok(Value::Boolean(*x != 0.0)),
        Value::Str(_) => match value.string_content()?.trim() {
            "true" | "1" => Ok(Value::Boolean(true)),
            "false" | "0" => Ok(Value::Boolean(false)),
            _ => Err(ExprError),
        },
        _ => Err(ExprError),
    }
}

fn to_string(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    Ok(Value::simple_string(&content))
}
