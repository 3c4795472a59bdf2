//! Term-kind tests and term constructors.

use super::value::{ExprError, ExprResult, Value};
use crate::lexical::{escape, resolve_iri};
use oxiri::Iri;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub(super) fn bound(value: &Value) -> Value {
    Value::Boolean(!value.is_unbound())
}

pub(super) fn is_iri(value: &Value) -> ExprResult<Value> {
    if value.is_unbound() {
        return Err(ExprError);
    }
    Ok(Value::Boolean(matches!(value, Value::Iri(_))))
}

pub(super) fn is_blank(value: &Value) -> ExprResult<Value> {
    if value.is_unbound() {
        return Err(ExprError);
    }
    Ok(Value::Boolean(value.is_blank()))
}

pub(super) fn is_literal(value: &Value) -> ExprResult<Value> {
    if value.is_unbound() {
        return Err(ExprError);
    }
    Ok(Value::Boolean(value.is_literal()))
}

pub(super) fn is_numeric(value: &Value) -> ExprResult<Value> {
    if value.is_unbound() {
        return Err(ExprError);
    }
    Ok(Value::Boolean(value.is_numeric()))
}

/// `sameTerm`: exact term identity, no coercion. `+0` and `-0` differ,
/// two identical `NaN` tokens are the same term.
pub(super) fn same_term(a: &Value, b: &Value) -> ExprResult<Value> {
    let left = a.to_term_text().ok_or(ExprError)?;
    let right = b.to_term_text().ok_or(ExprError)?;
    Ok(Value::Boolean(left == right))
}

pub(super) fn datatype(value: &Value) -> ExprResult<Value> {
    value.datatype_iri().map(Value::Iri)
}

/// `LANG()`: the language tag, or the empty string for untagged literals.
pub(super) fn lang(value: &Value) -> ExprResult<Value> {
    if !value.is_literal() {
        return Err(ExprError);
    }
    Ok(Value::simple_string(value.language_tag().unwrap_or("")))
}

/// `STR()`: the lexical form, stripped of any language or datatype.
pub(super) fn str_fn(value: &Value) -> ExprResult<Value> {
    let content = value.string_content()?;
    Ok(Value::simple_string(&content))
}

/// `IRI()` / `URI()`: builds an IRI, resolving relative forms against the
/// base IRI.
pub(super) fn iri(value: &Value, base: Option<&Iri<String>>) -> ExprResult<Value> {
    match value {
        Value::Iri(existing) => Ok(Value::Iri(existing.clone())),
        Value::Str(_) => {
            let content = value.string_content()?;
            Ok(Value::Iri(resolve_iri(&content, base)))
        }
        _ => Err(ExprError),
    }
}

static BNODE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `BNODE()` / `BNODE(str)`: a fresh blank node, or one derived from the
/// argument so equal arguments yield equal nodes within a query.
pub(super) fn bnode(argument: Option<&Value>) -> ExprResult<Value> {
    match argument {
        None => {
            let id = BNODE_COUNTER.fetch_add(1, Ordering::Relaxed);
            Ok(Value::Str(format!("_:gen{id}")))
        }
        Some(value) => {
            let content = value.string_content()?;
            let label: String = content
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            Ok(Value::Str(format!("_:fn{label}")))
        }
    }
}

/// `STRDT(lexical, datatype)`.
pub(super) fn strdt(lexical: &Value, datatype: &Value) -> ExprResult<Value> {
    let content = lexical.string_content()?;
    let Value::Iri(datatype) = datatype else {
        return Err(ExprError);
    };
    Ok(Value::from_term_text(&format!(
        "\"{}\"^^<{datatype}>",
        escape(&content)
    )))
}

/// `STRLANG(lexical, tag)`.
pub(super) fn strlang(lexical: &Value, tag: &Value) -> ExprResult<Value> {
    let content = lexical.string_content()?;
    let tag = tag.string_content()?;
    if tag.is_empty() {
        return Err(ExprError);
    }
    Ok(Value::Str(format!("\"{}\"@{tag}", escape(&content))))
}

pub(super) fn uuid() -> Value {
    Value::Iri(format!("urn:uuid:{}", Uuid::new_v4()))
}

pub(super) fn struuid() -> Value {
    Value::simple_string(&Uuid::new_v4().to_string())
}
