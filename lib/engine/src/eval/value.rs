use crate::config::StringNumericMode;
use crate::lexical::{escape, split_literal, unescape};
use quadflow_model::vocab::{rdf, xsd};
use std::borrow::Cow;
use std::cmp::Ordering;

/// Tolerance for `=`/`<`/... on doubles. `sameTerm` never uses it.
pub(crate) const DOUBLE_EPSILON: f64 = 1e-10;

/// A row-local expression failure: a type error or a malformed operand.
/// Filters treat it as false, BIND leaves the target variable unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExprError;

pub(crate) type ExprResult<T> = Result<T, ExprError>;

/// A value inside the expression evaluator.
///
/// `Str` keeps the full quoted lexical form, suffix included, so
/// string-returning builtins can preserve language tags and datatypes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Unbound,
    Iri(String),
    Str(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
}

impl Value {
    /// Classifies a binding value (N-Triples lexical string) into a typed
    /// value, following the literal's datatype.
    pub(crate) fn from_term_text(text: &str) -> Value {
        if let Some(iri) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return Value::Iri(iri.to_owned());
        }
        if !text.starts_with('"') {
            // Blank nodes and anything else non-literal stay textual.
            return Value::Str(text.to_owned());
        }
        let Some((content, suffix)) = split_literal(text) else {
            return Value::Str(text.to_owned());
        };
        if let Some(datatype) = suffix.strip_prefix("^^<").and_then(|s| s.strip_suffix('>')) {
            if datatype == xsd::BOOLEAN {
                return match content {
                    "true" | "1" => Value::Boolean(true),
                    "false" | "0" => Value::Boolean(false),
                    _ => Value::Str(text.to_owned()),
                };
            }
            if xsd::is_integer_datatype(datatype) {
                if let Ok(value) = content.parse::<i64>() {
                    return Value::Integer(value);
                }
            }
            if xsd::is_double_datatype(datatype) {
                if let Ok(value) = content.parse::<f64>() {
                    return Value::Double(value);
                }
            }
        }
        Value::Str(text.to_owned())
    }

    /// Renders the value back into a binding string. `None` for unbound.
    pub(crate) fn to_term_text(&self) -> Option<String> {
        match self {
            Value::Unbound => None,
            Value::Iri(iri) => Some(format!("<{iri}>")),
            Value::Str(raw) => Some(raw.clone()),
            Value::Integer(value) => Some(format!("\"{value}\"^^<{}>", xsd::INTEGER)),
            Value::Double(value) => Some(format!("\"{value}\"^^<{}>", xsd::DOUBLE)),
            Value::Boolean(value) => Some(format!("\"{value}\"^^<{}>", xsd::BOOLEAN)),
        }
    }

    pub(crate) fn is_unbound(&self) -> bool {
        matches!(self, Value::Unbound)
    }

    /// Builds a simple string literal from unescaped content.
    pub(crate) fn simple_string(content: &str) -> Value {
        Value::Str(format!("\"{}\"", escape(content)))
    }

    /// Builds a string literal carrying `suffix` (a language tag or
    /// datatype suffix copied from another literal).
    pub(crate) fn string_with_suffix(content: &str, suffix: &str) -> Value {
        Value::Str(format!("\"{}\"{suffix}", escape(content)))
    }

    /// The unescaped lexical content for string-shaped values; numerics and
    /// booleans render their canonical form.
    pub(crate) fn string_content(&self) -> ExprResult<Cow<'_, str>> {
        match self {
            Value::Str(raw) => match split_literal(raw) {
                Some((content, _)) => Ok(unescape(content)),
                None => Ok(Cow::Borrowed(raw.as_str())),
            },
            Value::Iri(iri) => Ok(Cow::Borrowed(iri.as_str())),
            Value::Integer(value) => Ok(Cow::Owned(value.to_string())),
            Value::Double(value) => Ok(Cow::Owned(value.to_string())),
            Value::Boolean(value) => Ok(Cow::Owned(value.to_string())),
            Value::Unbound => Err(ExprError),
        }
    }

    /// The literal suffix (`@lang` or `^^<dt>`), empty for simple literals
    /// and non-literals.
    pub(crate) fn literal_suffix(&self) -> &str {
        match self {
            Value::Str(raw) => split_literal(raw).map(|(_, suffix)| suffix).unwrap_or(""),
            _ => "",
        }
    }

    pub(crate) fn language_tag(&self) -> Option<&str> {
        self.literal_suffix().strip_prefix('@')
    }

    /// The datatype IRI per SPARQL `DATATYPE()`.
    pub(crate) fn datatype_iri(&self) -> ExprResult<String> {
        match self {
            Value::Integer(_) => Ok(xsd::INTEGER.to_owned()),
            Value::Double(_) => Ok(xsd::DOUBLE.to_owned()),
            Value::Boolean(_) => Ok(xsd::BOOLEAN.to_owned()),
            Value::Str(raw) if raw.starts_with('"') => {
                let suffix = self.literal_suffix();
                if suffix.is_empty() {
                    Ok(xsd::STRING.to_owned())
                } else if suffix.starts_with('@') {
                    Ok(rdf::LANG_STRING.to_owned())
                } else {
                    suffix
                        .strip_prefix("^^<")
                        .and_then(|s| s.strip_suffix('>'))
                        .map(str::to_owned)
                        .ok_or(ExprError)
                }
            }
            _ => Err(ExprError),
        }
    }

    pub(crate) fn is_literal(&self) -> bool {
        match self {
            Value::Integer(_) | Value::Double(_) | Value::Boolean(_) => true,
            Value::Str(raw) => raw.starts_with('"'),
            _ => false,
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        matches!(self, Value::Str(raw) if raw.starts_with("_:"))
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Double(_))
    }

    pub(crate) fn as_double(&self) -> ExprResult<f64> {
        match self {
            Value::Integer(value) => Ok(*value as f64),
            Value::Double(value) => Ok(*value),
            _ => Err(ExprError),
        }
    }

    pub(crate) fn as_integer(&self) -> ExprResult<i64> {
        match self {
            Value::Integer(value) => Ok(*value),
            _ => Err(ExprError),
        }
    }

    /// The effective boolean value. Unbound collapses to false; IRIs have
    /// no boolean form and also collapse to false at the filter boundary.
    pub(crate) fn effective_boolean(&self) -> bool {
        match self {
            Value::Boolean(value) => *value,
            Value::Integer(value) => *value != 0,
            Value::Double(value) => value.abs() > DOUBLE_EPSILON,
            Value::Str(raw) => match split_literal(raw) {
                Some((content, _)) => !content.is_empty(),
                None => !raw.is_empty(),
            },
            Value::Iri(_) | Value::Unbound => false,
        }
    }
}

/// `=` / `!=` equality with numeric promotion and the double epsilon.
pub(crate) fn values_equal(a: &Value, b: &Value, mode: StringNumericMode) -> ExprResult<bool> {
    if a.is_unbound() || b.is_unbound() {
        return Err(ExprError);
    }
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(x == y),
        (Value::Boolean(x), Value::Boolean(y)) => Ok(x == y),
        (Value::Iri(x), Value::Iri(y)) => Ok(x == y),
        (Value::Double(_) | Value::Integer(_), Value::Double(_) | Value::Integer(_)) => {
            Ok((a.as_double()? - b.as_double()?).abs() < DOUBLE_EPSILON)
        }
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        (Value::Str(_), Value::Integer(_) | Value::Double(_))
        | (Value::Integer(_) | Value::Double(_), Value::Str(_)) => match mode {
            StringNumericMode::Strict => Err(ExprError),
            StringNumericMode::Coerce => {
                let (string, number) = if matches!(a, Value::Str(_)) {
                    (a, b)
                } else {
                    (b, a)
                };
                let parsed: f64 = string.string_content()?.trim().parse().map_err(|_| ExprError)?;
                Ok((parsed - number.as_double()?).abs() < DOUBLE_EPSILON)
            }
        },
        _ => Err(ExprError),
    }
}

/// `<` / `<=` / `>` / `>=` ordering.
pub(crate) fn compare_values(
    a: &Value,
    b: &Value,
    mode: StringNumericMode,
) -> ExprResult<Ordering> {
    if a.is_unbound() || b.is_unbound() {
        return Err(ExprError);
    }
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
        (Value::Double(_) | Value::Integer(_), Value::Double(_) | Value::Integer(_)) => {
            compare_doubles(a.as_double()?, b.as_double()?)
        }
        (Value::Str(_), Value::Str(_)) => {
            Ok(a.string_content()?.as_ref().cmp(b.string_content()?.as_ref()))
        }
        (Value::Boolean(x), Value::Boolean(y)) => Ok(x.cmp(y)),
        (Value::Str(_), Value::Integer(_) | Value::Double(_))
        | (Value::Integer(_) | Value::Double(_), Value::Str(_)) => match mode {
            StringNumericMode::Strict => Err(ExprError),
            StringNumericMode::Coerce => {
                let left: f64 = coerce_double(a)?;
                let right: f64 = coerce_double(b)?;
                compare_doubles(left, right)
            }
        },
        _ => Err(ExprError),
    }
}

fn coerce_double(value: &Value) -> ExprResult<f64> {
    match value {
        Value::Integer(_) | Value::Double(_) => value.as_double(),
        Value::Str(_) => value
            .string_content()?
            .trim()
            .parse()
            .map_err(|_| ExprError),
        _ => Err(ExprError),
    }
}

fn compare_doubles(a: f64, b: f64) -> ExprResult<Ordering> {
    if (a - b).abs() < DOUBLE_EPSILON {
        Ok(Ordering::Equal)
    } else {
        a.partial_cmp(&b).ok_or(ExprError)
    }
}

/// The total order used by ORDER BY: unbound < blank nodes < IRIs <
/// literals, literals by typed comparison where possible, lexical form
/// otherwise.
pub(crate) fn order_compare(a: &Value, b: &Value, mode: StringNumericMode) -> Ordering {
    let rank_a = order_rank(a);
    let rank_b = order_rank(b);
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    if let Ok(ordering) = compare_values(a, b, mode) {
        return ordering;
    }
    lexical_form(a).cmp(&lexical_form(b))
}

fn order_rank(value: &Value) -> u8 {
    match value {
        Value::Unbound => 0,
        Value::Str(raw) if raw.starts_with("_:") => 1,
        Value::Iri(_) => 2,
        _ => 3,
    }
}

fn lexical_form(value: &Value) -> String {
    value.to_term_text().unwrap_or_default()
}
