//! Conversions between the three term representations the engine touches:
//! IR terms (spans into the query source), binding values (N-Triples
//! lexical strings) and `oxrdf` terms (the store's representation).

use crate::error::EvaluationError;
use oxiri::Iri;
use oxrdf::{GraphName, Term as RdfTerm};
use quadflow_model::vocab::xsd;
use quadflow_model::{PrefixTable, SyntheticTerm, Term, TermKind};
use std::borrow::Cow;
use std::str::FromStr;

/// A pattern position resolved against the current bindings: either a
/// concrete term string or the name of a still-unbound variable.
#[derive(Debug, Clone)]
pub(crate) enum ConstOrVar {
    Const(String),
    Var(String),
}

/// Resolves an IR term that is not allowed to be a variable.
pub(crate) fn resolve_constant(
    term: &Term,
    source: &str,
    prefixes: &PrefixTable,
    base: Option<&Iri<String>>,
) -> Result<String, EvaluationError> {
    match resolve_term(term, source, prefixes, base)? {
        ConstOrVar::Const(value) => Ok(value),
        ConstOrVar::Var(name) => Err(EvaluationError::InvalidQuery(format!(
            "expected a constant term, found the variable ?{name}"
        ))),
    }
}

/// Resolves an IR term to a constant string or a variable name.
///
/// Blank nodes in patterns behave as variables; their name carries the
/// `_:` sigil so they can never collide with surface variables. Synthetic
/// list slots do the same with a reserved label.
pub(crate) fn resolve_term(
    term: &Term,
    source: &str,
    prefixes: &PrefixTable,
    base: Option<&Iri<String>>,
) -> Result<ConstOrVar, EvaluationError> {
    match term.kind {
        TermKind::Variable => Ok(ConstOrVar::Var(term.text(source).to_owned())),
        TermKind::BlankNode => Ok(ConstOrVar::Var(format!("_:{}", term.text(source)))),
        TermKind::Iri => Ok(ConstOrVar::Const(format!(
            "<{}>",
            resolve_iri(term.text(source), base)
        ))),
        TermKind::PrefixedName => {
            let text = term.text(source);
            let iri = expand_prefixed(text, prefixes).ok_or_else(|| {
                EvaluationError::InvalidQuery(format!("unknown prefix in {text}"))
            })?;
            Ok(ConstOrVar::Const(format!("<{iri}>")))
        }
        TermKind::Literal => Ok(ConstOrVar::Const(canonical_literal(
            term.text(source),
            prefixes,
        )?)),
        TermKind::Synthetic(synthetic) => match synthetic.well_known_iri() {
            Some(iri) => Ok(ConstOrVar::Const(format!("<{iri}>"))),
            None => {
                let SyntheticTerm::ListNode(slot) = synthetic else {
                    return Err(EvaluationError::internal("synthetic term without IRI"));
                };
                Ok(ConstOrVar::Var(format!("_:__list{slot}")))
            }
        },
    }
}

/// Expands a prefixed name, handling the `a` keyword.
pub(crate) fn expand_prefixed(name: &str, prefixes: &PrefixTable) -> Option<String> {
    if name == "a" {
        return Some(quadflow_model::vocab::rdf::TYPE.to_owned());
    }
    prefixes.expand(name)
}

/// Resolves a possibly-relative IRI against the base, when one is set.
pub(crate) fn resolve_iri(iri: &str, base: Option<&Iri<String>>) -> String {
    if let Some(base) = base {
        if let Ok(resolved) = base.resolve(iri) {
            return resolved.into_inner();
        }
    }
    iri.to_owned()
}

/// Normalizes a literal token to its N-Triples form: bare numerics and
/// booleans become typed literals, prefixed datatypes are expanded.
pub(crate) fn canonical_literal(
    token: &str,
    prefixes: &PrefixTable,
) -> Result<String, EvaluationError> {
    if let Some((content, suffix)) = split_literal(token) {
        if suffix.is_empty() || suffix.starts_with('@') {
            return Ok(token.to_owned());
        }
        if let Some(datatype) = suffix.strip_prefix("^^") {
            if datatype.starts_with('<') {
                return Ok(token.to_owned());
            }
            let expanded = expand_prefixed(datatype, prefixes).ok_or_else(|| {
                EvaluationError::InvalidQuery(format!("unknown prefix in datatype {datatype}"))
            })?;
            return Ok(format!("\"{content}\"^^<{expanded}>"));
        }
        return Err(EvaluationError::InvalidQuery(format!(
            "malformed literal {token}"
        )));
    }
    if token == "true" || token == "false" {
        return Ok(format!("\"{token}\"^^<{}>", xsd::BOOLEAN));
    }
    if token.parse::<i64>().is_ok() {
        return Ok(format!("\"{token}\"^^<{}>", xsd::INTEGER));
    }
    if token.parse::<f64>().is_ok() {
        let datatype = if token.contains(['e', 'E']) {
            xsd::DOUBLE
        } else {
            xsd::DECIMAL
        };
        return Ok(format!("\"{token}\"^^<{datatype}>"));
    }
    Err(EvaluationError::InvalidQuery(format!(
        "malformed literal {token}"
    )))
}

/// Splits a quoted literal into its raw content (escapes intact) and the
/// suffix after the closing quote. Returns `None` when `raw` is not
/// quoted.
pub(crate) fn split_literal(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix('"')?;
    let mut escaped = false;
    for (index, byte) in rest.bytes().enumerate() {
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == b'"' {
            return Some((&rest[..index], &rest[index + 1..]));
        }
    }
    None
}

/// Undoes N-Triples string escapes.
pub(crate) fn unescape(content: &str) -> Cow<'_, str> {
    if !content.contains('\\') {
        return Cow::Borrowed(content);
    }
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => result.push('\t'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('u') => push_unicode_escape(&mut chars, 4, &mut result),
            Some('U') => push_unicode_escape(&mut chars, 8, &mut result),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    Cow::Owned(result)
}

fn push_unicode_escape(chars: &mut std::str::Chars<'_>, digits: usize, out: &mut String) {
    let code: String = chars.by_ref().take(digits).collect();
    if let Ok(value) = u32::from_str_radix(&code, 16) {
        if let Some(c) = char::from_u32(value) {
            out.push(c);
            return;
        }
    }
    out.push_str(&code);
}

/// Applies N-Triples string escapes.
pub(crate) fn escape(content: &str) -> Cow<'_, str> {
    if !content.contains(['"', '\\', '\n', '\r']) {
        return Cow::Borrowed(content);
    }
    let mut result = String::with_capacity(content.len() + 2);
    for c in content.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            other => result.push(other),
        }
    }
    Cow::Owned(result)
}

/// Parses a binding value back into an `oxrdf` term.
pub(crate) fn parse_term(text: &str) -> Result<RdfTerm, EvaluationError> {
    RdfTerm::from_str(text)
        .map_err(|e| EvaluationError::internal(format!("malformed term {text}: {e}")))
}

/// Parses a binding value as a graph name; literals are not graph names.
pub(crate) fn parse_graph_name(text: &str) -> Result<GraphName, EvaluationError> {
    match parse_term(text)? {
        RdfTerm::NamedNode(node) => Ok(GraphName::NamedNode(node)),
        RdfTerm::BlankNode(node) => Ok(GraphName::BlankNode(node)),
        RdfTerm::Literal(_) => Err(EvaluationError::InvalidQuery(format!(
            "{text} is not a valid graph name"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_literal_types_bare_tokens() {
        let prefixes = PrefixTable::new();
        assert_eq!(
            canonical_literal("42", &prefixes).unwrap(),
            "\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
        assert_eq!(
            canonical_literal("4.2", &prefixes).unwrap(),
            "\"4.2\"^^<http://www.w3.org/2001/XMLSchema#decimal>"
        );
        assert_eq!(
            canonical_literal("1e3", &prefixes).unwrap(),
            "\"1e3\"^^<http://www.w3.org/2001/XMLSchema#double>"
        );
        assert_eq!(
            canonical_literal("true", &prefixes).unwrap(),
            "\"true\"^^<http://www.w3.org/2001/XMLSchema#boolean>"
        );
    }

    #[test]
    fn canonical_literal_expands_prefixed_datatypes() {
        let mut prefixes = PrefixTable::new();
        prefixes.insert("xsd", "http://www.w3.org/2001/XMLSchema#");
        assert_eq!(
            canonical_literal("\"5\"^^xsd:int", &prefixes).unwrap(),
            "\"5\"^^<http://www.w3.org/2001/XMLSchema#int>"
        );
        // Quoted forms with explicit IRIs pass through untouched.
        assert_eq!(
            canonical_literal("\"x\"@en", &prefixes).unwrap(),
            "\"x\"@en"
        );
    }

    #[test]
    fn split_literal_honors_escapes() {
        let (content, suffix) = split_literal("\"a\\\"b\"@en").unwrap();
        assert_eq!(content, "a\\\"b");
        assert_eq!(suffix, "@en");
        assert!(split_literal("<http://a>").is_none());
    }

    #[test]
    fn unescape_round_trips_escape() {
        let raw = "line1\nline2 \"quoted\" back\\slash";
        assert_eq!(unescape(&escape(raw)), raw);
    }

    #[test]
    fn parse_term_reads_ntriples_forms() {
        assert!(matches!(
            parse_term("<http://example.com/a>").unwrap(),
            RdfTerm::NamedNode(_)
        ));
        assert!(matches!(
            parse_term("\"30\"^^<http://www.w3.org/2001/XMLSchema#integer>").unwrap(),
            RdfTerm::Literal(_)
        ));
        assert!(parse_graph_name("\"nope\"").is_err());
    }
}
