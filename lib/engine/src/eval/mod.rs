//! The FILTER/BIND/HAVING expression evaluator.
//!
//! Expressions are evaluated by recursive descent directly over their
//! source span; there is no separate expression AST. Value-level failures
//! (type errors, unbound variables) flow through [ExprResult] without
//! stopping the parse, so three-valued logic and functions like COALESCE
//! see them as values rather than aborts.

mod cast;
mod datetime;
mod functions;
mod hash;
mod numeric;
mod strings;
mod terms;
mod value;

pub(crate) use value::{order_compare, ExprError, ExprResult, Value};

use crate::binding::BindingTable;
use crate::config::EngineConfig;
use oxiri::Iri;
use quadflow_model::{PrefixTable, Span};
use value::{compare_values, values_equal};

/// The immutable surroundings of one expression evaluation.
pub(crate) struct EvalContext<'a> {
    pub(crate) source: &'a str,
    pub(crate) prefixes: &'a PrefixTable,
    pub(crate) base: Option<&'a Iri<String>>,
    pub(crate) config: &'a EngineConfig,
    /// The group-nesting depth of the clause being evaluated; BIND
    /// bindings from shallower groups are invisible.
    pub(crate) depth: u16,
}

/// Evaluates an expression span to a typed value.
pub(crate) fn evaluate_expression(
    expr: Span,
    bindings: &BindingTable,
    ctx: &EvalContext<'_>,
) -> ExprResult<Value> {
    let text = expr.slice(ctx.source);
    let mut parser = Parser {
        text,
        pos: 0,
        bindings,
        ctx,
    };
    let result = parser.or_expr();
    parser.skip_ws();
    if parser.pos != parser.text.len() {
        return Err(ExprError);
    }
    result
}

/// Evaluates a filter: the effective boolean value, with every failure
/// collapsed to row rejection.
pub(crate) fn evaluate_filter(expr: Span, bindings: &BindingTable, ctx: &EvalContext<'_>) -> bool {
    evaluate_expression(expr, bindings, ctx)
        .map(|value| value.effective_boolean())
        .unwrap_or(false)
}

/// Lexically collects the variables an expression mentions, skipping
/// string literals. The planner uses this for filter pushdown analysis.
pub(crate) fn expression_variables(text: &str, visit: &mut impl FnMut(&str)) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                // Skip the quoted section, escapes included.
                i += 1;
                let mut escaped = false;
                while i < bytes.len() {
                    if escaped {
                        escaped = false;
                    } else if bytes[i] == b'\\' {
                        escaped = true;
                    } else if bytes[i] == b'"' {
                        break;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'?' | b'$' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                if end > start {
                    visit(&text[start..end]);
                }
                i = end;
            }
            _ => i += 1,
        }
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    bindings: &'a BindingTable,
    ctx: &'a EvalContext<'a>,
}

impl Parser<'_> {
    //
    // Grammar
    //

    fn or_expr(&mut self) -> ExprResult<Value> {
        let first = self.and_expr();
        if !self.peek_or_op() {
            return first;
        }
        let mut acc = first.map(|value| value.effective_boolean());
        while self.eat_or_op() {
            let rhs = self.and_expr().map(|value| value.effective_boolean());
            // SPARQL three-valued OR: an error is absorbed by a true arm.
            acc = match (acc, rhs) {
                (Ok(true), _) | (_, Ok(true)) => Ok(true),
                (Ok(false), Ok(false)) => Ok(false),
                _ => Err(ExprError),
            };
        }
        acc.map(Value::Boolean)
    }

    fn and_expr(&mut self) -> ExprResult<Value> {
        let first = self.unary_expr();
        if !self.peek_and_op() {
            return first;
        }
        let mut acc = first.map(|value| value.effective_boolean());
        while self.eat_and_op() {
            let rhs = self.unary_expr().map(|value| value.effective_boolean());
            acc = match (acc, rhs) {
                (Ok(false), _) | (_, Ok(false)) => Ok(false),
                (Ok(true), Ok(true)) => Ok(true),
                _ => Err(ExprError),
            };
        }
        acc.map(Value::Boolean)
    }

    fn unary_expr(&mut self) -> ExprResult<Value> {
        self.skip_ws();
        if self.rest().starts_with('!') && !self.rest().starts_with("!=") {
            self.pos += 1;
            let inner = self.unary_expr();
            return inner.map(|value| Value::Boolean(!value.effective_boolean()));
        }
        if self.eat_keyword("NOT") {
            let inner = self.unary_expr();
            return inner.map(|value| Value::Boolean(!value.effective_boolean()));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ExprResult<Value> {
        let lhs = self.additive();
        self.skip_ws();
        let mode = self.ctx.config.string_numeric_mode;
        if self.eat("!=") {
            let rhs = self.additive();
            return values_equal(&lhs?, &rhs?, mode).map(|eq| Value::Boolean(!eq));
        }
        if self.eat("<=") {
            let rhs = self.additive();
            return compare_values(&lhs?, &rhs?, mode).map(|o| Value::Boolean(o.is_le()));
        }
        if self.eat(">=") {
            let rhs = self.additive();
            return compare_values(&lhs?, &rhs?, mode).map(|o| Value::Boolean(o.is_ge()));
        }
        if self.eat("=") {
            let rhs = self.additive();
            return values_equal(&lhs?, &rhs?, mode).map(Value::Boolean);
        }
        if self.eat("<") {
            let rhs = self.additive();
            return compare_values(&lhs?, &rhs?, mode).map(|o| Value::Boolean(o.is_lt()));
        }
        if self.eat(">") {
            let rhs = self.additive();
            return compare_values(&lhs?, &rhs?, mode).map(|o| Value::Boolean(o.is_gt()));
        }
        if self.eat_keyword("NOT") {
            if !self.eat_keyword("IN") {
                return Err(ExprError);
            }
            return self.in_list(&lhs?).map(|found| Value::Boolean(!found));
        }
        if self.eat_keyword("IN") {
            return self.in_list(&lhs?).map(Value::Boolean);
        }
        lhs
    }

    fn in_list(&mut self, needle: &Value) -> ExprResult<bool> {
        self.skip_ws();
        if !self.eat("(") {
            return Err(ExprError);
        }
        let mode = self.ctx.config.string_numeric_mode;
        let mut found = false;
        let mut saw_error = false;
        loop {
            self.skip_ws();
            if self.eat(")") {
                break;
            }
            let element = self.or_expr();
            match element.and_then(|element| values_equal(needle, &element, mode)) {
                Ok(true) => found = true,
                Ok(false) => {}
                Err(ExprError) => saw_error = true,
            }
            self.skip_ws();
            if self.eat(",") {
                continue;
            }
            if self.eat(")") {
                break;
            }
            return Err(ExprError);
        }
        if found {
            Ok(true)
        } else if saw_error {
            Err(ExprError)
        } else {
            Ok(false)
        }
    }

    fn additive(&mut self) -> ExprResult<Value> {
        let mut acc = self.multiplicative();
        loop {
            self.skip_ws();
            if self.eat("+") {
                let rhs = self.multiplicative();
                acc = numeric::add(&acc?, &rhs?);
            } else if self.eat("-") {
                let rhs = self.multiplicative();
                acc = numeric::sub(&acc?, &rhs?);
            } else {
                return acc;
            }
        }
    }

    fn multiplicative(&mut self) -> ExprResult<Value> {
        let mut acc = self.signed_atom();
        loop {
            self.skip_ws();
            if self.eat("*") {
                let rhs = self.signed_atom();
                acc = numeric::mul(&acc?, &rhs?);
            } else if self.eat("/") {
                let rhs = self.signed_atom();
                acc = numeric::div(&acc?, &rhs?);
            } else {
                return acc;
            }
        }
    }

    fn signed_atom(&mut self) -> ExprResult<Value> {
        self.skip_ws();
        if self.eat("-") {
            let inner = self.signed_atom();
            return numeric::negate(&inner?);
        }
        if self.eat("+") {
            return self.signed_atom();
        }
        self.atom()
    }

    fn atom(&mut self) -> ExprResult<Value> {
        self.skip_ws();
        let Some(c) = self.peek() else {
            return Err(ExprError);
        };
        match c {
            '(' => {
                self.pos += 1;
                let inner = self.or_expr();
                self.skip_ws();
                if !self.eat(")") {
                    return Err(ExprError);
                }
                inner
            }
            '?' | '$' => self.variable(),
            '"' => self.quoted_literal(),
            '<' => self.iri_or_cast(),
            c if c.is_ascii_digit() => self.numeric_literal(),
            '.' => self.numeric_literal(),
            c if c.is_ascii_alphabetic() || c == '_' => self.name_or_call(),
            _ => Err(ExprError),
        }
    }

    //
    // Atoms
    //

    fn variable(&mut self) -> ExprResult<Value> {
        self.pos += 1;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ExprError);
        }
        let name = &self.text[start..self.pos];
        Ok(self.lookup(name))
    }

    fn lookup(&self, name: &str) -> Value {
        match self.bindings.find(name) {
            Some(index) => {
                let bind_depth = self.bindings.bind_depth(index);
                if bind_depth > 0 && bind_depth < self.ctx.depth {
                    // A BIND from a shallower group is out of scope here.
                    Value::Unbound
                } else {
                    Value::from_term_text(self.bindings.value(index))
                }
            }
            None => Value::Unbound,
        }
    }

    fn quoted_literal(&mut self) -> ExprResult<Value> {
        let start = self.pos;
        self.pos += 1;
        let mut escaped = false;
        loop {
            let Some(c) = self.peek() else {
                return Err(ExprError);
            };
            self.pos += c.len_utf8();
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                break;
            }
        }
        // Optional suffix: @lang or ^^datatype.
        if self.rest().starts_with('@') {
            self.pos += 1;
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                self.pos += 1;
            }
        } else if self.rest().starts_with("^^") {
            self.pos += 2;
            if self.rest().starts_with('<') {
                while let Some(c) = self.peek() {
                    if c == '>' {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
                if !self.eat(">") {
                    return Err(ExprError);
                }
            } else {
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.'))
                {
                    self.pos += 1;
                }
            }
        }
        let token = &self.text[start..self.pos];
        let canonical = crate::lexical::canonical_literal(token, self.ctx.prefixes)
            .map_err(|_| ExprError)?;
        Ok(Value::from_term_text(&canonical))
    }

    fn numeric_literal(&mut self) -> ExprResult<Value> {
        let start = self.pos;
        let mut saw_dot = false;
        let mut saw_exp = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => self.pos += 1,
                '.' if !saw_dot && !saw_exp => {
                    saw_dot = true;
                    self.pos += 1;
                }
                'e' | 'E' if !saw_exp => {
                    saw_exp = true;
                    self.pos += 1;
                    if self.peek().is_some_and(|c| c == '+' || c == '-') {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let token = &self.text[start..self.pos];
        if saw_dot || saw_exp {
            token.parse().map(Value::Double).map_err(|_| ExprError)
        } else {
            token.parse().map(Value::Integer).map_err(|_| ExprError)
        }
    }

    fn iri_or_cast(&mut self) -> ExprResult<Value> {
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '>' {
                break;
            }
            self.pos += c.len_utf8();
        }
        if !self.eat(">") {
            return Err(ExprError);
        }
        let iri = crate::lexical::resolve_iri(&self.text[start..self.pos - 1], self.ctx.base);
        self.skip_ws();
        if self.rest().starts_with('(') {
            let args = self.arguments()?;
            return functions::call_iri(&iri, args, self.ctx);
        }
        Ok(Value::Iri(iri))
    }

    fn name_or_call(&mut self) -> ExprResult<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            self.pos += 1;
        }
        if self.rest().starts_with(':') {
            self.pos += 1;
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            {
                self.pos += 1;
            }
        }
        let name = &self.text[start..self.pos];
        self.skip_ws();
        if self.rest().starts_with('(') {
            let args = self.arguments()?;
            return functions::call(name, args, self.ctx);
        }
        match name {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ if name.contains(':') => {
                let iri = crate::lexical::expand_prefixed(name, self.ctx.prefixes)
                    .ok_or(ExprError)?;
                Ok(Value::Iri(iri))
            }
            _ => Err(ExprError),
        }
    }

    fn arguments(&mut self) -> ExprResult<Vec<ExprResult<Value>>> {
        self.skip_ws();
        if !self.eat("(") {
            return Err(ExprError);
        }
        let mut args = Vec::new();
        self.skip_ws();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.or_expr());
            self.skip_ws();
            if self.eat(",") {
                continue;
            }
            if self.eat(")") {
                return Ok(args);
            }
            return Err(ExprError);
        }
    }

    //
    // Lexing helpers
    //

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        if rest.len() < keyword.len()
            || !rest[..keyword.len()].eq_ignore_ascii_case(keyword)
        {
            return false;
        }
        if rest[keyword.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn peek_or_op(&mut self) -> bool {
        let saved = self.pos;
        self.skip_ws();
        let found = self.rest().starts_with("||") || self.peek_keyword("OR");
        self.pos = saved;
        found
    }

    fn eat_or_op(&mut self) -> bool {
        self.skip_ws();
        self.eat("||") || self.eat_keyword("OR")
    }

    fn peek_and_op(&mut self) -> bool {
        let saved = self.pos;
        self.skip_ws();
        let found = self.rest().starts_with("&&") || self.peek_keyword("AND");
        self.pos = saved;
        found
    }

    fn eat_and_op(&mut self) -> bool {
        self.skip_ws();
        self.eat("&&") || self.eat_keyword("AND")
    }

    fn peek_keyword(&mut self, keyword: &str) -> bool {
        let saved = self.pos;
        let found = self.eat_keyword(keyword);
        self.pos = saved;
        found
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use quadflow_common::BufferPool;
    use std::sync::Arc;

    fn eval(expr: &str, setup: impl FnOnce(&mut BindingTable)) -> ExprResult<Value> {
        let mut source = quadflow_model::SourceBuf::new();
        let span = source.push_token(expr);
        let prefixes = PrefixTable::new();
        let config = EngineConfig::default();
        let ctx = EvalContext {
            source: source.as_str(),
            prefixes: &prefixes,
            base: None,
            config: &config,
            depth: 1,
        };
        let mut bindings = BindingTable::new(&Arc::new(BufferPool::new()));
        setup(&mut bindings);
        evaluate_expression(span, &bindings, &ctx)
    }

    fn eval_bool(expr: &str, setup: impl FnOnce(&mut BindingTable)) -> bool {
        eval(expr, setup)
            .map(|value| value.effective_boolean())
            .unwrap_or(false)
    }

    #[test]
    fn arithmetic_with_precedence() {
        assert_eq!(eval("1 + 2 * 3", |_| {}).unwrap(), Value::Integer(7));
        assert_eq!(eval("(1 + 2) * 3", |_| {}).unwrap(), Value::Integer(9));
        assert_eq!(eval("7 / 2", |_| {}).unwrap(), Value::Double(3.5));
        assert_eq!(eval("-3 + 5", |_| {}).unwrap(), Value::Integer(2));
    }

    #[test]
    fn comparisons_coerce_numerics() {
        assert!(eval_bool("2 < 2.5", |_| {}));
        assert!(eval_bool("\"30\"^^<http://www.w3.org/2001/XMLSchema#integer> > 25", |_| {}));
        assert!(!eval_bool("1 >= 2", |_| {}));
        assert!(eval_bool("1 != 2", |_| {}));
    }

    #[test]
    fn variables_resolve_from_bindings() {
        assert!(eval_bool("?age > 25", |b| {
            b.bind("age", "\"30\"^^<http://www.w3.org/2001/XMLSchema#integer>");
        }));
        // Unbound operand collapses the filter to false.
        assert!(!eval_bool("?missing > 25", |_| {}));
    }

    #[test]
    fn three_valued_logic_absorbs_errors() {
        // error || true is true, error && anything is an error (row drop).
        assert!(eval_bool("?missing > 1 || true", |_| {}));
        assert!(!eval_bool("?missing > 1 && true", |_| {}));
        // Negation does not rescue an error; the row still drops.
        assert!(!eval_bool("!(?missing > 1)", |_| {}));
    }

    #[test]
    fn keyword_operators() {
        assert!(eval_bool("true AND NOT false", |_| {}));
        assert!(eval_bool("false OR true", |_| {}));
    }

    #[test]
    fn in_lists() {
        assert!(eval_bool("2 IN (1, 2, 3)", |_| {}));
        assert!(eval_bool("4 NOT IN (1, 2, 3)", |_| {}));
        assert!(!eval_bool("?missing IN (1)", |_| {}));
    }

    #[test]
    fn string_equality_keeps_suffixes() {
        assert!(eval_bool("\"chat\"@en = \"chat\"@en", |_| {}));
        assert!(!eval_bool("\"chat\"@en = \"chat\"", |_| {}));
    }

    #[test]
    fn iri_terms_and_prefixed_names() {
        assert!(eval_bool("?x = <http://example.com/a>", |b| {
            b.bind("x", "<http://example.com/a>");
        }));
    }

    #[test]
    fn bind_depth_scoping_hides_shallower_binds() {
        let mut source = quadflow_model::SourceBuf::new();
        let span = source.push_token("bound(?v)");
        let prefixes = PrefixTable::new();
        let config = EngineConfig::default();
        let ctx = EvalContext {
            source: source.as_str(),
            prefixes: &prefixes,
            base: None,
            config: &config,
            depth: 2,
        };
        let mut bindings = BindingTable::new(&Arc::new(BufferPool::new()));
        bindings.bind_at_depth("v", "\"1\"", 1);
        // The BIND at depth 1 is invisible to a filter at depth 2.
        assert!(!evaluate_filter(span, &bindings, &ctx));
    }

    #[test]
    fn expression_variables_skips_strings() {
        let mut vars = Vec::new();
        expression_variables("?a > 1 && regex(?b, \"?not_a_var\")", &mut |name| {
            vars.push(name.to_owned());
        });
        assert_eq!(vars, ["a", "b"]);
    }
}
