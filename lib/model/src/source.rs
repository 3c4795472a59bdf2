use crate::term::{Term, TermKind};
use crate::vocab::xsd;

/// A half-open byte range into a [SourceBuf].
///
/// Spans are the only way IR nodes refer to text: terms, filter expressions
/// and bind expressions all carry spans instead of owned strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Resolves this span against its source text.
    ///
    /// Panics if the span does not lie inside `source`, which indicates the
    /// span was resolved against the wrong buffer.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.start + self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The immutable character buffer a query or update was parsed from.
///
/// The buffer is append-only while the IR is being built and frozen
/// afterwards; spans recorded during construction stay valid for the
/// lifetime of the buffer.
#[derive(Clone, Debug, Default)]
pub struct SourceBuf {
    text: String,
}

impl SourceBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing query text, e.g. the raw input of an external
    /// parser that records spans while tokenizing.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Appends a token and returns the span covering it.
    ///
    /// A single space is inserted before the token when the buffer is
    /// non-empty so that concatenated tokens stay readable in diagnostics.
    pub fn push_token(&mut self, token: &str) -> Span {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        let start = self.text.len();
        self.text.push_str(token);
        Span::new(start, token.len())
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Emits IR terms and expression spans into a [SourceBuf].
///
/// This is the construction seam between the external SPARQL parser and the
/// engine: the parser calls these methods as it recognizes tokens, and tests
/// use the same API to assemble queries without a parser.
#[derive(Debug, Default)]
pub struct IrBuilder {
    source: SourceBuf,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A variable term. `name` is given without the `?`/`$` sigil.
    pub fn variable(&mut self, name: &str) -> Term {
        let span = self.source.push_token(&format!("?{name}"));
        // The span covers the bare name, not the sigil.
        Term::new(TermKind::Variable, Span::new(span.start + 1, span.len - 1))
    }

    /// An IRI term. `iri` is given without angle brackets.
    pub fn iri(&mut self, iri: &str) -> Term {
        let span = self.source.push_token(&format!("<{iri}>"));
        Term::new(TermKind::Iri, Span::new(span.start + 1, span.len - 2))
    }

    /// A prefixed name such as `foaf:name`, expanded later against the
    /// query's prefix table.
    pub fn prefixed(&mut self, prefixed_name: &str) -> Term {
        let span = self.source.push_token(prefixed_name);
        Term::new(TermKind::PrefixedName, span)
    }

    /// A blank node label, given without the `_:` sigil.
    pub fn blank(&mut self, label: &str) -> Term {
        let span = self.source.push_token(&format!("_:{label}"));
        Term::new(TermKind::BlankNode, Span::new(span.start + 2, span.len - 2))
    }

    /// A literal in its full lexical form, quotes and suffix included,
    /// e.g. `"chat"@fr` or `"30"^^<http://www.w3.org/2001/XMLSchema#integer>`.
    pub fn literal(&mut self, lexical: &str) -> Term {
        let span = self.source.push_token(lexical);
        Term::new(TermKind::Literal, span)
    }

    /// A simple string literal; the value is quoted for the caller.
    pub fn string(&mut self, value: &str) -> Term {
        self.literal(&format!("\"{value}\""))
    }

    pub fn integer(&mut self, value: i64) -> Term {
        self.literal(&format!("\"{value}\"^^<{}>", xsd::INTEGER))
    }

    pub fn double(&mut self, value: f64) -> Term {
        self.literal(&format!("\"{value}\"^^<{}>", xsd::DOUBLE))
    }

    pub fn boolean(&mut self, value: bool) -> Term {
        self.literal(&format!("\"{value}\"^^<{}>", xsd::BOOLEAN))
    }

    pub fn typed_literal(&mut self, value: &str, datatype_iri: &str) -> Term {
        self.literal(&format!("\"{value}\"^^<{datatype_iri}>"))
    }

    pub fn lang_literal(&mut self, value: &str, lang: &str) -> Term {
        self.literal(&format!("\"{value}\"@{lang}"))
    }

    /// Records a filter/bind/order expression verbatim and returns its span.
    pub fn expr(&mut self, expression: &str) -> Span {
        self.source.push_token(expression)
    }

    pub fn source(&self) -> &SourceBuf {
        &self.source
    }

    /// Freezes the buffer. Every span handed out so far stays valid.
    pub fn finish(self) -> SourceBuf {
        self.source
    }
}
