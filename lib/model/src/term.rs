use crate::source::Span;
use crate::vocab::rdf;

/// A term of the query IR.
///
/// Terms are cheap to copy: the text lives in the query's [SourceBuf] and is
/// addressed through `span`. Synthetic terms have no surface text at all,
/// they are invented by the parser for well-known IRIs and RDF collection
/// slots.
///
/// [SourceBuf]: crate::SourceBuf
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Term {
    pub kind: TermKind,
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TermKind {
    Variable,
    Iri,
    BlankNode,
    Literal,
    PrefixedName,
    Synthetic(SyntheticTerm),
}

/// Parser-invented terms without surface syntax.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SyntheticTerm {
    /// `rdf:type`, the expansion of the `a` keyword.
    RdfType,
    RdfFirst,
    RdfRest,
    RdfNil,
    /// The blank node allocated for slot `n` of an RDF collection.
    ListNode(u32),
}

impl SyntheticTerm {
    /// The well-known IRI this term stands for, if any. List nodes have no
    /// fixed IRI; they become fresh blank nodes at instantiation time.
    pub fn well_known_iri(self) -> Option<&'static str> {
        match self {
            SyntheticTerm::RdfType => Some(rdf::TYPE),
            SyntheticTerm::RdfFirst => Some(rdf::FIRST),
            SyntheticTerm::RdfRest => Some(rdf::REST),
            SyntheticTerm::RdfNil => Some(rdf::NIL),
            SyntheticTerm::ListNode(_) => None,
        }
    }
}

impl Term {
    pub fn new(kind: TermKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn synthetic(kind: SyntheticTerm) -> Self {
        Self {
            kind: TermKind::Synthetic(kind),
            span: Span::default(),
        }
    }

    /// The surface text of this term, without delimiters: variable name
    /// without the sigil, IRI without angle brackets, blank node label
    /// without `_:`, literal in full lexical form.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.slice(source)
    }

    pub fn is_variable(&self) -> bool {
        self.kind == TermKind::Variable
    }

    /// Blank nodes in a WHERE clause behave as variables that cannot be
    /// projected; scans treat both uniformly.
    pub fn binds_like_variable(&self) -> bool {
        matches!(self.kind, TermKind::Variable | TermKind::BlankNode)
    }
}
