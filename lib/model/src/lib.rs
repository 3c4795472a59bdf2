//! The Quadflow IR: the in-memory representation of parsed SPARQL queries and
//! updates that the execution engine consumes.
//!
//! Terms never own their text. Every term is a [Span] into an immutable
//! [SourceBuf], the character buffer the parser read the query from. Filter
//! and bind expressions stay unparsed in the IR; the engine's expression
//! evaluator walks their source spans directly.
//!
//! RDF terms, quads and graph names are re-exported from
//! [Oxigraph](https://github.com/oxigraph/oxigraph)'s `oxrdf`.

mod pattern;
mod prefix;
mod query;
mod source;
mod term;
mod update;
pub mod vocab;

pub use pattern::*;
pub use prefix::PrefixTable;
pub use query::*;
pub use source::{IrBuilder, SourceBuf, Span};
pub use term::*;
pub use update::*;

// Re-export the oxrdf types used across the workspace.
pub use oxiri::Iri;
pub use oxrdf::{
    BlankNode, BlankNodeRef, GraphName, GraphNameRef, IriParseError, Literal, LiteralRef,
    NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, QuadRef, Subject,
    SubjectRef, Term as RdfTerm, TermParseError, TermRef as RdfTermRef, Triple, TripleRef,
    Variable, VariableNameParseError, VariableRef,
};
