//! Quadflow: a SPARQL 1.1 query and update engine over an in-memory quad
//! store.
//!
//! The entry point is [QuadflowStore]:
//!
//! ```
//! use quadflow::{GroupPattern, IrBuilder, ParsedQuery, QuadflowStore, QueryIr, QueryResults};
//! use quadflow::model::{GraphName, Literal, NamedNode, Quad};
//!
//! let store = QuadflowStore::new();
//! store.insert(
//!     Quad::new(
//!         NamedNode::new("http://example.com/a")?,
//!         NamedNode::new("http://example.com/p")?,
//!         Literal::from(42),
//!         GraphName::DefaultGraph,
//!     )
//!     .as_ref(),
//! )?;
//!
//! let mut builder = IrBuilder::new();
//! let s = builder.variable("s");
//! let p = builder.iri("http://example.com/p");
//! let o = builder.variable("o");
//! let pattern = GroupPattern::with_patterns(vec![quadflow::TriplePattern::new(s, p, o)]);
//! let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s, o], pattern));
//!
//! if let QueryResults::Solutions(mut solutions) = store.query(&query)? {
//!     let row = solutions.next().unwrap()?;
//!     assert_eq!(row.get("s").unwrap().to_string(), "<http://example.com/a>");
//! }
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

mod store;

pub use store::QuadflowStore;

pub use quadflow_engine::{
    EngineConfig, EvaluationError, LoadLimits, QueryExecutor, QueryResults, QuerySolution,
    QuerySolutionIter, QueryTripleIter, ReqwestFetcher, StringNumericMode, UpdateApplier,
    UpdateOutcome,
};
pub use quadflow_model::{
    AggregateFunction, AggregateSpec, BindClause, DatasetSpec, FilterClause, GraphClause,
    GraphOrDefault, GraphTarget, GroupPattern, IrBuilder, OrderDirection, OrderKey, ParsedQuery,
    ParsedUpdate, PrefixTable, QuadPattern, QueryForm, QueryIr, ServiceClause, SolutionModifiers,
    SourceBuf, Span, SyntheticTerm, TemporalRange, Term, TermKind, TriplePattern, UpdateIr,
    UpdateOperation, ValuesClause,
};
pub use quadflow_storage::MemoryQuadStore;

pub use quadflow_common::{
    BufferPool, CancellationToken, HttpFetcher, HttpResponse, QuadBatch, QuadSnapshot, QuadStore,
    ServiceExecutor, ServiceRow, StorageError,
};

/// The RDF terms and quads the store speaks, re-exported from `oxrdf`.
pub mod model {
    pub use quadflow_model::{
        BlankNode, BlankNodeRef, GraphName, GraphNameRef, Iri, IriParseError, Literal,
        LiteralRef, NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad,
        QuadRef, RdfTerm as Term, RdfTermRef as TermRef, Subject, SubjectRef, Triple, TripleRef,
        Variable,
    };
}
