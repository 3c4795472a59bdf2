use oxrdfio::RdfParseError;
use quadflow_common::StorageError;
use std::error::Error;

/// A SPARQL evaluation error.
///
/// Row-local failures (expression type errors, unbound variables) never
/// surface here; they drop the affected row inside the scan pipeline. This
/// enum covers the failures that abort a whole query or update.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EvaluationError {
    /// An error from the storage layer.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A nested-loop join over more patterns than the configured maximum.
    #[error("join over {depth} patterns exceeds the configured maximum of {max}")]
    JoinDepthExceeded { depth: usize, max: usize },
    /// The cancellation token fired.
    #[error("the operation was cancelled")]
    Cancelled,
    /// Error during `SERVICE` evaluation.
    #[error("SERVICE evaluation failed: {0}")]
    Service(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// A `SERVICE` clause was reached but no service executor is configured.
    #[error("no service executor is configured for SERVICE evaluation")]
    ServiceUnsupported,
    /// An HTTP failure during `LOAD`.
    #[error("network operation failed: {0}")]
    Network(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// A `LOAD` download exceeded the configured byte limit.
    #[error("download exceeds the configured limit of {limit} bytes")]
    SizeLimitExceeded { limit: u64 },
    /// A `LOAD` produced more triples than the configured limit.
    #[error("load exceeds the configured limit of {limit} triples")]
    TripleLimitExceeded { limit: u64 },
    /// An error while parsing an RDF document fetched by `LOAD`.
    #[error(transparent)]
    GraphParsing(#[from] RdfParseError),
    /// The content media type of a `LOAD` response is not supported.
    #[error("the content media type {0} is not supported")]
    UnsupportedContentType(String),
    /// Malformed IR reached the executor (e.g. a variable in INSERT DATA).
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// An internal error that likely indicates a bug in Quadflow.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EvaluationError {
    pub(crate) fn internal(cause: impl Into<String>) -> Self {
        EvaluationError::Internal(cause.into())
    }
}

/// The result of a successful update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Quads touched, operation by operation, per the update semantics
    /// (inserted quad count for INSERT DATA, actually-removed count for
    /// DELETE DATA, deletes plus inserts for a modify, ...).
    pub affected: usize,
}
