use oxrdf::{NamedOrBlankNode, Quad, QuadRef};
use quadflow_common::{
    CancellationToken, HttpFetcher, QuadStore, ServiceExecutor, StorageError,
};
use quadflow_engine::{
    EngineConfig, EvaluationError, QueryExecutor, QueryResults, UpdateApplier, UpdateOutcome,
};
use quadflow_model::{ParsedQuery, ParsedUpdate};
use quadflow_storage::MemoryQuadStore;
use std::sync::Arc;

/// An in-memory RDF dataset with SPARQL query and update support: the
/// memory store wired to the execution engine.
///
/// Queries run against a snapshot taken when execution starts, so a live
/// result iterator keeps observing the state it began with. Updates are
/// batched per operation and roll back on failure.
pub struct QuadflowStore {
    store: Arc<MemoryQuadStore>,
    executor: QueryExecutor,
    applier: UpdateApplier,
}

impl Default for QuadflowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadflowStore {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryQuadStore::new());
        let dyn_store: Arc<dyn QuadStore> = Arc::clone(&store) as Arc<dyn QuadStore>;
        let executor = QueryExecutor::with_config(Arc::clone(&dyn_store), config.clone());
        let applier = UpdateApplier::with_config(dyn_store, config);
        Self {
            store,
            executor,
            applier,
        }
    }

    /// Injects the SERVICE executor used for federated clauses.
    pub fn set_service_executor(&mut self, service: Arc<dyn ServiceExecutor>) {
        self.executor.set_service_executor(Arc::clone(&service));
        self.applier.set_service_executor(service);
    }

    /// Replaces the HTTP fetcher used by LOAD.
    pub fn set_http_fetcher(&mut self, fetcher: Arc<dyn HttpFetcher>) {
        self.applier.set_http_fetcher(fetcher);
    }

    /// Evaluates a SPARQL query.
    pub fn query(&self, query: &ParsedQuery) -> Result<QueryResults, EvaluationError> {
        self.executor.execute(query)
    }

    /// Evaluates a SPARQL query under a cancellation token.
    pub fn query_with_cancellation(
        &self,
        query: &ParsedQuery,
        cancellation: CancellationToken,
    ) -> Result<QueryResults, EvaluationError> {
        self.executor.execute_with_cancellation(query, cancellation)
    }

    /// Applies a SPARQL update request.
    pub fn update(&self, update: &ParsedUpdate) -> Result<UpdateOutcome, EvaluationError> {
        self.applier.apply(update)
    }

    pub fn update_with_cancellation(
        &self,
        update: &ParsedUpdate,
        cancellation: CancellationToken,
    ) -> Result<UpdateOutcome, EvaluationError> {
        self.applier.apply_with_cancellation(update, cancellation)
    }

    //
    // Direct store access
    //

    pub fn insert(&self, quad: QuadRef<'_>) -> Result<bool, StorageError> {
        self.store.insert(quad)
    }

    pub fn extend(
        &self,
        quads: impl IntoIterator<Item = Quad>,
    ) -> Result<usize, StorageError> {
        self.store.extend(quads)
    }

    pub fn remove(&self, quad: QuadRef<'_>) -> Result<bool, StorageError> {
        self.store.remove(quad)
    }

    pub fn contains(&self, quad: QuadRef<'_>) -> bool {
        self.store.contains(quad)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn named_graphs(&self) -> Vec<NamedOrBlankNode> {
        self.store.named_graphs()
    }

    /// All quads matching the pattern, from a fresh snapshot.
    pub fn quads_for_pattern(
        &self,
        subject: Option<oxrdf::TermRef<'_>>,
        predicate: Option<oxrdf::TermRef<'_>>,
        object: Option<oxrdf::TermRef<'_>>,
        graph: Option<oxrdf::GraphNameRef<'_>>,
    ) -> Vec<Quad> {
        self.store
            .snapshot()
            .quads_matching(subject, predicate, object, graph, None)
            .collect()
    }
}
