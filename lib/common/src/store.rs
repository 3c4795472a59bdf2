use crate::error::StorageError;
use oxrdf::{GraphNameRef, NamedNodeRef, NamedOrBlankNode, Quad, QuadRef, TermRef};
use quadflow_model::TemporalRange;
use std::sync::Arc;

/// The storage seam the engine executes against.
///
/// Reads go through [snapshot](QuadStore::snapshot): the returned
/// [QuadSnapshot] exposes a state that does not change for as long as the
/// caller holds it, which is how the executor gets repeatable reads for the
/// whole lifetime of a result iterator. Dropping the snapshot releases the
/// read hold.
///
/// Writes go through [begin_batch](QuadStore::begin_batch). Batches are
/// exclusive: a second `begin_batch` blocks until the first batch commits or
/// rolls back.
pub trait QuadStore: Send + Sync {
    /// Takes a consistent read snapshot of the current state.
    fn snapshot(&self) -> Arc<dyn QuadSnapshot>;

    /// Opens an exclusive write batch. Nothing is visible to snapshots taken
    /// before [QuadBatch::commit].
    fn begin_batch(&self) -> Result<Box<dyn QuadBatch + '_>, StorageError>;

    /// A counter bumped whenever the store's statistics change meaningfully.
    /// Cached query plans are invalidated against it.
    fn statistics_tx_id(&self) -> u64;

    /// Estimated number of quads carrying `predicate`, if statistics are
    /// maintained for it.
    fn predicate_cardinality(&self, predicate: NamedNodeRef<'_>) -> Option<u64>;
}

/// A consistent read view of a [QuadStore].
pub trait QuadSnapshot: Send + Sync {
    /// Returns the quads matching the given pattern. `None` positions are
    /// wildcards; a `None` graph matches quads in every graph, default
    /// included.
    ///
    /// `temporal` is forwarded from the query; stores without history are
    /// free to ignore it. The cursor guarantees existence, not order.
    fn quads_matching(
        &self,
        subject: Option<TermRef<'_>>,
        predicate: Option<TermRef<'_>>,
        object: Option<TermRef<'_>>,
        graph: Option<GraphNameRef<'_>>,
        temporal: Option<&TemporalRange>,
    ) -> Box<dyn Iterator<Item = Quad> + Send>;

    /// The named graphs present in this snapshot.
    fn named_graphs(&self) -> Vec<NamedOrBlankNode>;

    fn contains(&self, quad: QuadRef<'_>) -> bool;

    /// Total number of quads in this snapshot.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A group of store mutations committed or rolled back atomically.
///
/// Staged mutations are visible to the batch's own `insert`/`remove` return
/// values but to nobody else until commit. A batch dropped without
/// committing rolls back.
pub trait QuadBatch {
    /// Stages an insert. Returns `false` when the quad is already present
    /// in the batch's effective state.
    fn insert(&mut self, quad: QuadRef<'_>) -> bool;

    /// Stages a removal. Returns `false` when the quad is absent from the
    /// batch's effective state.
    fn remove(&mut self, quad: QuadRef<'_>) -> bool;

    /// Whether the quad exists in the batch's effective state.
    fn contains(&self, quad: QuadRef<'_>) -> bool;

    /// Stages removal of every quad in `graph`; returns how many the
    /// effective state held.
    fn clear_graph(&mut self, graph: GraphNameRef<'_>) -> usize;

    /// Stages removal of every named-graph quad; returns the count.
    fn clear_named_graphs(&mut self) -> usize;

    /// Stages removal of everything; returns the count.
    fn clear_all(&mut self) -> usize;

    /// The quads of `graph` in the batch's effective state.
    fn graph_quads(&self, graph: GraphNameRef<'_>) -> Vec<Quad>;

    fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Discards every staged mutation. Dropping the batch has the same
    /// effect.
    fn rollback(self: Box<Self>);
}
