mod batch;
mod index;

use self::batch::MemoryBatch;
use self::index::DatasetIndex;
use oxrdf::{GraphNameRef, NamedNodeRef, NamedOrBlankNode, Quad, QuadRef, TermRef};
use quadflow_common::{QuadBatch, QuadSnapshot, QuadStore, StorageError};
use quadflow_model::TemporalRange;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A memory-backed quad store with per-graph SPO/POS/OSP indexes.
///
/// The index root lives behind `RwLock<Arc<...>>`: snapshots clone the
/// `Arc`, and a committing batch mutates through [Arc::make_mut], which
/// clones the root only while a snapshot is still alive. Readers therefore
/// always observe a committed state, never a partial write.
///
/// The store keeps current state only; temporal constraints forwarded by
/// the engine are ignored.
#[derive(Debug, Default)]
pub struct MemoryQuadStore {
    dataset: RwLock<Arc<DatasetIndex>>,
    /// Serializes batches: only one writer may hold a batch at a time.
    write_lock: Mutex<()>,
}

impl MemoryQuadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn current(&self) -> Arc<DatasetIndex> {
        Arc::clone(
            &self
                .dataset
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    pub(crate) fn install(&self, apply: impl FnOnce(&mut DatasetIndex)) {
        let mut guard = self.dataset.write().unwrap_or_else(PoisonError::into_inner);
        apply(Arc::make_mut(&mut guard));
    }

    /// Inserts a single quad outside any explicit batch.
    pub fn insert(&self, quad: QuadRef<'_>) -> Result<bool, StorageError> {
        let mut batch = self.begin_batch()?;
        let inserted = batch.insert(quad);
        batch.commit()?;
        Ok(inserted)
    }

    /// Inserts all `quads`; returns how many were newly added.
    pub fn extend(&self, quads: impl IntoIterator<Item = Quad>) -> Result<usize, StorageError> {
        let mut batch = self.begin_batch()?;
        let mut inserted = 0;
        for quad in quads {
            if batch.insert(quad.as_ref()) {
                inserted += 1;
            }
        }
        batch.commit()?;
        Ok(inserted)
    }

    /// Removes a single quad outside any explicit batch.
    pub fn remove(&self, quad: QuadRef<'_>) -> Result<bool, StorageError> {
        let mut batch = self.begin_batch()?;
        let removed = batch.remove(quad);
        batch.commit()?;
        Ok(removed)
    }

    pub fn contains(&self, quad: QuadRef<'_>) -> bool {
        self.current().contains(quad)
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn named_graphs(&self) -> Vec<NamedOrBlankNode> {
        self.current().named_graphs()
    }
}

impl QuadStore for MemoryQuadStore {
    fn snapshot(&self) -> Arc<dyn QuadSnapshot> {
        Arc::new(MemorySnapshot {
            dataset: self.current(),
        })
    }

    fn begin_batch(&self) -> Result<Box<dyn QuadBatch + '_>, StorageError> {
        let exclusive = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Box::new(MemoryBatch::new(self, exclusive, self.current())))
    }

    fn statistics_tx_id(&self) -> u64 {
        self.current().stats_tx_id
    }

    fn predicate_cardinality(&self, predicate: NamedNodeRef<'_>) -> Option<u64> {
        self.current()
            .predicate_counts
            .get(&predicate.into_owned())
            .copied()
    }
}

/// A frozen view of the store at snapshot time.
#[derive(Debug)]
struct MemorySnapshot {
    dataset: Arc<DatasetIndex>,
}

impl QuadSnapshot for MemorySnapshot {
    fn quads_matching(
        &self,
        subject: Option<TermRef<'_>>,
        predicate: Option<TermRef<'_>>,
        object: Option<TermRef<'_>>,
        graph: Option<GraphNameRef<'_>>,
        _temporal: Option<&TemporalRange>,
    ) -> Box<dyn Iterator<Item = Quad> + Send> {
        // Subject and predicate positions only accept the matching term
        // kinds; a pattern bound to e.g. a literal subject cannot match.
        let subject = match subject {
            Some(term) => match as_subject(term) {
                Some(subject) => Some(subject),
                None => return Box::new(std::iter::empty()),
            },
            None => None,
        };
        let predicate = match predicate {
            Some(TermRef::NamedNode(n)) => Some(n),
            Some(_) => return Box::new(std::iter::empty()),
            None => None,
        };

        let mut quads = Vec::new();
        self.dataset
            .quads_matching(subject, predicate, object, graph, &mut quads);
        Box::new(quads.into_iter())
    }

    fn named_graphs(&self) -> Vec<NamedOrBlankNode> {
        self.dataset.named_graphs()
    }

    fn contains(&self, quad: QuadRef<'_>) -> bool {
        self.dataset.contains(quad)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

fn as_subject(term: TermRef<'_>) -> Option<oxrdf::SubjectRef<'_>> {
    match term {
        TermRef::NamedNode(n) => Some(oxrdf::SubjectRef::NamedNode(n)),
        TermRef::BlankNode(n) => Some(oxrdf::SubjectRef::BlankNode(n)),
        TermRef::Literal(_) => None,
    }
}
