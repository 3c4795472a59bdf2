use super::index::DatasetIndex;
use super::MemoryQuadStore;
use oxrdf::{GraphName, GraphNameRef, NamedOrBlankNode, Quad, QuadRef};
use quadflow_common::{QuadBatch, StorageError};
use rustc_hash::FxHashSet;
use std::sync::{Arc, MutexGuard};

/// A staged group of mutations against one base snapshot.
///
/// The batch records adds, removes and graph clears as an overlay over the
/// base; `contains` answers against the effective state (base minus clears
/// and removes, plus adds) so that affected counts come out right before
/// anything is committed. Commit replays the overlay under the store's
/// write lock: clears first, then removes, then inserts — the staging
/// methods already collapse ordering conflicts (an insert into a graph
/// cleared later is dropped at clear time).
pub(crate) struct MemoryBatch<'store> {
    store: &'store MemoryQuadStore,
    _exclusive: MutexGuard<'store, ()>,
    base: Arc<DatasetIndex>,
    added: FxHashSet<Quad>,
    removed: FxHashSet<Quad>,
    cleared_all: bool,
    cleared_named: bool,
    cleared_graphs: FxHashSet<GraphName>,
}

impl<'store> MemoryBatch<'store> {
    pub(crate) fn new(
        store: &'store MemoryQuadStore,
        exclusive: MutexGuard<'store, ()>,
        base: Arc<DatasetIndex>,
    ) -> Self {
        Self {
            store,
            _exclusive: exclusive,
            base,
            added: FxHashSet::default(),
            removed: FxHashSet::default(),
            cleared_all: false,
            cleared_named: false,
            cleared_graphs: FxHashSet::default(),
        }
    }

    fn clear_covers(&self, graph: GraphNameRef<'_>) -> bool {
        if self.cleared_all {
            return true;
        }
        if self.cleared_named && graph != GraphNameRef::DefaultGraph {
            return true;
        }
        self.cleared_graphs.contains(&graph.into_owned())
    }

    /// Effective quads of `graph` that come from the base snapshot.
    fn base_graph_quads(&self, graph: GraphNameRef<'_>) -> Vec<Quad> {
        let mut quads = Vec::new();
        if !self.clear_covers(graph) {
            self.base
                .quads_matching(None, None, None, Some(graph), &mut quads);
            quads.retain(|quad| !self.removed.contains(quad));
        }
        quads
    }

    fn is_dirty(&self) -> bool {
        !self.added.is_empty()
            || !self.removed.is_empty()
            || self.cleared_all
            || self.cleared_named
            || !self.cleared_graphs.is_empty()
    }
}

impl QuadBatch for MemoryBatch<'_> {
    fn insert(&mut self, quad: QuadRef<'_>) -> bool {
        if self.contains(quad) {
            return false;
        }
        let quad = quad.into_owned();
        self.removed.remove(&quad);
        self.added.insert(quad);
        true
    }

    fn remove(&mut self, quad: QuadRef<'_>) -> bool {
        if !self.contains(quad) {
            return false;
        }
        let quad = quad.into_owned();
        if !self.added.remove(&quad) {
            self.removed.insert(quad);
        }
        true
    }

    fn contains(&self, quad: QuadRef<'_>) -> bool {
        let owned = quad.into_owned();
        if self.added.contains(&owned) {
            return true;
        }
        if self.removed.contains(&owned) || self.clear_covers(quad.graph_name) {
            return false;
        }
        self.base.contains(quad)
    }

    fn clear_graph(&mut self, graph: GraphNameRef<'_>) -> usize {
        let mut affected = self.base_graph_quads(graph).len();
        affected += self
            .added
            .iter()
            .filter(|quad| quad.graph_name.as_ref() == graph)
            .count();
        self.added.retain(|quad| quad.graph_name.as_ref() != graph);
        self.removed.retain(|quad| quad.graph_name.as_ref() != graph);
        self.cleared_graphs.insert(graph.into_owned());
        affected
    }

    fn clear_named_graphs(&mut self) -> usize {
        let mut affected = 0;
        for name in self.base.named_graphs() {
            let graph_name = to_graph_name(name);
            affected += self.base_graph_quads(graph_name.as_ref()).len();
        }
        affected += self
            .added
            .iter()
            .filter(|quad| quad.graph_name != GraphName::DefaultGraph)
            .count();
        self.added
            .retain(|quad| quad.graph_name == GraphName::DefaultGraph);
        self.removed
            .retain(|quad| quad.graph_name == GraphName::DefaultGraph);
        self.cleared_named = true;
        affected
    }

    fn clear_all(&mut self) -> usize {
        let named = self.clear_named_graphs();
        let default = self.clear_graph(GraphNameRef::DefaultGraph);
        self.cleared_all = true;
        named + default
    }

    fn graph_quads(&self, graph: GraphNameRef<'_>) -> Vec<Quad> {
        let mut quads = self.base_graph_quads(graph);
        quads.extend(
            self.added
                .iter()
                .filter(|quad| quad.graph_name.as_ref() == graph)
                .cloned(),
        );
        quads
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        if !self.is_dirty() {
            return Ok(());
        }
        let store = self.store;
        let batch = *self;
        store.install(move |dataset| {
            if batch.cleared_all {
                *dataset = DatasetIndex {
                    stats_tx_id: dataset.stats_tx_id,
                    ..DatasetIndex::default()
                };
            } else {
                if batch.cleared_named {
                    for name in dataset.named_graphs() {
                        dataset.clear_graph(to_graph_name(name).as_ref());
                    }
                }
                for graph in &batch.cleared_graphs {
                    dataset.clear_graph(graph.as_ref());
                }
            }
            for quad in &batch.removed {
                dataset.remove_quad(quad.as_ref());
            }
            for quad in &batch.added {
                dataset.insert_quad(quad.as_ref());
            }
            dataset.stats_tx_id += 1;
        });
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        // Staged state is dropped with the batch.
    }
}

fn to_graph_name(name: NamedOrBlankNode) -> GraphName {
    match name {
        NamedOrBlankNode::NamedNode(node) => GraphName::NamedNode(node),
        NamedOrBlankNode::BlankNode(node) => GraphName::BlankNode(node),
    }
}
