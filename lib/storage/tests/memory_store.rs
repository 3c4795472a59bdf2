use oxrdf::{GraphName, GraphNameRef, Literal, NamedNode, Quad, Subject, Term};
use quadflow_common::QuadStore;
use quadflow_storage::MemoryQuadStore;

#[test]
fn insert_quad() {
    let store = MemoryQuadStore::new();

    let inserted = store.insert(example_quad().as_ref()).unwrap();
    assert!(inserted);
    assert_eq!(store.len(), 1);
}

#[test]
fn insert_duplicate_quads_no_effect() {
    let store = MemoryQuadStore::new();

    store.insert(example_quad().as_ref()).unwrap();
    let inserted = store.insert(example_quad().as_ref()).unwrap();
    assert!(!inserted); // duplicate
    assert_eq!(store.len(), 1);
}

#[test]
fn extend_counts_new_quads_only() {
    let store = MemoryQuadStore::new();

    let inserted = store.extend(vec![example_quad(), example_quad()]).unwrap();
    assert_eq!(inserted, 1);
}

#[test]
fn remove_quad() {
    let store = MemoryQuadStore::new();
    let quad = example_quad_in_graph("http://example.com/g");

    store.insert(quad.as_ref()).unwrap();
    assert!(store.remove(quad.as_ref()).unwrap());
    assert_eq!(store.len(), 0);
    assert!(store.named_graphs().is_empty());
}

#[test]
fn named_graphs_exist_while_non_empty() {
    let store = MemoryQuadStore::new();
    store
        .insert(example_quad_in_graph("http://example.com/g1").as_ref())
        .unwrap();

    let graphs = store.named_graphs();
    assert_eq!(graphs.len(), 1);
    assert_eq!(graphs[0].to_string(), "<http://example.com/g1>");
}

#[test]
fn snapshot_is_consistent_across_writes() {
    let store = MemoryQuadStore::new();
    store
        .insert(example_quad_in_graph("http://example.com/g").as_ref())
        .unwrap();

    let snapshot = store.snapshot();

    // Mutate after the snapshot was taken.
    let mut batch = store.begin_batch().unwrap();
    batch.clear_all();
    batch.commit().unwrap();

    // The snapshot still sees the original quad.
    assert_eq!(snapshot.len(), 1);
    assert_eq!(store.len(), 0);
}

#[test]
fn batch_rollback_discards_staged_writes() {
    let store = MemoryQuadStore::new();

    let mut batch = store.begin_batch().unwrap();
    assert!(batch.insert(example_quad().as_ref()));
    batch.rollback();

    assert_eq!(store.len(), 0);
}

#[test]
fn batch_contains_sees_staged_state() {
    let store = MemoryQuadStore::new();
    store.insert(example_quad().as_ref()).unwrap();

    let mut batch = store.begin_batch().unwrap();
    assert!(batch.contains(example_quad().as_ref()));
    assert!(batch.remove(example_quad().as_ref()));
    assert!(!batch.contains(example_quad().as_ref()));
    // The second removal of the same quad is a no-op.
    assert!(!batch.remove(example_quad().as_ref()));
    batch.commit().unwrap();

    assert_eq!(store.len(), 0);
}

#[test]
fn clear_graph_reports_affected_quads() {
    let store = MemoryQuadStore::new();
    store
        .extend(vec![
            example_quad_in_graph("http://example.com/g1"),
            example_quad_in_graph("http://example.com/g2"),
            example_quad(),
        ])
        .unwrap();

    let mut batch = store.begin_batch().unwrap();
    let graph = NamedNode::new("http://example.com/g1").unwrap();
    assert_eq!(batch.clear_graph(GraphNameRef::NamedNode(graph.as_ref())), 1);
    batch.commit().unwrap();

    assert_eq!(store.len(), 2);
}

#[test]
fn clear_named_keeps_the_default_graph() {
    let store = MemoryQuadStore::new();
    store
        .extend(vec![
            example_quad_in_graph("http://example.com/g1"),
            example_quad(),
        ])
        .unwrap();

    let mut batch = store.begin_batch().unwrap();
    assert_eq!(batch.clear_named_graphs(), 1);
    batch.commit().unwrap();

    assert_eq!(store.len(), 1);
    assert!(store.contains(example_quad().as_ref()));
}

#[test]
fn statistics_track_predicate_cardinality() {
    let store = MemoryQuadStore::new();
    let before = store.statistics_tx_id();
    store
        .extend(vec![
            example_quad(),
            example_quad_in_graph("http://example.com/g1"),
        ])
        .unwrap();

    let predicate = NamedNode::new("http://example.com/predicate").unwrap();
    assert_eq!(store.predicate_cardinality(predicate.as_ref()), Some(2));
    assert!(store.statistics_tx_id() > before);

    store.remove(example_quad().as_ref()).unwrap();
    assert_eq!(store.predicate_cardinality(predicate.as_ref()), Some(1));
}

#[test]
fn quads_matching_uses_the_bound_positions() {
    let store = MemoryQuadStore::new();
    store
        .extend(vec![example_quad(), example_quad_in_graph("http://example.com/g")])
        .unwrap();

    let snapshot = store.snapshot();
    let object = Term::Literal(Literal::new_simple_literal("value"));
    let matches: Vec<Quad> = snapshot
        .quads_matching(None, None, Some(object.as_ref()), None, None)
        .collect();
    assert_eq!(matches.len(), 2);

    let matches: Vec<Quad> = snapshot
        .quads_matching(
            None,
            None,
            Some(object.as_ref()),
            Some(GraphNameRef::DefaultGraph),
            None,
        )
        .collect();
    assert_eq!(matches.len(), 1);
}

fn example_quad() -> Quad {
    Quad::new(
        Subject::NamedNode(NamedNode::new("http://example.com/subject").unwrap()),
        NamedNode::new("http://example.com/predicate").unwrap(),
        Term::Literal(Literal::new_simple_literal("value")),
        GraphName::DefaultGraph,
    )
}

fn example_quad_in_graph(graph: &str) -> Quad {
    Quad::new(
        Subject::NamedNode(NamedNode::new("http://example.com/subject").unwrap()),
        NamedNode::new("http://example.com/predicate").unwrap(),
        Term::Literal(Literal::new_simple_literal("value")),
        GraphName::NamedNode(NamedNode::new(graph).unwrap()),
    )
}
