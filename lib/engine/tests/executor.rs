use oxrdf::{GraphName, Literal, NamedNode, Quad};
use quadflow_engine::{QueryExecutor, QueryResults, UpdateApplier};
use quadflow_model::{
    GroupPattern, IrBuilder, ParsedQuery, ParsedUpdate, QuadPattern, QueryIr, TriplePattern,
    UpdateIr, UpdateOperation,
};
use quadflow_storage::MemoryQuadStore;
use std::sync::Arc;

const EX: &str = "http://example.com/";

fn seeded_store(count: i64) -> Arc<MemoryQuadStore> {
    let store = MemoryQuadStore::new();
    store
        .extend((0..count).map(|i| {
            Quad::new(
                NamedNode::new_unchecked(format!("{EX}s{i}")),
                NamedNode::new_unchecked(format!("{EX}p")),
                Literal::from(i),
                GraphName::DefaultGraph,
            )
        }))
        .unwrap();
    store.into()
}

fn spo_query() -> ParsedQuery {
    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&format!("{EX}p"));
    let o = builder.variable("o");
    let o2 = builder.variable("o");
    let q = builder.iri(&format!("{EX}q"));
    let n = builder.variable("n");
    let pattern = GroupPattern::with_patterns(vec![
        TriplePattern::new(s, p, o),
        TriplePattern::new(o2, q, n),
    ]);
    ParsedQuery::new(builder.finish(), QueryIr::select(vec![s, o], pattern))
}

fn count_solutions(executor: &QueryExecutor, query: &ParsedQuery) -> usize {
    match executor.execute(query).unwrap() {
        QueryResults::Solutions(solutions) => solutions.map(Result::unwrap).count(),
        _ => panic!("expected solutions"),
    }
}

#[test]
fn repeated_execution_reuses_the_cached_plan() {
    let store = seeded_store(8);
    let executor = QueryExecutor::new(Arc::clone(&store) as Arc<dyn quadflow_common::QuadStore>);
    let query = spo_query();

    // First run computes the plan, the second hits the cache; both must
    // agree (the join has no matches for <q>, so zero rows).
    assert_eq!(count_solutions(&executor, &query), 0);
    assert_eq!(count_solutions(&executor, &query), 0);
}

#[test]
fn plan_cache_survives_statistics_changes_correctly() {
    let store = seeded_store(4);
    let dyn_store = Arc::clone(&store) as Arc<dyn quadflow_common::QuadStore>;
    let executor = QueryExecutor::new(Arc::clone(&dyn_store));

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&format!("{EX}p"));
    let o = builder.variable("o");
    let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s, o], pattern));

    assert_eq!(count_solutions(&executor, &query), 4);

    // A write bumps the statistics tx id; results must track the new
    // state, cached plan or not.
    store
        .insert(
            Quad::new(
                NamedNode::new_unchecked(format!("{EX}extra")),
                NamedNode::new_unchecked(format!("{EX}p")),
                Literal::from(99),
                GraphName::DefaultGraph,
            )
            .as_ref(),
        )
        .unwrap();
    assert_eq!(count_solutions(&executor, &query), 5);
}

#[test]
fn result_iterator_reads_from_its_snapshot() {
    let store = seeded_store(3);
    let dyn_store = Arc::clone(&store) as Arc<dyn quadflow_common::QuadStore>;
    let executor = QueryExecutor::new(Arc::clone(&dyn_store));

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.variable("p");
    let o = builder.variable("o");
    let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s], pattern));

    let QueryResults::Solutions(solutions) = executor.execute(&query).unwrap() else {
        panic!("expected solutions");
    };

    // Wipe the store while the iterator is live.
    let applier = UpdateApplier::new(dyn_store);
    let clear = ParsedUpdate::new(
        IrBuilder::new().finish(),
        UpdateIr::single(UpdateOperation::Clear {
            target: quadflow_model::GraphTarget::AllGraphs,
            silent: false,
        }),
    );
    applier.apply(&clear).unwrap();
    assert_eq!(store.len(), 0);

    // The iterator still sees the snapshot it started from.
    assert_eq!(solutions.count(), 3);
}

#[test]
fn update_where_reads_the_pre_update_state() {
    // INSERT { ?s <mark> 1 } WHERE { ?s <p> ?o } must not observe its own
    // inserts.
    let store = seeded_store(2);
    let dyn_store = Arc::clone(&store) as Arc<dyn quadflow_common::QuadStore>;
    let applier = UpdateApplier::new(dyn_store);

    let mut builder = IrBuilder::new();
    let s_ins = builder.variable("s");
    let mark = builder.iri(&format!("{EX}mark"));
    let one = builder.integer(1);
    let s = builder.variable("s");
    let p = builder.iri(&format!("{EX}p"));
    let o = builder.variable("o");
    let update = ParsedUpdate::new(
        builder.finish(),
        UpdateIr::single(UpdateOperation::Modify {
            with: None,
            delete: Vec::new(),
            insert: vec![QuadPattern::new(TriplePattern::new(s_ins, mark, one), None)],
            using: quadflow_model::DatasetSpec::default(),
            pattern: GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]),
        }),
    );

    let outcome = applier.apply(&update).unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(store.len(), 4);
}
