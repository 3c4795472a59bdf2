mod common;

use common::*;
use quadflow::model::GraphNameRef;
use quadflow::{
    GraphOrDefault, GraphTarget, GroupPattern, IrBuilder, ParsedUpdate, QuadPattern,
    QuadflowStore, TriplePattern, UpdateIr, UpdateOperation,
};

const EX: &str = "http://example.com/";

fn ex(local: &str) -> String {
    format!("{EX}{local}")
}

fn data_quad(builder: &mut IrBuilder, s: &str, p: &str, o: i64) -> QuadPattern {
    let s = builder.iri(s);
    let p = builder.iri(p);
    let o = builder.integer(o);
    QuadPattern::new(TriplePattern::new(s, p, o), None)
}

#[test]
fn insert_data_makes_quads_retrievable() {
    let store = QuadflowStore::new();

    let mut builder = IrBuilder::new();
    let data = vec![
        data_quad(&mut builder, &ex("a"), &ex("p"), 1),
        data_quad(&mut builder, &ex("b"), &ex("p"), 2),
    ];
    let update = ParsedUpdate::new(
        builder.finish(),
        UpdateIr::single(UpdateOperation::InsertData { data }),
    );

    let outcome = store.update(&update).unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(store.len(), 2);
    assert!(store.contains(quad(&ex("a"), &ex("p"), int(1)).as_ref()));
    assert!(store.contains(quad(&ex("b"), &ex("p"), int(2)).as_ref()));
}

#[test]
fn delete_data_counts_only_present_quads() {
    let store = QuadflowStore::new();
    store.insert(quad(&ex("a"), &ex("p"), int(1)).as_ref()).unwrap();

    let mut builder = IrBuilder::new();
    let data = vec![
        data_quad(&mut builder, &ex("a"), &ex("p"), 1),
        data_quad(&mut builder, &ex("missing"), &ex("p"), 9),
    ];
    let update = ParsedUpdate::new(
        builder.finish(),
        UpdateIr::single(UpdateOperation::DeleteData { data }),
    );

    let outcome = store.update(&update).unwrap();
    assert_eq!(outcome.affected, 1);
    assert_eq!(store.len(), 0);
}

#[test]
fn delete_where_instantiates_patterns() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), int(1)),
            quad(&ex("b"), &ex("p"), int(2)),
            quad(&ex("c"), &ex("q"), int(3)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let patterns = vec![QuadPattern::new(TriplePattern::new(s, p, o), None)];
    let update = ParsedUpdate::new(
        builder.finish(),
        UpdateIr::single(UpdateOperation::DeleteWhere { patterns }),
    );

    let outcome = store.update(&update).unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(store.len(), 1);
    assert!(store.contains(quad(&ex("c"), &ex("q"), int(3)).as_ref()));
}

#[test]
fn delete_where_with_empty_match_has_no_effect() {
    let store = QuadflowStore::new();
    store.insert(quad(&ex("a"), &ex("p"), int(1)).as_ref()).unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let missing = builder.iri(&ex("missing"));
    let o = builder.variable("o");
    let patterns = vec![QuadPattern::new(TriplePattern::new(s, missing, o), None)];
    let update = ParsedUpdate::new(
        builder.finish(),
        UpdateIr::single(UpdateOperation::DeleteWhere { patterns }),
    );

    let outcome = store.update(&update).unwrap();
    assert_eq!(outcome.affected, 0);
    assert_eq!(store.len(), 1);
}

#[test]
fn modify_with_graph_rewrites_in_place() {
    // WITH <g> DELETE { ?s <p> ?o } INSERT { ?s <p> 2 } WHERE { ?s <p> ?o }
    let store = QuadflowStore::new();
    store
        .insert(quad_in(&ex("g"), &ex("a"), &ex("p"), int(1)).as_ref())
        .unwrap();

    let mut builder = IrBuilder::new();
    let with = builder.iri(&ex("g"));
    let s_del = builder.variable("s");
    let p_del = builder.iri(&ex("p"));
    let o_del = builder.variable("o");
    let s_ins = builder.variable("s");
    let p_ins = builder.iri(&ex("p"));
    let two = builder.integer(2);
    let s_where = builder.variable("s");
    let p_where = builder.iri(&ex("p"));
    let o_where = builder.variable("o");

    let update = ParsedUpdate::new(
        builder.finish(),
        UpdateIr::single(UpdateOperation::Modify {
            with: Some(with),
            delete: vec![QuadPattern::new(
                TriplePattern::new(s_del, p_del, o_del),
                None,
            )],
            insert: vec![QuadPattern::new(
                TriplePattern::new(s_ins, p_ins, two),
                None,
            )],
            using: quadflow::DatasetSpec::default(),
            pattern: GroupPattern::with_patterns(vec![TriplePattern::new(
                s_where, p_where, o_where,
            )]),
        }),
    );

    let outcome = store.update(&update).unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(store.len(), 1);
    assert!(store.contains(quad_in(&ex("g"), &ex("a"), &ex("p"), int(2)).as_ref()));
}

#[test]
fn clear_targets() {
    let store = QuadflowStore::new();
    let seed = |store: &QuadflowStore| {
        store
            .extend(vec![
                quad(&ex("d"), &ex("p"), int(0)),
                quad_in(&ex("g1"), &ex("a"), &ex("p"), int(1)),
                quad_in(&ex("g2"), &ex("b"), &ex("p"), int(2)),
            ])
            .unwrap();
    };
    seed(&store);

    let clear = |target: GraphTarget| {
        ParsedUpdate::new(
            IrBuilder::new().finish(),
            UpdateIr::single(UpdateOperation::Clear {
                target,
                silent: false,
            }),
        )
    };

    let outcome = store.update(&clear(GraphTarget::DefaultGraph)).unwrap();
    assert_eq!(outcome.affected, 1);
    assert_eq!(store.len(), 2);

    let outcome = store.update(&clear(GraphTarget::NamedGraphs)).unwrap();
    assert_eq!(outcome.affected, 2);
    assert_eq!(store.len(), 0);

    seed(&store);
    let outcome = store.update(&clear(GraphTarget::AllGraphs)).unwrap();
    assert_eq!(outcome.affected, 3);
    assert!(store.is_empty());

    seed(&store);
    let mut builder = IrBuilder::new();
    let g1 = builder.iri(&ex("g1"));
    let update = ParsedUpdate::new(
        builder.finish(),
        UpdateIr::single(UpdateOperation::Drop {
            target: GraphTarget::Graph(g1),
            silent: false,
        }),
    );
    let outcome = store.update(&update).unwrap();
    assert_eq!(outcome.affected, 1);
    assert_eq!(store.len(), 2);
}

#[test]
fn create_is_a_no_op() {
    let store = QuadflowStore::new();
    let mut builder = IrBuilder::new();
    let graph = builder.iri(&ex("g"));
    let update = ParsedUpdate::new(
        builder.finish(),
        UpdateIr::single(UpdateOperation::Create {
            graph,
            silent: false,
        }),
    );
    let outcome = store.update(&update).unwrap();
    assert_eq!(outcome.affected, 0);
    assert!(store.named_graphs().is_empty());
}

fn graph_contents(store: &QuadflowStore, graph: &str) -> Vec<String> {
    let mut quads: Vec<String> = store
        .quads_for_pattern(None, None, None, Some(GraphNameRef::NamedNode(nn(graph).as_ref())))
        .into_iter()
        .map(|quad| format!("{} {} {}", quad.subject, quad.predicate, quad.object))
        .collect();
    quads.sort();
    quads
}

fn copy_op(source: &str, destination: &str, kind: &str) -> ParsedUpdate {
    let mut builder = IrBuilder::new();
    let source = GraphOrDefault::Graph(builder.iri(source));
    let destination = GraphOrDefault::Graph(builder.iri(destination));
    let operation = match kind {
        "copy" => UpdateOperation::Copy {
            source,
            destination,
            silent: false,
        },
        "move" => UpdateOperation::Move {
            source,
            destination,
            silent: false,
        },
        _ => UpdateOperation::Add {
            source,
            destination,
            silent: false,
        },
    };
    ParsedUpdate::new(builder.finish(), UpdateIr::single(operation))
}

#[test]
fn copy_twice_is_idempotent() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad_in(&ex("src"), &ex("a"), &ex("p"), int(1)),
            quad_in(&ex("src"), &ex("b"), &ex("p"), int(2)),
            quad_in(&ex("dst"), &ex("old"), &ex("p"), int(9)),
        ])
        .unwrap();

    store.update(&copy_op(&ex("src"), &ex("dst"), "copy")).unwrap();
    let after_first = graph_contents(&store, &ex("dst"));
    assert_eq!(after_first, graph_contents(&store, &ex("src")));

    store.update(&copy_op(&ex("src"), &ex("dst"), "copy")).unwrap();
    assert_eq!(graph_contents(&store, &ex("dst")), after_first);
}

#[test]
fn move_back_and_forth_restores_state() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad_in(&ex("src"), &ex("a"), &ex("p"), int(1)),
            quad_in(&ex("src"), &ex("b"), &ex("p"), int(2)),
        ])
        .unwrap();
    let initial = graph_contents(&store, &ex("src"));

    store.update(&copy_op(&ex("src"), &ex("dst"), "move")).unwrap();
    assert!(graph_contents(&store, &ex("src")).is_empty());
    assert_eq!(graph_contents(&store, &ex("dst")), initial);

    store.update(&copy_op(&ex("dst"), &ex("src"), "move")).unwrap();
    assert_eq!(graph_contents(&store, &ex("src")), initial);
    assert!(graph_contents(&store, &ex("dst")).is_empty());
}

#[test]
fn add_keeps_existing_destination_quads() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad_in(&ex("src"), &ex("a"), &ex("p"), int(1)),
            quad_in(&ex("dst"), &ex("old"), &ex("p"), int(9)),
        ])
        .unwrap();

    store.update(&copy_op(&ex("src"), &ex("dst"), "add")).unwrap();
    assert_eq!(graph_contents(&store, &ex("dst")).len(), 2);
}

#[test]
fn self_copy_is_a_no_op() {
    let store = QuadflowStore::new();
    store
        .insert(quad_in(&ex("g"), &ex("a"), &ex("p"), int(1)).as_ref())
        .unwrap();

    let outcome = store.update(&copy_op(&ex("g"), &ex("g"), "copy")).unwrap();
    assert_eq!(outcome.affected, 0);
    assert_eq!(graph_contents(&store, &ex("g")).len(), 1);

    let outcome = store.update(&copy_op(&ex("g"), &ex("g"), "move")).unwrap();
    assert_eq!(outcome.affected, 0);
    assert_eq!(graph_contents(&store, &ex("g")).len(), 1);
}

#[test]
fn blank_node_labels_are_scoped_per_statement() {
    let store = QuadflowStore::new();

    let insert_with_bnode = || {
        let mut builder = IrBuilder::new();
        let b1 = builder.blank("x");
        let p = builder.iri(&ex("p"));
        let b2 = builder.blank("x");
        let q = builder.iri(&ex("q"));
        let one = builder.integer(1);
        let data = vec![
            QuadPattern::new(TriplePattern::new(b1, p, one), None),
            QuadPattern::new(TriplePattern::new(b2, q, one), None),
        ];
        ParsedUpdate::new(
            builder.finish(),
            UpdateIr::single(UpdateOperation::InsertData { data }),
        )
    };

    store.update(&insert_with_bnode()).unwrap();
    store.update(&insert_with_bnode()).unwrap();

    // Within one statement the label maps to one node, across statements
    // to distinct nodes.
    let p_quads = store.quads_for_pattern(None, Some(nn(&ex("p")).as_ref().into()), None, None);
    let q_quads = store.quads_for_pattern(None, Some(nn(&ex("q")).as_ref().into()), None, None);
    assert_eq!(p_quads.len(), 2);
    assert_eq!(q_quads.len(), 2);

    let mut p_subjects: Vec<String> =
        p_quads.iter().map(|quad| quad.subject.to_string()).collect();
    let mut q_subjects: Vec<String> =
        q_quads.iter().map(|quad| quad.subject.to_string()).collect();
    p_subjects.sort();
    q_subjects.sort();
    // Same label, same statement: the p and q subjects coincide.
    assert_eq!(p_subjects, q_subjects);
    // Across statements they differ.
    assert_ne!(p_subjects[0], p_subjects[1]);
}

#[test]
fn silent_swallows_failures() {
    let store = QuadflowStore::new();

    // LOAD against an unresolvable IRI fails loudly without SILENT...
    let load = |silent: bool| {
        let mut builder = IrBuilder::new();
        let source = builder.iri("http://invalid.invalid/data.ttl");
        ParsedUpdate::new(
            builder.finish(),
            UpdateIr::single(UpdateOperation::Load {
                source,
                destination: None,
                silent,
            }),
        )
    };

    assert!(store.update(&load(false)).is_err());
    // ...and quietly with it.
    let outcome = store.update(&load(true)).unwrap();
    assert_eq!(outcome.affected, 0);
}
