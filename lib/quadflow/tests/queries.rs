mod common;

use common::*;
use quadflow::{
    BindClause, CancellationToken, EngineConfig, EvaluationError, FilterClause, GraphClause,
    GroupPattern, IrBuilder, OrderKey, ParsedQuery, QuadflowStore, QueryIr, TriplePattern,
    ValuesClause,
};

const EX: &str = "http://example.com/";

fn ex(local: &str) -> String {
    format!("{EX}{local}")
}

#[test]
fn basic_two_pattern_join() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), iri_term(&ex("b"))),
            quad(&ex("b"), &ex("p"), iri_term(&ex("c"))),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let x = builder.variable("x");
    let p1 = builder.iri(&ex("p"));
    let y = builder.variable("y");
    let y2 = builder.variable("y");
    let p2 = builder.iri(&ex("p"));
    let z = builder.variable("z");
    let pattern = GroupPattern::with_patterns(vec![
        TriplePattern::new(x, p1, y),
        TriplePattern::new(y2, p2, z),
    ]);
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![x, y, z], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert_eq!(bound_str(&rows[0], "x"), format!("<{}>", ex("a")));
    assert_eq!(bound_str(&rows[0], "y"), format!("<{}>", ex("b")));
    assert_eq!(bound_str(&rows[0], "z"), format!("<{}>", ex("c")));
}

#[test]
fn filter_with_numeric_coercion() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("age"), int(30)),
            quad(&ex("b"), &ex("age"), int(20)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let age = builder.iri(&ex("age"));
    let a = builder.variable("a");
    let filter = builder.expr("?a > 25");
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(s, age, a)],
        filters: vec![FilterClause::new(filter)],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert_eq!(bound_str(&rows[0], "s"), format!("<{}>", ex("a")));
}

#[test]
fn optional_leaves_variables_unbound() {
    let store = QuadflowStore::new();
    store
        .insert(quad(&ex("a"), &ex("p"), iri_term(&ex("b"))).as_ref())
        .unwrap();

    let mut builder = IrBuilder::new();
    let x = builder.variable("x");
    let p = builder.iri(&ex("p"));
    let b = builder.iri(&ex("b"));
    let x2 = builder.variable("x");
    let q = builder.iri(&ex("q"));
    let y = builder.variable("y");
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(x, p, b)],
        optionals: vec![GroupPattern::with_patterns(vec![TriplePattern::new(
            x2, q, y,
        )])],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![x, y], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert_eq!(bound_str(&rows[0], "x"), format!("<{}>", ex("a")));
    assert!(rows[0].get("y").is_none());
}

#[test]
fn optional_extends_matching_rows() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), iri_term(&ex("b"))),
            quad(&ex("a"), &ex("q"), int(7)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let x = builder.variable("x");
    let p = builder.iri(&ex("p"));
    let b = builder.iri(&ex("b"));
    let x2 = builder.variable("x");
    let q = builder.iri(&ex("q"));
    let y = builder.variable("y");
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(x, p, b)],
        optionals: vec![GroupPattern::with_patterns(vec![TriplePattern::new(
            x2, q, y,
        )])],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![x, y], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert!(bound_str(&rows[0], "y").contains("\"7\""));
}

#[test]
fn ask_matches_select_non_emptiness() {
    let store = QuadflowStore::new();
    store
        .insert(quad(&ex("a"), &ex("p"), iri_term(&ex("b"))).as_ref())
        .unwrap();

    let build = |as_ask: bool| {
        let mut builder = IrBuilder::new();
        let s = builder.variable("s");
        let p = builder.variable("p");
        let o = builder.variable("o");
        let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
        let query = if as_ask {
            QueryIr::ask(pattern)
        } else {
            QueryIr::select(vec![s, p, o], pattern)
        };
        ParsedQuery::new(builder.finish(), query)
    };

    assert!(ask(&store, &build(true)));
    assert_eq!(select(&store, &build(false)).len(), 1);

    let empty = QuadflowStore::new();
    assert!(!ask(&empty, &build(true)));
    assert!(select(&empty, &build(false)).is_empty());
}

#[test]
fn regex_filter_with_case_insensitive_flag() {
    let store = QuadflowStore::new();
    store
        .insert(quad(&ex("a"), &ex("name"), lit("Hello")).as_ref())
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let name = builder.iri(&ex("name"));
    let n = builder.variable("n");
    let filter = builder.expr("regex(?n, \"^hel\", \"i\")");
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(s, name, n)],
        filters: vec![FilterClause::new(filter)],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::ask(pattern));

    assert!(ask(&store, &query));
}

#[test]
fn limit_caps_the_result_size() {
    let store = QuadflowStore::new();
    store
        .extend((0..10i64).map(|i| quad(&ex(&format!("s{i}")), &ex("p"), int(i))))
        .unwrap();

    for limit in [0u64, 3, 10, 50] {
        let mut builder = IrBuilder::new();
        let s = builder.variable("s");
        let p = builder.iri(&ex("p"));
        let o = builder.variable("o");
        let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
        let mut query = QueryIr::select(vec![s, o], pattern);
        query.modifiers.limit = Some(limit);
        let parsed = ParsedQuery::new(builder.finish(), query);

        let rows = select(&store, &parsed);
        assert_eq!(rows.len() as u64, limit.min(10));
    }
}

#[test]
fn offset_skips_rows() {
    let store = QuadflowStore::new();
    store
        .extend((0..5i64).map(|i| quad(&ex(&format!("s{i}")), &ex("p"), int(i))))
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
    let mut query = QueryIr::select(vec![s], pattern);
    query.modifiers.offset = 3;
    let parsed = ParsedQuery::new(builder.finish(), query);

    assert_eq!(select(&store, &parsed).len(), 2);
}

#[test]
fn distinct_deduplicates_projected_rows() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), int(1)),
            quad(&ex("a"), &ex("p"), int(2)),
            quad(&ex("b"), &ex("p"), int(3)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
    let mut query = QueryIr::select(vec![s], pattern);
    query.modifiers.distinct = true;
    let parsed = ParsedQuery::new(builder.finish(), query);

    assert_eq!(select(&store, &parsed).len(), 2);
}

#[test]
fn order_by_sorts_numerically() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), int(10)),
            quad(&ex("b"), &ex("p"), int(2)),
            quad(&ex("c"), &ex("p"), int(30)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let key = builder.expr("?o");
    let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
    let mut query = QueryIr::select(vec![s, o], pattern);
    query.modifiers.order_by = vec![OrderKey::ascending(key)];
    let parsed = ParsedQuery::new(builder.finish(), query);

    let rows = select(&store, &parsed);
    let order: Vec<String> = rows.iter().map(|row| bound_str(row, "s")).collect();
    assert_eq!(
        order,
        vec![
            format!("<{}>", ex("b")),
            format!("<{}>", ex("a")),
            format!("<{}>", ex("c"))
        ]
    );

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let key = builder.expr("?o");
    let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
    let mut query = QueryIr::select(vec![s, o], pattern);
    query.modifiers.order_by = vec![OrderKey::descending(key)];
    let parsed = ParsedQuery::new(builder.finish(), query);

    let rows = select(&store, &parsed);
    assert_eq!(bound_str(&rows[0], "s"), format!("<{}>", ex("c")));
}

#[test]
fn union_concatenates_branches() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), int(1)),
            quad(&ex("b"), &ex("q"), int(2)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s1 = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let v1 = builder.variable("v");
    let s2 = builder.variable("s");
    let q = builder.iri(&ex("q"));
    let w = builder.variable("w");
    let left = GroupPattern::with_patterns(vec![TriplePattern::new(s1, p, v1)]);
    let right = GroupPattern::with_patterns(vec![TriplePattern::new(s2, q, w)]);
    let pattern = GroupPattern {
        union: Some(Box::new((left, right))),
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s1, v1, w], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 2);
    // ?w is unbound on the left branch's row, ?v on the right branch's.
    let bound_w = rows.iter().filter(|row| row.get("w").is_some()).count();
    let bound_v = rows.iter().filter(|row| row.get("v").is_some()).count();
    assert_eq!((bound_v, bound_w), (1, 1));
}

#[test]
fn minus_removes_compatible_rows_only() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), int(1)),
            quad(&ex("b"), &ex("p"), int(2)),
            quad(&ex("a"), &ex("banned"), lit("yes")),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let s2 = builder.variable("s");
    let banned = builder.iri(&ex("banned"));
    let any = builder.variable("any");
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(s, p, o)],
        minus: Some(Box::new(GroupPattern::with_patterns(vec![
            TriplePattern::new(s2, banned, any),
        ]))),
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert_eq!(bound_str(&rows[0], "s"), format!("<{}>", ex("b")));
}

#[test]
fn minus_with_disjoint_variables_is_a_no_op() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), int(1)),
            quad(&ex("x"), &ex("other"), int(9)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    // The minus block binds entirely different variables.
    let u = builder.variable("u");
    let other = builder.iri(&ex("other"));
    let w = builder.variable("w");
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(s, p, o)],
        minus: Some(Box::new(GroupPattern::with_patterns(vec![
            TriplePattern::new(u, other, w),
        ]))),
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s], pattern));

    assert_eq!(select(&store, &query).len(), 1);
}

#[test]
fn fixed_graph_scopes_patterns() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad_in(&ex("g1"), &ex("a"), &ex("p"), int(1)),
            quad_in(&ex("g2"), &ex("b"), &ex("p"), int(2)),
            quad(&ex("c"), &ex("p"), int(3)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let g1 = builder.iri(&ex("g1"));
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let pattern = GroupPattern {
        graphs: vec![GraphClause {
            graph: g1,
            patterns: GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]),
        }],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert_eq!(bound_str(&rows[0], "s"), format!("<{}>", ex("a")));
}

#[test]
fn variable_graph_iterates_named_graphs() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad_in(&ex("g1"), &ex("a"), &ex("p"), int(1)),
            quad_in(&ex("g2"), &ex("b"), &ex("p"), int(2)),
            quad(&ex("c"), &ex("p"), int(3)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let g = builder.variable("g");
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let pattern = GroupPattern {
        graphs: vec![GraphClause {
            graph: g,
            patterns: GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]),
        }],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![g, s], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert!(row.get("g").is_some());
    }
}

#[test]
fn variable_graph_without_named_graphs_yields_nothing() {
    let store = QuadflowStore::new();
    store.insert(quad(&ex("a"), &ex("p"), int(1)).as_ref()).unwrap();

    let mut builder = IrBuilder::new();
    let g = builder.variable("g");
    let s = builder.variable("s");
    let p = builder.variable("p");
    let o = builder.variable("o");
    let pattern = GroupPattern {
        graphs: vec![GraphClause {
            graph: g,
            patterns: GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]),
        }],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![g], pattern));

    assert!(select(&store, &query).is_empty());
}

#[test]
fn from_builds_a_union_default_graph() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad_in(&ex("g1"), &ex("a"), &ex("p"), iri_term(&ex("b"))),
            quad_in(&ex("g2"), &ex("b"), &ex("p"), iri_term(&ex("c"))),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let x = builder.variable("x");
    let p1 = builder.iri(&ex("p"));
    let y = builder.variable("y");
    let y2 = builder.variable("y");
    let p2 = builder.iri(&ex("p"));
    let z = builder.variable("z");
    let g1 = builder.iri(&ex("g1"));
    let g2 = builder.iri(&ex("g2"));
    let pattern = GroupPattern::with_patterns(vec![
        TriplePattern::new(x, p1, y),
        TriplePattern::new(y2, p2, z),
    ]);
    let mut query = QueryIr::select(vec![x, z], pattern);
    query.dataset.default_graphs = vec![g1, g2];
    let parsed = ParsedQuery::new(builder.finish(), query);

    // The join crosses the two source graphs.
    let rows = select(&store, &parsed);
    assert_eq!(rows.len(), 1);
    assert_eq!(bound_str(&rows[0], "z"), format!("<{}>", ex("c")));
}

#[test]
fn values_joins_inline_data() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), int(1)),
            quad(&ex("b"), &ex("p"), int(2)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let s_value = builder.iri(&ex("a"));
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(s, p, o)],
        values: Some(ValuesClause {
            variables: vec![s],
            rows: vec![vec![Some(s_value)]],
        }),
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s, o], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert_eq!(bound_str(&rows[0], "s"), format!("<{}>", ex("a")));
}

#[test]
fn bind_computes_new_bindings() {
    let store = QuadflowStore::new();
    store.insert(quad(&ex("a"), &ex("p"), int(20)).as_ref()).unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let doubled = builder.variable("doubled");
    let expr = builder.expr("?o * 2");
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(s, p, o)],
        binds: vec![BindClause::new(doubled, expr)],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s, doubled], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert!(bound_str(&rows[0], "doubled").starts_with("\"40\""));
}

#[test]
fn subquery_joins_with_outer_patterns() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), int(1)),
            quad(&ex("a"), &ex("name"), lit("alpha")),
            quad(&ex("b"), &ex("name"), lit("beta")),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s_outer = builder.variable("s");
    let name = builder.iri(&ex("name"));
    let n = builder.variable("n");
    let s_inner = builder.variable("s");
    let p = builder.iri(&ex("p"));
    let o = builder.variable("o");
    let inner = QueryIr::select(
        vec![s_inner],
        GroupPattern::with_patterns(vec![TriplePattern::new(s_inner, p, o)]),
    );
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(s_outer, name, n)],
        subqueries: vec![inner],
        ..GroupPattern::default()
    };
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s_outer, n], pattern));

    let rows = select(&store, &query);
    assert_eq!(rows.len(), 1);
    assert_eq!(bound_str(&rows[0], "n"), "\"alpha\"");
}

#[test]
fn group_by_with_aggregates() {
    let store = QuadflowStore::new();
    store
        .extend(vec![
            quad(&ex("a"), &ex("score"), int(3)),
            quad(&ex("a"), &ex("score"), int(5)),
            quad(&ex("b"), &ex("score"), int(10)),
        ])
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let score = builder.iri(&ex("score"));
    let v = builder.variable("v");
    let total = builder.variable("total");
    let count = builder.variable("count");
    let sum_arg = builder.expr("?v");
    let count_arg = builder.expr("?v");
    let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, score, v)]);
    let mut query = QueryIr::select(vec![s, total, count], pattern);
    query.modifiers.group_by = vec![s];
    query.modifiers.aggregates = vec![
        quadflow::AggregateSpec {
            function: quadflow::AggregateFunction::Sum,
            argument: Some(sum_arg),
            distinct: false,
            alias: total,
        },
        quadflow::AggregateSpec {
            function: quadflow::AggregateFunction::Count,
            argument: Some(count_arg),
            distinct: false,
            alias: count,
        },
    ];
    let parsed = ParsedQuery::new(builder.finish(), query);

    let mut rows = select(&store, &parsed);
    rows.sort_by_key(|row| bound_str(row, "s"));
    assert_eq!(rows.len(), 2);
    assert!(bound_str(&rows[0], "total").starts_with("\"8\""));
    assert!(bound_str(&rows[0], "count").starts_with("\"2\""));
    assert!(bound_str(&rows[1], "total").starts_with("\"10\""));
}

#[test]
fn join_depth_boundary() {
    let mut config = EngineConfig::default();
    config.max_join_depth = 2;
    let store = QuadflowStore::with_config(config);
    store
        .extend(vec![
            quad(&ex("a"), &ex("p"), iri_term(&ex("b"))),
            quad(&ex("b"), &ex("p"), iri_term(&ex("c"))),
            quad(&ex("c"), &ex("p"), iri_term(&ex("d"))),
        ])
        .unwrap();

    let build = |depth: usize| {
        let mut builder = IrBuilder::new();
        let mut patterns = Vec::new();
        let mut projection = Vec::new();
        for i in 0..depth {
            let s = builder.variable(&format!("v{i}"));
            let p = builder.iri(&ex("p"));
            let o = builder.variable(&format!("v{}", i + 1));
            patterns.push(TriplePattern::new(s, p, o));
            if i == 0 {
                projection.push(s);
            }
            projection.push(o);
        }
        ParsedQuery::new(
            builder.finish(),
            QueryIr::select(projection, GroupPattern::with_patterns(patterns)),
        )
    };

    // Exactly at the limit: fine.
    assert_eq!(select(&store, &build(2)).len(), 1);
    // One deeper: a structured failure, not a blowup.
    match try_select(&store, &build(3)) {
        Err(EvaluationError::JoinDepthExceeded { depth: 3, max: 2 }) => {}
        other => panic!("expected JoinDepthExceeded, got {other:?}"),
    }
}

#[test]
fn cancellation_aborts_execution() {
    let store = QuadflowStore::new();
    store.insert(quad(&ex("a"), &ex("p"), int(1)).as_ref()).unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let p = builder.variable("p");
    let o = builder.variable("o");
    let pattern = GroupPattern::with_patterns(vec![TriplePattern::new(s, p, o)]);
    let query = ParsedQuery::new(builder.finish(), QueryIr::select(vec![s], pattern));

    let token = CancellationToken::new();
    token.cancel();
    let result = store.query_with_cancellation(&query, token).and_then(|results| {
        match results {
            quadflow::QueryResults::Solutions(solutions) => {
                solutions.collect::<Result<Vec<_>, _>>().map(|_| ())
            }
            _ => Ok(()),
        }
    });
    assert!(matches!(result, Err(EvaluationError::Cancelled)));
}

#[test]
fn prefixed_names_expand_in_patterns_and_filters() {
    let store = QuadflowStore::new();
    store
        .insert(quad(&ex("a"), "http://xmlns.com/foaf/0.1/name", lit("Ada")).as_ref())
        .unwrap();

    let mut builder = IrBuilder::new();
    let s = builder.variable("s");
    let name = builder.prefixed("foaf:name");
    let n = builder.variable("n");
    let filter = builder.expr("?n = \"Ada\"");
    let pattern = GroupPattern {
        patterns: vec![TriplePattern::new(s, name, n)],
        filters: vec![FilterClause::new(filter)],
        ..GroupPattern::default()
    };
    let mut query = QueryIr::select(vec![s], pattern);
    query.prefixes.insert("foaf", "http://xmlns.com/foaf/0.1/");
    let parsed = ParsedQuery::new(builder.finish(), query);

    assert_eq!(select(&store, &parsed).len(), 1);
}
