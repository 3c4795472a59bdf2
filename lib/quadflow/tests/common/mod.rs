#![allow(dead_code, reason = "each integration test binary uses a subset")]

use quadflow::model::{GraphName, Literal, NamedNode, Quad, Term};
use quadflow::{EvaluationError, ParsedQuery, QuadflowStore, QueryResults, QuerySolution};

pub fn nn(iri: &str) -> NamedNode {
    NamedNode::new(iri).unwrap()
}

pub fn iri_term(iri: &str) -> Term {
    nn(iri).into()
}

pub fn int(value: i64) -> Term {
    Literal::from(value).into()
}

pub fn lit(value: &str) -> Term {
    Literal::new_simple_literal(value).into()
}

pub fn quad(subject: &str, predicate: &str, object: Term) -> Quad {
    Quad::new(nn(subject), nn(predicate), object, GraphName::DefaultGraph)
}

pub fn quad_in(graph: &str, subject: &str, predicate: &str, object: Term) -> Quad {
    Quad::new(nn(subject), nn(predicate), object, nn(graph))
}

/// Runs a SELECT and collects its rows.
pub fn select(store: &QuadflowStore, query: &ParsedQuery) -> Vec<QuerySolution> {
    match store.query(query).unwrap() {
        QueryResults::Solutions(solutions) => solutions.map(Result::unwrap).collect(),
        _ => panic!("expected solutions"),
    }
}

pub fn try_select(
    store: &QuadflowStore,
    query: &ParsedQuery,
) -> Result<Vec<QuerySolution>, EvaluationError> {
    match store.query(query)? {
        QueryResults::Solutions(solutions) => solutions.collect(),
        _ => panic!("expected solutions"),
    }
}

pub fn ask(store: &QuadflowStore, query: &ParsedQuery) -> bool {
    match store.query(query).unwrap() {
        QueryResults::Boolean(result) => result,
        _ => panic!("expected a boolean"),
    }
}

/// The string form of one bound variable, panicking when unbound.
pub fn bound_str(solution: &QuerySolution, variable: &str) -> String {
    solution
        .get(variable)
        .unwrap_or_else(|| panic!("?{variable} should be bound"))
        .to_string()
}
