use crate::binding::BindingTable;
use crate::context::ExecContext;
use crate::error::EvaluationError;
use crate::lexical;
use crate::scan::{BoxedScan, Scan};
use oxrdf::{Term as RdfTerm, Triple};
use std::sync::Arc;

/// The results of a query evaluation.
pub enum QueryResults {
    /// SELECT: a stream of solutions.
    Solutions(QuerySolutionIter),
    /// ASK: a single boolean.
    Boolean(bool),
    /// CONSTRUCT / DESCRIBE: a stream of triples with set semantics.
    Graph(QueryTripleIter),
}

/// One solution row: projected variables paired with optional terms.
#[derive(Debug, Clone)]
pub struct QuerySolution {
    variables: Arc<[String]>,
    values: Vec<Option<RdfTerm>>,
}

impl QuerySolution {
    pub(crate) fn new(variables: Arc<[String]>, values: Vec<Option<RdfTerm>>) -> Self {
        Self { variables, values }
    }

    /// The projected variables, in projection order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The value bound to `variable`, if any.
    pub fn get(&self, variable: &str) -> Option<&RdfTerm> {
        let index = self.variables.iter().position(|name| name == variable)?;
        self.values.get(index)?.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&RdfTerm>)> {
        self.variables
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_ref))
    }
}

/// A pull iterator over solutions.
///
/// Holds the execution context — and through it the store snapshot and the
/// pooled binding arena — until dropped.
pub struct QuerySolutionIter {
    variables: Arc<[String]>,
    inner: SolutionsInner,
}

pub(crate) enum SolutionsInner {
    Streaming(StreamingSolutions),
    Materialized(std::vec::IntoIter<QuerySolution>),
}

pub(crate) struct StreamingSolutions {
    pub(crate) ctx: Arc<ExecContext>,
    pub(crate) scan: BoxedScan,
    pub(crate) bindings: BindingTable,
    pub(crate) offset_remaining: u64,
    pub(crate) limit_remaining: Option<u64>,
    pub(crate) finished: bool,
}

impl QuerySolutionIter {
    pub(crate) fn streaming(variables: Arc<[String]>, streaming: StreamingSolutions) -> Self {
        Self {
            variables,
            inner: SolutionsInner::Streaming(streaming),
        }
    }

    pub(crate) fn materialized(
        variables: Arc<[String]>,
        solutions: Vec<QuerySolution>,
    ) -> Self {
        Self {
            variables,
            inner: SolutionsInner::Materialized(solutions.into_iter()),
        }
    }

    /// The projected variables, in projection order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

impl Iterator for QuerySolutionIter {
    type Item = Result<QuerySolution, EvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            SolutionsInner::Materialized(solutions) => solutions.next().map(Ok),
            SolutionsInner::Streaming(streaming) => {
                streaming.next_solution(&self.variables).transpose()
            }
        }
    }
}

impl StreamingSolutions {
    fn next_solution(
        &mut self,
        variables: &Arc<[String]>,
    ) -> Result<Option<QuerySolution>, EvaluationError> {
        if self.finished {
            return Ok(None);
        }
        loop {
            self.ctx.check_cancelled()?;
            if !self.scan.move_next(&mut self.bindings)? {
                self.finished = true;
                return Ok(None);
            }
            if self.offset_remaining > 0 {
                self.offset_remaining -= 1;
                continue;
            }
            if let Some(limit) = &mut self.limit_remaining {
                if *limit == 0 {
                    self.finished = true;
                    return Ok(None);
                }
                *limit -= 1;
            }
            return Ok(Some(project_bindings(variables, &self.bindings)?));
        }
    }
}

/// Projects the live bindings onto the given variable list.
pub(crate) fn project_bindings(
    variables: &Arc<[String]>,
    bindings: &BindingTable,
) -> Result<QuerySolution, EvaluationError> {
    let mut values = Vec::with_capacity(variables.len());
    for name in variables.iter() {
        match bindings.find(name) {
            Some(index) => values.push(Some(lexical::parse_term(bindings.value(index))?)),
            None => values.push(None),
        }
    }
    Ok(QuerySolution::new(Arc::clone(variables), values))
}

/// A pull iterator over CONSTRUCT / DESCRIBE triples.
pub struct QueryTripleIter {
    pub(crate) inner: Box<dyn Iterator<Item = Result<Triple, EvaluationError>>>,
}

impl Iterator for QueryTripleIter {
    type Item = Result<Triple, EvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
