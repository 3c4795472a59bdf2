//! The query executor: shape dispatch, pipeline assembly and the
//! solution-modifier stack.

use crate::binding::{BindingTable, MaterializedRow};
use crate::config::EngineConfig;
use crate::construct::{describe_triples, ConstructIter};
use crate::context::{self, ExecContext, ScanGraph};
use crate::error::EvaluationError;
use crate::eval::{self, order_compare, EvalContext, Value};
use crate::plan_cache::PlanCache;
use crate::results::{
    project_bindings, QueryResults, QuerySolution, QuerySolutionIter, QueryTripleIter,
    StreamingSolutions,
};
use crate::scan::{build_group_scan, Scan, UnitScan};
use oxiri::Iri;
use quadflow_common::{BufferPool, CancellationToken, QuadStore, ServiceExecutor};
use quadflow_model::{
    AggregateFunction, AggregateSpec, DatasetSpec, GroupPattern, OrderDirection, ParsedQuery,
    QueryForm, QueryIr,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::sync::Arc;

/// Evaluates parsed queries against a quad store.
pub struct QueryExecutor {
    store: Arc<dyn QuadStore>,
    config: Arc<EngineConfig>,
    service: Option<Arc<dyn ServiceExecutor>>,
    plan_cache: Arc<PlanCache>,
    pool: Arc<BufferPool>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn QuadStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn QuadStore>, config: EngineConfig) -> Self {
        let plan_cache = Arc::new(PlanCache::new(config.plan_cache_capacity));
        Self {
            store,
            config: Arc::new(config),
            service: None,
            plan_cache,
            pool: Arc::new(BufferPool::new()),
        }
    }

    /// Injects the executor used for `SERVICE` clauses.
    pub fn set_service_executor(&mut self, service: Arc<dyn ServiceExecutor>) {
        self.service = Some(service);
    }

    pub fn execute(&self, parsed: &ParsedQuery) -> Result<QueryResults, EvaluationError> {
        self.execute_with_cancellation(parsed, CancellationToken::new())
    }

    pub fn execute_with_cancellation(
        &self,
        parsed: &ParsedQuery,
        cancellation: CancellationToken,
    ) -> Result<QueryResults, EvaluationError> {
        let query = &parsed.query;
        let ctx = self.make_context(parsed, cancellation)?;
        let shape = detect_shape(&query.pattern, &query.dataset);
        tracing::debug!(?shape, form = ?query.form, "dispatching query");

        match query.form {
            QueryForm::Select => Ok(QueryResults::Solutions(select_iter(&ctx, query)?)),
            QueryForm::Ask => {
                let mut scan =
                    build_group_scan(&ctx, &query.pattern, &ScanGraph::DefaultDataset, UnitScan::boxed())?;
                let mut bindings = BindingTable::new(&ctx.pool);
                Ok(QueryResults::Boolean(scan.move_next(&mut bindings)?))
            }
            QueryForm::Construct => {
                let scan = build_group_scan(
                    &ctx,
                    &query.pattern,
                    &ScanGraph::DefaultDataset,
                    UnitScan::boxed(),
                )?;
                let bindings = BindingTable::new(&ctx.pool);
                let iter =
                    ConstructIter::new(Arc::clone(&ctx), scan, bindings, query.template.clone());
                Ok(QueryResults::Graph(QueryTripleIter {
                    inner: Box::new(iter),
                }))
            }
            QueryForm::Describe => {
                let scan = build_group_scan(
                    &ctx,
                    &query.pattern,
                    &ScanGraph::DefaultDataset,
                    UnitScan::boxed(),
                )?;
                let bindings = BindingTable::new(&ctx.pool);
                let projection = projection_names(&ctx, query);
                let triples =
                    describe_triples(&ctx, &query.describe, scan, bindings, &projection)?;
                Ok(QueryResults::Graph(QueryTripleIter {
                    inner: Box::new(triples.into_iter().map(Ok)),
                }))
            }
        }
    }

    fn make_context(
        &self,
        parsed: &ParsedQuery,
        cancellation: CancellationToken,
    ) -> Result<Arc<ExecContext>, EvaluationError> {
        let query = &parsed.query;
        let base = parse_base(query.base.as_deref())?;
        let dataset = context::resolve_dataset(
            &query.dataset,
            parsed.source.as_str(),
            &query.prefixes,
            base.as_ref(),
        )?;
        Ok(Arc::new(ExecContext {
            snapshot: self.store.snapshot(),
            store: Arc::clone(&self.store),
            source: Arc::from(parsed.source.as_str()),
            prefixes: query.prefixes.clone(),
            base,
            dataset,
            temporal: query.temporal,
            cancellation,
            config: Arc::clone(&self.config),
            service: self.service.clone(),
            plan_cache: Arc::clone(&self.plan_cache),
            pool: Arc::clone(&self.pool),
        }))
    }
}

pub(crate) fn parse_base(base: Option<&str>) -> Result<Option<Iri<String>>, EvaluationError> {
    match base {
        None => Ok(None),
        Some(text) => Iri::parse(text.to_owned())
            .map(Some)
            .map_err(|e| EvaluationError::InvalidQuery(format!("invalid base IRI: {e}"))),
    }
}

/// The §4.5-style shape classification, used for planning diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryShape {
    GraphOnly,
    SubQuery,
    Federated,
    Dataset,
    SinglePattern,
    MultiPattern,
    Compound,
}

pub(crate) fn detect_shape(group: &GroupPattern, dataset: &DatasetSpec) -> QueryShape {
    if group.patterns.is_empty() && !group.graphs.is_empty() {
        QueryShape::GraphOnly
    } else if !group.subqueries.is_empty() {
        QueryShape::SubQuery
    } else if !group.services.is_empty() {
        QueryShape::Federated
    } else if !dataset.is_empty() {
        QueryShape::Dataset
    } else if group.patterns.len() == 1 {
        QueryShape::SinglePattern
    } else if group.patterns.len() > 1 {
        QueryShape::MultiPattern
    } else {
        QueryShape::Compound
    }
}

/// The projected variable names: the explicit projection, or every
/// in-scope variable (blank nodes excluded) for `SELECT *`.
pub(crate) fn projection_names(ctx: &ExecContext, query: &QueryIr) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = FxHashSet::default();
    if query.projection.is_empty() {
        query.pattern.visit_binding_terms(&mut |term| {
            if term.is_variable() {
                let name = term.text(&ctx.source).to_owned();
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        });
        for aggregate in &query.modifiers.aggregates {
            let name = aggregate.alias.text(&ctx.source).to_owned();
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    } else {
        for term in &query.projection {
            let name = term.text(&ctx.source).to_owned();
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    names
}

fn needs_materialization(query: &QueryIr) -> bool {
    let modifiers = &query.modifiers;
    modifiers.distinct
        || modifiers.reduced
        || !modifiers.order_by.is_empty()
        || !modifiers.group_by.is_empty()
        || !modifiers.aggregates.is_empty()
        || !modifiers.having.is_empty()
}

fn select_iter(
    ctx: &Arc<ExecContext>,
    query: &QueryIr,
) -> Result<QuerySolutionIter, EvaluationError> {
    let variables: Arc<[String]> = projection_names(ctx, query).into();
    if !needs_materialization(query) {
        let scan = build_group_scan(ctx, &query.pattern, &ScanGraph::DefaultDataset, UnitScan::boxed())?;
        let bindings = BindingTable::new(&ctx.pool);
        return Ok(QuerySolutionIter::streaming(
            Arc::clone(&variables),
            StreamingSolutions {
                ctx: Arc::clone(ctx),
                scan,
                bindings,
                offset_remaining: query.modifiers.offset,
                limit_remaining: query.modifiers.limit,
                finished: false,
            },
        ));
    }

    let rows = select_rows(ctx, query)?;
    let mut solutions = Vec::with_capacity(rows.len());
    for row in rows {
        let bindings = row_to_bindings(ctx, &row);
        solutions.push(project_bindings(&variables, &bindings)?);
    }
    Ok(QuerySolutionIter::materialized(variables, solutions))
}

/// The materialized SELECT pipeline, as projected rows. Subqueries and
/// the update applier reuse it.
pub(crate) fn select_rows(
    ctx: &Arc<ExecContext>,
    query: &QueryIr,
) -> Result<Vec<MaterializedRow>, EvaluationError> {
    let mut scan =
        build_group_scan(ctx, &query.pattern, &ScanGraph::DefaultDataset, UnitScan::boxed())?;
    let mut bindings = BindingTable::new(&ctx.pool);
    let mut rows = Vec::new();
    while scan.move_next(&mut bindings)? {
        ctx.check_cancelled()?;
        rows.push(bindings.to_row());
    }
    drop(scan);

    let modifiers = &query.modifiers;
    if !modifiers.group_by.is_empty() || !modifiers.aggregates.is_empty() {
        rows = aggregate_rows(ctx, query, rows)?;
    }

    for having in &modifiers.having {
        let eval_ctx = eval_context(ctx, 1);
        rows.retain(|row| {
            let bindings = row_to_bindings(ctx, row);
            eval::evaluate_filter(*having, &bindings, &eval_ctx)
        });
    }

    // Projection happens before DISTINCT and ORDER BY, so order keys are
    // evaluated against the full row first and carried through.
    let variables: Arc<[String]> = projection_names(ctx, query).into();
    let mut projected: Vec<(Vec<Option<String>>, Vec<Value>)> = Vec::with_capacity(rows.len());
    for row in &rows {
        ctx.check_cancelled()?;
        let bindings = row_to_bindings(ctx, row);
        let values: Vec<Option<String>> = variables
            .iter()
            .map(|name| {
                bindings
                    .find(name)
                    .map(|index| bindings.value(index).to_owned())
            })
            .collect();
        let keys: Vec<Value> = modifiers
            .order_by
            .iter()
            .map(|key| {
                let eval_ctx = eval_context(ctx, 1);
                eval::evaluate_expression(key.expr, &bindings, &eval_ctx)
                    .unwrap_or(Value::Unbound)
            })
            .collect();
        projected.push((values, keys));
    }

    if modifiers.distinct {
        let mut seen: FxHashSet<Vec<Option<String>>> = FxHashSet::default();
        projected.retain(|(values, _)| seen.insert(values.clone()));
    } else if modifiers.reduced {
        projected.dedup_by(|a, b| a.0 == b.0);
    }

    if !modifiers.order_by.is_empty() {
        let directions: Vec<OrderDirection> = modifiers
            .order_by
            .iter()
            .map(|key| key.direction)
            .collect();
        let mode = ctx.config.string_numeric_mode;
        projected.sort_by(|a, b| {
            for (index, direction) in directions.iter().enumerate() {
                let ordering = order_compare(&a.1[index], &b.1[index], mode);
                let ordering = match direction {
                    OrderDirection::Ascending => ordering,
                    OrderDirection::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    let offset = usize::try_from(modifiers.offset).unwrap_or(usize::MAX);
    let projected = projected.into_iter().skip(offset);
    let projected: Vec<(Vec<Option<String>>, Vec<Value>)> = match modifiers.limit {
        Some(limit) => projected
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect(),
        None => projected.collect(),
    };

    let mut result = Vec::with_capacity(projected.len());
    for (values, _) in projected {
        let mut bindings = BindingTable::new(&ctx.pool);
        for (name, value) in variables.iter().zip(&values) {
            if let Some(value) = value {
                bindings.bind(name, value);
            }
        }
        result.push(bindings.to_row());
    }
    Ok(result)
}

/// Runs a subquery with a fresh inner pipeline and returns its projected
/// rows for joining.
pub(crate) fn materialize_subquery(
    ctx: &Arc<ExecContext>,
    query: &QueryIr,
) -> Result<Vec<MaterializedRow>, EvaluationError> {
    select_rows(ctx, query)
}

/// GROUP BY + aggregates: partitions the rows and computes one output row
/// per group. Without GROUP BY, every row lands in one implicit group.
fn aggregate_rows(
    ctx: &Arc<ExecContext>,
    query: &QueryIr,
    rows: Vec<MaterializedRow>,
) -> Result<Vec<MaterializedRow>, EvaluationError> {
    let group_names: Vec<String> = query
        .modifiers
        .group_by
        .iter()
        .map(|term| term.text(&ctx.source).to_owned())
        .collect();

    let mut order: Vec<Vec<Option<String>>> = Vec::new();
    let mut groups: FxHashMap<Vec<Option<String>>, Vec<MaterializedRow>> = FxHashMap::default();
    if group_names.is_empty() {
        order.push(Vec::new());
        groups.insert(Vec::new(), rows);
    } else {
        for row in rows {
            let key: Vec<Option<String>> = group_names
                .iter()
                .map(|name| row.get(name).map(str::to_owned))
                .collect();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(row);
        }
    }

    let mut output = Vec::with_capacity(order.len());
    for key in order {
        ctx.check_cancelled()?;
        let members = groups.remove(&key).unwrap_or_default();
        let mut bindings = BindingTable::new(&ctx.pool);
        for (name, value) in group_names.iter().zip(&key) {
            if let Some(value) = value {
                bindings.bind(name, value);
            }
        }
        for aggregate in &query.modifiers.aggregates {
            if let Some(value) = compute_aggregate(ctx, aggregate, &members)? {
                let alias = aggregate.alias.text(&ctx.source).to_owned();
                bindings.bind(&alias, &value);
            }
        }
        output.push(bindings.to_row());
    }
    Ok(output)
}

fn compute_aggregate(
    ctx: &Arc<ExecContext>,
    spec: &AggregateSpec,
    members: &[MaterializedRow],
) -> Result<Option<String>, EvaluationError> {
    let mut values: Vec<Value> = Vec::new();
    for member in members {
        match spec.argument {
            None => values.push(Value::Integer(1)), // COUNT(*)
            Some(expr) => {
                let bindings = row_to_bindings(ctx, member);
                let eval_ctx = eval_context(ctx, 1);
                match eval::evaluate_expression(expr, &bindings, &eval_ctx) {
                    Ok(value) if !value.is_unbound() => values.push(value),
                    _ => {}
                }
            }
        }
    }
    if spec.distinct {
        let mut seen = FxHashSet::default();
        values.retain(|value| seen.insert(value.to_term_text()));
    }

    let mode = ctx.config.string_numeric_mode;
    let result = match &spec.function {
        AggregateFunction::Count => Some(Value::Integer(values.len() as i64)),
        AggregateFunction::Sum => {
            let mut sum = Value::Integer(0);
            for value in &values {
                sum = match numeric_add(&sum, value) {
                    Some(sum) => sum,
                    None => return Ok(None),
                };
            }
            Some(sum)
        }
        AggregateFunction::Avg => {
            if values.is_empty() {
                Some(Value::Integer(0))
            } else {
                let mut sum = Value::Integer(0);
                for value in &values {
                    sum = match numeric_add(&sum, value) {
                        Some(sum) => sum,
                        None => return Ok(None),
                    };
                }
                match sum {
                    Value::Integer(total) => {
                        Some(Value::Double(total as f64 / values.len() as f64))
                    }
                    Value::Double(total) => {
                        Some(Value::Double(total / values.len() as f64))
                    }
                    _ => None,
                }
            }
        }
        AggregateFunction::Min => values
            .iter()
            .min_by(|a, b| order_compare(a, b, mode))
            .cloned(),
        AggregateFunction::Max => values
            .iter()
            .max_by(|a, b| order_compare(a, b, mode))
            .cloned(),
        AggregateFunction::Sample => values.first().cloned(),
        AggregateFunction::GroupConcat { separator } => {
            let separator = separator.as_deref().unwrap_or(" ");
            let mut parts = Vec::with_capacity(values.len());
            for value in &values {
                match value.string_content() {
                    Ok(content) => parts.push(content.into_owned()),
                    Err(_) => return Ok(None),
                }
            }
            Some(Value::simple_string(&parts.join(separator)))
        }
    };
    Ok(result.and_then(|value| value.to_term_text()))
}

fn numeric_add(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.checked_add(*y).map(Value::Integer),
        (Value::Integer(_) | Value::Double(_), Value::Integer(_) | Value::Double(_)) => {
            let x = a.as_double().ok()?;
            let y = b.as_double().ok()?;
            Some(Value::Double(x + y))
        }
        _ => None,
    }
}

pub(crate) fn row_to_bindings(ctx: &Arc<ExecContext>, row: &MaterializedRow) -> BindingTable {
    let mut bindings = BindingTable::new(&ctx.pool);
    row.apply_to(&mut bindings);
    bindings
}

fn eval_context<'a>(ctx: &'a ExecContext, depth: u16) -> EvalContext<'a> {
    EvalContext {
        source: &ctx.source,
        prefixes: &ctx.prefixes,
        base: ctx.base.as_ref(),
        config: &ctx.config,
        depth,
    }
}
