use super::clauses::{BindScan, FilterScan, ValuesScan};
use super::graph::GraphScan;
use super::join::MultiPatternScan;
use super::minus::MinusScan;
use super::optional::LeftJoinScan;
use super::pattern::TriplePatternScan;
use super::service::{ServiceMode, ServiceScan};
use super::subquery::SubQueryScan;
use super::union::UnionScan;
use super::{BoxedScan, Scan, UnitScan};
use crate::binding::{BindingTable, MaterializedRow};
use crate::context::{ExecContext, ScanGraph};
use crate::error::EvaluationError;
use crate::planner;
use std::sync::Arc;

use quadflow_model::GroupPattern;

/// Assembles the scan pipeline for one group pattern on top of `input`.
///
/// Clause order: required patterns (planner-ordered, filters pushed),
/// graph clauses, subqueries, services, optionals, the union pair, the
/// minus block, inline values, binds, then residual filters.
pub(crate) fn build_group_scan(
    ctx: &Arc<ExecContext>,
    group: &GroupPattern,
    graph: &ScanGraph,
    input: BoxedScan,
) -> Result<BoxedScan, EvaluationError> {
    let mut scan = input;
    let mut consumed_filters = Vec::new();

    match group.patterns.len() {
        0 => {}
        1 => {
            scan = Box::new(TriplePatternScan::new(
                Arc::clone(ctx),
                group.patterns[0],
                graph.clone(),
                scan,
            ));
        }
        _ => {
            let plan = planner::plan_join(ctx, &group.patterns, &group.filters);
            let ordered = plan
                .permutation
                .iter()
                .map(|&index| group.patterns[index])
                .collect();
            consumed_filters = plan.pushed_filters;
            scan = Box::new(MultiPatternScan::try_new(
                Arc::clone(ctx),
                graph.clone(),
                ordered,
                plan.level_filters,
                scan,
            )?);
        }
    }

    for clause in &group.graphs {
        scan = Box::new(GraphScan::new(
            Arc::clone(ctx),
            Arc::new(clause.clone()),
            scan,
        ));
    }

    for subquery in &group.subqueries {
        scan = Box::new(SubQueryScan::new(
            Arc::clone(ctx),
            Arc::new(subquery.clone()),
            scan,
        ));
    }

    for service in &group.services {
        let local_estimate = planner::estimate_block(ctx, &group.patterns);
        let mode = if planner::local_first(ctx, local_estimate) {
            ServiceMode::LocalFirst
        } else {
            ServiceMode::ServiceFirst
        };
        tracing::debug!(?mode, local_estimate, "SERVICE join strategy");
        scan = Box::new(ServiceScan::new(
            Arc::clone(ctx),
            Arc::new(service.clone()),
            mode,
            scan,
        ));
    }

    for optional in &group.optionals {
        scan = Box::new(LeftJoinScan::new(
            Arc::clone(ctx),
            graph.clone(),
            Arc::new(optional.clone()),
            scan,
        ));
    }

    if let Some(union) = &group.union {
        scan = Box::new(UnionScan::new(
            Arc::clone(ctx),
            graph.clone(),
            Arc::new(union.0.clone()),
            Arc::new(union.1.clone()),
            scan,
        ));
    }

    if let Some(minus) = &group.minus {
        scan = Box::new(MinusScan::new(
            Arc::clone(ctx),
            graph.clone(),
            Arc::new((**minus).clone()),
            scan,
        ));
    }

    if let Some(values) = &group.values {
        scan = Box::new(ValuesScan::new(
            Arc::clone(ctx),
            Arc::new(values.clone()),
            scan,
        ));
    }

    for bind in &group.binds {
        scan = Box::new(BindScan::new(Arc::clone(ctx), *bind, scan));
    }

    for (index, filter) in group.filters.iter().enumerate() {
        if consumed_filters.contains(&index) {
            continue;
        }
        scan = Box::new(FilterScan::new(Arc::clone(ctx), *filter, scan));
    }

    Ok(scan)
}

/// Evaluates a group from empty bindings and materializes every row.
/// MINUS right sides and update WHERE clauses go through here.
pub(crate) fn materialize_group(
    ctx: &Arc<ExecContext>,
    group: &GroupPattern,
    graph: &ScanGraph,
) -> Result<Vec<MaterializedRow>, EvaluationError> {
    let mut scan = build_group_scan(ctx, group, graph, UnitScan::boxed())?;
    let mut bindings = BindingTable::new(&ctx.pool);
    let mut rows = Vec::new();
    while scan.move_next(&mut bindings)? {
        ctx.check_cancelled()?;
        rows.push(bindings.to_row());
    }
    Ok(rows)
}
