//! Join planning: cardinality estimation, pattern reordering and filter
//! pushdown analysis.

use crate::context::ExecContext;
use crate::eval;
use crate::lexical::{self, ConstOrVar};
use itertools::Itertools;
use quadflow_common::fnv1a_64;
use quadflow_model::{FilterClause, Span, TriplePattern};
use rustc_hash::FxHashSet;

/// Assumed result size of a SERVICE call with no better hint.
const DEFAULT_SERVICE_CARDINALITY: u64 = 10_000;

/// The outcome of planning one required-pattern block.
#[derive(Debug)]
pub(crate) struct JoinPlan {
    /// The evaluation order, as indices into the original pattern list.
    pub(crate) permutation: Vec<usize>,
    /// Per evaluation level, the pushed filters as `(expr, depth)`.
    pub(crate) level_filters: Vec<Vec<(Span, u16)>>,
    /// Indices (into the group's filter list) consumed by pushdown.
    pub(crate) pushed_filters: Vec<usize>,
}

/// Plans a multi-pattern join: reorders the patterns by estimated
/// cardinality under a connectivity constraint and assigns each pushable
/// filter to the earliest level that binds all its variables.
///
/// The permutation is cached per `(source, pattern block)` and reused
/// while the store's statistics version is unchanged.
pub(crate) fn plan_join(
    ctx: &ExecContext,
    patterns: &[TriplePattern],
    filters: &[FilterClause],
) -> JoinPlan {
    let stats_tx_id = ctx.store.statistics_tx_id();
    let key = plan_key(&ctx.source, patterns);

    let permutation = match ctx.plan_cache.get(key, stats_tx_id) {
        Some(cached) if cached.len() == patterns.len() => {
            tracing::debug!(key, "join plan cache hit");
            cached
        }
        _ => {
            let computed = reorder(ctx, patterns);
            tracing::debug!(key, order = ?computed, "computed join plan");
            ctx.plan_cache.insert(key, computed.clone(), stats_tx_id);
            computed
        }
    };

    let (level_filters, pushed_filters) = push_down_filters(ctx, patterns, &permutation, filters);
    JoinPlan {
        permutation,
        level_filters,
        pushed_filters,
    }
}

/// The cache key: the query-source hash, mixed with the pattern spans so
/// distinct blocks of one query do not collide.
fn plan_key(source: &str, patterns: &[TriplePattern]) -> u64 {
    let mut key = fnv1a_64(source);
    for pattern in patterns {
        for term in pattern.terms() {
            key = key
                .rotate_left(7)
                .wrapping_add(term.span.start as u64)
                .wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    key
}

/// Greedy reorder: repeatedly pick the cheapest pattern among those
/// connected to the already-placed prefix (or among all, when nothing
/// connects), so the estimated cardinality product stays small.
fn reorder(ctx: &ExecContext, patterns: &[TriplePattern]) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..patterns.len()).collect();
    let mut placed = Vec::with_capacity(patterns.len());
    let mut bound: FxHashSet<String> = FxHashSet::default();

    while !remaining.is_empty() {
        let connected: Vec<usize> = if placed.is_empty() {
            remaining.clone()
        } else {
            let linked = remaining
                .iter()
                .copied()
                .filter(|&index| {
                    pattern_variables(ctx, &patterns[index])
                        .iter()
                        .any(|name| bound.contains(name))
                })
                .collect_vec();
            if linked.is_empty() {
                remaining.clone()
            } else {
                linked
            }
        };

        let chosen = connected
            .into_iter()
            .min_by_key(|&index| estimate_pattern(ctx, &patterns[index], &bound))
            .expect("remaining is non-empty");
        remaining.retain(|&index| index != chosen);
        bound.extend(pattern_variables(ctx, &patterns[chosen]));
        placed.push(chosen);
    }
    placed
}

/// Estimates the matching-quad count for one pattern given the variables
/// bound so far.
pub(crate) fn estimate_pattern(
    ctx: &ExecContext,
    pattern: &TriplePattern,
    bound: &FxHashSet<String>,
) -> u64 {
    let total = ctx.snapshot.len() as u64;
    let position_bound = |term: &quadflow_model::Term| -> bool {
        match lexical::resolve_term(term, &ctx.source, &ctx.prefixes, ctx.base.as_ref()) {
            Ok(ConstOrVar::Const(_)) => true,
            Ok(ConstOrVar::Var(name)) => bound.contains(&name),
            Err(_) => true,
        }
    };

    let mut estimate = match lexical::resolve_term(
        &pattern.predicate,
        &ctx.source,
        &ctx.prefixes,
        ctx.base.as_ref(),
    ) {
        Ok(ConstOrVar::Const(text)) => match lexical::parse_term(&text) {
            Ok(oxrdf::Term::NamedNode(node)) => ctx
                .store
                .predicate_cardinality(node.as_ref())
                .unwrap_or(total / 5 + 1),
            _ => total,
        },
        Ok(ConstOrVar::Var(name)) if bound.contains(&name) => total / 5 + 1,
        _ => total,
    };

    if position_bound(&pattern.subject) {
        estimate = (estimate / 10).max(1);
    }
    if position_bound(&pattern.object) {
        estimate = (estimate / 10).max(1);
    }
    estimate.max(1)
}

/// The estimated cardinality of a whole pattern block: the product of the
/// per-level estimates along the planned order.
pub(crate) fn estimate_block(ctx: &ExecContext, patterns: &[TriplePattern]) -> u64 {
    let mut bound: FxHashSet<String> = FxHashSet::default();
    let mut product: u64 = 1;
    for pattern in patterns {
        product = product.saturating_mul(estimate_pattern(ctx, pattern, &bound));
        bound.extend(pattern_variables(ctx, pattern));
    }
    product
}

/// Whether a SERVICE clause should run local-first: only when the local
/// side is smaller than the assumed service cardinality by the configured
/// factor.
pub(crate) fn local_first(ctx: &ExecContext, local_estimate: u64) -> bool {
    local_estimate.saturating_mul(ctx.config.service_local_first_ratio)
        < DEFAULT_SERVICE_CARDINALITY
}

/// Assigns each pushable filter to the earliest prefix of the planned
/// order that binds all its variables. Filters mentioning variables from
/// outside the block (optionals, binds, outer scope) are left for the
/// residual filter stage.
fn push_down_filters(
    ctx: &ExecContext,
    patterns: &[TriplePattern],
    permutation: &[usize],
    filters: &[FilterClause],
) -> (Vec<Vec<(Span, u16)>>, Vec<usize>) {
    let mut level_filters: Vec<Vec<(Span, u16)>> = vec![Vec::new(); permutation.len()];
    let mut pushed = Vec::new();

    let block_vars: FxHashSet<String> = permutation
        .iter()
        .flat_map(|&index| pattern_variables(ctx, &patterns[index]))
        .collect();

    for (filter_index, filter) in filters.iter().enumerate() {
        let mut vars = FxHashSet::default();
        eval::expression_variables(filter.expr.slice(&ctx.source), &mut |name| {
            vars.insert(name.to_owned());
        });
        if vars.is_empty() || !vars.iter().all(|name| block_vars.contains(name)) {
            continue;
        }
        let mut bound: FxHashSet<String> = FxHashSet::default();
        for (level, &pattern_index) in permutation.iter().enumerate() {
            bound.extend(pattern_variables(ctx, &patterns[pattern_index]));
            if vars.iter().all(|name| bound.contains(name)) {
                level_filters[level].push((filter.expr, filter.depth));
                pushed.push(filter_index);
                break;
            }
        }
    }
    (level_filters, pushed)
}

/// The variables a pattern binds, named the way scans name them (blank
/// nodes keep their sigil).
fn pattern_variables(ctx: &ExecContext, pattern: &TriplePattern) -> Vec<String> {
    pattern
        .terms()
        .iter()
        .filter_map(|term| {
            match lexical::resolve_term(term, &ctx.source, &ctx.prefixes, ctx.base.as_ref()) {
                Ok(ConstOrVar::Var(name)) => Some(name),
                _ => None,
            }
        })
        .collect()
}
