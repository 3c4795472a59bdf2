use super::pattern::PatternState;
use super::{BoxedScan, Scan};
use crate::binding::BindingTable;
use crate::context::{ExecContext, ScanGraph};
use crate::error::EvaluationError;
use crate::eval::{self, EvalContext};
use quadflow_model::{Span, TriplePattern};
use std::sync::Arc;

/// The nested-loop join over a block of required patterns.
///
/// One [PatternState] per level, managed as an explicit stack: advancing
/// the deepest level yields rows; exhaustion pops a level and advances its
/// parent. Filters pushed down by the planner run as soon as their level
/// binds, skipping rows before deeper levels open.
pub(crate) struct MultiPatternScan {
    ctx: Arc<ExecContext>,
    graph: ScanGraph,
    input: BoxedScan,
    patterns: Vec<TriplePattern>,
    /// Per level: the filters whose variables are all bound once the level
    /// has produced a row, as `(expression, clause depth)`.
    level_filters: Vec<Vec<(Span, u16)>>,
    levels: Vec<PatternState>,
    done: bool,
}

impl MultiPatternScan {
    /// Fails with [EvaluationError::JoinDepthExceeded] instead of building
    /// a join deeper than the configured maximum.
    pub(crate) fn try_new(
        ctx: Arc<ExecContext>,
        graph: ScanGraph,
        patterns: Vec<TriplePattern>,
        level_filters: Vec<Vec<(Span, u16)>>,
        input: BoxedScan,
    ) -> Result<Self, EvaluationError> {
        let max = ctx.config.max_join_depth;
        if patterns.len() > max {
            return Err(EvaluationError::JoinDepthExceeded {
                depth: patterns.len(),
                max,
            });
        }
        debug_assert_eq!(patterns.len(), level_filters.len());
        Ok(Self {
            ctx,
            graph,
            input,
            patterns,
            level_filters,
            levels: Vec::new(),
            done: false,
        })
    }

    fn filters_pass(&self, level: usize, bindings: &BindingTable) -> bool {
        let filters = &self.level_filters[level];
        if filters.is_empty() {
            return true;
        }
        for (expr, depth) in filters {
            let eval_ctx = EvalContext {
                source: &self.ctx.source,
                prefixes: &self.ctx.prefixes,
                base: self.ctx.base.as_ref(),
                config: &self.ctx.config,
                depth: *depth,
            };
            if !eval::evaluate_filter(*expr, bindings, &eval_ctx) {
                return false;
            }
        }
        true
    }
}

impl Scan for MultiPatternScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        if self.done {
            return Ok(false);
        }
        loop {
            self.ctx.check_cancelled()?;

            if self.levels.is_empty() {
                if !self.input.move_next(bindings)? {
                    self.done = true;
                    return Ok(false);
                }
                self.levels.push(PatternState::open(
                    &self.ctx,
                    &self.patterns[0],
                    &self.graph,
                    bindings,
                )?);
            }

            let level = self.levels.len() - 1;
            if self.levels[level].advance(bindings)? {
                if !self.filters_pass(level, bindings) {
                    continue;
                }
                if level + 1 == self.patterns.len() {
                    return Ok(true);
                }
                self.levels.push(PatternState::open(
                    &self.ctx,
                    &self.patterns[level + 1],
                    &self.graph,
                    bindings,
                )?);
            } else {
                // Backtrack: dispose this level, advance the parent.
                self.levels.pop();
            }
        }
    }
}
