use super::{BoxedScan, Scan};
use crate::binding::{BindOutcome, BindingTable};
use crate::context::ExecContext;
use crate::error::EvaluationError;
use crate::eval::{self, EvalContext};
use crate::lexical::{self, ConstOrVar};
use quadflow_model::{BindClause, FilterClause, ValuesClause};
use std::sync::Arc;

/// FILTER: passes the rows whose expression has a true effective boolean
/// value. Every failure mode rejects the row.
pub(crate) struct FilterScan {
    ctx: Arc<ExecContext>,
    input: BoxedScan,
    filter: FilterClause,
}

impl FilterScan {
    pub(crate) fn new(ctx: Arc<ExecContext>, filter: FilterClause, input: BoxedScan) -> Self {
        Self { ctx, input, filter }
    }
}

impl Scan for FilterScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        loop {
            self.ctx.check_cancelled()?;
            if !self.input.move_next(bindings)? {
                return Ok(false);
            }
            let eval_ctx = EvalContext {
                source: &self.ctx.source,
                prefixes: &self.ctx.prefixes,
                base: self.ctx.base.as_ref(),
                config: &self.ctx.config,
                depth: self.filter.depth,
            };
            if eval::evaluate_filter(self.filter.expr, bindings, &eval_ctx) {
                return Ok(true);
            }
        }
    }
}

/// BIND: evaluates the expression and binds the target variable. An
/// unbound or erroneous result leaves the variable unbound; a conflict
/// with an existing binding rejects the row.
pub(crate) struct BindScan {
    ctx: Arc<ExecContext>,
    input: BoxedScan,
    bind: BindClause,
}

impl BindScan {
    pub(crate) fn new(ctx: Arc<ExecContext>, bind: BindClause, input: BoxedScan) -> Self {
        Self { ctx, input, bind }
    }
}

impl Scan for BindScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        loop {
            self.ctx.check_cancelled()?;
            if !self.input.move_next(bindings)? {
                return Ok(false);
            }
            let eval_ctx = EvalContext {
                source: &self.ctx.source,
                prefixes: &self.ctx.prefixes,
                base: self.ctx.base.as_ref(),
                config: &self.ctx.config,
                depth: self.bind.depth,
            };
            let value = eval::evaluate_expression(self.bind.expr, bindings, &eval_ctx)
                .ok()
                .and_then(|value| value.to_term_text());
            let Some(value) = value else {
                return Ok(true);
            };
            let name = self.bind.variable.text(&self.ctx.source).to_owned();
            match bindings.bind_at_depth(&name, &value, self.bind.depth) {
                BindOutcome::Conflict => continue,
                _ => return Ok(true),
            }
        }
    }
}

/// VALUES: joins the inline data block with the upstream rows. UNDEF
/// cells constrain nothing.
pub(crate) struct ValuesScan {
    ctx: Arc<ExecContext>,
    input: BoxedScan,
    values: Arc<ValuesClause>,
    cursor: usize,
    entry_len: usize,
    row_active: bool,
}

impl ValuesScan {
    pub(crate) fn new(
        ctx: Arc<ExecContext>,
        values: Arc<ValuesClause>,
        input: BoxedScan,
    ) -> Self {
        Self {
            ctx,
            input,
            values,
            cursor: 0,
            entry_len: 0,
            row_active: false,
        }
    }
}

impl Scan for ValuesScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        loop {
            self.ctx.check_cancelled()?;

            if !self.row_active {
                if !self.input.move_next(bindings)? {
                    return Ok(false);
                }
                self.row_active = true;
                self.cursor = 0;
                self.entry_len = bindings.len();
            }

            while self.cursor < self.values.rows.len() {
                let row = &self.values.rows[self.cursor];
                self.cursor += 1;
                bindings.truncate_to(self.entry_len);
                let mut accepted = true;
                for (variable, cell) in self.values.variables.iter().zip(row) {
                    let Some(term) = cell else {
                        continue; // UNDEF
                    };
                    let resolved = lexical::resolve_term(
                        term,
                        &self.ctx.source,
                        &self.ctx.prefixes,
                        self.ctx.base.as_ref(),
                    )?;
                    let ConstOrVar::Const(value) = resolved else {
                        return Err(EvaluationError::InvalidQuery(
                            "VALUES cells must be constant terms".into(),
                        ));
                    };
                    let name = variable.text(&self.ctx.source);
                    if bindings.bind(name, &value) == BindOutcome::Conflict {
                        accepted = false;
                        break;
                    }
                }
                if accepted {
                    return Ok(true);
                }
            }
            bindings.truncate_to(self.entry_len);
            self.row_active = false;
        }
    }
}
