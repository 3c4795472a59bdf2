use super::{BoxedScan, Scan};
use crate::binding::{BindingTable, MaterializedRow};
use crate::context::ExecContext;
use crate::error::EvaluationError;
use quadflow_model::QueryIr;
use std::sync::Arc;

/// A subquery: executed once with a fresh inner pipeline, its projected
/// rows materialized, then joined with the outer rows on shared
/// variables.
pub(crate) struct SubQueryScan {
    ctx: Arc<ExecContext>,
    input: BoxedScan,
    query: Arc<QueryIr>,
    rows: Option<Vec<MaterializedRow>>,
    cursor: usize,
    entry_len: usize,
    row_active: bool,
}

impl SubQueryScan {
    pub(crate) fn new(ctx: Arc<ExecContext>, query: Arc<QueryIr>, input: BoxedScan) -> Self {
        Self {
            ctx,
            input,
            query,
            rows: None,
            cursor: 0,
            entry_len: 0,
            row_active: false,
        }
    }
}

impl Scan for SubQueryScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        if self.rows.is_none() {
            self.rows = Some(crate::exec::materialize_subquery(&self.ctx, &self.query)?);
        }
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

            let rows = self.rows.as_ref().expect("materialized above");
            while self.cursor < rows.len() {
                let row = &rows[self.cursor];
                self.cursor += 1;
                bindings.truncate_to(self.entry_len);
                if row.apply_to(bindings) {
                    return Ok(true);
                }
            }
            bindings.truncate_to(self.entry_len);
            self.row_active = false;
        }
    }
}
