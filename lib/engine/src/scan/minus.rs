use super::{materialize_group, BoxedScan, Scan};
use crate::binding::{BindingTable, MaterializedRow};
use crate::context::{ExecContext, ScanGraph};
use crate::error::EvaluationError;
use quadflow_model::GroupPattern;
use std::sync::Arc;

/// MINUS: an anti-join.
///
/// The right side is evaluated once, independently of the left, and
/// materialized. A left row is eliminated when some right row shares at
/// least one variable with it and agrees on every shared variable; a
/// right row sharing no variables eliminates nothing (SPARQL 1.1
/// disjoint-domain rule).
pub(crate) struct MinusScan {
    ctx: Arc<ExecContext>,
    graph: ScanGraph,
    input: BoxedScan,
    group: Arc<GroupPattern>,
    right_rows: Option<Vec<MaterializedRow>>,
}

impl MinusScan {
    pub(crate) fn new(
        ctx: Arc<ExecContext>,
        graph: ScanGraph,
        group: Arc<GroupPattern>,
        input: BoxedScan,
    ) -> Self {
        Self {
            ctx,
            graph,
            input,
            group,
            right_rows: None,
        }
    }
}

impl Scan for MinusScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        if self.right_rows.is_none() {
            self.right_rows = Some(materialize_group(&self.ctx, &self.group, &self.graph)?);
        }
        loop {
            self.ctx.check_cancelled()?;
            if !self.input.move_next(bindings)? {
                return Ok(false);
            }
            let excluded = self
                .right_rows
                .as_ref()
                .expect("materialized above")
                .iter()
                .any(|row| {
                    let (compatible, shared) = row.compatibility(bindings);
                    compatible && shared > 0
                });
            if !excluded {
                return Ok(true);
            }
        }
    }
}
