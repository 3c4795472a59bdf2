use super::{build_group_scan, BoxedScan, Scan, UnitScan};
use crate::binding::BindingTable;
use crate::context::{ExecContext, ScanGraph};
use crate::error::EvaluationError;
use quadflow_model::GroupPattern;
use std::sync::Arc;

/// OPTIONAL: a left-outer join.
///
/// For each upstream row, the optional group runs against the current
/// bindings. Matches extend the row; a matchless group lets the bare row
/// through once, optional variables left unbound.
pub(crate) struct LeftJoinScan {
    ctx: Arc<ExecContext>,
    graph: ScanGraph,
    input: BoxedScan,
    group: Arc<GroupPattern>,
    right: Option<BoxedScan>,
    matched: bool,
}

impl LeftJoinScan {
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
            right: None,
            matched: false,
        }
    }
}

impl Scan for LeftJoinScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        loop {
            self.ctx.check_cancelled()?;
            if let Some(right) = &mut self.right {
                if right.move_next(bindings)? {
                    self.matched = true;
                    return Ok(true);
                }
                self.right = None;
                if !self.matched {
                    // The right side restored the bindings to the bare
                    // left row; emit it as-is.
                    return Ok(true);
                }
            }
            if !self.input.move_next(bindings)? {
                return Ok(false);
            }
            self.right = Some(build_group_scan(
                &self.ctx,
                &self.group,
                &self.graph,
                UnitScan::boxed(),
            )?);
            self.matched = false;
        }
    }
}
