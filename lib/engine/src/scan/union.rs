use super::{build_group_scan, BoxedScan, Scan, UnitScan};
use crate::binding::BindingTable;
use crate::context::{ExecContext, ScanGraph};
use crate::error::EvaluationError;
use quadflow_model::GroupPattern;
use std::sync::Arc;

/// UNION: for each upstream row, the left branch's rows followed by the
/// right branch's rows. A variable bound on only one branch stays unbound
/// on the other branch's rows.
pub(crate) struct UnionScan {
    ctx: Arc<ExecContext>,
    graph: ScanGraph,
    input: BoxedScan,
    left: Arc<GroupPattern>,
    right: Arc<GroupPattern>,
    active: Option<(BoxedScan, Side)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl UnionScan {
    pub(crate) fn new(
        ctx: Arc<ExecContext>,
        graph: ScanGraph,
        left: Arc<GroupPattern>,
        right: Arc<GroupPattern>,
        input: BoxedScan,
    ) -> Self {
        Self {
            ctx,
            graph,
            input,
            left,
            right,
            active: None,
        }
    }

    fn branch(&self, side: Side) -> Result<BoxedScan, EvaluationError> {
        let group = match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        };
        build_group_scan(&self.ctx, group, &self.graph, UnitScan::boxed())
    }
}

impl Scan for UnionScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        loop {
            self.ctx.check_cancelled()?;
            let mut exhausted_side = None;
            if let Some((scan, side)) = &mut self.active {
                if scan.move_next(bindings)? {
                    return Ok(true);
                }
                exhausted_side = Some(*side);
            }
            if let Some(side) = exhausted_side {
                self.active = if side == Side::Left {
                    Some((self.branch(Side::Right)?, Side::Right))
                } else {
                    None
                };
                continue;
            }
            if !self.input.move_next(bindings)? {
                return Ok(false);
            }
            self.active = Some((self.branch(Side::Left)?, Side::Left));
        }
    }
}
