//! The scan operators: iterator-shaped producers of solution rows.
//!
//! Every scan follows one pull contract: `move_next` either extends the
//! binding table with the next solution and returns `true`, or restores
//! the table to the length it found it at and returns `false`. Compound
//! clauses are decorators over an upstream scan; a scan that returns
//! `false` is exhausted for the current upstream row only when its
//! documentation says so.

mod build;
mod clauses;
mod graph;
mod join;
mod minus;
mod optional;
mod pattern;
mod service;
mod subquery;
mod union;

pub(crate) use build::{build_group_scan, materialize_group};
pub(crate) use pattern::resource_occurrences;

use crate::binding::BindingTable;
use crate::error::EvaluationError;

pub(crate) trait Scan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError>;
}

pub(crate) type BoxedScan = Box<dyn Scan>;

/// Emits the incoming bindings once, unchanged. The seed under every
/// pipeline.
pub(crate) struct UnitScan {
    emitted: bool,
}

impl UnitScan {
    pub(crate) fn new() -> Self {
        Self { emitted: false }
    }

    pub(crate) fn boxed() -> BoxedScan {
        Box::new(Self::new())
    }
}

impl Scan for UnitScan {
    fn move_next(&mut self, _bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        if self.emitted {
            Ok(false)
        } else {
            self.emitted = true;
            Ok(true)
        }
    }
}
