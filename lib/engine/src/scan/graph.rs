use super::pattern::named_graph_candidates;
use super::{build_group_scan, BoxedScan, Scan, UnitScan};
use crate::binding::{BindOutcome, BindingTable};
use crate::context::{ExecContext, ScanGraph};
use crate::error::EvaluationError;
use crate::lexical::{self, ConstOrVar};
use oxrdf::GraphName;
use quadflow_model::GraphClause;
use std::sync::Arc;

/// GRAPH: evaluates the child patterns scoped to one graph.
///
/// A constant graph term scopes directly. A variable iterates the named
/// graphs (restricted to FROM NAMED when given), binding the variable to
/// each graph in turn; with no named graphs it yields nothing.
pub(crate) struct GraphScan {
    ctx: Arc<ExecContext>,
    input: BoxedScan,
    clause: Arc<GraphClause>,
    state: Option<RowState>,
}

struct RowState {
    /// Remaining graphs to visit for the current upstream row.
    pending: Vec<GraphName>,
    /// The graph variable name, when the clause names one.
    variable: Option<String>,
    entry_len: usize,
    child: Option<BoxedScan>,
}

impl GraphScan {
    pub(crate) fn new(
        ctx: Arc<ExecContext>,
        clause: Arc<GraphClause>,
        input: BoxedScan,
    ) -> Self {
        Self {
            ctx,
            input,
            clause,
            state: None,
        }
    }

    fn open_row(&self, bindings: &BindingTable) -> Result<RowState, EvaluationError> {
        let resolved = lexical::resolve_term(
            &self.clause.graph,
            &self.ctx.source,
            &self.ctx.prefixes,
            self.ctx.base.as_ref(),
        )?;
        let (pending, variable) = match resolved {
            ConstOrVar::Const(text) => (vec![lexical::parse_graph_name(&text)?], None),
            ConstOrVar::Var(name) => match bindings.find(&name) {
                // Already bound: scope to that single graph. A non-graph
                // binding simply matches nothing.
                Some(index) => match lexical::parse_graph_name(bindings.value(index)) {
                    Ok(graph) => (vec![graph], None),
                    Err(_) => (Vec::new(), None),
                },
                None => (named_graph_candidates(&self.ctx), Some(name)),
            },
        };
        Ok(RowState {
            pending,
            variable,
            entry_len: bindings.len(),
            child: None,
        })
    }
}

impl Scan for GraphScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        loop {
            self.ctx.check_cancelled()?;

            if let Some(state) = &mut self.state {
                if let Some(child) = &mut state.child {
                    if child.move_next(bindings)? {
                        return Ok(true);
                    }
                    state.child = None;
                    bindings.truncate_to(state.entry_len);
                }
                if let Some(graph) = state.pending.pop() {
                    if let Some(variable) = &state.variable {
                        let text = graph.to_string();
                        if bindings.bind(variable, &text) == BindOutcome::Conflict {
                            bindings.truncate_to(state.entry_len);
                            continue;
                        }
                    }
                    state.child = Some(build_group_scan(
                        &self.ctx,
                        &self.clause.patterns,
                        &ScanGraph::Fixed(graph),
                        UnitScan::boxed(),
                    )?);
                    continue;
                }
                self.state = None;
            }

            if !self.input.move_next(bindings)? {
                return Ok(false);
            }
            self.state = Some(self.open_row(bindings)?);
        }
    }
}
