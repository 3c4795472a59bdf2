use super::{BoxedScan, Scan};
use crate::binding::{BindOutcome, BindingTable};
use crate::context::{ExecContext, ScanGraph};
use crate::error::EvaluationError;
use crate::lexical::{self, ConstOrVar};
use oxrdf::{GraphName, Quad, Term as RdfTerm};
use quadflow_model::TriplePattern;
use std::sync::Arc;

type QuadCursor = Box<dyn Iterator<Item = Quad> + Send>;

/// The per-row state of one triple pattern: a store cursor plus the
/// variable positions to bind on each step.
///
/// Opened against the bindings in force for the current upstream row;
/// positions bound there become constants pushed into the store lookup.
pub(crate) struct PatternState {
    cursor: QuadCursor,
    vars: Vec<(u8, String)>,
    entry_len: usize,
}

impl PatternState {
    pub(crate) fn open(
        ctx: &ExecContext,
        pattern: &TriplePattern,
        graph: &ScanGraph,
        bindings: &BindingTable,
    ) -> Result<Self, EvaluationError> {
        let mut vars = Vec::new();
        let mut constants: [Option<RdfTerm>; 3] = [None, None, None];
        let mut impossible = false;

        for (position, term) in pattern.terms().iter().enumerate() {
            let resolved = lexical::resolve_term(
                term,
                &ctx.source,
                &ctx.prefixes,
                ctx.base.as_ref(),
            )?;
            let constant = match resolved {
                ConstOrVar::Const(text) => Some(text),
                ConstOrVar::Var(name) => match bindings.find(&name) {
                    Some(index) => Some(bindings.value(index).to_owned()),
                    None => {
                        vars.push((position as u8, name));
                        None
                    }
                },
            };
            if let Some(text) = constant {
                match lexical::parse_term(&text) {
                    Ok(term) => constants[position] = Some(term),
                    // A binding that is not a valid term cannot match.
                    Err(_) => impossible = true,
                }
            }
        }

        let cursor: QuadCursor = if impossible {
            Box::new(std::iter::empty())
        } else {
            open_cursor(ctx, &constants, graph)
        };
        Ok(Self {
            cursor,
            vars,
            entry_len: bindings.len(),
        })
    }

    /// Advances to the next matching quad, binding this pattern's
    /// variables. Restores the binding table to the open-time length
    /// between attempts and on exhaustion.
    pub(crate) fn advance(
        &mut self,
        bindings: &mut BindingTable,
    ) -> Result<bool, EvaluationError> {
        loop {
            bindings.truncate_to(self.entry_len);
            let Some(quad) = self.cursor.next() else {
                return Ok(false);
            };
            let mut accepted = true;
            for (position, name) in &self.vars {
                let text = match position {
                    0 => quad.subject.to_string(),
                    1 => quad.predicate.to_string(),
                    _ => quad.object.to_string(),
                };
                if bindings.bind(name, &text) == BindOutcome::Conflict {
                    accepted = false;
                    break;
                }
            }
            if accepted {
                return Ok(true);
            }
        }
    }
}

/// Opens the store cursor for the resolved positions under the given graph
/// scope. The dataset default graph may be a FROM union, in which case the
/// per-graph cursors are concatenated (patterns may match across source
/// graphs independently).
fn open_cursor(
    ctx: &ExecContext,
    constants: &[Option<RdfTerm>; 3],
    graph: &ScanGraph,
) -> QuadCursor {
    let subject = constants[0].as_ref().map(RdfTerm::as_ref);
    let predicate = constants[1].as_ref().map(RdfTerm::as_ref);
    let object = constants[2].as_ref().map(RdfTerm::as_ref);
    let temporal = ctx.temporal.as_ref();

    match graph {
        ScanGraph::Fixed(name) => ctx.snapshot.quads_matching(
            subject,
            predicate,
            object,
            Some(name.as_ref()),
            temporal,
        ),
        ScanGraph::DefaultDataset => match &ctx.dataset.default_graphs {
            None => ctx.snapshot.quads_matching(
                subject,
                predicate,
                object,
                Some(oxrdf::GraphNameRef::DefaultGraph),
                temporal,
            ),
            Some(graphs) => {
                let mut chained: QuadCursor = Box::new(std::iter::empty());
                for name in graphs {
                    let next = ctx.snapshot.quads_matching(
                        subject,
                        predicate,
                        object,
                        Some(name.as_ref()),
                        temporal,
                    );
                    chained = Box::new(chained.chain(next));
                }
                chained
            }
        },
    }
}

/// A single-pattern scan: for each upstream row, emits one row per
/// matching quad.
pub(crate) struct TriplePatternScan {
    ctx: Arc<ExecContext>,
    pattern: TriplePattern,
    graph: ScanGraph,
    input: BoxedScan,
    state: Option<PatternState>,
}

impl TriplePatternScan {
    pub(crate) fn new(
        ctx: Arc<ExecContext>,
        pattern: TriplePattern,
        graph: ScanGraph,
        input: BoxedScan,
    ) -> Self {
        Self {
            ctx,
            pattern,
            graph,
            input,
            state: None,
        }
    }
}

impl Scan for TriplePatternScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        loop {
            self.ctx.check_cancelled()?;
            if let Some(state) = &mut self.state {
                if state.advance(bindings)? {
                    return Ok(true);
                }
                self.state = None;
            }
            if !self.input.move_next(bindings)? {
                return Ok(false);
            }
            self.state = Some(PatternState::open(
                &self.ctx,
                &self.pattern,
                &self.graph,
                bindings,
            )?);
        }
    }
}

/// Convenience used by DESCRIBE: all quads mentioning `resource` as
/// subject, optionally as object too.
pub(crate) fn resource_occurrences(
    ctx: &ExecContext,
    resource: &RdfTerm,
    include_object: bool,
) -> Vec<Quad> {
    let mut quads: Vec<Quad> = ctx
        .snapshot
        .quads_matching(Some(resource.as_ref()), None, None, None, ctx.temporal.as_ref())
        .collect();
    if include_object {
        quads.extend(ctx.snapshot.quads_matching(
            None,
            None,
            Some(resource.as_ref()),
            None,
            ctx.temporal.as_ref(),
        ));
    }
    quads
}

/// Owned graph-name helper shared by scans that iterate named graphs.
pub(crate) fn named_graph_candidates(ctx: &ExecContext) -> Vec<GraphName> {
    let restricted = ctx.dataset.named_graphs.clone();
    let present = ctx.snapshot.named_graphs();
    let names = match restricted {
        Some(from_named) => from_named
            .into_iter()
            .filter(|name| present.contains(name))
            .collect(),
        None => present,
    };
    names
        .into_iter()
        .map(|name| match name {
            oxrdf::NamedOrBlankNode::NamedNode(node) => GraphName::NamedNode(node),
            oxrdf::NamedOrBlankNode::BlankNode(node) => GraphName::BlankNode(node),
        })
        .collect()
}
