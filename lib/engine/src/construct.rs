//! CONSTRUCT template instantiation and DESCRIBE materialization.

use crate::binding::BindingTable;
use crate::context::ExecContext;
use crate::error::EvaluationError;
use crate::lexical::{self, ConstOrVar};
use crate::scan::{resource_occurrences, BoxedScan, Scan};
use oxrdf::{NamedNode, Subject, Term as RdfTerm, Triple};
use quadflow_model::{QuadPattern, SyntheticTerm, Term, TermKind};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;

/// Streams the CONSTRUCT template over the WHERE solutions.
///
/// Blank-node labels in the template get a fresh identity per solution
/// row; duplicate `(s, p, o)` triples are suppressed across the whole
/// execution with a structural key.
pub(crate) struct ConstructIter {
    ctx: Arc<ExecContext>,
    scan: BoxedScan,
    bindings: BindingTable,
    template: Vec<QuadPattern>,
    row_counter: u64,
    seen: FxHashSet<(String, String, String)>,
    pending: VecDeque<Triple>,
    finished: bool,
}

impl ConstructIter {
    pub(crate) fn new(
        ctx: Arc<ExecContext>,
        scan: BoxedScan,
        bindings: BindingTable,
        template: Vec<QuadPattern>,
    ) -> Self {
        Self {
            ctx,
            scan,
            bindings,
            template,
            row_counter: 0,
            seen: FxHashSet::default(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn instantiate_row(&mut self) {
        self.row_counter += 1;
        for quad in &self.template {
            let subject = template_term(
                &self.ctx,
                &quad.triple.subject,
                &self.bindings,
                self.row_counter,
            );
            let predicate = template_term(
                &self.ctx,
                &quad.triple.predicate,
                &self.bindings,
                self.row_counter,
            );
            let object = template_term(
                &self.ctx,
                &quad.triple.object,
                &self.bindings,
                self.row_counter,
            );
            let (Some(subject), Some(predicate), Some(object)) = (subject, predicate, object)
            else {
                continue;
            };
            if subject.is_empty() || predicate.is_empty() || object.is_empty() {
                continue;
            }
            let key = (subject, predicate, object);
            if self.seen.contains(&key) {
                continue;
            }
            if let Some(triple) = parse_triple(&key.0, &key.1, &key.2) {
                self.pending.push_back(triple);
            }
            self.seen.insert(key);
        }
    }
}

impl Iterator for ConstructIter {
    type Item = Result<Triple, EvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(triple) = self.pending.pop_front() {
                return Some(Ok(triple));
            }
            if self.finished {
                return None;
            }
            if let Err(error) = self.ctx.check_cancelled() {
                self.finished = true;
                return Some(Err(error));
            }
            match self.scan.move_next(&mut self.bindings) {
                Ok(true) => self.instantiate_row(),
                Ok(false) => self.finished = true,
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

/// Resolves one template position against the current solution. `None`
/// drops the triple (unbound variable, unexpandable name).
fn template_term(
    ctx: &ExecContext,
    term: &Term,
    bindings: &BindingTable,
    row: u64,
) -> Option<String> {
    match term.kind {
        TermKind::Variable => {
            let name = term.text(&ctx.source);
            bindings
                .find(name)
                .map(|index| bindings.value(index).to_owned())
        }
        // Template blank nodes are renamed per solution row.
        TermKind::BlankNode => Some(format!("_:b{row}_{}", term.text(&ctx.source))),
        TermKind::Synthetic(SyntheticTerm::ListNode(slot)) => Some(format!("_:l{row}_{slot}")),
        _ => match lexical::resolve_term(term, &ctx.source, &ctx.prefixes, ctx.base.as_ref()) {
            Ok(ConstOrVar::Const(text)) => Some(text),
            _ => None,
        },
    }
}

/// Parses the three positions, enforcing RDF term kinds per position.
fn parse_triple(subject: &str, predicate: &str, object: &str) -> Option<Triple> {
    let subject = match lexical::parse_term(subject).ok()? {
        RdfTerm::NamedNode(node) => Subject::NamedNode(node),
        RdfTerm::BlankNode(node) => Subject::BlankNode(node),
        RdfTerm::Literal(_) => return None,
    };
    let RdfTerm::NamedNode(predicate) = lexical::parse_term(predicate).ok()? else {
        return None;
    };
    let object = lexical::parse_term(object).ok()?;
    Some(Triple::new(subject, predicate, object))
}

/// Materializes a DESCRIBE: every quad in which a described resource
/// occurs as subject (and, unless subject-bounded, as object).
pub(crate) fn describe_triples(
    ctx: &Arc<ExecContext>,
    targets: &[Term],
    mut scan: BoxedScan,
    mut bindings: BindingTable,
    projection: &[String],
) -> Result<Vec<Triple>, EvaluationError> {
    // Split targets into constants and variables to read per row.
    let mut resources: Vec<String> = Vec::new();
    let mut variables: Vec<String> = Vec::new();
    for target in targets {
        match lexical::resolve_term(target, &ctx.source, &ctx.prefixes, ctx.base.as_ref())? {
            ConstOrVar::Const(text) => resources.push(text),
            ConstOrVar::Var(name) => variables.push(name),
        }
    }
    if targets.is_empty() {
        variables.extend(projection.iter().cloned());
    }

    while scan.move_next(&mut bindings)? {
        ctx.check_cancelled()?;
        for name in &variables {
            if let Some(index) = bindings.find(name) {
                resources.push(bindings.value(index).to_owned());
            }
        }
    }

    let mut distinct: FxHashSet<String> = FxHashSet::default();
    let mut triples = Vec::new();
    let mut seen: FxHashSet<(Subject, NamedNode, RdfTerm)> = FxHashSet::default();
    for resource in resources {
        if !distinct.insert(resource.clone()) {
            continue;
        }
        ctx.check_cancelled()?;
        let Ok(term) = lexical::parse_term(&resource) else {
            continue;
        };
        if matches!(term, RdfTerm::Literal(_)) {
            continue;
        }
        let include_object = !ctx.config.describe_subject_only;
        for quad in resource_occurrences(ctx, &term, include_object) {
            let triple = Triple::new(quad.subject, quad.predicate, quad.object);
            let key = (
                triple.subject.clone(),
                triple.predicate.clone(),
                triple.object.clone(),
            );
            if seen.insert(key) {
                triples.push(triple);
            }
        }
    }
    Ok(triples)
}
