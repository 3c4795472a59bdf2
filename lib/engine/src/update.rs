//! The update applier: evaluates WHERE clauses, instantiates templates and
//! drives batched store mutation.

use crate::binding::MaterializedRow;
use crate::config::EngineConfig;
use crate::context::{self, ExecContext, ScanGraph};
use crate::error::{EvaluationError, UpdateOutcome};
use crate::exec::{parse_base, row_to_bindings};
use crate::lexical::{self, ConstOrVar};
use crate::load::{LoadClient, ReqwestFetcher};
use crate::plan_cache::PlanCache;
use crate::scan::materialize_group;
use oxrdf::{GraphName, Quad, Subject, Term as RdfTerm};
use quadflow_common::{
    BufferPool, CancellationToken, HttpFetcher, QuadBatch, QuadStore, ServiceExecutor,
};
use quadflow_model::{
    DatasetSpec, GraphClause, GraphOrDefault, GraphTarget, GroupPattern, ParsedUpdate,
    QuadPattern, SyntheticTerm, Term, TermKind, UpdateOperation,
};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Width of the blank-node id range reserved per update operation, so
/// labels from different operations can never collide.
const BLANK_RANGE_WIDTH: u64 = 10_000_000;

static BLANK_RANGE: AtomicU64 = AtomicU64::new(1);

/// Blank-node identity scoping: one scope per update operation, same
/// label ⇒ same node within it. `keyed` distinguishes per-row template
/// instantiation.
struct BnodeScope {
    base: u64,
    next: u64,
    labels: FxHashMap<String, u64>,
}

impl BnodeScope {
    fn new() -> Self {
        let range = BLANK_RANGE.fetch_add(1, Ordering::Relaxed);
        Self {
            base: range.wrapping_mul(BLANK_RANGE_WIDTH),
            next: 0,
            labels: FxHashMap::default(),
        }
    }

    fn label(&mut self, key: &str) -> String {
        let id = match self.labels.get(key) {
            Some(id) => *id,
            None => {
                let id = self.base + self.next;
                self.next += 1;
                self.labels.insert(key.to_owned(), id);
                id
            }
        };
        format!("_:b{id}")
    }
}

/// Applies parsed updates to a quad store. Each operation runs in its own
/// exclusive batch, committed on success and rolled back on failure;
/// SILENT converts a failure into zero affected quads.
pub struct UpdateApplier {
    store: Arc<dyn QuadStore>,
    config: Arc<EngineConfig>,
    service: Option<Arc<dyn ServiceExecutor>>,
    fetcher: Arc<dyn HttpFetcher>,
    plan_cache: Arc<PlanCache>,
    pool: Arc<BufferPool>,
}

impl UpdateApplier {
    pub fn new(store: Arc<dyn QuadStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn QuadStore>, config: EngineConfig) -> Self {
        let plan_cache = Arc::new(PlanCache::new(config.plan_cache_capacity));
        let timeout = config.load_limits.timeout;
        Self {
            store,
            config: Arc::new(config),
            service: None,
            fetcher: Arc::new(ReqwestFetcher::new(timeout)),
            plan_cache,
            pool: Arc::new(BufferPool::new()),
        }
    }

    /// Replaces the HTTP fetcher used by LOAD (tests stub it).
    pub fn set_http_fetcher(&mut self, fetcher: Arc<dyn HttpFetcher>) {
        self.fetcher = fetcher;
    }

    /// Injects the executor used by SERVICE clauses inside update WHERE
    /// patterns.
    pub fn set_service_executor(&mut self, service: Arc<dyn ServiceExecutor>) {
        self.service = Some(service);
    }

    pub fn apply(&self, parsed: &ParsedUpdate) -> Result<UpdateOutcome, EvaluationError> {
        self.apply_with_cancellation(parsed, CancellationToken::new())
    }

    pub fn apply_with_cancellation(
        &self,
        parsed: &ParsedUpdate,
        cancellation: CancellationToken,
    ) -> Result<UpdateOutcome, EvaluationError> {
        let mut affected = 0;
        for operation in &parsed.update.operations {
            if cancellation.is_cancelled() {
                return Err(EvaluationError::Cancelled);
            }
            let silent = operation_silent(operation);
            match self.apply_operation(parsed, operation, cancellation.clone()) {
                Ok(count) => affected += count,
                Err(error) if silent => {
                    tracing::debug!("silent update failure: {error}");
                }
                Err(error) => return Err(error),
            }
        }
        tracing::debug!(affected, "update applied");
        Ok(UpdateOutcome { affected })
    }

    fn apply_operation(
        &self,
        parsed: &ParsedUpdate,
        operation: &UpdateOperation,
        cancellation: CancellationToken,
    ) -> Result<usize, EvaluationError> {
        let ctx = self.make_context(parsed, operation, cancellation)?;
        let mut batch = self.store.begin_batch()?;
        let result = self.run_operation(&ctx, operation, batch.as_mut());
        match result {
            Ok(affected) => {
                batch.commit()?;
                Ok(affected)
            }
            Err(error) => {
                batch.rollback();
                Err(error)
            }
        }
    }

    fn run_operation(
        &self,
        ctx: &Arc<ExecContext>,
        operation: &UpdateOperation,
        batch: &mut dyn QuadBatch,
    ) -> Result<usize, EvaluationError> {
        match operation {
            UpdateOperation::InsertData { data } => {
                let mut scope = BnodeScope::new();
                for quad in data {
                    let quad = self.ground_quad(ctx, quad, &mut scope, None)?;
                    batch.insert(quad.as_ref());
                }
                // Affected is the statement's quad count, duplicates
                // included.
                Ok(data.len())
            }
            UpdateOperation::DeleteData { data } => {
                let mut scope = BnodeScope::new();
                let mut affected = 0;
                for quad in data {
                    let quad = self.ground_quad(ctx, quad, &mut scope, None)?;
                    if batch.remove(quad.as_ref()) {
                        affected += 1;
                    }
                }
                Ok(affected)
            }
            UpdateOperation::DeleteWhere { patterns } => {
                let group = quad_patterns_as_group(patterns);
                let rows = materialize_group(ctx, &group, &ScanGraph::DefaultDataset)?;
                let mut affected = 0;
                for row in &rows {
                    ctx.check_cancelled()?;
                    for quad in self.instantiate(ctx, patterns, row, None, None)? {
                        if batch.remove(quad.as_ref()) {
                            affected += 1;
                        }
                    }
                }
                Ok(affected)
            }
            UpdateOperation::Modify {
                with,
                delete,
                insert,
                pattern,
                ..
            } => {
                let with_graph = self.resolve_with(ctx, with.as_ref())?;
                let rows = materialize_group(ctx, pattern, &ScanGraph::DefaultDataset)?;

                let mut deletes = Vec::new();
                let mut inserts = Vec::new();
                let mut scope = BnodeScope::new();
                for (row_index, row) in rows.iter().enumerate() {
                    ctx.check_cancelled()?;
                    deletes.extend(self.instantiate(
                        ctx,
                        delete,
                        row,
                        with_graph.as_ref(),
                        None,
                    )?);
                    // Template blank nodes are fresh per solution row.
                    inserts.extend(self.instantiate(
                        ctx,
                        insert,
                        row,
                        with_graph.as_ref(),
                        Some((&mut scope, row_index)),
                    )?);
                }

                // All deletes land before any insert.
                let mut affected = 0;
                for quad in &deletes {
                    if batch.remove(quad.as_ref()) {
                        affected += 1;
                    }
                }
                for quad in &inserts {
                    if batch.insert(quad.as_ref()) {
                        affected += 1;
                    }
                }
                Ok(affected)
            }
            UpdateOperation::Clear { target, .. } | UpdateOperation::Drop { target, .. } => {
                // CLEAR and DROP coincide: graphs exist implicitly while
                // non-empty.
                match target {
                    GraphTarget::DefaultGraph => {
                        Ok(batch.clear_graph(oxrdf::GraphNameRef::DefaultGraph))
                    }
                    GraphTarget::NamedGraphs => Ok(batch.clear_named_graphs()),
                    GraphTarget::AllGraphs => Ok(batch.clear_all()),
                    GraphTarget::Graph(term) => {
                        let graph = self.resolve_graph_term(ctx, term)?;
                        Ok(batch.clear_graph(graph.as_ref()))
                    }
                }
            }
            UpdateOperation::Create { .. } => Ok(0),
            UpdateOperation::Copy {
                source,
                destination,
                ..
            } => self.copy_like(ctx, batch, source, destination, CopyKind::Copy),
            UpdateOperation::Move {
                source,
                destination,
                ..
            } => self.copy_like(ctx, batch, source, destination, CopyKind::Move),
            UpdateOperation::Add {
                source,
                destination,
                ..
            } => self.copy_like(ctx, batch, source, destination, CopyKind::Add),
            UpdateOperation::Load {
                source,
                destination,
                ..
            } => {
                let iri = self.resolve_iri_term(ctx, source)?;
                let graph = match destination {
                    Some(term) => self.resolve_graph_term(ctx, term)?,
                    None => GraphName::DefaultGraph,
                };
                let client = LoadClient::new(self.fetcher.as_ref(), &ctx.config.load_limits);
                client.load_into(batch, &iri, graph.as_ref())
            }
        }
    }

    fn copy_like(
        &self,
        ctx: &Arc<ExecContext>,
        batch: &mut dyn QuadBatch,
        source: &GraphOrDefault,
        destination: &GraphOrDefault,
        kind: CopyKind,
    ) -> Result<usize, EvaluationError> {
        let source = self.resolve_graph_or_default(ctx, source)?;
        let destination = self.resolve_graph_or_default(ctx, destination)?;
        if source == destination {
            return Ok(0);
        }

        let quads = batch.graph_quads(source.as_ref());
        let mut affected = 0;
        if kind != CopyKind::Add {
            affected += batch.clear_graph(destination.as_ref());
        }
        for quad in quads {
            let moved = Quad::new(
                quad.subject,
                quad.predicate,
                quad.object,
                destination.clone(),
            );
            if batch.insert(moved.as_ref()) {
                affected += 1;
            }
        }
        if kind == CopyKind::Move {
            affected += batch.clear_graph(source.as_ref());
        }
        Ok(affected)
    }

    /// Grounds a data-block quad: variables are rejected, blank nodes get
    /// scoped identities.
    fn ground_quad(
        &self,
        ctx: &Arc<ExecContext>,
        quad: &QuadPattern,
        scope: &mut BnodeScope,
        with_graph: Option<&GraphName>,
    ) -> Result<Quad, EvaluationError> {
        let mut positions = Vec::with_capacity(3);
        for term in quad.triple.terms() {
            let text = match term.kind {
                TermKind::BlankNode => scope.label(term.text(&ctx.source)),
                TermKind::Synthetic(SyntheticTerm::ListNode(slot)) => {
                    scope.label(&format!("__list{slot}"))
                }
                _ => lexical::resolve_constant(
                    &term,
                    &ctx.source,
                    &ctx.prefixes,
                    ctx.base.as_ref(),
                )?,
            };
            positions.push(text);
        }
        let graph = match &quad.graph {
            Some(term) => self.resolve_graph_term(ctx, term)?,
            None => with_graph.cloned().unwrap_or(GraphName::DefaultGraph),
        };
        build_quad(&positions[0], &positions[1], &positions[2], graph)
    }

    /// Instantiates a template against one solution row. Quads with an
    /// unbound position are skipped.
    fn instantiate(
        &self,
        ctx: &Arc<ExecContext>,
        template: &[QuadPattern],
        row: &MaterializedRow,
        with_graph: Option<&GraphName>,
        mut bnodes: Option<(&mut BnodeScope, usize)>,
    ) -> Result<Vec<Quad>, EvaluationError> {
        let bindings = row_to_bindings(ctx, row);
        let mut quads = Vec::new();
        'template: for quad in template {
            let mut positions = Vec::with_capacity(3);
            for term in quad.triple.terms() {
                let text = match self.template_position(ctx, &term, row, &mut bnodes)? {
                    Some(text) => text,
                    None => continue 'template,
                };
                positions.push(text);
            }
            let graph = match &quad.graph {
                Some(term) => {
                    if term.binds_like_variable() {
                        let name = term.text(&ctx.source);
                        match bindings
                            .find(name)
                            .and_then(|index| {
                                lexical::parse_graph_name(bindings.value(index)).ok()
                            }) {
                            Some(graph) => graph,
                            None => continue 'template,
                        }
                    } else {
                        self.resolve_graph_term(ctx, term)?
                    }
                }
                None => with_graph.cloned().unwrap_or(GraphName::DefaultGraph),
            };
            if let Ok(quad) = build_quad(&positions[0], &positions[1], &positions[2], graph) {
                quads.push(quad);
            }
        }
        Ok(quads)
    }

    fn template_position(
        &self,
        ctx: &Arc<ExecContext>,
        term: &Term,
        row: &MaterializedRow,
        bnodes: &mut Option<(&mut BnodeScope, usize)>,
    ) -> Result<Option<String>, EvaluationError> {
        match term.kind {
            TermKind::Variable => Ok(row.get(term.text(&ctx.source)).map(str::to_owned)),
            TermKind::BlankNode => match bnodes {
                Some((scope, row_index)) => {
                    let label = format!("{row_index}|{}", term.text(&ctx.source));
                    Ok(Some(scope.label(&label)))
                }
                // Blank nodes are not allowed in delete templates.
                None => Ok(None),
            },
            TermKind::Synthetic(SyntheticTerm::ListNode(slot)) => match bnodes {
                Some((scope, row_index)) => Ok(Some(scope.label(&format!(
                    "{row_index}|__list{slot}"
                )))),
                None => Ok(None),
            },
            _ => {
                match lexical::resolve_term(term, &ctx.source, &ctx.prefixes, ctx.base.as_ref())?
                {
                    ConstOrVar::Const(text) => Ok(Some(text)),
                    ConstOrVar::Var(name) => Ok(row.get(&name).map(str::to_owned)),
                }
            }
        }
    }

    fn resolve_with(
        &self,
        ctx: &Arc<ExecContext>,
        with: Option<&Term>,
    ) -> Result<Option<GraphName>, EvaluationError> {
        with.map(|term| self.resolve_graph_term(ctx, term)).transpose()
    }

    fn resolve_graph_term(
        &self,
        ctx: &Arc<ExecContext>,
        term: &Term,
    ) -> Result<GraphName, EvaluationError> {
        let text =
            lexical::resolve_constant(term, &ctx.source, &ctx.prefixes, ctx.base.as_ref())?;
        lexical::parse_graph_name(&text)
    }

    fn resolve_iri_term(
        &self,
        ctx: &Arc<ExecContext>,
        term: &Term,
    ) -> Result<String, EvaluationError> {
        let text =
            lexical::resolve_constant(term, &ctx.source, &ctx.prefixes, ctx.base.as_ref())?;
        match lexical::parse_term(&text)? {
            RdfTerm::NamedNode(node) => Ok(node.into_string()),
            _ => Err(EvaluationError::InvalidQuery(format!(
                "{text} is not an IRI"
            ))),
        }
    }

    fn resolve_graph_or_default(
        &self,
        ctx: &Arc<ExecContext>,
        graph: &GraphOrDefault,
    ) -> Result<GraphName, EvaluationError> {
        match graph {
            GraphOrDefault::DefaultGraph => Ok(GraphName::DefaultGraph),
            GraphOrDefault::Graph(term) => self.resolve_graph_term(ctx, term),
        }
    }

    /// Builds the execution context for one operation. A modify's WHERE
    /// reads through USING / USING NAMED when given, else through WITH.
    fn make_context(
        &self,
        parsed: &ParsedUpdate,
        operation: &UpdateOperation,
        cancellation: CancellationToken,
    ) -> Result<Arc<ExecContext>, EvaluationError> {
        let update = &parsed.update;
        let base = parse_base(update.base.as_deref())?;
        let source = parsed.source.as_str();

        let mut dataset = context::resolve_dataset(
            &DatasetSpec::default(),
            source,
            &update.prefixes,
            base.as_ref(),
        )?;
        if let UpdateOperation::Modify { using, with, .. } = operation {
            if !using.is_empty() {
                dataset =
                    context::resolve_dataset(using, source, &update.prefixes, base.as_ref())?;
            } else if let Some(with) = with {
                let text = lexical::resolve_constant(
                    with,
                    source,
                    &update.prefixes,
                    base.as_ref(),
                )?;
                dataset.default_graphs = Some(vec![lexical::parse_graph_name(&text)?]);
            }
        }

        Ok(Arc::new(ExecContext {
            snapshot: self.store.snapshot(),
            store: Arc::clone(&self.store),
            source: Arc::from(source),
            prefixes: update.prefixes.clone(),
            base,
            dataset,
            temporal: None,
            cancellation,
            config: Arc::clone(&self.config),
            service: self.service.clone(),
            plan_cache: Arc::clone(&self.plan_cache),
            pool: Arc::clone(&self.pool),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CopyKind {
    Copy,
    Move,
    Add,
}

fn operation_silent(operation: &UpdateOperation) -> bool {
    match operation {
        UpdateOperation::Clear { silent, .. }
        | UpdateOperation::Drop { silent, .. }
        | UpdateOperation::Create { silent, .. }
        | UpdateOperation::Copy { silent, .. }
        | UpdateOperation::Move { silent, .. }
        | UpdateOperation::Add { silent, .. }
        | UpdateOperation::Load { silent, .. } => *silent,
        _ => false,
    }
}

/// DELETE WHERE: the quad patterns double as the WHERE group, graph
/// clauses included.
fn quad_patterns_as_group(patterns: &[QuadPattern]) -> GroupPattern {
    let mut group = GroupPattern::default();
    for quad in patterns {
        match &quad.graph {
            None => group.patterns.push(quad.triple),
            Some(graph) => group.graphs.push(GraphClause {
                graph: *graph,
                patterns: GroupPattern::with_patterns(vec![quad.triple]),
            }),
        }
    }
    group
}

fn build_quad(
    subject: &str,
    predicate: &str,
    object: &str,
    graph: GraphName,
) -> Result<Quad, EvaluationError> {
    let subject = match lexical::parse_term(subject)? {
        RdfTerm::NamedNode(node) => Subject::NamedNode(node),
        RdfTerm::BlankNode(node) => Subject::BlankNode(node),
        RdfTerm::Literal(_) => {
            return Err(EvaluationError::InvalidQuery(
                "a literal cannot be a subject".into(),
            ))
        }
    };
    let RdfTerm::NamedNode(predicate) = lexical::parse_term(predicate)? else {
        return Err(EvaluationError::InvalidQuery(
            "a predicate must be an IRI".into(),
        ));
    };
    let object = lexical::parse_term(object)?;
    Ok(Quad::new(subject, predicate, object, graph))
}
