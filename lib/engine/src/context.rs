use crate::config::EngineConfig;
use crate::error::EvaluationError;
use crate::lexical;
use crate::plan_cache::PlanCache;
use oxiri::Iri;
use oxrdf::{GraphName, NamedOrBlankNode};
use quadflow_common::{
    BufferPool, CancellationToken, QuadSnapshot, QuadStore, ServiceExecutor,
};
use quadflow_model::{DatasetSpec, PrefixTable, TemporalRange};
use std::sync::Arc;

/// The FROM / FROM NAMED selection in force for one execution, with IRIs
/// already resolved.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolvedDataset {
    /// `None` selects the store's real default graph; otherwise the
    /// default graph is the union of these graphs.
    pub(crate) default_graphs: Option<Vec<GraphName>>,
    /// `None` lets GRAPH variables range over every named graph.
    pub(crate) named_graphs: Option<Vec<NamedOrBlankNode>>,
}

/// Everything a scan needs to run, shared across one execution.
///
/// The context owns the store snapshot, so holding a result iterator (which
/// holds the context) keeps the read view alive until disposal.
pub(crate) struct ExecContext {
    pub(crate) snapshot: Arc<dyn QuadSnapshot>,
    /// The store itself, consulted for statistics only.
    pub(crate) store: Arc<dyn QuadStore>,
    pub(crate) source: Arc<str>,
    pub(crate) prefixes: PrefixTable,
    pub(crate) base: Option<Iri<String>>,
    pub(crate) dataset: ResolvedDataset,
    pub(crate) temporal: Option<TemporalRange>,
    pub(crate) cancellation: CancellationToken,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) service: Option<Arc<dyn ServiceExecutor>>,
    pub(crate) plan_cache: Arc<PlanCache>,
    pub(crate) pool: Arc<BufferPool>,
}

impl ExecContext {
    pub(crate) fn check_cancelled(&self) -> Result<(), EvaluationError> {
        if self.cancellation.is_cancelled() {
            Err(EvaluationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves a FROM / FROM NAMED spec against this context's prefixes.
    pub(crate) fn resolve_dataset(
        &self,
        spec: &DatasetSpec,
    ) -> Result<ResolvedDataset, EvaluationError> {
        resolve_dataset(spec, &self.source, &self.prefixes, self.base.as_ref())
    }
}

pub(crate) fn resolve_dataset(
    spec: &DatasetSpec,
    source: &str,
    prefixes: &PrefixTable,
    base: Option<&Iri<String>>,
) -> Result<ResolvedDataset, EvaluationError> {
    let mut resolved = ResolvedDataset::default();
    if !spec.default_graphs.is_empty() {
        let mut graphs = Vec::with_capacity(spec.default_graphs.len());
        for term in &spec.default_graphs {
            let text = lexical::resolve_constant(term, source, prefixes, base)?;
            graphs.push(lexical::parse_graph_name(&text)?);
        }
        resolved.default_graphs = Some(graphs);
    }
    if !spec.named_graphs.is_empty() {
        let mut graphs = Vec::with_capacity(spec.named_graphs.len());
        for term in &spec.named_graphs {
            let text = lexical::resolve_constant(term, source, prefixes, base)?;
            match lexical::parse_graph_name(&text)? {
                GraphName::NamedNode(node) => graphs.push(NamedOrBlankNode::NamedNode(node)),
                GraphName::BlankNode(node) => graphs.push(NamedOrBlankNode::BlankNode(node)),
                GraphName::DefaultGraph => {
                    return Err(EvaluationError::InvalidQuery(
                        "the default graph cannot appear in FROM NAMED".into(),
                    ))
                }
            }
        }
        resolved.named_graphs = Some(graphs);
    }
    Ok(resolved)
}

/// The graph scope a pattern scan runs in.
#[derive(Debug, Clone)]
pub(crate) enum ScanGraph {
    /// The dataset default graph: the real default graph, or the FROM
    /// union when one is configured.
    DefaultDataset,
    /// One fixed graph, from a GRAPH clause or a WITH/USING context.
    Fixed(GraphName),
}
