use crate::pattern::{GroupPattern, QuadPattern};
use crate::prefix::PrefixTable;
use crate::source::{SourceBuf, Span};
use crate::term::Term;

/// The shape of a query, which decides the result type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QueryForm {
    Select,
    Ask,
    Construct,
    Describe,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

/// One `ORDER BY` key.
#[derive(Clone, Copy, Debug)]
pub struct OrderKey {
    pub expr: Span,
    pub direction: OrderDirection,
}

impl OrderKey {
    pub fn ascending(expr: Span) -> Self {
        Self {
            expr,
            direction: OrderDirection::Ascending,
        }
    }

    pub fn descending(expr: Span) -> Self {
        Self {
            expr,
            direction: OrderDirection::Descending,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    GroupConcat { separator: Option<String> },
    Sample,
}

/// One aggregate of the projection, e.g. `(COUNT(DISTINCT ?x) AS ?n)`.
#[derive(Clone, Debug)]
pub struct AggregateSpec {
    pub function: AggregateFunction,
    /// The argument expression; `None` is `COUNT(*)`.
    pub argument: Option<Span>,
    pub distinct: bool,
    /// The variable the aggregate is bound to.
    pub alias: Term,
}

/// Everything applied on top of the WHERE results.
#[derive(Clone, Debug, Default)]
pub struct SolutionModifiers {
    pub distinct: bool,
    pub reduced: bool,
    pub order_by: Vec<OrderKey>,
    pub group_by: Vec<Term>,
    pub aggregates: Vec<AggregateSpec>,
    pub having: Vec<Span>,
    pub offset: u64,
    pub limit: Option<u64>,
}

/// FROM / FROM NAMED (or USING / USING NAMED for updates).
#[derive(Clone, Debug, Default)]
pub struct DatasetSpec {
    pub default_graphs: Vec<Term>,
    pub named_graphs: Vec<Term>,
}

impl DatasetSpec {
    pub fn is_empty(&self) -> bool {
        self.default_graphs.is_empty() && self.named_graphs.is_empty()
    }
}

/// A temporal constraint forwarded to the store with every pattern scan.
/// Timestamps are seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporalRange {
    pub as_of: Option<i64>,
    pub during: Option<(i64, i64)>,
}

/// A parsed query, ready for execution.
#[derive(Clone, Debug)]
pub struct QueryIr {
    pub form: QueryForm,
    /// Projected variables; empty projects every in-scope variable.
    pub projection: Vec<Term>,
    pub pattern: GroupPattern,
    pub modifiers: SolutionModifiers,
    pub dataset: DatasetSpec,
    /// CONSTRUCT template; unused for other forms.
    pub template: Vec<QuadPattern>,
    /// DESCRIBE targets (variables or IRIs); empty describes every
    /// projected variable.
    pub describe: Vec<Term>,
    pub prefixes: PrefixTable,
    pub base: Option<String>,
    pub temporal: Option<TemporalRange>,
}

impl QueryIr {
    fn with_form(form: QueryForm) -> Self {
        Self {
            form,
            projection: Vec::new(),
            pattern: GroupPattern::default(),
            modifiers: SolutionModifiers::default(),
            dataset: DatasetSpec::default(),
            template: Vec::new(),
            describe: Vec::new(),
            prefixes: PrefixTable::new(),
            base: None,
            temporal: None,
        }
    }

    pub fn select(projection: Vec<Term>, pattern: GroupPattern) -> Self {
        Self {
            projection,
            pattern,
            ..Self::with_form(QueryForm::Select)
        }
    }

    pub fn ask(pattern: GroupPattern) -> Self {
        Self {
            pattern,
            ..Self::with_form(QueryForm::Ask)
        }
    }

    pub fn construct(template: Vec<QuadPattern>, pattern: GroupPattern) -> Self {
        Self {
            template,
            pattern,
            ..Self::with_form(QueryForm::Construct)
        }
    }

    pub fn describe(targets: Vec<Term>, pattern: GroupPattern) -> Self {
        Self {
            describe: targets,
            pattern,
            ..Self::with_form(QueryForm::Describe)
        }
    }
}

/// A query IR together with the buffer its spans point into.
#[derive(Clone, Debug)]
pub struct ParsedQuery {
    pub source: SourceBuf,
    pub query: QueryIr,
}

impl ParsedQuery {
    pub fn new(source: SourceBuf, query: QueryIr) -> Self {
        Self { source, query }
    }
}
