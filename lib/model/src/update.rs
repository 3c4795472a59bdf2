use crate::pattern::{GroupPattern, QuadPattern};
use crate::prefix::PrefixTable;
use crate::query::DatasetSpec;
use crate::source::SourceBuf;
use crate::term::Term;

/// The graphs a CLEAR or DROP applies to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GraphTarget {
    /// Quads in the default graph.
    DefaultGraph,
    /// Every named graph.
    NamedGraphs,
    /// Default and named graphs alike.
    AllGraphs,
    /// One specific graph.
    Graph(Term),
}

/// Source or destination of COPY / MOVE / ADD.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GraphOrDefault {
    DefaultGraph,
    Graph(Term),
}

/// One update operation of an update request.
#[derive(Clone, Debug)]
pub enum UpdateOperation {
    InsertData {
        data: Vec<QuadPattern>,
    },
    DeleteData {
        data: Vec<QuadPattern>,
    },
    /// `DELETE WHERE { ... }`: the patterns double as the delete template.
    DeleteWhere {
        patterns: Vec<QuadPattern>,
    },
    /// `[WITH <g>] DELETE { ... } INSERT { ... } [USING ...] WHERE { ... }`.
    Modify {
        with: Option<Term>,
        delete: Vec<QuadPattern>,
        insert: Vec<QuadPattern>,
        using: DatasetSpec,
        pattern: GroupPattern,
    },
    Clear {
        target: GraphTarget,
        silent: bool,
    },
    Drop {
        target: GraphTarget,
        silent: bool,
    },
    Create {
        graph: Term,
        silent: bool,
    },
    Copy {
        source: GraphOrDefault,
        destination: GraphOrDefault,
        silent: bool,
    },
    Move {
        source: GraphOrDefault,
        destination: GraphOrDefault,
        silent: bool,
    },
    Add {
        source: GraphOrDefault,
        destination: GraphOrDefault,
        silent: bool,
    },
    Load {
        source: Term,
        destination: Option<Term>,
        silent: bool,
    },
}

/// A parsed update request: a sequence of operations sharing one prefix
/// table and source buffer.
#[derive(Clone, Debug, Default)]
pub struct UpdateIr {
    pub operations: Vec<UpdateOperation>,
    pub prefixes: PrefixTable,
    pub base: Option<String>,
}

impl UpdateIr {
    pub fn single(operation: UpdateOperation) -> Self {
        Self {
            operations: vec![operation],
            ..Self::default()
        }
    }
}

/// An update IR together with the buffer its spans point into.
#[derive(Clone, Debug)]
pub struct ParsedUpdate {
    pub source: SourceBuf,
    pub update: UpdateIr,
}

impl ParsedUpdate {
    pub fn new(source: SourceBuf, update: UpdateIr) -> Self {
        Self { source, update }
    }
}
