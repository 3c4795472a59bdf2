use crate::query::QueryIr;
use crate::source::Span;
use crate::term::Term;

/// A triple pattern: three terms, any of which may be a variable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    pub fn terms(&self) -> [Term; 3] {
        [self.subject, self.predicate, self.object]
    }
}

/// A triple pattern with an optional explicit graph term, as it appears in
/// update data blocks and templates.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct QuadPattern {
    pub triple: TriplePattern,
    /// `None` targets whatever default graph is in effect (WITH, or the
    /// real default graph).
    pub graph: Option<Term>,
}

impl QuadPattern {
    pub fn new(triple: TriplePattern, graph: Option<Term>) -> Self {
        Self { triple, graph }
    }
}

/// `GRAPH <g> { ... }` / `GRAPH ?g { ... }`.
#[derive(Clone, Debug)]
pub struct GraphClause {
    pub graph: Term,
    pub patterns: GroupPattern,
}

/// `SERVICE [SILENT] <endpoint> { ... }`.
#[derive(Clone, Debug)]
pub struct ServiceClause {
    pub endpoint: Term,
    pub silent: bool,
    pub patterns: GroupPattern,
    /// The raw text of the service body, forwarded verbatim to the remote
    /// endpoint.
    pub body: Span,
}

/// `FILTER(expr)`. `depth` is the group-nesting depth the filter appears
/// at; it gates which BIND-introduced variables the filter may observe.
#[derive(Clone, Copy, Debug)]
pub struct FilterClause {
    pub expr: Span,
    pub depth: u16,
}

impl FilterClause {
    pub fn new(expr: Span) -> Self {
        Self { expr, depth: 1 }
    }
}

/// `BIND(expr AS ?var)`.
#[derive(Clone, Copy, Debug)]
pub struct BindClause {
    pub variable: Term,
    pub expr: Span,
    pub depth: u16,
}

impl BindClause {
    pub fn new(variable: Term, expr: Span) -> Self {
        Self {
            variable,
            expr,
            depth: 1,
        }
    }
}

/// Inline `VALUES` data. A `None` cell is the UNDEF keyword.
#[derive(Clone, Debug)]
pub struct ValuesClause {
    pub variables: Vec<Term>,
    pub rows: Vec<Vec<Option<Term>>>,
}

/// A group graph pattern: the body of a WHERE clause or of any nested
/// group.
///
/// The engine evaluates the members in a fixed order: required patterns
/// (possibly reordered by the planner), graph clauses, subqueries, service
/// clauses, optionals, the union pair, the minus block, inline values,
/// binds, then the filters that could not be pushed into the join.
#[derive(Clone, Debug, Default)]
pub struct GroupPattern {
    pub patterns: Vec<TriplePattern>,
    pub optionals: Vec<GroupPattern>,
    pub graphs: Vec<GraphClause>,
    pub services: Vec<ServiceClause>,
    pub subqueries: Vec<QueryIr>,
    pub filters: Vec<FilterClause>,
    pub binds: Vec<BindClause>,
    pub union: Option<Box<(GroupPattern, GroupPattern)>>,
    pub minus: Option<Box<GroupPattern>>,
    pub values: Option<ValuesClause>,
}

impl GroupPattern {
    pub fn with_patterns(patterns: Vec<TriplePattern>) -> Self {
        Self {
            patterns,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
            && self.optionals.is_empty()
            && self.graphs.is_empty()
            && self.services.is_empty()
            && self.subqueries.is_empty()
            && self.filters.is_empty()
            && self.binds.is_empty()
            && self.union.is_none()
            && self.minus.is_none()
            && self.values.is_none()
    }

    /// Visits every variable this group can bind, in no particular order.
    /// Blank nodes are included since they bind like variables.
    pub fn visit_binding_terms(&self, visit: &mut impl FnMut(Term)) {
        for pattern in &self.patterns {
            for term in pattern.terms() {
                if term.binds_like_variable() {
                    visit(term);
                }
            }
        }
        for optional in &self.optionals {
            optional.visit_binding_terms(visit);
        }
        for graph in &self.graphs {
            if graph.graph.binds_like_variable() {
                visit(graph.graph);
            }
            graph.patterns.visit_binding_terms(visit);
        }
        for service in &self.services {
            service.patterns.visit_binding_terms(visit);
        }
        for subquery in &self.subqueries {
            for term in &subquery.projection {
                visit(*term);
            }
        }
        for bind in &self.binds {
            visit(bind.variable);
        }
        if let Some(union) = &self.union {
            union.0.visit_binding_terms(visit);
            union.1.visit_binding_terms(visit);
        }
        if let Some(values) = &self.values {
            for variable in &values.variables {
                visit(*variable);
            }
        }
        // The minus block never exports bindings.
    }
}
