use oxrdf::{
    GraphName, GraphNameRef, NamedNode, NamedOrBlankNode, Quad, QuadRef, Subject, SubjectRef,
    Term, TermRef,
};
use rustc_hash::{FxHashMap, FxHashSet};

type SpoIndex = FxHashMap<Subject, FxHashMap<NamedNode, FxHashSet<Term>>>;
type PosIndex = FxHashMap<NamedNode, FxHashMap<Term, FxHashSet<Subject>>>;
type OspIndex = FxHashMap<Term, FxHashMap<Subject, FxHashSet<NamedNode>>>;

/// The triples of one graph, indexed in the three access permutations a
/// pattern scan can need: subject-first, predicate-first and object-first.
#[derive(Clone, Debug, Default)]
pub(crate) struct GraphIndex {
    spo: SpoIndex,
    pos: PosIndex,
    osp: OspIndex,
    len: usize,
}

impl GraphIndex {
    pub(crate) fn insert(&mut self, subject: Subject, predicate: NamedNode, object: Term) -> bool {
        let inserted = self
            .spo
            .entry(subject.clone())
            .or_default()
            .entry(predicate.clone())
            .or_default()
            .insert(object.clone());
        if !inserted {
            return false;
        }
        self.pos
            .entry(predicate.clone())
            .or_default()
            .entry(object.clone())
            .or_default()
            .insert(subject.clone());
        self.osp
            .entry(object)
            .or_default()
            .entry(subject)
            .or_default()
            .insert(predicate);
        self.len += 1;
        true
    }

    pub(crate) fn remove(
        &mut self,
        subject: SubjectRef<'_>,
        predicate: oxrdf::NamedNodeRef<'_>,
        object: TermRef<'_>,
    ) -> bool {
        let subject = subject.into_owned();
        let predicate = predicate.into_owned();
        let object = object.into_owned();

        let removed = remove_two_level(&mut self.spo, &subject, &predicate, &object);
        if !removed {
            return false;
        }
        remove_two_level(&mut self.pos, &predicate, &object, &subject);
        remove_two_level(&mut self.osp, &object, &subject, &predicate);
        self.len -= 1;
        true
    }

    pub(crate) fn contains(
        &self,
        subject: SubjectRef<'_>,
        predicate: oxrdf::NamedNodeRef<'_>,
        object: TermRef<'_>,
    ) -> bool {
        self.spo
            .get(&subject.into_owned())
            .and_then(|by_predicate| by_predicate.get(&predicate.into_owned()))
            .is_some_and(|objects| objects.contains(&object.into_owned()))
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Per-predicate triple counts, used to maintain store statistics when a
    /// whole graph is dropped.
    pub(crate) fn predicate_counts(&self) -> impl Iterator<Item = (&NamedNode, u64)> {
        self.pos.iter().map(|(predicate, by_object)| {
            let count = by_object.values().map(|subjects| subjects.len() as u64).sum();
            (predicate, count)
        })
    }

    /// Collects the triples matching the pattern, picking the index
    /// permutation from the bound positions.
    pub(crate) fn triples_matching(
        &self,
        subject: Option<SubjectRef<'_>>,
        predicate: Option<oxrdf::NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
        out: &mut Vec<(Subject, NamedNode, Term)>,
    ) {
        match (subject, predicate, object) {
            (Some(s), p, o) => {
                let Some(by_predicate) = self.spo.get(&s.into_owned()) else {
                    return;
                };
                let subject = s.into_owned();
                match p {
                    Some(p) => {
                        let Some(objects) = by_predicate.get(&p.into_owned()) else {
                            return;
                        };
                        collect_last_level(objects, o, |object| {
                            out.push((subject.clone(), p.into_owned(), object));
                        });
                    }
                    None => {
                        for (predicate, objects) in by_predicate {
                            collect_last_level(objects, o, |object| {
                                out.push((subject.clone(), predicate.clone(), object));
                            });
                        }
                    }
                }
            }
            (None, Some(p), o) => {
                let Some(by_object) = self.pos.get(&p.into_owned()) else {
                    return;
                };
                let predicate = p.into_owned();
                match o {
                    Some(o) => {
                        let Some(subjects) = by_object.get(&o.into_owned()) else {
                            return;
                        };
                        for subject in subjects {
                            out.push((subject.clone(), predicate.clone(), o.into_owned()));
                        }
                    }
                    None => {
                        for (object, subjects) in by_object {
                            for subject in subjects {
                                out.push((subject.clone(), predicate.clone(), object.clone()));
                            }
                        }
                    }
                }
            }
            (None, None, Some(o)) => {
                let Some(by_subject) = self.osp.get(&o.into_owned()) else {
                    return;
                };
                let object = o.into_owned();
                for (subject, predicates) in by_subject {
                    for predicate in predicates {
                        out.push((subject.clone(), predicate.clone(), object.clone()));
                    }
                }
            }
            (None, None, None) => {
                for (subject, by_predicate) in &self.spo {
                    for (predicate, objects) in by_predicate {
                        for object in objects {
                            out.push((subject.clone(), predicate.clone(), object.clone()));
                        }
                    }
                }
            }
        }
    }
}

fn collect_last_level(
    objects: &FxHashSet<Term>,
    filter: Option<TermRef<'_>>,
    mut push: impl FnMut(Term),
) {
    match filter {
        Some(o) => {
            let object = o.into_owned();
            if objects.contains(&object) {
                push(object);
            }
        }
        None => {
            for object in objects {
                push(object.clone());
            }
        }
    }
}

fn remove_two_level<A, B, C>(
    index: &mut FxHashMap<A, FxHashMap<B, FxHashSet<C>>>,
    a: &A,
    b: &B,
    c: &C,
) -> bool
where
    A: std::hash::Hash + Eq,
    B: std::hash::Hash + Eq,
    C: std::hash::Hash + Eq,
{
    let Some(inner) = index.get_mut(a) else {
        return false;
    };
    let Some(leaf) = inner.get_mut(b) else {
        return false;
    };
    let removed = leaf.remove(c);
    if removed {
        if leaf.is_empty() {
            inner.remove(b);
        }
        if inner.is_empty() {
            index.remove(a);
        }
    }
    removed
}

/// The copy-on-write root: all graphs plus the statistics the planner
/// consults.
#[derive(Clone, Debug, Default)]
pub(crate) struct DatasetIndex {
    pub(crate) default_graph: GraphIndex,
    pub(crate) named: FxHashMap<NamedOrBlankNode, GraphIndex>,
    pub(crate) predicate_counts: FxHashMap<NamedNode, u64>,
    pub(crate) stats_tx_id: u64,
}

impl DatasetIndex {
    pub(crate) fn insert_quad(&mut self, quad: QuadRef<'_>) -> bool {
        let graph = match quad.graph_name {
            GraphNameRef::DefaultGraph => &mut self.default_graph,
            GraphNameRef::NamedNode(n) => self
                .named
                .entry(NamedOrBlankNode::NamedNode(n.into_owned()))
                .or_default(),
            GraphNameRef::BlankNode(n) => self
                .named
                .entry(NamedOrBlankNode::BlankNode(n.into_owned()))
                .or_default(),
        };
        let inserted = graph.insert(
            quad.subject.into_owned(),
            quad.predicate.into_owned(),
            quad.object.into_owned(),
        );
        if inserted {
            *self
                .predicate_counts
                .entry(quad.predicate.into_owned())
                .or_insert(0) += 1;
        }
        inserted
    }

    pub(crate) fn remove_quad(&mut self, quad: QuadRef<'_>) -> bool {
        let removed = match self.graph_mut(quad.graph_name) {
            Some(graph) => graph.remove(quad.subject, quad.predicate, quad.object),
            None => false,
        };
        if removed {
            self.decrement_predicate(&quad.predicate.into_owned(), 1);
            self.drop_if_empty(quad.graph_name);
        }
        removed
    }

    pub(crate) fn clear_graph(&mut self, graph_name: GraphNameRef<'_>) -> usize {
        let Some(graph) = self.graph_mut(graph_name) else {
            return 0;
        };
        let removed = graph.len();
        let counts: Vec<(NamedNode, u64)> = graph
            .predicate_counts()
            .map(|(predicate, count)| (predicate.clone(), count))
            .collect();
        *graph = GraphIndex::default();
        for (predicate, count) in counts {
            self.decrement_predicate(&predicate, count);
        }
        self.drop_if_empty(graph_name);
        removed
    }

    pub(crate) fn contains(&self, quad: QuadRef<'_>) -> bool {
        self.graph(quad.graph_name)
            .is_some_and(|graph| graph.contains(quad.subject, quad.predicate, quad.object))
    }

    pub(crate) fn len(&self) -> usize {
        self.default_graph.len() + self.named.values().map(GraphIndex::len).sum::<usize>()
    }

    pub(crate) fn named_graphs(&self) -> Vec<NamedOrBlankNode> {
        self.named.keys().cloned().collect()
    }

    pub(crate) fn quads_matching(
        &self,
        subject: Option<SubjectRef<'_>>,
        predicate: Option<oxrdf::NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
        graph: Option<GraphNameRef<'_>>,
        out: &mut Vec<Quad>,
    ) {
        let mut triples = Vec::new();
        match graph {
            Some(graph_name) => {
                if let Some(graph) = self.graph(graph_name) {
                    graph.triples_matching(subject, predicate, object, &mut triples);
                    push_quads(&mut triples, graph_name.into_owned(), out);
                }
            }
            None => {
                self.default_graph
                    .triples_matching(subject, predicate, object, &mut triples);
                push_quads(&mut triples, GraphName::DefaultGraph, out);
                for (name, graph) in &self.named {
                    let graph_name = match name.clone() {
                        NamedOrBlankNode::NamedNode(node) => GraphName::NamedNode(node),
                        NamedOrBlankNode::BlankNode(node) => GraphName::BlankNode(node),
                    };
                    graph.triples_matching(subject, predicate, object, &mut triples);
                    push_quads(&mut triples, graph_name, out);
                }
            }
        }
    }

    fn graph(&self, graph_name: GraphNameRef<'_>) -> Option<&GraphIndex> {
        match graph_name {
            GraphNameRef::DefaultGraph => Some(&self.default_graph),
            GraphNameRef::NamedNode(n) => {
                self.named.get(&NamedOrBlankNode::NamedNode(n.into_owned()))
            }
            GraphNameRef::BlankNode(n) => {
                self.named.get(&NamedOrBlankNode::BlankNode(n.into_owned()))
            }
        }
    }

    fn graph_mut(&mut self, graph_name: GraphNameRef<'_>) -> Option<&mut GraphIndex> {
        match graph_name {
            GraphNameRef::DefaultGraph => Some(&mut self.default_graph),
            GraphNameRef::NamedNode(n) => self
                .named
                .get_mut(&NamedOrBlankNode::NamedNode(n.into_owned())),
            GraphNameRef::BlankNode(n) => self
                .named
                .get_mut(&NamedOrBlankNode::BlankNode(n.into_owned())),
        }
    }

    /// Graphs exist implicitly while non-empty; an emptied named graph
    /// disappears from enumeration.
    fn drop_if_empty(&mut self, graph_name: GraphNameRef<'_>) {
        let key = match graph_name {
            GraphNameRef::DefaultGraph => return,
            GraphNameRef::NamedNode(n) => NamedOrBlankNode::NamedNode(n.into_owned()),
            GraphNameRef::BlankNode(n) => NamedOrBlankNode::BlankNode(n.into_owned()),
        };
        if self.named.get(&key).is_some_and(GraphIndex::is_empty) {
            self.named.remove(&key);
        }
    }

    fn decrement_predicate(&mut self, predicate: &NamedNode, by: u64) {
        if let Some(count) = self.predicate_counts.get_mut(predicate) {
            *count = count.saturating_sub(by);
            if *count == 0 {
                self.predicate_counts.remove(predicate);
            }
        }
    }
}

fn push_quads(
    triples: &mut Vec<(Subject, NamedNode, Term)>,
    graph_name: GraphName,
    out: &mut Vec<Quad>,
) {
    for (subject, predicate, object) in triples.drain(..) {
        out.push(Quad::new(subject, predicate, object, graph_name.clone()));
    }
}
