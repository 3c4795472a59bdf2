use rustc_hash::FxHashMap;

/// The prefix declarations accompanying a query or update.
///
/// Expansion is plain concatenation of the prefix base with the local part;
/// relative results are resolved against the base IRI by the engine, not
/// here.
#[derive(Clone, Debug, Default)]
pub struct PrefixTable {
    prefixes: FxHashMap<String, String>,
}

impl PrefixTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Expands `pfx:local` into a full IRI. Returns `None` when the prefix
    /// is undeclared or the name carries no colon.
    pub fn expand(&self, prefixed_name: &str) -> Option<String> {
        let (prefix, local) = prefixed_name.split_once(':')?;
        let base = self.prefixes.get(prefix)?;
        Some(format!("{base}{local}"))
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
