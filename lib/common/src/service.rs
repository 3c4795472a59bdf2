use std::error::Error;

/// One solution row exchanged with a SERVICE endpoint: variable names
/// (without sigil) paired with term strings in N-Triples lexical form.
pub type ServiceRow = Vec<(String, String)>;

/// Evaluates the body of a `SERVICE` clause against a remote endpoint.
///
/// The engine never speaks HTTP for federation itself; hosts inject an
/// implementation (or none, in which case any non-SILENT `SERVICE` clause
/// fails).
pub trait ServiceExecutor: Send + Sync {
    /// Executes `query` against `endpoint`. `bindings` are the solutions
    /// already gathered locally; an empty slice means the service runs
    /// unconstrained.
    fn execute(
        &self,
        endpoint: &str,
        query: &str,
        bindings: &[ServiceRow],
    ) -> Result<Vec<ServiceRow>, Box<dyn Error + Send + Sync>>;
}
