use std::time::Duration;

/// How a comparison between a plain string and a numeric behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringNumericMode {
    /// SPARQL semantics: the comparison is a type error and the row is
    /// dropped.
    #[default]
    Strict,
    /// Attempt a numeric parse of the string before comparing.
    Coerce,
}

/// Resource limits applied to `LOAD`.
#[derive(Debug, Clone)]
pub struct LoadLimits {
    pub max_download_bytes: u64,
    pub max_triples: u64,
    pub timeout: Duration,
}

impl Default for LoadLimits {
    fn default() -> Self {
        Self {
            max_download_bytes: 100 * 1024 * 1024,
            max_triples: 10_000_000,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Engine-wide execution settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on the number of patterns a single nested-loop join may
    /// carry. Exceeding it aborts the query instead of risking unbounded
    /// join state.
    pub max_join_depth: usize,
    pub string_numeric_mode: StringNumericMode,
    /// SERVICE is evaluated local-first when the estimated local
    /// cardinality times this factor stays below the service-side estimate.
    pub service_local_first_ratio: u64,
    pub plan_cache_capacity: usize,
    /// Restrict DESCRIBE to subject occurrences of the described resource.
    pub describe_subject_only: bool,
    pub load_limits: LoadLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_join_depth: 32,
            string_numeric_mode: StringNumericMode::default(),
            service_local_first_ratio: 10,
            plan_cache_capacity: 256,
            describe_subject_only: false,
            load_limits: LoadLimits::default(),
        }
    }
}
