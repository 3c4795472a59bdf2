use super::{BoxedScan, Scan};
use crate::binding::{BindOutcome, BindingTable};
use crate::context::ExecContext;
use crate::error::EvaluationError;
use crate::lexical::{self, ConstOrVar};
use quadflow_common::{ServiceExecutor, ServiceRow};
use quadflow_model::ServiceClause;
use std::sync::Arc;

/// How a SERVICE clause is joined with the local side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServiceMode {
    /// Gather local rows first, call the endpoint once per row with the
    /// row as pre-binding.
    LocalFirst,
    /// Call the endpoint once up front, join the materialized result with
    /// the local rows.
    ServiceFirst,
}

/// SERVICE: delegates the clause body to the injected service executor.
/// SILENT converts any failure into a single empty row per upstream row.
pub(crate) struct ServiceScan {
    ctx: Arc<ExecContext>,
    input: BoxedScan,
    clause: Arc<ServiceClause>,
    mode: ServiceMode,
    /// Service-first: the rows fetched up front.
    prefetched: Option<Vec<ServiceRow>>,
    /// The rows to join with the current upstream row.
    pending: Option<Vec<ServiceRow>>,
    cursor: usize,
    entry_len: usize,
    /// SILENT failure for the current row: emit it bare, once.
    pass_through: bool,
}

impl ServiceScan {
    pub(crate) fn new(
        ctx: Arc<ExecContext>,
        clause: Arc<ServiceClause>,
        mode: ServiceMode,
        input: BoxedScan,
    ) -> Self {
        Self {
            ctx,
            input,
            clause,
            mode,
            prefetched: None,
            pending: None,
            cursor: 0,
            entry_len: 0,
            pass_through: false,
        }
    }

    fn executor(&self) -> Result<&Arc<dyn ServiceExecutor>, EvaluationError> {
        self.ctx
            .service
            .as_ref()
            .ok_or(EvaluationError::ServiceUnsupported)
    }

    fn endpoint(&self, bindings: &BindingTable) -> Result<String, EvaluationError> {
        let resolved = lexical::resolve_term(
            &self.clause.endpoint,
            &self.ctx.source,
            &self.ctx.prefixes,
            self.ctx.base.as_ref(),
        )?;
        match resolved {
            ConstOrVar::Const(text) => Ok(text
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(&text)
                .to_owned()),
            ConstOrVar::Var(name) => match bindings.find(&name) {
                Some(index) => Ok(bindings
                    .value(index)
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_owned()),
                None => Err(EvaluationError::InvalidQuery(
                    "the SERVICE endpoint variable is unbound".into(),
                )),
            },
        }
    }

    fn body_query(&self) -> String {
        let body = self.clause.body.slice(&self.ctx.source);
        format!("SELECT * WHERE {{ {body} }}")
    }

    fn fetch(
        &self,
        bindings: &BindingTable,
        pre_bindings: &[ServiceRow],
    ) -> Result<Vec<ServiceRow>, EvaluationError> {
        let endpoint = self.endpoint(bindings)?;
        let executor = self.executor()?;
        executor
            .execute(&endpoint, &self.body_query(), pre_bindings)
            .map_err(EvaluationError::Service)
    }

    fn row_bindings(bindings: &BindingTable) -> Vec<ServiceRow> {
        let row: ServiceRow = bindings
            .iter()
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();
        vec![row]
    }
}

impl Scan for ServiceScan {
    fn move_next(&mut self, bindings: &mut BindingTable) -> Result<bool, EvaluationError> {
        loop {
            self.ctx.check_cancelled()?;

            if self.pass_through {
                self.pass_through = false;
                return Ok(true);
            }

            if let Some(rows) = &self.pending {
                while self.cursor < rows.len() {
                    let row = &rows[self.cursor];
                    self.cursor += 1;
                    bindings.truncate_to(self.entry_len);
                    let mut accepted = true;
                    for (name, value) in row {
                        if bindings.bind(name, value) == BindOutcome::Conflict {
                            accepted = false;
                            break;
                        }
                    }
                    if accepted {
                        return Ok(true);
                    }
                }
                bindings.truncate_to(self.entry_len);
                self.pending = None;
            }

            if !self.input.move_next(bindings)? {
                return Ok(false);
            }
            self.entry_len = bindings.len();
            self.cursor = 0;

            let rows = match self.mode {
                ServiceMode::ServiceFirst => {
                    if self.prefetched.is_none() {
                        match self.fetch(bindings, &[]) {
                            Ok(rows) => self.prefetched = Some(rows),
                            Err(error) if self.clause.silent => {
                                tracing::debug!("silent SERVICE failure: {error}");
                                self.pass_through = true;
                                continue;
                            }
                            Err(error) => return Err(error),
                        }
                    }
                    Ok(self.prefetched.clone().expect("prefetched above"))
                }
                ServiceMode::LocalFirst => {
                    let pre = Self::row_bindings(bindings);
                    self.fetch(bindings, &pre)
                }
            };
            match rows {
                Ok(rows) => self.pending = Some(rows),
                Err(error) if self.clause.silent => {
                    // SILENT: the upstream row passes through bare.
                    tracing::debug!("silent SERVICE failure: {error}");
                    self.pass_through = true;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
