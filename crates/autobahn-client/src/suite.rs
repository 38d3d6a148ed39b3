//! Suite driver
//!
//! Runs cases one at a time, in order. A failing case is recorded against
//! its identifier and the run moves on; only failures outside a case
//! (enumeration, case info, report trigger) abort the suite.

use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::server::CaseServer;

/// Which cases to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseSelection {
    /// Every case the server reports, `1..=count`
    All,
    /// Exactly these indices, in this order. The server's case count is not
    /// consulted and no report is written.
    Debug(Vec<u32>),
}

impl CaseSelection {
    /// An empty list selects every case
    pub fn from_debug_cases(cases: Vec<u32>) -> Self {
        if cases.is_empty() {
            CaseSelection::All
        } else {
            CaseSelection::Debug(cases)
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, CaseSelection::Debug(_))
    }
}

/// A case that ended in anything other than the server closing the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFailure {
    pub case: u32,
    pub id: String,
    pub error: String,
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    /// Server case count; `None` in debug mode
    pub case_count: Option<u32>,
    /// Number of cases run
    pub attempted: usize,
    pub exceptions: Vec<CaseFailure>,
    pub report_updated: bool,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub fn is_success(&self) -> bool {
        self.exceptions.is_empty()
    }

    /// Identifiers of failed cases in the order they ran
    pub fn exception_ids(&self) -> Vec<&str> {
        self.exceptions.iter().map(|f| f.id.as_str()).collect()
    }

    /// Process exit status: 0 when every case completed, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Indices to run, produced lazily so a large case count costs nothing up front
fn case_indices(
    selection: &CaseSelection,
    case_count: Option<u32>,
) -> Box<dyn Iterator<Item = u32> + Send + '_> {
    match selection {
        CaseSelection::All => Box::new(1..=case_count.unwrap_or(0)),
        CaseSelection::Debug(cases) => Box::new(cases.iter().copied()),
    }
}

pub struct Suite<S> {
    server: S,
    selection: CaseSelection,
}

impl<S: CaseServer> Suite<S> {
    pub fn new(server: S, selection: CaseSelection) -> Self {
        Self { server, selection }
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub async fn run(&self) -> Result<SuiteReport> {
        let started = Instant::now();

        let case_count = match &self.selection {
            CaseSelection::All => Some(self.server.case_count().await?),
            CaseSelection::Debug(_) => None,
        };

        let mut attempted = 0usize;
        let mut exceptions = Vec::new();
        for case in case_indices(&self.selection, case_count) {
            attempted += 1;
            let id = self.server.case_info(case).await?.id;
            match case_count {
                Some(total) => info!("Running test case {} ({} of {})", id, case, total),
                None => info!("Debugging test case {} ({})", id, case),
            }

            match self.server.run_case(case).await {
                Ok(outcome) => debug!(
                    "Test case {} done: {} messages echoed in {:?}",
                    id, outcome.messages, outcome.elapsed
                ),
                Err(e) => {
                    error!("  runtime exception during test case {} ({}): {}", id, case, e);
                    exceptions.push(CaseFailure {
                        case,
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !exceptions.is_empty() {
            let ids: Vec<&str> = exceptions.iter().map(|f| f.id.as_str()).collect();
            error!(
                "Runtime exception in {} of {} test cases: {:?}",
                exceptions.len(),
                attempted,
                ids
            );
        }

        let report_updated = if self.selection.is_debug() {
            false
        } else {
            info!("Updating report");
            self.server.update_reports().await?;
            true
        };

        Ok(SuiteReport {
            case_count,
            attempted,
            exceptions,
            report_updated,
            elapsed: started.elapsed(),
        })
    }
}
