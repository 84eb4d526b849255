//! The per-job result record persisted in the ledger.

use crate::elapsed::serde_elapsed;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one (certificate, hole) job.
///
/// `certificate_path` is relative to the corpus root; `slice_path`,
/// `spec_path` and `log_path` are relative to the output root, so a ledger
/// stays meaningful when the whole output tree is relocated. `ok` holds iff
/// the run finished in budget, did not crash, and reported zero failed
/// checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub root: String,
    pub certificate_path: String,
    pub hole_name: String,
    pub line: u32,
    pub slice_path: String,
    pub spec_path: Option<String>,
    pub log_path: String,
    pub ok: bool,
    pub success_count: u32,
    pub failed_count: u32,
    pub panicked: bool,
    pub timed_out: bool,
    #[serde(with = "serde_elapsed")]
    pub elapsed: Duration,
}
