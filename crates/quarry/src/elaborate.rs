//! Elaboration of a slice under a wall-clock budget.
//!
//! `<tool> elaborate <slice> <spec> --rare-file <rules> --hole-solver
//! rare_rewrite ...` with combined stdout+stderr captured into the log
//! file. On timeout the child is killed immediately and a synthetic marker
//! line is appended to the log for human readers; the marker never affects
//! the outcome counts. The log path doubles as the cache key consulted by
//! the orchestrator — this module always runs when called.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::classify::{self, LogCounts};
use crate::{tool, QuarryError};

/// Inputs for one elaboration invocation.
#[derive(Debug)]
pub struct ElaborateJob<'a> {
    pub program: &'a str,
    pub slice: &'a Path,
    pub spec: &'a Path,
    pub log: &'a Path,
    pub rules_file: &'a Path,
    /// Wall-clock budget in seconds; `0` disables the timeout.
    pub timeout_secs: u64,
}

/// Classified outcome of one elaboration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub ok: bool,
    pub success_count: u32,
    pub failed_count: u32,
    pub panicked: bool,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl Verdict {
    fn new(counts: LogCounts, timed_out: bool, elapsed: Duration) -> Self {
        let ok = counts.readable && !timed_out && !counts.panicked && counts.failed == 0;
        Self {
            ok,
            success_count: counts.success,
            failed_count: counts.failed,
            panicked: counts.panicked,
            timed_out,
            elapsed,
        }
    }
}

/// Runs one elaboration and classifies its captured log.
pub async fn run(job: &ElaborateJob<'_>) -> Result<Verdict, QuarryError> {
    if let Some(parent) = job.log.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_out = File::create(job.log)?;
    let log_err = log_out.try_clone()?;

    let mut command = Command::new(job.program);
    command
        .arg("elaborate")
        .arg(job.slice)
        .arg(job.spec)
        .arg(tool::FLAG_RARE_FILE)
        .arg(job.rules_file)
        .arg(tool::FLAG_HOLE_SOLVER)
        .arg(tool::HOLE_SOLVER)
        .arg(tool::FLAG_EXPAND_LET_BINDINGS)
        .arg(tool::FLAG_ALLOW_INT_REAL_SUBTYPING)
        .args(tool::PIPELINE_ARGS)
        .arg(tool::FLAG_PARSE_HOLE_ARGS)
        .arg(tool::FLAG_NO_PRINT_WITH_SHARING)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log_out))
        .stderr(Stdio::from(log_err));

    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| QuarryError::Spawn {
        program: job.program.to_string(),
        source,
    })?;

    let timed_out = if job.timeout_secs == 0 {
        child.wait().await?;
        false
    } else {
        let budget = Duration::from_secs(job.timeout_secs);
        match tokio::time::timeout(budget, child.wait()).await {
            Ok(status) => {
                status?;
                false
            }
            Err(_) => {
                child.kill().await.ok();
                append_timeout_marker(job.log, job.timeout_secs);
                true
            }
        }
    };
    let elapsed = started.elapsed();

    Ok(Verdict::new(classify::scan_log(job.log), timed_out, elapsed))
}

/// Leaves a clear marker in the log so a reader can tell the run was cut
/// short. Failures here are ignored: the classification already carries the
/// timeout.
fn append_timeout_marker(log: &Path, budget_secs: u64) {
    if let Ok(mut file) = OpenOptions::new().append(true).open(log) {
        let _ = writeln!(
            file,
            "\n[timeout] Elaboration exceeded {budget_secs}s and was terminated."
        );
    }
}
