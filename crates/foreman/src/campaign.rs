//! Campaign orchestration: scan → resolve → slice → elaborate → record.
//!
//! One status line per job goes to the sink regardless of outcome, so a
//! consumer tailing the driver has a live view independent of the ledger.
//! Failures are isolated per job — nothing short of a missing external tool
//! aborts a campaign. The ledger holds first-run outcomes only: a job whose
//! elaboration log already exists is replayed to the status stream as
//! `cached: true` and never re-appended.

use annalist::Ledger;
use anyhow::Context;
use common::status::{self, CachedLine, ErrorLine, NotFoundLine, ResultLine, SliceErrorLine};
use common::JobRecord;
use prospector::layout::{log_file_name, slice_file_name};
use prospector::resolve::{self, Transfer};
use prospector::{Hole, OutputLayout};
use quarry::elaborate::ElaborateJob;
use quarry::slice::{SliceJob, SliceOutcome};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Settings for one campaign invocation.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// Corpus root scanned for certificates.
    pub root: PathBuf,
    /// Directory receiving `sliced_proofs`; `None` = alongside the root.
    pub out_root: Option<PathBuf>,
    /// Rewrite-rules file handed to every elaboration.
    pub rules_file: PathBuf,
    /// Ledger file; a relative path resolves under the output root.
    pub results_file: PathBuf,
    /// Per-elaboration budget in seconds; `0` disables the timeout.
    pub timeout_secs: u64,
    pub debug: bool,
    /// How specification files are materialized into the output tree.
    pub transfer: Transfer,
    /// External tool to invoke.
    pub program: String,
}

impl CampaignConfig {
    /// Defaults mirroring the CLI surface.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out_root: None,
            rules_file: PathBuf::from("big.rare"),
            results_file: PathBuf::from("results.json"),
            timeout_secs: 60,
            debug: false,
            transfer: Transfer::Move,
            program: quarry::tool::DEFAULT_PROGRAM.to_string(),
        }
    }
}

/// Per-status tallies for one campaign run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CampaignSummary {
    pub certificates: usize,
    pub jobs: usize,
    pub recorded: usize,
    pub cached: usize,
    pub not_found: usize,
    pub slice_errors: usize,
    pub errors: usize,
}

/// Drives a full campaign over the corpus.
pub async fn run(cfg: &CampaignConfig, sink: &mut dyn Write) -> anyhow::Result<CampaignSummary> {
    let layout = OutputLayout::new(&cfg.root, cfg.out_root.as_deref())
        .with_context(|| format!("cannot resolve corpus root {}", cfg.root.display()))?;
    std::fs::create_dir_all(layout.sliced_root())?;

    let results_path = if cfg.results_file.is_absolute() {
        cfg.results_file.clone()
    } else {
        layout.out_root().join(&cfg.results_file)
    };
    let ledger = Ledger::new(results_path);

    if cfg.debug {
        eprintln!(
            "debug: root={} sliced_root={} ledger={}",
            layout.root().display(),
            layout.sliced_root().display(),
            ledger.path().display()
        );
    }

    let mut summary = CampaignSummary::default();
    for certificate in prospector::certificates(layout.root()) {
        summary.certificates += 1;
        process_certificate(cfg, &layout, &ledger, &certificate, sink, &mut summary).await;
    }
    Ok(summary)
}

async fn process_certificate(
    cfg: &CampaignConfig,
    layout: &OutputLayout,
    ledger: &Ledger,
    certificate: &Path,
    sink: &mut dyn Write,
    summary: &mut CampaignSummary,
) {
    let Some(base) = prospector::layout::base_name(certificate) else {
        return;
    };
    let Some(job_dir) = layout.job_dir(certificate) else {
        return;
    };

    if resolve::resolve_spec(certificate, &job_dir, &base).is_none() {
        status::emit(
            sink,
            &NotFoundLine::new(
                "matching .smt2 not found",
                layout.rel_to_root(certificate),
            ),
        );
        summary.not_found += 1;
        return;
    }

    let holes = prospector::holes_in_certificate(certificate);
    if cfg.debug {
        eprintln!(
            "debug: {} hole(s) in {}",
            holes.len(),
            layout.rel_to_root(certificate)
        );
    }

    for hole in &holes {
        summary.jobs += 1;
        if let Err(e) =
            process_hole(cfg, layout, ledger, certificate, &base, &job_dir, hole, sink, summary)
                .await
        {
            status::emit(
                sink,
                &ErrorLine::new(format!(
                    "{} hole {}: {e:#}",
                    layout.rel_to_root(certificate),
                    hole.name
                )),
            );
            summary.errors += 1;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_hole(
    cfg: &CampaignConfig,
    layout: &OutputLayout,
    ledger: &Ledger,
    certificate: &Path,
    base: &str,
    job_dir: &Path,
    hole: &Hole,
    sink: &mut dyn Write,
    summary: &mut CampaignSummary,
) -> anyhow::Result<()> {
    let slice_path = job_dir.join(slice_file_name(base, &hole.name));
    let log_path = job_dir.join(log_file_name(base, &hole.name));

    // Re-resolve per hole: once the specification has been moved into the
    // output tree, later holes of the same certificate must read it there.
    let spec_source = resolve::resolve_spec(certificate, job_dir, base)
        .context("specification file vanished mid-run")?;

    let outcome = quarry::slice::run(&SliceJob {
        program: &cfg.program,
        hole: &hole.name,
        certificate,
        spec: &spec_source,
        artifact: &slice_path,
        debug: cfg.debug,
    })
    .await?;

    if let SliceOutcome::Failed { stderr_path } = outcome {
        status::emit(
            sink,
            &SliceErrorLine::new(
                layout.rel_to_root(certificate),
                &hole.name,
                hole.line,
                Some(layout.rel_to_out(&stderr_path)),
            ),
        );
        summary.slice_errors += 1;
        return Ok(());
    }

    let spec_dest = resolve::materialize_spec(&spec_source, job_dir, base, cfg.transfer)
        .context("could not materialize specification file")?;

    if log_path.exists() {
        status::emit(
            sink,
            &CachedLine::new(
                layout.root_name(),
                layout.rel_to_root(certificate),
                &hole.name,
                layout.rel_to_out(&slice_path),
                layout.rel_to_out(&log_path),
            ),
        );
        summary.cached += 1;
        return Ok(());
    }

    let verdict = quarry::elaborate::run(&ElaborateJob {
        program: &cfg.program,
        slice: &slice_path,
        spec: &spec_dest,
        log: &log_path,
        rules_file: &cfg.rules_file,
        timeout_secs: cfg.timeout_secs,
    })
    .await?;

    let record = JobRecord {
        root: layout.root_name().to_string(),
        certificate_path: layout.rel_to_root(certificate),
        hole_name: hole.name.clone(),
        line: hole.line,
        slice_path: layout.rel_to_out(&slice_path),
        spec_path: Some(layout.rel_to_out(&spec_dest)),
        log_path: layout.rel_to_out(&log_path),
        ok: verdict.ok,
        success_count: verdict.success_count,
        failed_count: verdict.failed_count,
        panicked: verdict.panicked,
        timed_out: verdict.timed_out,
        elapsed: verdict.elapsed,
    };

    status::emit(sink, &ResultLine::new(&record));
    match ledger.append(&record) {
        Ok(_) => summary.recorded += 1,
        Err(e) => eprintln!("warning: ledger append failed: {e}"),
    }
    Ok(())
}
