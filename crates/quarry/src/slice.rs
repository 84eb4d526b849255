//! Slice extraction for a single hole.
//!
//! `<tool> slice --from <hole> <certificate> <spec>` writes the slice to
//! stdout, captured into the artifact file; stderr goes to a sibling
//! `.stderr` capture. The artifact path is the cache key: an existing
//! artifact short-circuits the call and the tool is never invoked
//! (invalidation is manual deletion only).

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::{tool, QuarryError};

/// Inputs for one slice invocation.
#[derive(Debug)]
pub struct SliceJob<'a> {
    pub program: &'a str,
    pub hole: &'a str,
    pub certificate: &'a Path,
    pub spec: &'a Path,
    pub artifact: &'a Path,
    /// Keep empty `.stderr` captures instead of cleaning them up.
    pub debug: bool,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceOutcome {
    /// Artifact already on disk; the tool was not invoked.
    Cached,
    /// Artifact produced by a fresh invocation.
    Fresh,
    /// Non-zero exit or empty artifact; the artifact is left as written and
    /// the stderr capture is retained for inspection.
    Failed { stderr_path: PathBuf },
}

/// Produces the slice artifact for one hole.
///
/// Success requires a zero exit code **and** a non-empty artifact. After a
/// success, an empty stderr capture is deleted to keep the tree clean
/// unless debug mode asked for it.
pub async fn run(job: &SliceJob<'_>) -> Result<SliceOutcome, QuarryError> {
    if job.artifact.exists() {
        return Ok(SliceOutcome::Cached);
    }
    if let Some(parent) = job.artifact.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let stderr_path = stderr_path_for(job.artifact);
    let out = File::create(job.artifact)?;
    let err = File::create(&stderr_path)?;

    let status = Command::new(job.program)
        .arg("slice")
        .arg("--from")
        .arg(job.hole)
        .arg(job.certificate)
        .arg(job.spec)
        .arg(tool::FLAG_PARSE_HOLE_ARGS)
        .arg(tool::FLAG_NO_PRINT_WITH_SHARING)
        .stdin(Stdio::null())
        .stdout(Stdio::from(out))
        .stderr(Stdio::from(err))
        .status()
        .await
        .map_err(|source| QuarryError::Spawn {
            program: job.program.to_string(),
            source,
        })?;

    let produced = std::fs::metadata(job.artifact)
        .map(|m| m.len() > 0)
        .unwrap_or(false);
    if !status.success() || !produced {
        return Ok(SliceOutcome::Failed { stderr_path });
    }

    if !job.debug {
        if let Ok(meta) = std::fs::metadata(&stderr_path) {
            if meta.len() == 0 {
                std::fs::remove_file(&stderr_path).ok();
            }
        }
    }
    Ok(SliceOutcome::Fresh)
}

/// Sibling `.stderr` capture path for a slice artifact.
pub fn stderr_path_for(artifact: &Path) -> PathBuf {
    let mut os = artifact.as_os_str().to_os_string();
    os.push(".stderr");
    PathBuf::from(os)
}
