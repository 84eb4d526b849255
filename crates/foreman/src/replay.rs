//! Replays slicing from a JSON job list.
//!
//! The input is tolerant: a JSON array of job objects, a single object, or
//! JSON Lines. Malformed entries produce `error` status lines and are
//! skipped — one bad job never stops the list. Resolution happens under an
//! explicit search root passed in by the caller; nothing here consults the
//! process working directory.

use common::status::{self, ErrorLine, NotFoundLine};
use prospector::layout::slice_file_name;
use prospector::resolve::PROOF_EXTENSION;
use prospector::OutputLayout;
use quarry::slice::{SliceJob, SliceOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Settings for one replay invocation.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Directory searched for the certificates named by the jobs.
    pub search_root: PathBuf,
    /// Directory receiving `sliced_proofs`; `None` = alongside the search
    /// root.
    pub out_root: Option<PathBuf>,
    pub debug: bool,
    pub program: String,
}

/// Per-status tallies for one replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub sliced: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub errors: usize,
}

/// A job as it appears in the input; everything optional so malformed
/// entries can be reported instead of killing the parse.
#[derive(Debug, Deserialize)]
struct RawJob {
    #[serde(default)]
    folder: String,
    file: Option<String>,
    command: Option<String>,
    #[serde(default)]
    line: Option<u32>,
}

/// One replayed slice, as reported on the status stream.
#[derive(Debug, Serialize)]
struct ReplayLine<'a> {
    status: &'static str,
    folder: &'a str,
    file: &'a str,
    command: &'a str,
    line: Option<u32>,
    out: String,
    cached: bool,
    elapsed: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
}

/// Runs every job in `input` against the search root.
pub async fn run(
    cfg: &ReplayConfig,
    input: &str,
    sink: &mut dyn Write,
) -> anyhow::Result<ReplaySummary> {
    let layout = OutputLayout::new(&cfg.search_root, cfg.out_root.as_deref())?;
    std::fs::create_dir_all(layout.sliced_root())?;

    if cfg.debug {
        eprintln!(
            "debug: search_root={} sliced_root={}",
            layout.root().display(),
            layout.sliced_root().display()
        );
    }

    let mut summary = ReplaySummary::default();
    for job in parse_jobs(input, sink) {
        replay_job(cfg, &layout, &job, sink, &mut summary).await;
    }
    Ok(summary)
}

/// Parses the job list: full JSON first, JSON Lines as the fallback.
fn parse_jobs(input: &str, sink: &mut dyn Write) -> Vec<RawJob> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| coerce_job(item, sink))
            .collect(),
        Ok(item @ Value::Object(_)) => coerce_job(item, sink).into_iter().collect(),
        Ok(_) => {
            status::emit(
                sink,
                &ErrorLine::new("top-level JSON must be an object or an array of objects".into()),
            );
            Vec::new()
        }
        Err(_) => input
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                match serde_json::from_str::<Value>(line) {
                    Ok(item) => coerce_job(item, sink),
                    Err(e) => {
                        status::emit(
                            sink,
                            &ErrorLine::new(format!("invalid JSONL line {}: {e}", idx + 1)),
                        );
                        None
                    }
                }
            })
            .collect(),
    }
}

fn coerce_job(item: Value, sink: &mut dyn Write) -> Option<RawJob> {
    match serde_json::from_value::<RawJob>(item) {
        Ok(job) => Some(job),
        Err(e) => {
            status::emit(sink, &ErrorLine::new(format!("job entry not usable: {e}")));
            None
        }
    }
}

async fn replay_job(
    cfg: &ReplayConfig,
    layout: &OutputLayout,
    job: &RawJob,
    sink: &mut dyn Write,
    summary: &mut ReplaySummary,
) {
    let (Some(file), Some(command)) = (job.file.as_deref(), job.command.as_deref()) else {
        status::emit(sink, &ErrorLine::new("job is missing file or command".into()));
        summary.errors += 1;
        return;
    };

    // Already-qualified steps are derived work, not independently sliceable.
    if command.contains('.') {
        summary.skipped += 1;
        return;
    }

    let Some(certificate) = find_certificate(layout.root(), file) else {
        status::emit(
            sink,
            &NotFoundLine::new("certificate not found under search root", file.to_string()),
        );
        summary.not_found += 1;
        return;
    };

    let Some(cert_str) = certificate.to_str() else {
        status::emit(sink, &ErrorLine::new(format!("non-UTF-8 path for {file}")));
        summary.errors += 1;
        return;
    };
    let Some(spec_str) = cert_str.strip_suffix(PROOF_EXTENSION) else {
        status::emit(
            sink,
            &ErrorLine::new(format!("{}: not a proof certificate", layout.rel_to_root(&certificate))),
        );
        summary.errors += 1;
        return;
    };
    let spec = PathBuf::from(spec_str);
    if !spec.is_file() {
        status::emit(
            sink,
            &NotFoundLine::new("matching .smt2 not found", layout.rel_to_root(&certificate)),
        );
        summary.not_found += 1;
        return;
    }

    let base = spec
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.strip_suffix(".smt2").unwrap_or(n).to_string())
        .unwrap_or_default();
    let top_folder = if job.folder.is_empty() {
        layout.root_name()
    } else {
        job.folder.as_str()
    };
    let rel_dir = certificate
        .parent()
        .map(|d| d.strip_prefix(layout.root()).unwrap_or(Path::new("")))
        .unwrap_or(Path::new(""));
    let out_dir = layout
        .sliced_root()
        .join(top_folder)
        .join(rel_dir)
        .join(&base);
    let artifact = out_dir.join(slice_file_name(&base, command));

    let started = Instant::now();
    let outcome = quarry::slice::run(&SliceJob {
        program: &cfg.program,
        hole: command,
        certificate: &certificate,
        spec: &spec,
        artifact: &artifact,
        debug: cfg.debug,
    })
    .await;
    let elapsed = common::elapsed::format_elapsed(started.elapsed());

    let line = match outcome {
        Ok(result @ (SliceOutcome::Fresh | SliceOutcome::Cached)) => {
            let cached = result == SliceOutcome::Cached;
            summary.sliced += 1;
            ReplayLine {
                status: "ok",
                folder: top_folder,
                file,
                command,
                line: job.line,
                out: layout.rel_to_out(&artifact),
                cached,
                elapsed,
                stderr: None,
            }
        }
        Ok(SliceOutcome::Failed { stderr_path }) => {
            summary.errors += 1;
            ReplayLine {
                status: "error",
                folder: top_folder,
                file,
                command,
                line: job.line,
                out: layout.rel_to_out(&artifact),
                cached: false,
                elapsed,
                stderr: Some(layout.rel_to_out(&stderr_path)),
            }
        }
        Err(e) => {
            summary.errors += 1;
            status::emit(sink, &ErrorLine::new(format!("{file} {command}: {e}")));
            return;
        }
    };
    status::emit(sink, &line);
}

/// Locates a certificate under the search root: exact relative path first,
/// then a walk matching the bare file name — the tree (`sliced_proofs`
/// included) is searched exactly as laid out on disk.
fn find_certificate(search_root: &Path, rel_or_name: &str) -> Option<PathBuf> {
    let candidate = search_root.join(rel_or_name);
    if candidate.is_file() {
        return Some(candidate);
    }
    let base = Path::new(rel_or_name).file_name()?;
    WalkDir::new(search_root)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .find(|e| e.file_type().is_file() && e.file_name() == base)
        .map(walkdir::DirEntry::into_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn fake_tool(dir: &TempDir) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("fake-tool");
        fs::write(&path, "#!/bin/sh\necho \"(step t1 (cl))\"\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn search_root(dir: &TempDir) -> PathBuf {
        let root = dir.path().join("bench");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/case.smt2.alethe"), "(step h1)").unwrap();
        fs::write(root.join("sub/case.smt2"), "(set-logic QF_UF)").unwrap();
        root
    }

    fn config(dir: &TempDir, root: &Path) -> ReplayConfig {
        ReplayConfig {
            search_root: root.to_path_buf(),
            out_root: None,
            debug: false,
            program: fake_tool(dir),
        }
    }

    fn lines(sink: &[u8]) -> Vec<Value> {
        std::str::from_utf8(sink)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_replay_from_array_slices_job() {
        let dir = tempdir().unwrap();
        let root = search_root(&dir);
        let cfg = config(&dir, &root);
        let input = json!([
            {"folder": "bench", "file": "sub/case.smt2.alethe", "command": "h1", "line": 1}
        ])
        .to_string();

        let mut sink = Vec::new();
        let summary = run(&cfg, &input, &mut sink).await.unwrap();

        assert_eq!(summary.sliced, 1);
        let out = lines(&sink);
        assert_eq!(out[0]["status"], "ok");
        assert_eq!(out[0]["command"], "h1");
        assert!(dir
            .path()
            .join("sliced_proofs/bench/sub/case/case__from-h1.smt2.alethe")
            .exists());
    }

    #[tokio::test]
    async fn test_replay_finds_certificate_by_basename() {
        let dir = tempdir().unwrap();
        let root = search_root(&dir);
        let cfg = config(&dir, &root);
        let input = json!({"file": "case.smt2.alethe", "command": "h1"}).to_string();

        let mut sink = Vec::new();
        let summary = run(&cfg, &input, &mut sink).await.unwrap();

        assert_eq!(summary.sliced, 1);
        // Folder defaults to the search-root name.
        assert_eq!(lines(&sink)[0]["folder"], "bench");
    }

    #[tokio::test]
    async fn test_replay_skips_qualified_commands_silently() {
        let dir = tempdir().unwrap();
        let root = search_root(&dir);
        let cfg = config(&dir, &root);
        let input = json!([{"file": "sub/case.smt2.alethe", "command": "h1.sub"}]).to_string();

        let mut sink = Vec::new();
        let summary = run(&cfg, &input, &mut sink).await.unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(sink.is_empty(), "qualified steps produce no status line");
    }

    #[tokio::test]
    async fn test_replay_jsonl_with_bad_line() {
        let dir = tempdir().unwrap();
        let root = search_root(&dir);
        let cfg = config(&dir, &root);
        let input = concat!(
            "{\"file\": \"sub/case.smt2.alethe\", \"command\": \"h1\"}\n",
            "this is not json\n",
            "{\"command\": \"h2\"}\n",
        );

        let mut sink = Vec::new();
        let summary = run(&cfg, input, &mut sink).await.unwrap();

        assert_eq!(summary.sliced, 1);
        assert_eq!(summary.errors, 1, "missing file counts as an error");
        let out = lines(&sink);
        assert_eq!(out.len(), 3);
        // Parse errors surface first, then jobs replay in input order.
        assert_eq!(out[0]["status"], "error");
        assert!(out[0]["reason"].as_str().unwrap().contains("invalid JSONL line 2"));
        assert_eq!(out[1]["status"], "ok");
        assert_eq!(out[2]["status"], "error");
        assert!(out[2]["reason"].as_str().unwrap().contains("missing file or command"));
    }

    #[tokio::test]
    async fn test_replay_missing_certificate_is_not_found() {
        let dir = tempdir().unwrap();
        let root = search_root(&dir);
        let cfg = config(&dir, &root);
        let input = json!({"file": "ghost.smt2.alethe", "command": "h1"}).to_string();

        let mut sink = Vec::new();
        let summary = run(&cfg, &input, &mut sink).await.unwrap();

        assert_eq!(summary.not_found, 1);
        assert_eq!(lines(&sink)[0]["status"], "not_found");
    }
}
