//! Flattens a corpus scan into a JSON job list for later replay.
//!
//! Unlike the campaign scanner this walks *every* readable file and keeps
//! every marker occurrence — qualification and dedup are replay-time
//! decisions, so the job list is a faithful inventory of the corpus.

use prospector::layout::rel_display;
use prospector::scan::{step_name, HOLE_MARKER};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One marker occurrence in replay-job form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedJob {
    pub folder: String,
    pub file: String,
    pub command: String,
    pub line: u32,
}

/// Scans `root` and writes the job list as a pretty JSON array.
///
/// Returns the output path and the number of jobs written. The default
/// output is `<root-name>.commands.json` in the current directory.
pub fn run(root: &Path, out_path: Option<&Path>) -> anyhow::Result<(PathBuf, usize)> {
    let root = dunce::canonicalize(root)?;
    let root_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("corpus")
        .to_string();
    let out_path = out_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{root_name}.commands.json")));

    let mut jobs: Vec<ExtractedJob> = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name().into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        // Unreadable and binary files are skipped silently.
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        for (idx, line) in text.lines().enumerate() {
            if !line.contains(HOLE_MARKER) {
                continue;
            }
            let Some(name) = step_name(line) else { continue };
            jobs.push(ExtractedJob {
                folder: root_name.clone(),
                file: rel_display(entry.path(), &root),
                command: name.to_string(),
                line: idx as u32 + 1,
            });
        }
    }

    std::fs::write(&out_path, serde_json::to_string_pretty(&jobs)?)?;
    Ok((out_path, jobs.len()))
}
