//! Post-hoc elaboration log classification.
//!
//! The tool reports per-step outcomes in its text output rather than
//! through exit codes, so a run is classified by counting literal markers
//! in the captured log: one automaton pass over an mmap of the file.
//! Classification never raises — logs truncated by a timeout kill, or logs
//! that cannot be read at all, degrade to zero counts.

use aho_corasick::AhoCorasick;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Emitted once per successfully re-derived step.
pub const SUCCESS_MARKER: &str = "Elaboration successed";

/// Emitted once per step whose re-derivation was refuted.
pub const FAILURE_MARKER: &str = "Check failed:";

/// Present when the tool's runtime aborted.
pub const PANIC_MARKER: &str = "panicked at";

/// Marker tallies from one log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCounts {
    pub success: u32,
    pub failed: u32,
    pub panicked: bool,
    /// `false` when the log could not be opened or mapped; such a run is
    /// never considered ok.
    pub readable: bool,
}

/// Counts outcome markers in the log at `path`.
pub fn scan_log(path: &Path) -> LogCounts {
    let Ok(file) = File::open(path) else {
        return LogCounts::default();
    };
    let Ok(meta) = file.metadata() else {
        return LogCounts::default();
    };
    if meta.len() == 0 {
        // A tool that exited before printing anything: readable, no outcomes.
        return LogCounts {
            readable: true,
            ..LogCounts::default()
        };
    }
    // SAFETY: the mapping is read-only and dropped before the file handle.
    let Ok(mmap) = (unsafe { Mmap::map(&file) }) else {
        return LogCounts::default();
    };
    scan_bytes(&mmap)
}

/// Counts markers in an in-memory log body.
pub fn scan_bytes(data: &[u8]) -> LogCounts {
    let automaton = AhoCorasick::new([SUCCESS_MARKER, FAILURE_MARKER, PANIC_MARKER])
        .expect("marker automaton");

    let mut counts = LogCounts {
        readable: true,
        ..LogCounts::default()
    };
    for mat in automaton.find_iter(data) {
        match mat.pattern().as_usize() {
            0 => counts.success += 1,
            1 => counts.failed += 1,
            _ => counts.panicked = true,
        }
    }
    counts
}
