//! Contract of the external prover tool.
//!
//! The tool is invoked as a black-box subprocess with two subcommands:
//! `slice` writes a minimal sub-proof to stdout, `elaborate` re-derives a
//! slice and reports per-step outcomes in its text output (not through the
//! exit code). The compatibility flags below are fixed for the whole
//! campaign.

use std::io::ErrorKind;
use std::process::{Command, Stdio};

/// Default external tool driving slicing and elaboration.
pub const DEFAULT_PROGRAM: &str = "carcara";

pub const FLAG_PARSE_HOLE_ARGS: &str = "--parse-hole-args";
pub const FLAG_NO_PRINT_WITH_SHARING: &str = "--no-print-with-sharing";
pub const FLAG_ALLOW_INT_REAL_SUBTYPING: &str = "--allow-int-real-subtyping";
pub const FLAG_EXPAND_LET_BINDINGS: &str = "--expand-let-bindings";
pub const FLAG_RARE_FILE: &str = "--rare-file";
pub const FLAG_HOLE_SOLVER: &str = "--hole-solver";

/// The fixed hole solver used for trusted-rewrite discharge.
pub const HOLE_SOLVER: &str = "rare_rewrite";

/// Multi-stage elaboration pipeline arguments.
pub const PIPELINE_ARGS: [&str; 3] = ["--pipeline", "hole", "local"];

/// Probes whether `program` can be spawned at all.
///
/// Spawns `<program> --version` with all output discarded; the exit code is
/// irrelevant, only spawnability counts. This is the environment
/// precondition checked before any scanning begins.
pub fn available(program: &str) -> bool {
    match Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_unavailable() {
        assert!(!available("definitely-not-a-real-tool-name"));
    }

    #[test]
    fn test_present_program_is_available() {
        // `sh` exists on every platform the driver targets.
        assert!(available("sh"));
    }
}
