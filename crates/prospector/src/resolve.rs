//! Companion specification (`.smt2`) resolution and materialization.
//!
//! Every certificate is paired with the specification file it proves,
//! named by stripping the proof suffix. The source of truth is searched in
//! a fixed order: the copy already materialized in the job output
//! directory, the sibling of the certificate, then a same-directory guess
//! from the base name. Once a hole has been sliced, the specification is
//! materialized into the output directory so reruns and elaboration read
//! from the output tree alone.

use std::path::{Path, PathBuf};

/// Proof suffix appended to a specification file name.
pub const PROOF_EXTENSION: &str = ".alethe";

/// Specification file extension.
pub const SPEC_EXTENSION: &str = "smt2";

/// How the specification file is transferred into the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Rename into place; falls back to copy + remove across filesystems.
    Move,
    /// Leave the original untouched.
    Copy,
}

/// Returns the sibling obtained by stripping the proof suffix, if it exists.
pub fn spec_beside(certificate: &Path) -> Option<PathBuf> {
    let stripped = certificate.to_str()?.strip_suffix(PROOF_EXTENSION)?;
    let candidate = PathBuf::from(stripped);
    candidate.is_file().then_some(candidate)
}

/// Returns `<dir>/<base>.smt2` if present on disk.
pub fn spec_in_dir(dir: &Path, base_name: &str) -> Option<PathBuf> {
    let candidate = dir.join(format!("{base_name}.{SPEC_EXTENSION}"));
    candidate.is_file().then_some(candidate)
}

/// Resolves the specification file for `certificate`.
///
/// Preference order: already materialized in `out_dir`, sibling with the
/// proof suffix stripped, same-directory guess from the base name. `None`
/// is terminal for the certificate — the caller reports it once and moves
/// on.
pub fn resolve_spec(certificate: &Path, out_dir: &Path, base_name: &str) -> Option<PathBuf> {
    if let Some(dest) = spec_in_dir(out_dir, base_name) {
        return Some(dest);
    }
    if let Some(beside) = spec_beside(certificate) {
        return Some(beside);
    }
    certificate
        .parent()
        .and_then(|dir| spec_in_dir(dir, base_name))
}

/// Materializes the specification at `<out_dir>/<base>.smt2`.
///
/// A copy already in place is returned as-is, so repeated holes of the same
/// certificate transfer at most once. `Transfer::Move` renames, falling
/// back to copy + best-effort remove when rename fails (cross-device).
pub fn materialize_spec(
    source: &Path,
    out_dir: &Path,
    base_name: &str,
    transfer: Transfer,
) -> std::io::Result<PathBuf> {
    if let Some(existing) = spec_in_dir(out_dir, base_name) {
        return Ok(existing);
    }
    std::fs::create_dir_all(out_dir)?;
    let target = out_dir.join(format!("{base_name}.{SPEC_EXTENSION}"));
    match transfer {
        Transfer::Copy => {
            std::fs::copy(source, &target)?;
        }
        Transfer::Move => {
            if std::fs::rename(source, &target).is_err() {
                std::fs::copy(source, &target)?;
                std::fs::remove_file(source).ok();
            }
        }
    }
    Ok(target)
}
