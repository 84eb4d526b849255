//! Output tree layout.
//!
//! All campaign artifacts live under
//! `<out-root>/sliced_proofs/<root-name>/<relative-dir>/<base-name>/`:
//! per hole a slice artifact, an optional `.stderr` capture, the
//! elaboration log, and the materialized specification file.

use std::path::{Path, PathBuf};

use crate::scan::CERTIFICATE_SUFFIX;
use crate::ProspectorError;

/// Directory created under the output root to hold all campaign artifacts.
pub const SLICED_DIR_NAME: &str = "sliced_proofs";

/// Extension of the elaboration log captured per hole.
pub const LOG_EXTENSION: &str = "out";

/// Resolved directory scheme for one campaign.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    root_name: String,
    out_root: PathBuf,
    sliced_root: PathBuf,
}

impl OutputLayout {
    /// Builds the layout for a canonicalized `root`, placing
    /// `sliced_proofs` under `out_root` when given, else alongside the
    /// corpus root (in its parent directory).
    pub fn new(root: &Path, out_root: Option<&Path>) -> Result<Self, ProspectorError> {
        let root = dunce::canonicalize(root)?;
        let root_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("corpus")
            .to_string();
        let out_root = match out_root {
            Some(p) => {
                std::fs::create_dir_all(p)?;
                dunce::canonicalize(p)?
            }
            None => root.parent().unwrap_or(&root).to_path_buf(),
        };
        let sliced_root = out_root.join(SLICED_DIR_NAME);
        Ok(Self {
            root,
            root_name,
            out_root,
            sliced_root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Parent of the `sliced_proofs` tree; ledger paths resolve against it.
    pub fn out_root(&self) -> &Path {
        &self.out_root
    }

    pub fn sliced_root(&self) -> &Path {
        &self.sliced_root
    }

    /// Job directory for a certificate:
    /// `<sliced-root>/<root-name>/<dir-of-cert-relative-to-root>/<base>/`.
    pub fn job_dir(&self, certificate: &Path) -> Option<PathBuf> {
        let base = base_name(certificate)?;
        let rel_dir = certificate
            .parent()
            .map(|d| d.strip_prefix(&self.root).unwrap_or(Path::new("")))
            .unwrap_or(Path::new(""));
        Some(
            self.sliced_root
                .join(&self.root_name)
                .join(rel_dir)
                .join(base),
        )
    }

    /// Renders `path` relative to the corpus root.
    pub fn rel_to_root(&self, path: &Path) -> String {
        rel_display(path, &self.root)
    }

    /// Renders `path` relative to the output root.
    pub fn rel_to_out(&self, path: &Path) -> String {
        rel_display(path, &self.out_root)
    }
}

/// Base name of a certificate: the file name minus the dual extension.
pub fn base_name(certificate: &Path) -> Option<String> {
    certificate
        .file_name()?
        .to_str()?
        .strip_suffix(CERTIFICATE_SUFFIX)
        .map(str::to_string)
}

/// File name of the slice artifact for one hole.
pub fn slice_file_name(base: &str, hole: &str) -> String {
    format!("{base}__from-{hole}{CERTIFICATE_SUFFIX}")
}

/// File name of the elaboration log for one hole.
pub fn log_file_name(base: &str, hole: &str) -> String {
    format!("{base}__from-{hole}.{LOG_EXTENSION}")
}

/// Forward-slash rendering of `path` relative to `base`; falls back to the
/// full path when `path` lies outside `base`.
pub fn rel_display(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
