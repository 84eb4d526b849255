//! Certificate discovery and hole extraction.
//!
//! A certificate is any file whose name ends in [`CERTIFICATE_SUFFIX`]. A
//! hole is a proof step marked with [`HOLE_MARKER`], meaning the step was
//! admitted on trust and still needs to be discharged. Extraction is a
//! line-oriented scan with an explicit bounded-delimiter tokenizer — no
//! regex engine: after the `(step` keyword and at least one whitespace
//! character, the step name is the maximal run of characters that are
//! neither whitespace nor `)`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::layout::SLICED_DIR_NAME;

/// Dual extension identifying a proof certificate.
pub const CERTIFICATE_SUFFIX: &str = ".smt2.alethe";

/// Marker on a proof step that was admitted on trust.
pub const HOLE_MARKER: &str = "TRUST_THEORY_REWRITE";

/// Keyword opening a step s-expression; the step name follows it.
const STEP_KEYWORD: &str = "(step";

/// A trusted step extracted from a certificate: name plus 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hole {
    pub name: String,
    pub line: u32,
}

/// Lazily walks `root` and yields every certificate file, in lexicographic
/// order per directory so reruns visit the corpus deterministically.
///
/// The output tree (`sliced_proofs`) is excluded from the walk: a campaign
/// whose output root sits inside the corpus never rescans its own slices.
/// Walk errors (unreadable directories) are skipped silently.
pub fn certificates(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name().to_str() != Some(SLICED_DIR_NAME))
        .flatten()
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(CERTIFICATE_SUFFIX))
        })
}

/// Extracts the actionable holes from one certificate.
///
/// Lines are scanned once (lossy UTF-8, 1-based numbering). A line yields a
/// candidate when it contains [`HOLE_MARKER`] and a step name can be
/// extracted. Names containing `.` are already-qualified derivations of
/// another step and are dropped; the rest dedup by name, first occurrence
/// wins.
///
/// Unreadable files yield an empty set — a single bad file never aborts a
/// corpus scan.
pub fn holes_in_certificate(path: &Path) -> Vec<Hole> {
    let Ok(bytes) = std::fs::read(path) else {
        return Vec::new();
    };
    let text = String::from_utf8_lossy(&bytes);

    let mut seen: HashSet<&str> = HashSet::new();
    let mut holes = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if !line.contains(HOLE_MARKER) {
            continue;
        }
        let Some(name) = step_name(line) else { continue };
        if name.contains('.') {
            continue;
        }
        if seen.insert(name) {
            holes.push(Hole {
                name: name.to_string(),
                line: idx as u32 + 1,
            });
        }
    }
    holes
}

/// Extracts the step name from a certificate line.
///
/// Returns the first non-empty run after `(step ` that stops at whitespace
/// or `)`. The keyword must be followed by at least one whitespace
/// character.
pub fn step_name(line: &str) -> Option<&str> {
    let rest = &line[line.find(STEP_KEYWORD)? + STEP_KEYWORD.len()..];
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        // `(stepX` — not the keyword.
        return None;
    }
    let end = trimmed
        .find(|c: char| c.is_whitespace() || c == ')')
        .unwrap_or(trimmed.len());
    (end > 0).then(|| &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_step_name_terminated_by_space() {
        assert_eq!(
            step_name("(step t12 (cl) :rule TRUST_THEORY_REWRITE)"),
            Some("t12")
        );
    }

    #[test]
    fn test_step_name_terminated_by_paren() {
        assert_eq!(step_name("(step t42)"), Some("t42"));
    }

    #[test]
    fn test_step_name_requires_whitespace_after_keyword() {
        assert_eq!(step_name("(stept12 x)"), None);
        assert_eq!(step_name("(step"), None);
        assert_eq!(step_name("no step here"), None);
    }

    #[test]
    fn test_hole_dedup_first_occurrence_wins() {
        let dir = tempdir().unwrap();
        let cert = dir.path().join("proof.smt2.alethe");
        fs::write(
            &cert,
            concat!(
                "(step h1 (cl) :rule TRUST_THEORY_REWRITE)\n",
                "(step h1.sub (cl) :rule TRUST_THEORY_REWRITE)\n",
                "(step h1 (cl) :rule TRUST_THEORY_REWRITE)\n",
                "(step h2 (cl) :rule TRUST_THEORY_REWRITE)\n",
                "(step h3 (cl) :rule resolution)\n",
            ),
        )
        .unwrap();

        let holes = holes_in_certificate(&cert);
        assert_eq!(
            holes,
            vec![
                Hole {
                    name: "h1".into(),
                    line: 1
                },
                Hole {
                    name: "h2".into(),
                    line: 4
                },
            ]
        );
    }

    #[test]
    fn test_marker_without_step_is_ignored() {
        let dir = tempdir().unwrap();
        let cert = dir.path().join("odd.smt2.alethe");
        fs::write(&cert, "; TRUST_THEORY_REWRITE appears in a comment\n").unwrap();
        assert!(holes_in_certificate(&cert).is_empty());
    }

    #[test]
    fn test_unreadable_file_yields_empty_set() {
        assert!(holes_in_certificate(Path::new("/no/such/file.smt2.alethe")).is_empty());
    }

    #[test]
    fn test_certificates_filters_by_suffix_and_sorts() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/two.smt2.alethe"), "").unwrap();
        fs::write(dir.path().join("a_one.smt2.alethe"), "").unwrap();
        fs::write(dir.path().join("ignore.smt2"), "").unwrap();
        fs::write(dir.path().join("ignore.alethe"), "").unwrap();

        let found: Vec<String> = certificates(dir.path())
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(found, vec!["a_one.smt2.alethe", "two.smt2.alethe"]);
    }

    #[test]
    fn test_certificates_skips_output_tree() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("sliced_proofs/corpus/case");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("case__from-t1.smt2.alethe"), "").unwrap();
        fs::write(dir.path().join("real.smt2.alethe"), "").unwrap();

        let found: Vec<PathBuf> = certificates(dir.path()).collect();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("real.smt2.alethe"));
    }
}
