//! Append-only JSON-array result ledger.
//!
//! The ledger is a single JSON array on disk that must parse after every
//! successful append, across kills and reruns, without rewriting the whole
//! file per record. A sidecar index (`<ledger>.idx`) tracks the byte offset
//! of the final `]`; each append validates the index, splices
//! `,\n<record>\n]` in at that offset, then rewrites the index.
//!
//! ## Recovery
//! When the index and the file disagree, recovery runs in order:
//! 1. full parse-modify-rewrite of the array (lossless);
//! 2. truncate back to the indexed bracket and restore `]` — recovers
//!    everything up to the last known-good append when a splice was torn
//!    mid-write;
//! 3. reset to a one-element array — lossy, and always surfaced as a
//!    warning on stderr, never silent.
//!
//! The only supported invalidation is manual deletion of the ledger file;
//! the driver never truncates or rewrites it outside the recovery path.

use common::JobRecord;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Errors from ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum AnnalistError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// How an append landed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// File was absent or empty; created as a one-element array.
    Created,
    /// Record spliced in at the indexed closing bracket.
    Spliced,
    /// Index was unusable; the whole array was reparsed and rewritten.
    Rewritten,
    /// Tail was corrupt; contents up to the indexed bracket were salvaged.
    Recovered,
    /// Nothing salvageable; ledger restarted with just this record.
    Reset,
}

/// Single-writer handle on a ledger file.
pub struct Ledger {
    path: PathBuf,
    index_path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let index_path = index_path_for(&path);
        Self { path, index_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record; the file parses as a JSON array afterwards.
    pub fn append(&self, record: &JobRecord) -> Result<Append, AnnalistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let len = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            self.write_array(&[serde_json::to_value(record)?])?;
            return Ok(Append::Created);
        }
        if let Some(offset) = self.read_index() {
            if self.try_splice(offset, len, record)? {
                return Ok(Append::Spliced);
            }
        }
        self.rewrite_fallback(record)
    }

    /// Fast path: verify the indexed byte really is the final `]` with only
    /// whitespace behind it, then splice the record in before it.
    fn try_splice(&self, offset: u64, len: u64, record: &JobRecord) -> Result<bool, AnnalistError> {
        if offset >= len {
            return Ok(false);
        }
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail)?;
        if tail.first() != Some(&b']') || !tail[1..].iter().all(u8::is_ascii_whitespace) {
            return Ok(false);
        }

        let entry = indent_record(record)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(format!(",\n{entry}\n]\n").as_bytes())?;
        let end = file.stream_position()?;
        file.set_len(end)?;
        file.sync_all()?;
        // The bracket now sits just before the trailing newline.
        self.write_index(end - 2)?;
        Ok(true)
    }

    fn rewrite_fallback(&self, record: &JobRecord) -> Result<Append, AnnalistError> {
        let bytes = std::fs::read(&self.path)?;

        if let Ok(Value::Array(mut items)) = serde_json::from_slice::<Value>(&bytes) {
            items.push(serde_json::to_value(record)?);
            self.write_array(&items)?;
            return Ok(Append::Rewritten);
        }

        // A torn splice overwrote the bracket; everything before the indexed
        // offset is still the old array body.
        if let Some(offset) = self.read_index() {
            let offset = offset as usize;
            if offset < bytes.len() {
                let mut salvaged = bytes[..offset].to_vec();
                salvaged.push(b']');
                if let Ok(Value::Array(mut items)) = serde_json::from_slice::<Value>(&salvaged) {
                    eprintln!(
                        "warning: ledger {} had a corrupt tail; kept {} records up to the last good bracket",
                        self.path.display(),
                        items.len()
                    );
                    items.push(serde_json::to_value(record)?);
                    self.write_array(&items)?;
                    return Ok(Append::Recovered);
                }
            }
        }

        eprintln!(
            "warning: ledger {} is not a JSON array; resetting it (previous contents discarded)",
            self.path.display()
        );
        self.write_array(&[serde_json::to_value(record)?])?;
        Ok(Append::Reset)
    }

    /// Rewrites the whole array atomically (temp file + rename) and indexes
    /// the new closing bracket.
    fn write_array(&self, items: &[Value]) -> Result<(), AnnalistError> {
        let body = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(body.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        self.write_index(body.len() as u64 - 1)?;
        Ok(())
    }

    fn read_index(&self) -> Option<u64> {
        std::fs::read_to_string(&self.index_path)
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    fn write_index(&self, offset: u64) -> Result<(), AnnalistError> {
        std::fs::write(&self.index_path, format!("{offset}\n"))?;
        Ok(())
    }
}

/// Reads every record from a ledger file; absent files read as empty.
pub fn read_all(path: &Path) -> Result<Vec<JobRecord>, AnnalistError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Sidecar index path: `<ledger>.idx` beside the ledger.
fn index_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".idx");
    PathBuf::from(os)
}

/// Record rendered for splicing: pretty-printed, shifted to array depth.
fn indent_record(record: &JobRecord) -> Result<String, serde_json::Error> {
    let pretty = serde_json::to_string_pretty(record)?;
    Ok(pretty
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn record(hole: &str) -> JobRecord {
        JobRecord {
            root: "corpus".into(),
            certificate_path: "case.smt2.alethe".into(),
            hole_name: hole.into(),
            line: 3,
            slice_path: format!("sliced_proofs/corpus/case/case__from-{hole}.smt2.alethe"),
            spec_path: Some("sliced_proofs/corpus/case/case.smt2".into()),
            log_path: format!("sliced_proofs/corpus/case/case__from-{hole}.out"),
            ok: true,
            success_count: 1,
            failed_count: 0,
            panicked: false,
            timed_out: false,
            elapsed: Duration::from_millis(7),
        }
    }

    #[test]
    fn test_create_then_splice_sequence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let ledger = Ledger::new(&path);

        assert_eq!(ledger.append(&record("t1")).unwrap(), Append::Created);
        assert_eq!(ledger.append(&record("t2")).unwrap(), Append::Spliced);
        assert_eq!(ledger.append(&record("t3")).unwrap(), Append::Spliced);

        let records = read_all(&path).unwrap();
        let holes: Vec<&str> = records.iter().map(|r| r.hole_name.as_str()).collect();
        assert_eq!(holes, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_file_parses_after_every_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let ledger = Ledger::new(&path);

        for n in 0..5 {
            ledger.append(&record(&format!("t{n}"))).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();
            let parsed: Vec<JobRecord> = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed.len(), n + 1);
        }
    }

    #[test]
    fn test_missing_index_falls_back_to_full_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let ledger = Ledger::new(&path);
        ledger.append(&record("t1")).unwrap();
        std::fs::remove_file(dir.path().join("results.json.idx")).unwrap();

        assert_eq!(ledger.append(&record("t2")).unwrap(), Append::Rewritten);
        assert_eq!(read_all(&path).unwrap().len(), 2);
        // Splicing resumes once the index is rebuilt.
        assert_eq!(ledger.append(&record("t3")).unwrap(), Append::Spliced);
    }

    #[test]
    fn test_torn_splice_recovers_to_last_good_bracket() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let ledger = Ledger::new(&path);
        ledger.append(&record("t1")).unwrap();
        ledger.append(&record("t2")).unwrap();

        // Simulate a crash mid-splice: the bracket got overwritten by a
        // partial record and the index was never updated.
        let offset: u64 = std::fs::read_to_string(dir.path().join("results.json.idx"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(offset as usize);
        bytes.extend_from_slice(b",\n  {\"root\": \"cor");
        std::fs::write(&path, &bytes).unwrap();

        assert_eq!(ledger.append(&record("t3")).unwrap(), Append::Recovered);
        let records = read_all(&path).unwrap();
        let holes: Vec<&str> = records.iter().map(|r| r.hole_name.as_str()).collect();
        assert_eq!(holes, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_garbage_file_resets_with_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, "definitely not json").unwrap();

        let ledger = Ledger::new(&path);
        assert_eq!(ledger.append(&record("t1")).unwrap(), Append::Reset);
        assert_eq!(read_all(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_stale_index_with_valid_file_still_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.json");
        let ledger = Ledger::new(&path);
        ledger.append(&record("t1")).unwrap();

        // Point the index somewhere useless; the file itself is intact.
        std::fs::write(dir.path().join("results.json.idx"), "2\n").unwrap();
        assert_eq!(ledger.append(&record("t2")).unwrap(), Append::Rewritten);
        assert_eq!(read_all(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_read_all_absent_is_empty() {
        let dir = tempdir().unwrap();
        assert!(read_all(&dir.path().join("none.json")).unwrap().is_empty());
    }

    #[test]
    fn test_parent_directories_are_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deep/nested/results.json");
        let ledger = Ledger::new(&path);
        ledger.append(&record("t1")).unwrap();
        assert!(path.is_file());
    }
}
