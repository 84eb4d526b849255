//! Per-job status stream.
//!
//! The driver emits exactly one JSON object per line to its status sink
//! (stdout in the binary) for every job it touches, independent of the
//! ledger. `status` is one of `ok`, `not_found`, `slice_error`, `error`;
//! `ok` lines carry either the full result record (`cached: false`) or the
//! identifying subset for a replayed cache hit (`cached: true`).

use crate::JobRecord;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum Status {
    Ok,
    NotFound,
    SliceError,
    Error,
}

/// Fresh elaboration outcome: the full record, flattened.
#[derive(Debug, Serialize)]
pub struct ResultLine<'a> {
    status: Status,
    cached: bool,
    #[serde(flatten)]
    record: &'a JobRecord,
}

impl<'a> ResultLine<'a> {
    pub fn new(record: &'a JobRecord) -> Self {
        Self {
            status: Status::Ok,
            cached: false,
            record,
        }
    }
}

/// Cache hit: the elaboration log already existed, nothing was re-run.
#[derive(Debug, Serialize)]
pub struct CachedLine<'a> {
    status: Status,
    cached: bool,
    pub root: &'a str,
    pub certificate_path: String,
    pub hole_name: &'a str,
    pub slice_path: String,
    pub log_path: String,
}

impl<'a> CachedLine<'a> {
    pub fn new(
        root: &'a str,
        certificate_path: String,
        hole_name: &'a str,
        slice_path: String,
        log_path: String,
    ) -> Self {
        Self {
            status: Status::Ok,
            cached: true,
            root,
            certificate_path,
            hole_name,
            slice_path,
            log_path,
        }
    }
}

/// Companion specification file could not be resolved; terminal for the
/// certificate.
#[derive(Debug, Serialize)]
pub struct NotFoundLine<'a> {
    status: Status,
    pub reason: &'a str,
    pub certificate_path: String,
}

impl<'a> NotFoundLine<'a> {
    pub fn new(reason: &'a str, certificate_path: String) -> Self {
        Self {
            status: Status::NotFound,
            reason,
            certificate_path,
        }
    }
}

/// The external tool failed to produce a slice; elaboration never ran.
#[derive(Debug, Serialize)]
pub struct SliceErrorLine<'a> {
    status: Status,
    pub certificate_path: String,
    pub hole_name: &'a str,
    pub line: u32,
    pub stderr_path: Option<String>,
}

impl<'a> SliceErrorLine<'a> {
    pub fn new(
        certificate_path: String,
        hole_name: &'a str,
        line: u32,
        stderr_path: Option<String>,
    ) -> Self {
        Self {
            status: Status::SliceError,
            certificate_path,
            hole_name,
            line,
            stderr_path,
        }
    }
}

/// Any other per-job failure; the campaign continues with the next job.
#[derive(Debug, Serialize)]
pub struct ErrorLine {
    status: Status,
    pub reason: String,
}

impl ErrorLine {
    pub fn new(reason: String) -> Self {
        Self {
            status: Status::Error,
            reason,
        }
    }
}

/// Writes one status line to `sink`.
///
/// Serialization or write failures are reported on stderr; the job itself
/// is never aborted over a status line.
pub fn emit<T: Serialize>(sink: &mut dyn Write, line: &T) {
    match serde_json::to_string(line) {
        Ok(text) => {
            if let Err(e) = writeln!(sink, "{text}") {
                eprintln!("warning: status stream write failed: {e}");
            }
        }
        Err(e) => eprintln!("warning: could not serialize status line: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record() -> JobRecord {
        JobRecord {
            root: "corpus".into(),
            certificate_path: "a.smt2.alethe".into(),
            hole_name: "t1".into(),
            line: 7,
            slice_path: "s".into(),
            spec_path: None,
            log_path: "l".into(),
            ok: false,
            success_count: 0,
            failed_count: 1,
            panicked: false,
            timed_out: false,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_result_line_flattens_record() {
        let rec = record();
        let json = serde_json::to_value(ResultLine::new(&rec)).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cached"], false);
        assert_eq!(json["hole_name"], "t1");
        assert_eq!(json["failed_count"], 1);
    }

    #[test]
    fn test_cached_line_shape() {
        let line = CachedLine::new("corpus", "a.smt2.alethe".into(), "t1", "s".into(), "l".into());
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cached"], true);
        assert!(json.get("success_count").is_none());
    }

    #[test]
    fn test_status_values_are_snake_case() {
        let nf = NotFoundLine::new("matching .smt2 not found", "x.smt2.alethe".into());
        assert_eq!(serde_json::to_value(&nf).unwrap()["status"], "not_found");
        let se = SliceErrorLine::new("x".into(), "t1", 3, None);
        assert_eq!(serde_json::to_value(&se).unwrap()["status"], "slice_error");
        let err = ErrorLine::new("boom".into());
        assert_eq!(serde_json::to_value(&err).unwrap()["status"], "error");
    }

    #[test]
    fn test_emit_writes_one_line() {
        let mut sink: Vec<u8> = Vec::new();
        emit(&mut sink, &ErrorLine::new("bad job".into()));
        let text = String::from_utf8(sink).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with('{') && text.trim_end().ends_with('}'));
    }
}
