//! Scan events -- the single channel between the scanner and the reporters
//!
//! The scanner publishes [`ScanEvent`]s in a strict order: for every file,
//! `FileStarted` comes first, then that file's findings and failures, then
//! `FileFinished`. `ScanFinished` closes the stream exactly once.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{Finding, SeverityCounts, SourcePath};

// --- event kind names ---

/// A file is about to be parsed
pub const EVENT_FILE_STARTED: &str = "file_started";
/// A rule matched
pub const EVENT_FINDING: &str = "finding";
/// A file could not be parsed
pub const EVENT_PARSE_FAILED: &str = "parse_failed";
/// A rule predicate failed and was disabled for the file
pub const EVENT_RULE_FAILED: &str = "rule_failed";
/// The enumerator could not read a path
pub const EVENT_PATH_SKIPPED: &str = "path_skipped";
/// A file is done
pub const EVENT_FILE_FINISHED: &str = "file_finished";
/// The scan is done
pub const EVENT_SCAN_FINISHED: &str = "scan_finished";

/// One step of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// Processing of a file begins
    FileStarted(SourcePath),
    /// A rule matched a node
    FindingEmitted(Finding),
    /// The file could not be parsed; no rules ran on it
    ParseFailed { path: SourcePath, reason: String },
    /// A rule failed on this file and was skipped for the rest of it
    RuleFailed {
        path: SourcePath,
        rule_id: String,
        line: usize,
        reason: String,
    },
    /// An unreadable directory entry was skipped during enumeration
    PathSkipped { path: PathBuf, reason: String },
    /// Processing of a file ends
    FileFinished(SourcePath),
    /// The scan ends
    ScanFinished(ScanSummary),
}

impl ScanEvent {
    /// Stable event kind name, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileStarted(_) => EVENT_FILE_STARTED,
            Self::FindingEmitted(_) => EVENT_FINDING,
            Self::ParseFailed { .. } => EVENT_PARSE_FAILED,
            Self::RuleFailed { .. } => EVENT_RULE_FAILED,
            Self::PathSkipped { .. } => EVENT_PATH_SKIPPED,
            Self::FileFinished(_) => EVENT_FILE_FINISHED,
            Self::ScanFinished(_) => EVENT_SCAN_FINISHED,
        }
    }

    /// The source file this event belongs to, if any.
    pub fn source_path(&self) -> Option<&SourcePath> {
        match self {
            Self::FileStarted(path)
            | Self::FileFinished(path)
            | Self::ParseFailed { path, .. }
            | Self::RuleFailed { path, .. } => Some(path),
            Self::FindingEmitted(finding) => Some(&finding.path),
            Self::PathSkipped { .. } | Self::ScanFinished(_) => None,
        }
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileStarted(path) => write!(f, "FileStarted[{path}]"),
            Self::FindingEmitted(finding) => write!(f, "FindingEmitted[{finding}]"),
            Self::ParseFailed { path, reason } => write!(f, "ParseFailed[{path}] {reason}"),
            Self::RuleFailed {
                path,
                rule_id,
                line,
                reason,
            } => write!(f, "RuleFailed[{path}:{line}] {rule_id}: {reason}"),
            Self::PathSkipped { path, reason } => {
                write!(f, "PathSkipped[{}] {reason}", path.display())
            }
            Self::FileFinished(path) => write!(f, "FileFinished[{path}]"),
            Self::ScanFinished(summary) => write!(f, "ScanFinished[{summary}]"),
        }
    }
}

/// Totals for one scan, computed when the scan finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Files that got a `FileStarted` event
    pub files_scanned: usize,
    /// Files that failed to parse
    pub parse_failures: usize,
    /// Findings per severity
    pub findings: SeverityCounts,
    /// Rule predicates that failed (not findings)
    pub rule_failures: usize,
    /// Paths the enumerator could not read
    pub paths_skipped: usize,
    /// The overall timeout stopped enumeration early
    pub timed_out: bool,
}

impl ScanSummary {
    /// Total number of findings.
    pub fn total_findings(&self) -> usize {
        self.findings.total()
    }

    /// Returns `true` when nothing was found and every file parsed.
    pub fn is_clean(&self) -> bool {
        self.total_findings() == 0 && self.parse_failures == 0
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "files={} findings={} parse_failures={}",
            self.files_scanned,
            self.total_findings(),
            self.parse_failures,
        )
    }
}

/// Process exit status of a scan invocation.
///
/// | Code | Meaning                                         |
/// |------|-------------------------------------------------|
/// | 0    | No findings and no parse failures               |
/// | 1    | At least one finding or parse failure           |
/// | 2    | Configuration error, the scan never started     |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScanExitCode {
    #[default]
    Clean,
    IssuesFound,
    ConfigError,
}

impl ScanExitCode {
    /// Maps a finished scan to its exit status.
    pub fn from_summary(summary: &ScanSummary) -> Self {
        if summary.is_clean() {
            Self::Clean
        } else {
            Self::IssuesFound
        }
    }

    /// Numeric process exit code.
    pub fn code(self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::IssuesFound => 1,
            Self::ConfigError => 2,
        }
    }
}
