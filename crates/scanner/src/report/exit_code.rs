//! Exit-code aggregation

use std::io;

use parsec_core::event::{ScanExitCode, ScanSummary};
use parsec_core::types::{Finding, SourcePath};

use super::Reporter;

/// Tracks the worst outcome seen so far.
///
/// Findings and parse failures raise the code to
/// [`ScanExitCode::IssuesFound`]. Rule failures, skipped paths and timeouts
/// leave it unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitCodeAggregator {
    worst: ScanExitCode,
}

impl ExitCodeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_code(&self) -> ScanExitCode {
        self.worst
    }

    fn raise(&mut self, code: ScanExitCode) {
        self.worst = self.worst.max(code);
    }
}

impl Reporter for ExitCodeAggregator {
    fn name(&self) -> &'static str {
        "exit-code"
    }

    fn finding(&mut self, _finding: &Finding) -> io::Result<()> {
        self.raise(ScanExitCode::IssuesFound);
        Ok(())
    }

    fn parse_failed(&mut self, _path: &SourcePath, _reason: &str) -> io::Result<()> {
        self.raise(ScanExitCode::IssuesFound);
        Ok(())
    }

    fn scan_finished(&mut self, summary: &ScanSummary) -> io::Result<()> {
        self.raise(ScanExitCode::from_summary(summary));
        Ok(())
    }
}
