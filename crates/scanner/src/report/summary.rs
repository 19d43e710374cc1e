//! End-of-scan totals

use std::io::{self, Write};

use colored::Colorize;

use parsec_core::event::ScanSummary;
use parsec_core::types::Severity;

use super::Reporter;

/// Prints scan totals once the scan finishes.
pub struct SummaryReporter<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> SummaryReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_owned()
        }
    }
}

impl<W: Write> Reporter for SummaryReporter<W> {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn scan_finished(&mut self, summary: &ScanSummary) -> io::Result<()> {
        let heading = self.heading("Scan summary");
        writeln!(self.out)?;
        writeln!(self.out, "{heading}")?;
        writeln!(self.out, "  Files scanned:  {}", summary.files_scanned)?;
        writeln!(self.out, "  Parse failures: {}", summary.parse_failures)?;
        writeln!(self.out, "  Findings:       {}", summary.total_findings())?;
        for severity in Severity::ALL {
            let count = summary.findings.get(severity);
            if count > 0 {
                writeln!(self.out, "    {:<9} {count}", format!("{severity}:"))?;
            }
        }
        if summary.rule_failures > 0 {
            writeln!(self.out, "  Rule failures:  {}", summary.rule_failures)?;
        }
        if summary.paths_skipped > 0 {
            writeln!(self.out, "  Paths skipped:  {}", summary.paths_skipped)?;
        }
        if summary.timed_out {
            writeln!(self.out, "  Scan stopped early: timeout reached")?;
        }
        self.out.flush()
    }
}
