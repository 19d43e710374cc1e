//! Plain-text findings output

use std::io::{self, Write};
use std::path::Path;

use colored::{ColoredString, Colorize};

use parsec_core::types::{Finding, Severity, SourcePath};

use super::Reporter;

/// How much the console reporter prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// `path:line: message`
    #[default]
    Standard,
    /// Adds the column and the rule id
    Verbose,
    /// Adds per-file markers, parse errors, rule failures and skipped paths
    Debug,
}

impl Verbosity {
    /// Maps a `-v` count to a tier; anything past 2 is `Debug`.
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Self::Standard,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }
}

/// Writes one line per finding to `W`.
pub struct ConsoleReporter<W: Write> {
    out: W,
    verbosity: Verbosity,
    color: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbosity: Verbosity) -> Self {
        Self {
            out,
            verbosity,
            color: false,
        }
    }

    /// Enables ANSI colours.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn paint(&self, text: &str, severity: Severity) -> String {
        if !self.color {
            return text.to_owned();
        }
        let painted: ColoredString = match severity {
            Severity::Critical => text.red().bold(),
            Severity::High => text.red(),
            Severity::Medium => text.yellow(),
            Severity::Low => text.cyan(),
            Severity::Info => text.normal(),
        };
        painted.to_string()
    }

    fn debug_line(&mut self, line: std::fmt::Arguments<'_>) -> io::Result<()> {
        if self.verbosity < Verbosity::Debug {
            return Ok(());
        }
        if self.color {
            writeln!(self.out, "{}", line.to_string().dimmed())
        } else {
            writeln!(self.out, "{line}")
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn name(&self) -> &'static str {
        "console"
    }

    fn file_started(&mut self, path: &SourcePath) -> io::Result<()> {
        self.debug_line(format_args!(">> scanning {path}"))
    }

    fn finding(&mut self, finding: &Finding) -> io::Result<()> {
        match self.verbosity {
            Verbosity::Standard => {
                let message = self.paint(&finding.message, finding.severity);
                writeln!(self.out, "{}:{}: {message}", finding.path, finding.line)
            }
            Verbosity::Verbose | Verbosity::Debug => {
                let location = match finding.column {
                    Some(column) => format!("{}:{}:{column}", finding.path, finding.line),
                    None => format!("{}:{}", finding.path, finding.line),
                };
                let rule = self.paint(&format!("[{}]", finding.rule_id), finding.severity);
                writeln!(self.out, "{location}: {rule} {}", finding.message)
            }
        }
    }

    fn parse_failed(&mut self, path: &SourcePath, reason: &str) -> io::Result<()> {
        self.debug_line(format_args!("!! parse error in {path}: {reason}"))
    }

    fn rule_failed(
        &mut self,
        path: &SourcePath,
        rule_id: &str,
        line: usize,
        reason: &str,
    ) -> io::Result<()> {
        self.debug_line(format_args!(
            "!! rule {rule_id} failed in {path} at line {line}: {reason}"
        ))
    }

    fn path_skipped(&mut self, path: &Path, reason: &str) -> io::Result<()> {
        self.debug_line(format_args!("!! skipped {}: {reason}", path.display()))
    }

    fn file_finished(&mut self, path: &SourcePath) -> io::Result<()> {
        self.debug_line(format_args!("<< finished {path}"))
    }

    fn scan_finished(&mut self, _summary: &parsec_core::event::ScanSummary) -> io::Result<()> {
        self.out.flush()
    }
}
