//! Reporting -- turns the scan event stream into output and an exit code
//!
//! The scanner publishes every [`ScanEvent`] to an [`EventBus`], which hands
//! it to each registered [`Reporter`] in registration order. Reporters only
//! observe; they never change what the scanner does.
//!
//! # Reporters
//! - [`ConsoleReporter`]: one line per finding, three verbosity tiers
//! - [`SummaryReporter`]: totals after the scan
//! - [`XmlReporter`]: one XML document after the scan
//! - [`ExitCodeAggregator`]: always registered, owned by the bus

pub mod console;
pub mod exit_code;
pub mod summary;
pub mod xml;

pub use console::{ConsoleReporter, Verbosity};
pub use exit_code::ExitCodeAggregator;
pub use summary::SummaryReporter;
pub use xml::XmlReporter;

use std::io;
use std::path::Path;

use tracing::warn;

use parsec_core::event::{ScanEvent, ScanExitCode, ScanSummary};
use parsec_core::types::{Finding, SourcePath};

/// Receives scan events. Every method defaults to doing nothing.
///
/// An `Err` is logged by the [`EventBus`] and otherwise ignored.
pub trait Reporter {
    /// Reporter name, used in logs.
    fn name(&self) -> &'static str;

    fn file_started(&mut self, _path: &SourcePath) -> io::Result<()> {
        Ok(())
    }

    fn finding(&mut self, _finding: &Finding) -> io::Result<()> {
        Ok(())
    }

    fn parse_failed(&mut self, _path: &SourcePath, _reason: &str) -> io::Result<()> {
        Ok(())
    }

    fn rule_failed(
        &mut self,
        _path: &SourcePath,
        _rule_id: &str,
        _line: usize,
        _reason: &str,
    ) -> io::Result<()> {
        Ok(())
    }

    fn path_skipped(&mut self, _path: &Path, _reason: &str) -> io::Result<()> {
        Ok(())
    }

    fn file_finished(&mut self, _path: &SourcePath) -> io::Result<()> {
        Ok(())
    }

    fn scan_finished(&mut self, _summary: &ScanSummary) -> io::Result<()> {
        Ok(())
    }

    /// Routes an event to the matching method.
    fn handle(&mut self, event: &ScanEvent) -> io::Result<()> {
        match event {
            ScanEvent::FileStarted(path) => self.file_started(path),
            ScanEvent::FindingEmitted(finding) => self.finding(finding),
            ScanEvent::ParseFailed { path, reason } => self.parse_failed(path, reason),
            ScanEvent::RuleFailed {
                path,
                rule_id,
                line,
                reason,
            } => self.rule_failed(path, rule_id, *line, reason),
            ScanEvent::PathSkipped { path, reason } => self.path_skipped(path, reason),
            ScanEvent::FileFinished(path) => self.file_finished(path),
            ScanEvent::ScanFinished(summary) => self.scan_finished(summary),
        }
    }
}

/// Dispatches events to reporters and tracks the exit code.
pub struct EventBus<'a> {
    reporters: Vec<Box<dyn Reporter + 'a>>,
    exit_code: ExitCodeAggregator,
    published: usize,
}

impl<'a> EventBus<'a> {
    /// Creates a bus holding only the exit-code aggregator.
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
            exit_code: ExitCodeAggregator::new(),
            published: 0,
        }
    }

    /// Appends a reporter; reporters see events in registration order.
    pub fn register(&mut self, reporter: Box<dyn Reporter + 'a>) {
        self.reporters.push(reporter);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_reporter(mut self, reporter: impl Reporter + 'a) -> Self {
        self.register(Box::new(reporter));
        self
    }

    /// Sends one event to the aggregator and then every reporter.
    pub fn publish(&mut self, event: &ScanEvent) {
        self.published += 1;

        // the aggregator never does I/O
        let _ = self.exit_code.handle(event);

        for reporter in &mut self.reporters {
            if let Err(e) = reporter.handle(event) {
                warn!(
                    reporter = reporter.name(),
                    event = event.kind(),
                    error = %e,
                    "reporter failed to write output"
                );
            }
        }
    }

    /// Exit code implied by the events published so far.
    pub fn exit_code(&self) -> ScanExitCode {
        self.exit_code.exit_code()
    }

    /// Number of reporters, not counting the aggregator.
    pub fn reporter_count(&self) -> usize {
        self.reporters.len()
    }

    /// Number of events published.
    pub fn published(&self) -> usize {
        self.published
    }
}

impl Default for EventBus<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use parsec_core::types::Severity;

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Reporter for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&mut self, event: &ScanEvent) -> io::Result<()> {
            self.0.borrow_mut().push(event.kind().to_owned());
            Ok(())
        }
    }

    struct Broken;

    impl Reporter for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn file_started(&mut self, _path: &SourcePath) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    fn finding() -> Finding {
        Finding {
            rule_id: "EvalFunction".to_owned(),
            path: SourcePath::new("a.php"),
            line: 1,
            column: None,
            severity: Severity::Critical,
            message: "eval".to_owned(),
        }
    }

    #[test]
    fn new_bus_is_clean() {
        let bus = EventBus::new();
        assert_eq!(bus.exit_code(), ScanExitCode::Clean);
        assert_eq!(bus.reporter_count(), 0);
    }

    #[test]
    fn publishes_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new()
            .with_reporter(Recorder(Rc::clone(&log)))
            .with_reporter(Recorder(Rc::clone(&log)));

        bus.publish(&ScanEvent::FileStarted(SourcePath::new("a.php")));
        assert_eq!(*log.borrow(), vec!["file_started", "file_started"]);
        assert_eq!(bus.published(), 1);
    }

    #[test]
    fn reporter_error_does_not_stop_dispatch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new()
            .with_reporter(Broken)
            .with_reporter(Recorder(Rc::clone(&log)));

        bus.publish(&ScanEvent::FileStarted(SourcePath::new("a.php")));
        bus.publish(&ScanEvent::FindingEmitted(finding()));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(bus.exit_code(), ScanExitCode::IssuesFound);
    }

    #[test]
    fn default_handle_routes_by_kind() {
        struct Counter(usize);
        impl Reporter for Counter {
            fn name(&self) -> &'static str {
                "counter"
            }
            fn finding(&mut self, _finding: &Finding) -> io::Result<()> {
                self.0 += 1;
                Ok(())
            }
        }

        let mut counter = Counter(0);
        counter.handle(&ScanEvent::FindingEmitted(finding())).unwrap();
        counter
            .handle(&ScanEvent::FileFinished(SourcePath::new("a.php")))
            .unwrap();
        assert_eq!(counter.0, 1);
    }
}
