//! Scanner -- drives enumeration, parsing and evaluation, and emits events
//!
//! [`Scanner`] consumes the enumerator's [`Entry`] stream and publishes
//! [`ScanEvent`]s to an [`EventBus`]. Every file produces the same group of
//! events in the same position, whether the scan runs sequentially
//! ([`Scanner::scan`]) or on a worker pool ([`Scanner::scan_concurrent`]).
//!
//! # Per-file flow
//!
//! ```text
//! Entry::File --> FileStarted --> SourceParser::parse --+--> Evaluator --> FindingEmitted / RuleFailed
//!                                                       |
//!                                                       +--> ParseFailed
//!                                                                   |
//!                                                             FileFinished
//! ```
//!
//! A parse failure or a failing rule only affects its own file. The only
//! error `scan` itself returns is [`ScannerError::AlreadyUsed`].

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};

use parsec_core::config::ScanConfig;
use parsec_core::error::ConfigError;
use parsec_core::event::{ScanEvent, ScanSummary};
use parsec_core::types::SourcePath;

use crate::enumerator::Entry;
use crate::error::ScannerError;
use crate::evaluator::{Evaluator, FileEvent};
use crate::parser::{PhpParser, SourceParser};
use crate::report::EventBus;
use crate::rule::{RuleFactory, RuleRegistry};

/// How far, in multiples of the worker count, enumeration may run ahead of
/// the oldest entry whose events are not yet published.
pub const REPLAY_WINDOW: usize = 4;

/// Scanner lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScannerState {
    /// Built, not yet scanned
    Idle,
    /// Scan in progress
    Running,
    /// Scan done; the scanner cannot be reused
    Finished,
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: SourcePath,
    pub result: FileResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileResult {
    /// Parsed; the evaluator's findings and rule failures in order
    Analyzed(Vec<FileEvent>),
    /// Not parsed; no rules ran
    ParseFailed(String),
}

/// Parses and evaluates one file.
pub fn analyze(parser: &dyn SourceParser, evaluator: &Evaluator, path: SourcePath) -> FileOutcome {
    let result = match parser.parse(path.as_path()) {
        Ok(tree) => FileResult::Analyzed(evaluator.evaluate(&path, &tree)),
        Err(e) => FileResult::ParseFailed(e.to_string()),
    };
    FileOutcome { path, result }
}

/// Runs one scan.
///
/// A scanner is single-use: build a new one with [`ScannerBuilder`] for the
/// next scan.
pub struct Scanner {
    state: ScannerState,
    parser: Arc<dyn SourceParser>,
    evaluator: Arc<Evaluator>,
    jobs: usize,
    timeout: Option<Duration>,
}

impl Scanner {
    /// Current state name.
    pub fn state_name(&self) -> &'static str {
        match self.state {
            ScannerState::Idle => "idle",
            ScannerState::Running => "running",
            ScannerState::Finished => "finished",
        }
    }

    /// Configured worker count (0 = hardware concurrency).
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Worker count actually used by [`scan_concurrent`](Self::scan_concurrent).
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    fn begin(&mut self) -> Result<(), ScannerError> {
        if self.state != ScannerState::Idle {
            return Err(ScannerError::AlreadyUsed {
                state: self.state_name(),
            });
        }
        self.state = ScannerState::Running;
        Ok(())
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }

    /// Scans every entry in order on the calling thread.
    ///
    /// Each event is published before the scanner moves on.
    pub fn scan<I>(&mut self, entries: I, bus: &mut EventBus<'_>) -> Result<ScanSummary, ScannerError>
    where
        I: IntoIterator<Item = Entry>,
    {
        self.begin()?;

        let scan_id = uuid::Uuid::new_v4();
        let span = info_span!("scan", scan_id = %scan_id, mode = "sequential");
        let _enter = span.enter();

        info!(
            parser = self.parser.name(),
            rules = self.evaluator.rules().len(),
            "scan started"
        );

        let deadline = self.deadline();
        let mut summary = ScanSummary::default();

        let mut entries = entries.into_iter();
        loop {
            if deadline_passed(deadline) {
                summary.timed_out = true;
                break;
            }
            let Some(entry) = entries.next() else {
                break;
            };
            match entry {
                Entry::Skipped { path, reason } => {
                    publish_skipped(bus, &mut summary, path, reason);
                }
                Entry::File(path) => {
                    summary.files_scanned += 1;
                    bus.publish(&ScanEvent::FileStarted(path.clone()));
                    let outcome = analyze(self.parser.as_ref(), &self.evaluator, path);
                    publish_outcome(bus, &mut summary, outcome);
                }
            }
        }

        self.finish(bus, summary)
    }

    /// Scans on a pool of blocking workers.
    ///
    /// At most [`effective_jobs`](Self::effective_jobs) files are in flight,
    /// and enumeration never runs more than [`REPLAY_WINDOW`] times that many
    /// entries ahead of the oldest unpublished one. Results are replayed in
    /// enumeration order, so the published event stream matches
    /// [`scan`](Self::scan) exactly.
    ///
    /// `entries` is pulled on the calling task. A directory walk does
    /// blocking filesystem calls there, which a multi-thread runtime absorbs;
    /// on a current-thread runtime the walk stalls the executor between
    /// worker completions.
    pub async fn scan_concurrent<I>(
        &mut self,
        entries: I,
        bus: &mut EventBus<'_>,
    ) -> Result<ScanSummary, ScannerError>
    where
        I: IntoIterator<Item = Entry>,
    {
        self.begin()?;

        let scan_id = uuid::Uuid::new_v4();
        let workers = self.effective_jobs();
        let span = info_span!("scan", scan_id = %scan_id, mode = "concurrent", workers);

        let summary = async {
            info!(
                parser = self.parser.name(),
                rules = self.evaluator.rules().len(),
                "scan started"
            );
            self.run_pool(entries.into_iter(), workers, bus).await
        }
        .instrument(span.clone())
        .await;

        let _enter = span.enter();
        self.finish(bus, summary)
    }

    async fn run_pool<I>(&self, mut entries: I, workers: usize, bus: &mut EventBus<'_>) -> ScanSummary
    where
        I: Iterator<Item = Entry>,
    {
        let deadline = self.deadline();
        let mut summary = ScanSummary::default();

        let mut tasks: JoinSet<FileOutcome> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, (usize, SourcePath)> = HashMap::new();
        let mut replay = ReplayBuffer::default();
        let mut next_index = 0usize;
        let mut exhausted = false;

        loop {
            while !exhausted
                && tasks.len() < workers
                && next_index - replay.next < workers * REPLAY_WINDOW
            {
                if deadline_passed(deadline) {
                    summary.timed_out = true;
                    exhausted = true;
                    break;
                }
                // blocking walkdir I/O, on the executor thread
                let Some(entry) = entries.next() else {
                    exhausted = true;
                    break;
                };
                match entry {
                    Entry::Skipped { path, reason } => {
                        replay.insert(next_index, Slot::Skipped { path, reason });
                    }
                    Entry::File(path) => {
                        let parser = Arc::clone(&self.parser);
                        let evaluator = Arc::clone(&self.evaluator);
                        let task_path = path.clone();
                        let handle = tasks.spawn_blocking(move || {
                            analyze(parser.as_ref(), &evaluator, task_path)
                        });
                        in_flight.insert(handle.id(), (next_index, path));
                    }
                }
                next_index += 1;
            }
            replay.flush(bus, &mut summary);

            let Some(joined) = tasks.join_next_with_id().await else {
                if exhausted {
                    break;
                }
                continue;
            };

            match joined {
                Ok((id, outcome)) => {
                    if let Some((index, _)) = in_flight.remove(&id) {
                        replay.insert(index, Slot::Done(outcome));
                    }
                }
                Err(join_err) => {
                    let Some((index, path)) = in_flight.remove(&join_err.id()) else {
                        warn!(error = %join_err, "unknown worker task failed");
                        continue;
                    };
                    let reason = if join_err.is_panic() {
                        format!("worker panicked: {}", panic_message(join_err.into_panic()))
                    } else {
                        "worker cancelled".to_owned()
                    };
                    warn!(path = %path, reason = %reason, "worker failed");
                    replay.insert(
                        index,
                        Slot::Done(FileOutcome {
                            path,
                            result: FileResult::ParseFailed(reason),
                        }),
                    );
                }
            }
            replay.flush(bus, &mut summary);
        }

        replay.flush(bus, &mut summary);
        summary
    }

    fn finish(
        &mut self,
        bus: &mut EventBus<'_>,
        summary: ScanSummary,
    ) -> Result<ScanSummary, ScannerError> {
        if summary.timed_out {
            warn!(
                timeout_secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
                files = summary.files_scanned,
                "scan timeout reached, remaining paths were not scanned"
            );
        }

        bus.publish(&ScanEvent::ScanFinished(summary.clone()));
        self.state = ScannerState::Finished;

        info!(
            files = summary.files_scanned,
            findings = summary.total_findings(),
            parse_failures = summary.parse_failures,
            rule_failures = summary.rule_failures,
            skipped = summary.paths_skipped,
            "scan finished"
        );
        Ok(summary)
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn publish_skipped(
    bus: &mut EventBus<'_>,
    summary: &mut ScanSummary,
    path: PathBuf,
    reason: String,
) {
    summary.paths_skipped += 1;
    bus.publish(&ScanEvent::PathSkipped { path, reason });
}

/// Publishes everything after `FileStarted` for one file.
fn publish_outcome(bus: &mut EventBus<'_>, summary: &mut ScanSummary, outcome: FileOutcome) {
    let FileOutcome { path, result } = outcome;
    match result {
        FileResult::Analyzed(events) => {
            debug!(path = %path, events = events.len(), "file analyzed");
            for event in events {
                match event {
                    FileEvent::Finding(finding) => {
                        summary.findings.record(finding.severity);
                        bus.publish(&ScanEvent::FindingEmitted(finding));
                    }
                    FileEvent::RuleFailed {
                        rule_id,
                        line,
                        reason,
                    } => {
                        summary.rule_failures += 1;
                        bus.publish(&ScanEvent::RuleFailed {
                            path: path.clone(),
                            rule_id,
                            line,
                            reason,
                        });
                    }
                }
            }
        }
        FileResult::ParseFailed(reason) => {
            debug!(path = %path, reason = %reason, "file not parsed");
            summary.parse_failures += 1;
            bus.publish(&ScanEvent::ParseFailed {
                path: path.clone(),
                reason,
            });
        }
    }
    bus.publish(&ScanEvent::FileFinished(path));
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

enum Slot {
    Skipped { path: PathBuf, reason: String },
    Done(FileOutcome),
}

/// Holds finished work until every earlier entry has been published.
#[derive(Default)]
struct ReplayBuffer {
    ready: BTreeMap<usize, Slot>,
    next: usize,
}

impl ReplayBuffer {
    fn insert(&mut self, index: usize, slot: Slot) {
        self.ready.insert(index, slot);
    }

    fn flush(&mut self, bus: &mut EventBus<'_>, summary: &mut ScanSummary) {
        while let Some(slot) = self.ready.remove(&self.next) {
            match slot {
                Slot::Skipped { path, reason } => publish_skipped(bus, summary, path, reason),
                Slot::Done(outcome) => {
                    summary.files_scanned += 1;
                    bus.publish(&ScanEvent::FileStarted(outcome.path.clone()));
                    publish_outcome(bus, summary, outcome);
                }
            }
            self.next += 1;
        }
    }
}

/// Builds a [`Scanner`].
pub struct ScannerBuilder {
    evaluator: Option<Evaluator>,
    parser: Option<Arc<dyn SourceParser>>,
    jobs: usize,
    max_file_size: u64,
    timeout: Option<Duration>,
}

impl ScannerBuilder {
    /// Sequential scanner, every built-in rule, default PHP parser.
    pub fn new() -> Self {
        Self {
            evaluator: None,
            parser: None,
            jobs: 1,
            max_file_size: crate::parser::php::DEFAULT_MAX_FILE_SIZE,
            timeout: None,
        }
    }

    /// Takes jobs, size limit, timeout and rule filters from `[scan]`.
    ///
    /// Unknown rule ids in the filters fail here, before any file is read.
    pub fn from_config(config: &ScanConfig, registry: &RuleRegistry) -> Result<Self, ScannerError> {
        let rules = RuleFactory::new(&config.include_tests, &config.exclude_tests).create(registry)?;
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Ok(Self::new()
            .evaluator(Evaluator::new(rules))
            .jobs(config.jobs)
            .max_file_size(config.max_file_size)
            .timeout(timeout))
    }

    pub fn evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Replaces the PHP parser. `max_file_size` is then up to the parser.
    pub fn parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Worker count for [`Scanner::scan_concurrent`]; 0 = hardware concurrency.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Stop pulling new entries once `timeout` has elapsed.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Scanner, ScannerError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.max_file_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        let evaluator = match self.evaluator {
            Some(evaluator) => evaluator,
            None => Evaluator::new(RuleFactory::default().create(&RuleRegistry::builtin())?),
        };
        let parser = self.parser.unwrap_or_else(|| {
            Arc::new(PhpParser::new().with_max_file_size(self.max_file_size))
        });

        Ok(Scanner {
            state: ScannerState::Idle,
            parser,
            evaluator: Arc::new(evaluator),
            jobs: self.jobs,
            timeout: self.timeout,
        })
    }
}

impl Default for ScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io;
    use std::path::Path;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use parsec_core::error::ParseError;

    use crate::enumerator::FileIterator;
    use crate::parser::SyntaxTree;
    use crate::report::Reporter;

    struct Recorder<'r>(&'r mut Vec<ScanEvent>);

    impl Reporter for Recorder<'_> {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&mut self, event: &ScanEvent) -> io::Result<()> {
            self.0.push(event.clone());
            Ok(())
        }
    }

    /// Panics on files named `boom.php`, defers to the PHP parser otherwise.
    struct Flaky;

    impl SourceParser for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn parse(&self, path: &Path) -> Result<SyntaxTree, ParseError> {
            if path.ends_with("boom.php") {
                panic!("parser crashed");
            }
            PhpParser::new().parse(path)
        }
    }

    /// Holds up `a.php` and records how many parses had begun when it resumed.
    struct SlowHead {
        started: Arc<AtomicUsize>,
        seen_by_head: Arc<AtomicUsize>,
    }

    impl SourceParser for SlowHead {
        fn name(&self) -> &str {
            "slow-head"
        }

        fn parse(&self, path: &Path) -> Result<SyntaxTree, ParseError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if path.ends_with("a.php") {
                std::thread::sleep(Duration::from_millis(300));
                self.seen_by_head
                    .store(self.started.load(Ordering::SeqCst), Ordering::SeqCst);
            }
            PhpParser::new().parse(path)
        }
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.php"), "<?php\n$x = ;\n").unwrap();
        fs::write(dir.path().join("b.php"), "<?php\necho 'clean';\n").unwrap();
        fs::write(dir.path().join("c.php"), "<?php\neval($code);\n").unwrap();
        dir
    }

    fn entries(dir: &Path) -> FileIterator {
        FileIterator::new([dir], &["php".to_owned()]).unwrap()
    }

    fn kinds(events: &[ScanEvent]) -> Vec<&'static str> {
        events.iter().map(ScanEvent::kind).collect()
    }

    #[test]
    fn builder_defaults() {
        let scanner = ScannerBuilder::new().build().unwrap();
        assert_eq!(scanner.state_name(), "idle");
        assert_eq!(scanner.jobs(), 1);
        assert!(scanner.timeout().is_none());
        assert_eq!(
            scanner.evaluator().rules().len(),
            RuleRegistry::builtin().len()
        );
    }

    #[test]
    fn builder_rejects_zero_max_file_size() {
        let err = ScannerBuilder::new().max_file_size(0).build().err().unwrap();
        assert!(matches!(err, ScannerError::Config(_)));
    }

    #[test]
    fn from_config_applies_rule_filters() {
        let config = ScanConfig {
            exclude_tests: vec!["WeakHashFunction".to_owned()],
            jobs: 3,
            timeout_secs: 5,
            ..Default::default()
        };
        let scanner = ScannerBuilder::from_config(&config, &RuleRegistry::builtin())
            .unwrap()
            .build()
            .unwrap();
        assert!(!scanner.evaluator().rules().contains("WeakHashFunction"));
        assert_eq!(scanner.jobs(), 3);
        assert_eq!(scanner.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn from_config_rejects_unknown_rule() {
        let config = ScanConfig {
            include_tests: vec!["NoSuchRule".to_owned()],
            ..Default::default()
        };
        let err = ScannerBuilder::from_config(&config, &RuleRegistry::builtin())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ScannerError::Config(ConfigError::UnknownRule { .. })
        ));
    }

    #[test]
    fn sequential_scan_emits_nested_events() {
        let dir = tree();
        let mut events = Vec::new();
        let mut scanner = ScannerBuilder::new().build().unwrap();
        let summary = {
            let mut bus = EventBus::new().with_reporter(Recorder(&mut events));
            let summary = scanner.scan(entries(dir.path()), &mut bus).unwrap();
            assert_eq!(bus.exit_code().code(), 1);
            summary
        };

        assert_eq!(
            kinds(&events),
            vec![
                "file_started",
                "parse_failed",
                "file_finished",
                "file_started",
                "file_finished",
                "file_started",
                "finding",
                "file_finished",
                "scan_finished",
            ]
        );
        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.parse_failures, 1);
        assert_eq!(summary.total_findings(), 1);
        assert_eq!(scanner.state_name(), "finished");
    }

    #[test]
    fn second_scan_is_rejected() {
        let mut scanner = ScannerBuilder::new().build().unwrap();
        let mut bus = EventBus::new();
        scanner.scan(Vec::new(), &mut bus).unwrap();
        let err = scanner.scan(Vec::new(), &mut bus).unwrap_err();
        assert!(matches!(err, ScannerError::AlreadyUsed { state: "finished" }));
    }

    #[test]
    fn empty_input_still_finishes() {
        let mut events = Vec::new();
        let mut scanner = ScannerBuilder::new().build().unwrap();
        let summary = {
            let mut bus = EventBus::new().with_reporter(Recorder(&mut events));
            scanner.scan(Vec::new(), &mut bus).unwrap()
        };
        assert_eq!(kinds(&events), vec!["scan_finished"]);
        assert!(summary.is_clean());
    }

    #[test]
    fn skipped_entries_are_counted() {
        let mut scanner = ScannerBuilder::new().build().unwrap();
        let mut bus = EventBus::new();
        let summary = scanner
            .scan(
                vec![Entry::Skipped {
                    path: "locked".into(),
                    reason: "permission denied".to_owned(),
                }],
                &mut bus,
            )
            .unwrap();
        assert_eq!(summary.paths_skipped, 1);
        assert_eq!(bus.exit_code().code(), 0);
    }

    #[test]
    fn zero_timeout_scans_nothing() {
        let dir = tree();
        let mut scanner = ScannerBuilder::new()
            .timeout(Some(Duration::ZERO))
            .build()
            .unwrap();
        let mut bus = EventBus::new();
        let summary = scanner.scan(entries(dir.path()), &mut bus).unwrap();
        assert!(summary.timed_out);
        assert_eq!(summary.files_scanned, 0);
        assert_eq!(bus.exit_code().code(), 0);
    }

    #[tokio::test]
    async fn concurrent_scan_matches_sequential() {
        let dir = tree();
        for extra in 0..6 {
            fs::write(
                dir.path().join(format!("d{extra}.php")),
                format!("<?php\nsystem($c{extra});\nmd5($p);\n"),
            )
            .unwrap();
        }

        let mut sequential = Vec::new();
        {
            let mut bus = EventBus::new().with_reporter(Recorder(&mut sequential));
            ScannerBuilder::new()
                .build()
                .unwrap()
                .scan(entries(dir.path()), &mut bus)
                .unwrap();
        }

        let mut concurrent = Vec::new();
        {
            let mut bus = EventBus::new().with_reporter(Recorder(&mut concurrent));
            ScannerBuilder::new()
                .jobs(4)
                .build()
                .unwrap()
                .scan_concurrent(entries(dir.path()), &mut bus)
                .await
                .unwrap();
        }

        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn worker_panic_becomes_parse_failure() {
        let dir = tree();
        fs::write(dir.path().join("boom.php"), "<?php").unwrap();

        let mut events = Vec::new();
        let summary = {
            let mut bus = EventBus::new().with_reporter(Recorder(&mut events));
            ScannerBuilder::new()
                .parser(Arc::new(Flaky))
                .jobs(2)
                .build()
                .unwrap()
                .scan_concurrent(entries(dir.path()), &mut bus)
                .await
                .unwrap()
        };

        assert_eq!(summary.files_scanned, 4);
        assert_eq!(summary.parse_failures, 2);
        let crash = events.iter().find_map(|e| match e {
            ScanEvent::ParseFailed { path, reason } if path.as_path().ends_with("boom.php") => {
                Some(reason.clone())
            }
            _ => None,
        });
        assert!(crash.unwrap().contains("parser crashed"));
    }

    #[tokio::test]
    async fn concurrent_scan_is_single_use() {
        let mut scanner = ScannerBuilder::new().jobs(0).build().unwrap();
        assert!(scanner.effective_jobs() >= 1);
        let mut bus = EventBus::new();
        scanner.scan_concurrent(Vec::new(), &mut bus).await.unwrap();
        assert!(scanner.scan_concurrent(Vec::new(), &mut bus).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_head_file_bounds_read_ahead() {
        let dir = tree();
        for n in 0..24 {
            fs::write(
                dir.path().join(format!("f{n:02}.php")),
                format!("<?php\necho {n};\n"),
            )
            .unwrap();
        }
        let workers = 2;
        let started = Arc::new(AtomicUsize::new(0));
        let seen_by_head = Arc::new(AtomicUsize::new(0));

        let mut sequential = Vec::new();
        {
            let mut bus = EventBus::new().with_reporter(Recorder(&mut sequential));
            ScannerBuilder::new()
                .build()
                .unwrap()
                .scan(entries(dir.path()), &mut bus)
                .unwrap();
        }

        let mut concurrent = Vec::new();
        {
            let mut bus = EventBus::new().with_reporter(Recorder(&mut concurrent));
            ScannerBuilder::new()
                .parser(Arc::new(SlowHead {
                    started: Arc::clone(&started),
                    seen_by_head: Arc::clone(&seen_by_head),
                }))
                .jobs(workers)
                .build()
                .unwrap()
                .scan_concurrent(entries(dir.path()), &mut bus)
                .await
                .unwrap();
        }

        assert_eq!(started.load(Ordering::SeqCst), 27);
        assert!(seen_by_head.load(Ordering::SeqCst) <= workers * REPLAY_WINDOW);
        assert_eq!(sequential, concurrent);
    }
}
