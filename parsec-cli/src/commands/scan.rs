//! `parsec scan` command handler

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use tracing::info;

use parsec_core::config::{ParsecConfig, ScanConfig, split_csv};
use parsec_core::error::ConfigError;
use parsec_core::event::ScanExitCode;
use parsec_scanner::{
    ConsoleReporter, EventBus, FileIterator, RuleRegistry, ScannerBuilder, SummaryReporter,
    Verbosity, XmlReporter,
};

use crate::cli::ScanArgs;
use crate::error::CliError;

/// Report format selected by `--format` / `scan.format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Txt,
    Xml,
}

impl ReportFormat {
    /// Case-insensitive; anything else is a configuration error.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_lowercase().as_str() {
            "txt" => Ok(Self::Txt),
            "xml" => Ok(Self::Xml),
            _ => Err(ConfigError::UnknownFormat(value.to_owned())),
        }
    }
}

/// Execute the `scan` command against stdout/stderr.
pub async fn execute(args: ScanArgs, config: ParsecConfig) -> Result<ScanExitCode, CliError> {
    let out = BufWriter::new(io::stdout());
    run(args, config, out, io::stderr()).await
}

/// Runs a scan with the given sinks.
///
/// Reports go to `out`. The txt summary goes to `summary_out`, which keeps
/// `out` limited to one line per finding.
pub async fn run<W, S>(
    args: ScanArgs,
    mut config: ParsecConfig,
    out: W,
    summary_out: S,
) -> Result<ScanExitCode, CliError>
where
    W: Write,
    S: Write,
{
    apply_overrides(&args, &mut config.scan);
    config.scan.validate()?;
    let format = ReportFormat::parse(&config.scan.format)?;

    let registry = RuleRegistry::builtin();
    let mut scanner = ScannerBuilder::from_config(&config.scan, &registry)?.build()?;

    let roots = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths
    };
    let files = FileIterator::new(roots, &config.scan.extensions)?;

    info!(
        format = ?format,
        rules = scanner.evaluator().rules().len(),
        jobs = scanner.jobs(),
        "starting scan"
    );

    let mut bus = EventBus::new();
    match format {
        ReportFormat::Txt => {
            let verbosity = Verbosity::from_occurrences(args.verbose);
            bus.register(Box::new(
                ConsoleReporter::new(out, verbosity).with_color(args.color),
            ));
            bus.register(Box::new(
                SummaryReporter::new(summary_out).with_color(args.color),
            ));
        }
        ReportFormat::Xml => bus.register(Box::new(XmlReporter::new(out))),
    }

    if scanner.jobs() == 1 {
        scanner.scan(files, &mut bus)?;
    } else {
        scanner.scan_concurrent(files, &mut bus).await?;
    }

    Ok(bus.exit_code())
}

/// CLI flags win over the file and environment.
fn apply_overrides(args: &ScanArgs, scan: &mut ScanConfig) {
    if let Some(format) = &args.format {
        scan.format = format.clone();
    }
    if let Some(ids) = &args.include_tests {
        scan.include_tests = split_csv(ids);
    }
    if let Some(ids) = &args.exclude_tests {
        scan.exclude_tests = split_csv(ids);
    }
    if let Some(jobs) = args.jobs {
        scan.jobs = jobs;
    }
    if let Some(exts) = &args.extensions {
        scan.extensions = split_csv(exts);
    }
}
