//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// parsec -- static security scanner for PHP sources.
///
/// Use `parsec <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "parsec", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file [default: parsec.toml].
    ///
    /// A missing default file means built-in defaults; a missing explicit
    /// file is an error.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for the informational subcommands.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan PHP sources for vulnerable patterns.
    Scan(ScanArgs),

    /// List the built-in rules.
    Rules(RulesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Scan files and directories.
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Files or directories to scan (default: current directory).
    pub paths: Vec<PathBuf>,

    /// Report format (txt, xml), case-insensitive.
    #[arg(long)]
    pub format: Option<String>,

    /// Comma-separated rule ids to run.
    #[arg(long, value_name = "IDS")]
    pub include_tests: Option<String>,

    /// Comma-separated rule ids to skip.
    #[arg(long, value_name = "IDS")]
    pub exclude_tests: Option<String>,

    /// Increase text output detail (-v: rule ids, -vv: debug markers).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Worker count; 1 is sequential, 0 uses every core.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Comma-separated source file extensions.
    #[arg(long, value_name = "EXTS")]
    pub extensions: Option<String>,

    /// Colour the text output.
    #[arg(long)]
    pub color: bool,
}

// ---- rules ----

/// List built-in rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Output format.
    #[arg(long, default_value = "text")]
    pub output: OutputFormat,
}

// ---- config ----

/// Manage parsec configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, scan).
        #[arg(long)]
        section: Option<String>,
    },
}
