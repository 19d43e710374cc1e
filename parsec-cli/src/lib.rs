//! parsec command-line front end
//!
//! [`run`] loads the configuration, initialises logging and dispatches to
//! the subcommand handlers in [`commands`].

use std::fmt;
use std::path::{Path, PathBuf};

use parsec_core::config::{DEFAULT_CONFIG_FILE, ParsecConfig};
use parsec_core::error::ParsecError;

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

use cli::{Cli, Commands};
use error::CliError;

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A TOML file on disk
    File(PathBuf),
    /// No file; built-in defaults plus environment overrides
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Loads the configuration named by `-c`, or the implicit `parsec.toml`,
/// with environment overrides applied but not yet validated.
///
/// A missing implicit file yields the defaults; a missing explicit file is
/// a configuration error. The error side only carries read and TOML
/// failures, so CLI flags can still replace an invalid value.
pub async fn load_config_layers(
    explicit: Option<&Path>,
) -> (ConfigSource, Result<ParsecConfig, ParsecError>) {
    match explicit {
        Some(path) => (
            ConfigSource::File(path.to_path_buf()),
            ParsecConfig::layered(path).await,
        ),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            let source = if path.exists() {
                ConfigSource::File(path.clone())
            } else {
                ConfigSource::Defaults
            };
            (source, ParsecConfig::layered_or_default(&path).await)
        }
    }
}

/// Like [`load_config_layers`], then validated.
pub async fn load_config(
    explicit: Option<&Path>,
) -> (ConfigSource, Result<ParsecConfig, ParsecError>) {
    let (source, layered) = load_config_layers(explicit).await;
    (source, layered.and_then(ParsecConfig::validated))
}

/// Runs one CLI invocation and returns the process exit code.
pub async fn run(cli: Cli) -> Result<i32, CliError> {
    let (source, layered) = load_config_layers(cli.config.as_deref()).await;

    let general = layered
        .as_ref()
        .ok()
        .filter(|c| c.general.validate().is_ok())
        .map(|c| c.general.clone())
        .unwrap_or_default();
    logging::init_tracing(cli.log_level.as_deref(), &general)
        .map_err(|e| CliError::Command(e.to_string()))?;

    tracing::debug!(source = %source, "configuration resolved");

    match cli.command {
        Commands::Scan(args) => {
            let config = layered?;
            config.general.validate()?;
            // [scan] is validated once the flags are applied
            let exit = commands::scan::execute(args, config).await?;
            Ok(exit.code())
        }
        Commands::Rules(args) => {
            commands::rules::execute(args)?;
            Ok(0)
        }
        Commands::Config(args) => {
            let loaded = layered.and_then(ParsecConfig::validated);
            commands::config::execute(args, &source, loaded)?;
            Ok(0)
        }
    }
}
