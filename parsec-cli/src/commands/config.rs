//! `parsec config` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use parsec_core::config::ParsecConfig;
use parsec_core::error::ParsecError;

use crate::ConfigSource;
use crate::cli::{ConfigAction, ConfigArgs, OutputFormat};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
///
/// `loaded` is the result of loading `source`; `validate` reports a failure
/// instead of propagating it.
pub fn execute(
    args: ConfigArgs,
    source: &ConfigSource,
    loaded: Result<ParsecConfig, ParsecError>,
) -> Result<(), CliError> {
    let writer = OutputWriter::new(OutputFormat::Text);
    match args.action {
        ConfigAction::Validate => {
            let report = validation_report(source, &loaded);
            writer.render(&report)?;
            match loaded {
                Ok(_) => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
        ConfigAction::Show { section } => {
            let report = show_report(source, &loaded?, section.as_deref())?;
            writer.render(&report)
        }
    }
}

pub fn validation_report(
    source: &ConfigSource,
    loaded: &Result<ParsecConfig, ParsecError>,
) -> ConfigValidationReport {
    info!(source = %source, "validating configuration");
    match loaded {
        Ok(_) => ConfigValidationReport {
            source: source.to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: source.to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    }
}

pub fn show_report(
    source: &ConfigSource,
    config: &ParsecConfig,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    let config_toml = match section {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("scan") => toml::to_string_pretty(&config.scan),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: general, scan)"
            )));
        }
    }
    .map_err(|e| CliError::Command(format!("failed to serialize configuration: {e}")))?;

    Ok(ConfigReport {
        source: source.to_string(),
        section: section.map(str::to_owned),
        config_toml,
    })
}

/// Effective configuration as TOML.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.section {
            Some(section) => writeln!(
                w,
                "Configuration {} (source: {})",
                format!("[{section}]").bold(),
                self.source
            )?,
            None => writeln!(w, "Configuration (source: {})", self.source.bold())?,
        }
        writeln!(w)?;
        write!(w, "{}", self.config_toml)
    }
}

#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;
        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}
