//! Configuration -- parsec.toml parsing and runtime settings
//!
//! [`ParsecConfig`] is the top-level structure of `parsec.toml`.
//!
//! # Loading precedence
//! 1. CLI flags (highest)
//! 2. Environment variables (`PARSEC_SCAN_JOBS=4` style)
//! 3. Config file (`parsec.toml`)
//! 4. Defaults (`Default` impls)
//!
//! Validation runs once every layer is applied, so a higher layer can
//! replace an invalid value from a lower one. [`ParsecConfig::from_file`]
//! and [`ParsecConfig::parse`] only check the TOML syntax.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), parsec_core::error::ParsecError> {
//! use parsec_core::config::ParsecConfig;
//!
//! // file + environment overrides
//! let config = ParsecConfig::load("parsec.toml").await?;
//!
//! // straight from a TOML string
//! let config = ParsecConfig::parse("[scan]\njobs = 4")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ParsecError};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "parsec.toml";

const MAX_FILE_SIZE_LIMIT: u64 = 100 * 1024 * 1024; // 100 MB

/// Report formats accepted by `scan.format`.
pub const REPORT_FORMATS: [&str; 2] = ["txt", "xml"];

/// parsec configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsecConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Scan settings
    #[serde(default)]
    pub scan: ScanConfig,
}

impl ParsecConfig {
    /// Loads a TOML file, applies environment overrides and validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ParsecError> {
        Self::layered(path).await?.validated()
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    ///
    /// Used for the implicit `parsec.toml` lookup, where having no file is normal.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ParsecError> {
        Self::layered_or_default(path).await?.validated()
    }

    /// File plus environment overrides, not yet validated.
    ///
    /// For callers that still apply their own layer (CLI flags) on top.
    pub async fn layered(path: impl AsRef<Path>) -> Result<Self, ParsecError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`layered`](Self::layered), but a missing file yields the defaults.
    pub async fn layered_or_default(path: impl AsRef<Path>) -> Result<Self, ParsecError> {
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(ParsecError::Config(ConfigError::FileNotFound { .. })) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Validates and hands the config back.
    pub fn validated(self) -> Result<Self, ParsecError> {
        self.validate()?;
        Ok(self)
    }

    /// Reads and parses a TOML file. No environment overrides, no validation.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ParsecError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ParsecError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ParsecError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ParsecError> {
        toml::from_str(toml_str).map_err(|e| {
            ParsecError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides values from environment variables.
    ///
    /// Naming: `PARSEC_{SECTION}_{FIELD}`, e.g. `PARSEC_SCAN_JOBS=4`.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "PARSEC_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PARSEC_GENERAL_LOG_FORMAT");

        override_csv(&mut self.scan.extensions, "PARSEC_SCAN_EXTENSIONS");
        override_csv(&mut self.scan.include_tests, "PARSEC_SCAN_INCLUDE_TESTS");
        override_csv(&mut self.scan.exclude_tests, "PARSEC_SCAN_EXCLUDE_TESTS");
        override_usize(&mut self.scan.jobs, "PARSEC_SCAN_JOBS");
        override_u64(&mut self.scan.max_file_size, "PARSEC_SCAN_MAX_FILE_SIZE");
        override_u64(&mut self.scan.timeout_secs, "PARSEC_SCAN_TIMEOUT_SECS");
        override_string(&mut self.scan.format, "PARSEC_SCAN_FORMAT");
    }

    /// Validates every setting.
    pub fn validate(&self) -> Result<(), ParsecError> {
        self.general.validate()?;
        self.scan.validate()
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (pretty, compact, json)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

impl GeneralConfig {
    /// Validates the general section.
    pub fn validate(&self) -> Result<(), ParsecError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        Ok(())
    }
}

/// Scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// File extensions treated as source files (without the dot)
    pub extensions: Vec<String>,
    /// Rule ids to run; empty means every registered rule
    pub include_tests: Vec<String>,
    /// Rule ids to skip; wins over `include_tests`
    pub exclude_tests: Vec<String>,
    /// Worker count; 1 is sequential, 0 uses every available core
    pub jobs: usize,
    /// Largest file that is parsed (bytes)
    pub max_file_size: u64,
    /// Stop pulling new files after this many seconds (0 = no limit)
    pub timeout_secs: u64,
    /// Report format (txt, xml)
    pub format: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["php".to_owned()],
            include_tests: Vec::new(),
            exclude_tests: Vec::new(),
            jobs: 1,
            max_file_size: 5 * 1024 * 1024, // 5 MB
            timeout_secs: 0,
            format: "txt".to_owned(),
        }
    }
}

impl ScanConfig {
    /// Validates the scan section.
    pub fn validate(&self) -> Result<(), ParsecError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scan.extensions".to_owned(),
                reason: "at least one extension is required".to_owned(),
            }
            .into());
        }

        if self
            .extensions
            .iter()
            .any(|ext| ext.trim().trim_start_matches('.').is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "scan.extensions".to_owned(),
                reason: "extensions must not be empty".to_owned(),
            }
            .into());
        }

        if self.max_file_size == 0 || self.max_file_size > MAX_FILE_SIZE_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "scan.max_file_size".to_owned(),
                reason: format!("must be 1-{MAX_FILE_SIZE_LIMIT}"),
            }
            .into());
        }

        if !REPORT_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::UnknownFormat(self.format.clone()).into());
        }

        Ok(())
    }
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = split_csv(&val);
    }
}

/// Splits a comma separated list, trimming items and dropping empty ones.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
