#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod types;

// --- re-exports ---

// errors
pub use error::{ConfigError, ParseError, ParsecError};

// configuration
pub use config::{GeneralConfig, ParsecConfig, ScanConfig};

// events
pub use event::{ScanEvent, ScanExitCode, ScanSummary};

// domain types
pub use types::{Finding, Severity, SeverityCounts, SourcePath};
