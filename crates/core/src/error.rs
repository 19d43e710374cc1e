//! Error types, one enum per failure domain

/// Top-level parsec error.
#[derive(Debug, thiserror::Error)]
pub enum ParsecError {
    /// Configuration problem, raised before any file is scanned
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A single source file could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The scan engine was driven incorrectly
    #[error("scan error: {0}")]
    Scan(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParsecError {
    /// Returns `true` for errors that must abort before scanning starts.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Configuration error.
///
/// Every variant is fatal and detected before the scan loop starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config file is not valid TOML or does not match the schema
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// Invalid config value
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Unsupported report format
    #[error("unknown output format '{0}' (expected: txt, xml)")]
    UnknownFormat(String),

    /// A rule id named in an include/exclude list is not registered
    #[error("unknown rule '{id}' in {list} list")]
    UnknownRule { list: &'static str, id: String },

    /// Two rules were registered under the same id
    #[error("duplicate rule id '{0}'")]
    DuplicateRule(String),

    /// Include/exclude filtering left nothing to run
    #[error("rule filters leave no active rules")]
    NoActiveRules,
}

/// Parse error for a single source file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The file exceeds the configured size limit
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    TooLarge { path: String, size: u64, max: u64 },

    /// The source contains a syntax error
    #[error("syntax error at line {line}, column {column}: {detail}")]
    Syntax {
        line: usize,
        column: usize,
        detail: String,
    },

    /// The parser produced no tree
    #[error("parser unavailable: {0}")]
    Unavailable(String),
}
