//! Scanner error types
//!
//! [`ScannerError`] covers the few failures that escape a scan call.
//! Per-file problems (parse failures, rule failures, unreadable paths) are
//! never errors here; they travel through the event stream instead.
//!
//! `From<ScannerError> for ParsecError` lets the CLI propagate with `?`.

use parsec_core::error::{ConfigError, ParsecError};

/// Scanner domain error
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// `scan` was called on a scanner that already ran
    #[error("scanner already used (state: {state})")]
    AlreadyUsed {
        /// State the scanner was in
        state: &'static str,
    },

    /// Invalid scanner or rule configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ScannerError> for ParsecError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::Config(e) => ParsecError::Config(e),
            err @ ScannerError::AlreadyUsed { .. } => ParsecError::Scan(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_used_display() {
        let err = ScannerError::AlreadyUsed { state: "finished" };
        assert!(err.to_string().contains("finished"));
    }

    #[test]
    fn config_error_is_transparent() {
        let err = ScannerError::from(ConfigError::NoActiveRules);
        assert_eq!(err.to_string(), ConfigError::NoActiveRules.to_string());
    }

    #[test]
    fn converts_to_parsec_config_error() {
        let err = ScannerError::Config(ConfigError::UnknownRule {
            list: "include",
            id: "Nope".to_owned(),
        });
        let parsec_err: ParsecError = err.into();
        assert!(parsec_err.is_config());
    }

    #[test]
    fn already_used_is_not_a_config_error() {
        let parsec_err: ParsecError = ScannerError::AlreadyUsed { state: "running" }.into();
        assert!(!parsec_err.is_config());
    }
}
