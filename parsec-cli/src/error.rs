//! CLI-specific error types and exit code mapping

use parsec_core::error::{ConfigError, ParsecError};
use parsec_core::event::ScanExitCode;
use parsec_scanner::ScannerError;

/// CLI-specific error type.
///
/// `exit_code()` maps each variant to the process exit status.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from parsec-core.
    #[error("{0}")]
    Core(#[from] ParsecError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 1    | General / command / IO error         |
    /// | 2    | Configuration error; nothing scanned |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ScanExitCode::ConfigError.code(),
            Self::Core(e) if e.is_config() => ScanExitCode::ConfigError.code(),
            Self::Command(_) | Self::JsonSerialize(_) | Self::Io(_) | Self::Core(_) => 1,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Core(ParsecError::Config(e))
    }
}

impl From<ScannerError> for CliError {
    fn from(e: ScannerError) -> Self {
        Self::Core(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("bad".to_owned());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = ConfigError::UnknownFormat("json".to_owned()).into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("json"));
    }

    #[test]
    fn test_exit_code_unknown_rule_from_scanner() {
        let err: CliError = ScannerError::Config(ConfigError::UnknownRule {
            list: "include",
            id: "NoSuchRule".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_already_used_is_general() {
        let err: CliError = ScannerError::AlreadyUsed { state: "finished" }.into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_io_error() {
        let err = CliError::Io(std::io::Error::other("broken pipe"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(err.to_string(), "execution failed");
    }
}
