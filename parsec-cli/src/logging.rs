//! Logging initialization for the `parsec` binary.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `ParsecConfig`. Logs always go to stderr so that stdout carries only
//! report output.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use parsec_core::config::GeneralConfig;

/// Picks the filter directive: `--log-level`, then `RUST_LOG`, then the config.
pub fn build_filter(cli_level: Option<&str>, config: &GeneralConfig) -> EnvFilter {
    match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called at most once per process.
///
/// # Formats
///
/// * `"pretty"` - Human-readable multi-line output (default)
/// * `"compact"` - One line per event
/// * `"json"` - Machine-parseable JSON lines
pub fn init_tracing(cli_level: Option<&str>, config: &GeneralConfig) -> Result<()> {
    let env_filter = build_filter(cli_level, config);

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize compact tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'pretty', 'compact' or 'json'",
                config.log_format
            ));
        }
    }

    Ok(())
}
