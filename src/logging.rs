// Logging setup for hosts and test binaries that have no subscriber of their own

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit directive is given
pub const DEFAULT_DIRECTIVE: &str = "ytdlp_resolver=info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to parse log directive {directive}: {source}")]
    ParseDirective {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInstall(Box<dyn std::error::Error + Send + Sync>),
}

/// Install a stderr fmt subscriber.
///
/// `RUST_LOG` wins over `directive` when set. Fails instead of panicking if a
/// global subscriber is already installed.
pub fn init(directive: Option<&str>) -> Result<(), LoggingError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(env) if !env.trim().is_empty() => parse_filter(&env)?,
        _ => parse_filter(directive.unwrap_or(DEFAULT_DIRECTIVE))?,
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(LoggingError::SubscriberInstall)
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|source| LoggingError::ParseDirective {
        directive: directive.to_string(),
        source,
    })
}
