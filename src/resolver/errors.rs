// Error types for the resolution pipeline

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coarse failure category, stable enough to hand across the host boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ToolUnavailable,
    SpawnFailure,
    Timeout,
    ResolutionFailure,
    InvalidInput,
    Cancelled,
    InstallFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// yt-dlp not found and could not (or may not) be installed
    #[error("yt-dlp is not available")]
    ToolUnavailable,

    /// The OS refused to create the child process
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Child did not exit before the deadline and was killed
    #[error("{program} timed out after {}ms", timeout.as_millis())]
    Timeout { program: String, timeout: Duration },

    /// yt-dlp ran but could not produce a result; carries its stderr when there was any
    #[error("{0}")]
    Resolution(String),

    /// Empty or malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Host is not on the known-hosts list
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Resolution cancelled")]
    Cancelled,

    /// Downloading or placing the yt-dlp binary failed
    #[error("Install failed: {0}")]
    Install(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ToolUnavailable => ErrorKind::ToolUnavailable,
            Self::Spawn { .. } => ErrorKind::SpawnFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Resolution(_) | Self::Io(_) => ErrorKind::ResolutionFailure,
            Self::InvalidInput(_) | Self::UnsupportedUrl(_) => ErrorKind::InvalidInput,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Install(_) | Self::Http(_) => ErrorKind::InstallFailure,
        }
    }

    /// Build a resolution failure from captured stderr, falling back to a generic message
    pub fn from_stderr(stderr: Option<&str>, fallback: &str) -> Self {
        match stderr.map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => Self::Resolution(text.to_string()),
            None => Self::Resolution(fallback.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_is_surfaced_verbatim() {
        let err =
            ResolveError::from_stderr(Some("ERROR: Unsupported URL\n"), "Failed to resolve URL");
        assert_eq!(err.to_string(), "ERROR: Unsupported URL");
        assert_eq!(err.kind(), ErrorKind::ResolutionFailure);
    }

    #[test]
    fn blank_stderr_falls_back_to_generic_message() {
        let err = ResolveError::from_stderr(Some("  \n"), "Failed to resolve URL");
        assert_eq!(err.to_string(), "Failed to resolve URL");

        let err = ResolveError::from_stderr(None, "Failed to resolve URL");
        assert_eq!(err.to_string(), "Failed to resolve URL");
    }

    #[test]
    fn timeout_message_reports_milliseconds() {
        let err = ResolveError::Timeout {
            program: "yt-dlp".to_string(),
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "yt-dlp timed out after 1500ms");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn unsupported_url_counts_as_invalid_input() {
        let err = ResolveError::UnsupportedUrl("example.org".to_string());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
