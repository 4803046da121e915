use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::Date;
use tokio_util::sync::CancellationToken;

use super::config::{default_install_dir, ResolverConfig};
use super::errors::ResolveError;
use super::process::{self, ProcessInvocation};

lazy_static::lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(r"(\d{4}\.\d{2}\.\d{2})(?:\.\d+)?").unwrap();
}

/// Snapshot of the tool's status for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// Parsed `yt-dlp --version` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolVersion {
    /// First line of the version output, trimmed
    pub raw: String,
    /// Release date encoded in the version, when it follows `YYYY.MM.DD`
    pub released: Option<Date>,
}

impl ToolVersion {
    pub fn parse(output: &str) -> Option<Self> {
        let raw = output.lines().map(str::trim).find(|l| !l.is_empty())?;
        let released = VERSION_RE.captures(raw).and_then(|caps| {
            let format = time::format_description::parse("[year].[month].[day]").ok()?;
            Date::parse(&caps[1], &format).ok()
        });
        Some(Self {
            raw: raw.to_string(),
            released,
        })
    }

    /// Days between release and `today`
    pub fn age_days(&self, today: Date) -> Option<i64> {
        self.released.map(|released| (today - released).whole_days())
    }
}

/// Finds the yt-dlp binary
pub struct ToolLocator;

impl ToolLocator {
    pub fn binary_name() -> &'static str {
        if cfg!(windows) {
            "yt-dlp.exe"
        } else {
            "yt-dlp"
        }
    }

    /// Resolve the binary for `config`.
    ///
    /// An explicit `tool_path` is authoritative: if it does not exist the tool
    /// is unavailable, nothing else is consulted.
    pub fn locate(config: &ResolverConfig) -> Option<PathBuf> {
        if let Some(path) = &config.tool_path {
            return path.is_file().then(|| path.clone());
        }

        if let Some(found) = Self::candidates(config).into_iter().find(|p| p.is_file()) {
            tracing::debug!("[tools] found yt-dlp at {}", found.display());
            return Some(found);
        }

        match which::which(Self::binary_name()) {
            Ok(path) => {
                tracing::debug!("[tools] found yt-dlp on PATH at {}", path.display());
                Some(path)
            }
            Err(_) => None,
        }
    }

    fn candidates(config: &ResolverConfig) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = &config.install_dir {
            paths.push(dir.join(Self::binary_name()));
        }
        paths.push(default_install_dir().join(Self::binary_name()));

        let system: &[&str] = if cfg!(windows) {
            &[
                r"C:\Program Files\yt-dlp\yt-dlp.exe",
                r"C:\yt-dlp\yt-dlp.exe",
                r"C:\ProgramData\Prism\yt-dlp.exe",
            ]
        } else {
            &[
                "/usr/local/bin/yt-dlp",
                "/usr/bin/yt-dlp",
                "/opt/homebrew/bin/yt-dlp",
            ]
        };
        paths.extend(system.iter().map(PathBuf::from));
        paths
    }
}

pub async fn query_version(
    tool: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ToolVersion, ResolveError> {
    let invocation = ProcessInvocation::new(tool, timeout).arg("--version");
    let output = process::run_cancellable(&invocation, cancel).await?;

    if !output.success() {
        return Err(ResolveError::from_stderr(
            output.stderr.as_deref(),
            "yt-dlp --version failed",
        ));
    }

    ToolVersion::parse(&output.stdout_text())
        .ok_or_else(|| ResolveError::Resolution("yt-dlp printed no version".to_string()))
}

/// Run yt-dlp's self-update; returns the version it reports, if any
pub async fn self_update(
    tool: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Option<String>, ResolveError> {
    let invocation = ProcessInvocation::new(tool, timeout).arg("-U");
    let output = process::run_cancellable(&invocation, cancel).await?;

    if !output.success() {
        return Err(ResolveError::from_stderr(
            output.stderr.as_deref(),
            "Update failed",
        ));
    }

    let stdout = output.stdout_text();
    tracing::info!("[tools] yt-dlp update: {}", stdout.trim());
    Ok(VERSION_RE
        .captures_iter(&stdout)
        .last()
        .map(|caps| caps[0].to_string()))
}
