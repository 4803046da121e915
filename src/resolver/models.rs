// Common data models for URL resolution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::errors::{ErrorKind, ResolveError};

/// Largest explicit pixel height accepted in a quality request
pub const MAX_HEIGHT: u32 = 4320;

/// Requested stream quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "QualityRepr")]
pub enum Quality {
    /// No height constraint
    #[default]
    Auto,
    /// 360p
    Low,
    /// 480p
    Medium,
    /// 720p
    High,
    /// 1080p
    Full,
    /// 1440p
    Qhd,
    /// 2160p
    Uhd4k,
    /// Explicit pixel height (1..=4320)
    Height(u32),
}

impl Quality {
    pub fn from_height(height: u32) -> Result<Self, ResolveError> {
        match height {
            0 => Ok(Self::Auto),
            1..=MAX_HEIGHT => Ok(Self::Height(height)),
            _ => Err(ResolveError::InvalidInput(format!(
                "height {} outside 1..={}",
                height, MAX_HEIGHT
            ))),
        }
    }

    /// Pixel height cap, 0 meaning "no constraint"
    pub fn height(&self) -> u32 {
        match self {
            Self::Auto => 0,
            Self::Low => 360,
            Self::Medium => 480,
            Self::High => 720,
            Self::Full => 1080,
            Self::Qhd => 1440,
            Self::Uhd4k => 2160,
            Self::Height(h) => (*h).min(MAX_HEIGHT),
        }
    }
}

/// Wire shape of [`Quality`]; raw heights are range-checked on the way in
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum QualityRepr {
    Auto,
    Low,
    Medium,
    High,
    Full,
    Qhd,
    Uhd4k,
    Height(u32),
}

impl TryFrom<QualityRepr> for Quality {
    type Error = ResolveError;

    fn try_from(repr: QualityRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            QualityRepr::Auto => Self::Auto,
            QualityRepr::Low => Self::Low,
            QualityRepr::Medium => Self::Medium,
            QualityRepr::High => Self::High,
            QualityRepr::Full => Self::Full,
            QualityRepr::Qhd => Self::Qhd,
            QualityRepr::Uhd4k => Self::Uhd4k,
            QualityRepr::Height(h) => Self::from_height(h)?,
        })
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            other => write!(f, "{}p", other.height()),
        }
    }
}

impl FromStr for Quality {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        match value.as_str() {
            "" | "auto" | "best" => Ok(Self::Auto),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "full" => Ok(Self::Full),
            "qhd" => Ok(Self::Qhd),
            "4k" | "uhd" => Ok(Self::Uhd4k),
            other => {
                let digits = other.strip_suffix('p').unwrap_or(other);
                let height: u32 = digits
                    .parse()
                    .map_err(|_| ResolveError::InvalidInput(format!("unknown quality '{}'", s)))?;
                Self::from_height(height)
            }
        }
    }
}

/// Per-call resolution options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOptions {
    pub quality: Quality,
    /// Overrides the configured per-invocation timeout for this call only
    pub timeout: Option<Duration>,
    /// Run the metadata step (title, dimensions, codecs...)
    pub include_metadata: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Auto,
            timeout: None,
            include_metadata: true,
        }
    }
}

impl ResolveOptions {
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.include_metadata = enabled;
        self
    }
}

/// Result of a resolution, success or failure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStream {
    /// Page URL as passed in
    pub original_url: String,
    /// Playable URL (video, or combined audio+video)
    pub direct_url: Option<String>,
    /// Separate audio URL when a video+audio pair was selected
    pub audio_url: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_secs: Option<f64>,
    /// Pixel width, 0 when unknown
    pub width: u32,
    /// Pixel height, 0 when unknown
    pub height: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Headers the player must send when fetching `direct_url`
    pub http_headers: BTreeMap<String, String>,
    /// Heights offered by the site, ascending
    pub available_heights: Vec<u32>,
    pub is_live: bool,
    /// Direct URL points at an HLS playlist
    pub is_hls: bool,
    pub success: bool,
    /// Present iff `success` is false
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl ResolvedStream {
    pub fn resolved(original_url: &str, direct_url: String, is_live: bool) -> Self {
        let is_hls = direct_url.contains("m3u8");
        Self {
            original_url: original_url.to_string(),
            direct_url: Some(direct_url),
            is_live,
            is_hls,
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(original_url: &str, error: &ResolveError) -> Self {
        Self {
            original_url: original_url.to_string(),
            success: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..Self::default()
        }
    }
}

/// Cheap metadata answer from `probe`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub original_url: String,
    pub title: Option<String>,
    pub is_live: bool,
    pub duration_secs: Option<f64>,
}

/// Features this resolver advertises to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Vod,
    Live,
    Quality,
    Async,
    Headers,
}

/// Dispatch ordering hint for the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Fallback,
    Normal,
    Preferred,
}

/// Static descriptor the host reads before dispatching URLs
#[derive(Debug, Clone, Serialize)]
pub struct ResolverInfo {
    pub name: &'static str,
    pub identifier: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub capabilities: &'static [Capability],
    pub hosts: &'static [&'static str],
    pub priority: Priority,
}

impl ResolverInfo {
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
