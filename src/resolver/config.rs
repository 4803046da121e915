// Resolver configuration: defaults, merge-style updates, and a lock-guarded store
//
// Resolutions never read the store mid-flight. They take a snapshot up front
// and thread it through every step, so a concurrent `configure` only affects
// calls that start after it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use super::errors::ResolveError;

/// Default per-invocation timeout for yt-dlp
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Explicit yt-dlp binary; disables auto-detection when set
    pub tool_path: Option<PathBuf>,
    /// Where to look for / install yt-dlp before the default install dir
    pub install_dir: Option<PathBuf>,
    /// Download yt-dlp on first use when it cannot be found
    pub auto_download: bool,
    pub process_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            tool_path: None,
            install_dir: None,
            auto_download: true,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    /// Directory installs go to: the configured one, else the platform default
    pub fn effective_install_dir(&self) -> PathBuf {
        self.install_dir.clone().unwrap_or_else(default_install_dir)
    }

    /// Merge `update` into this config; unset fields are left alone
    pub fn merge(&mut self, update: &ConfigUpdate) {
        if let Some(path) = &update.tool_path {
            self.tool_path = Some(path.clone());
        }
        if let Some(dir) = &update.install_dir {
            self.install_dir = Some(dir.clone());
        }
        if let Some(auto) = update.auto_download {
            self.auto_download = auto;
        }
        if let Some(ms) = update.process_timeout_ms.filter(|ms| *ms > 0) {
            self.process_timeout = Duration::from_millis(ms);
        }
    }
}

/// Partial configuration as supplied by a host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub tool_path: Option<PathBuf>,
    pub install_dir: Option<PathBuf>,
    pub auto_download: Option<bool>,
    /// Ignored when zero
    pub process_timeout_ms: Option<u64>,
}

impl ConfigUpdate {
    /// Parse the JSON config string a host hands over at plugin init
    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
            .map_err(|e| ResolveError::InvalidInput(format!("Invalid config JSON: {}", e)))
    }

    /// Read `YTDLP_PATH`, `YTDLP_INSTALL_DIR`, `YTDLP_AUTO_DOWNLOAD`, `YTDLP_TIMEOUT_MS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auto_download = non_empty("YTDLP_AUTO_DOWNLOAD").and_then(|v| {
            match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                other => {
                    tracing::warn!("[config] ignoring YTDLP_AUTO_DOWNLOAD={}", other);
                    None
                }
            }
        });

        let process_timeout_ms = non_empty("YTDLP_TIMEOUT_MS").and_then(|v| {
            match v.trim().parse::<u64>() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    tracing::warn!("[config] ignoring YTDLP_TIMEOUT_MS={}", v);
                    None
                }
            }
        });

        Self {
            tool_path: non_empty("YTDLP_PATH").map(PathBuf::from),
            install_dir: non_empty("YTDLP_INSTALL_DIR").map(PathBuf::from),
            auto_download,
            process_timeout_ms,
        }
    }
}

/// Thread-safe holder with copy-on-read semantics
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: RwLock<ResolverConfig>,
}

impl ConfigStore {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    pub fn snapshot(&self) -> ResolverConfig {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn apply(&self, update: &ConfigUpdate) {
        self.write(|config| config.merge(update));
    }

    pub fn set_tool_path(&self, path: PathBuf) {
        self.write(|config| config.tool_path = Some(path));
    }

    fn write(&self, f: impl FnOnce(&mut ResolverConfig)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}

/// Platform default install directory
pub fn default_install_dir() -> PathBuf {
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .map(|dir| dir.join("Prism"))
            .unwrap_or_else(|| PathBuf::from(r"C:\Prism"))
    }
    #[cfg(not(windows))]
    {
        dirs::home_dir()
            .map(|home| home.join(".local").join("bin"))
            .unwrap_or_else(|| PathBuf::from("/tmp/prism"))
    }
}
