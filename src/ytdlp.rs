// yt-dlp resolver - availability gating, auto-install and the host-facing operation table

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::resolver::config::{ConfigStore, ConfigUpdate, ResolverConfig};
use crate::resolver::errors::ResolveError;
use crate::resolver::hosts::{self, KNOWN_HOSTS};
use crate::resolver::install::GithubReleaseInstaller;
use crate::resolver::models::{
    Capability, Priority, ProbeInfo, ResolveOptions, ResolvedStream, ResolverInfo,
};
use crate::resolver::pipeline::ResolutionPipeline;
use crate::resolver::tools::{self, ToolInfo, ToolLocator, ToolVersion};
use crate::resolver::traits::{ProgressEmitter, ProgressFn, ToolInstaller, UrlResolver};

/// Self-update downloads a full release, so it gets at least this long
const UPDATE_TIMEOUT: Duration = Duration::from_secs(120);

static INFO: ResolverInfo = ResolverInfo {
    name: "yt-dlp",
    identifier: "com.prism.ytdlp",
    version: env!("CARGO_PKG_VERSION"),
    description: "Resolves page URLs on supported sites to direct stream URLs using yt-dlp",
    capabilities: &[
        Capability::Vod,
        Capability::Live,
        Capability::Quality,
        Capability::Async,
        Capability::Headers,
    ],
    hosts: KNOWN_HOSTS,
    priority: Priority::Preferred,
};

lazy_static::lazy_static! {
    static ref SHARED: YtDlpResolver = YtDlpResolver::from_env();
}

/// Process-wide resolver configured from the environment
pub fn shared() -> &'static YtDlpResolver {
    &SHARED
}

pub struct YtDlpResolver {
    config: ConfigStore,
    /// Located binary; only the path is cached, not whether it works.
    /// Held while the config's tool path changes so the two never disagree.
    location: Mutex<Option<PathBuf>>,
    /// Latched on the first install attempt so a failed install is never retried
    download_attempted: AtomicBool,
    install_lock: tokio::sync::Mutex<()>,
    installer: Arc<dyn ToolInstaller>,
    cancel: Mutex<CancellationToken>,
}

impl YtDlpResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_installer(config, Arc::new(GithubReleaseInstaller::new()))
    }

    pub fn with_installer(config: ResolverConfig, installer: Arc<dyn ToolInstaller>) -> Self {
        Self {
            config: ConfigStore::new(config),
            location: Mutex::new(None),
            download_attempted: AtomicBool::new(false),
            install_lock: tokio::sync::Mutex::new(()),
            installer,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Defaults overridden by `YTDLP_*` environment variables
    pub fn from_env() -> Self {
        let mut config = ResolverConfig::default();
        config.merge(&ConfigUpdate::from_env());
        Self::new(config)
    }

    pub fn info(&self) -> &'static ResolverInfo {
        &INFO
    }

    /// Merge `update` into the live config; in-flight calls keep their snapshot
    pub fn configure(&self, update: &ConfigUpdate) {
        let mut location = self.location();
        self.config.apply(update);
        *location = None;
        drop(location);
        tracing::debug!("[yt-dlp] configuration updated: {:?}", update);
    }

    pub fn config(&self) -> ResolverConfig {
        self.config.snapshot()
    }

    pub fn can_handle(&self, url: &str) -> bool {
        hosts::can_resolve(url)
    }

    /// Path of the binary, locating it on first use
    pub fn tool_path(&self) -> Option<PathBuf> {
        let mut location = self.location();
        if let Some(path) = location.as_ref() {
            if path.is_file() {
                return Some(path.clone());
            }
            tracing::debug!("[yt-dlp] cached binary {} is gone", path.display());
        }

        // located under the lock; set_tool_path and configure wait for it
        let found = ToolLocator::locate(&self.config.snapshot());
        location.clone_from(&found);
        found
    }

    pub fn is_available(&self) -> bool {
        self.tool_path().is_some()
    }

    pub fn set_tool_path(&self, path: &Path) {
        self.remember_tool_path(path.to_path_buf());
        tracing::info!("[yt-dlp] tool path set to {}", path.display());
    }

    pub async fn tool_version(&self) -> Option<ToolVersion> {
        let tool = self.tool_path()?;
        let cancel = self.cancel_token();
        match tools::query_version(&tool, self.config.snapshot().process_timeout, &cancel).await {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!("[yt-dlp] version query failed: {}", e);
                None
            }
        }
    }

    pub async fn tool_info(&self) -> ToolInfo {
        let path = self.tool_path();
        let version = if path.is_some() {
            self.tool_version().await.map(|v| v.raw)
        } else {
            None
        };
        ToolInfo {
            name: INFO.name.to_string(),
            version,
            is_available: path.is_some(),
            path: path.map(|p| p.display().to_string()),
        }
    }

    /// Install yt-dlp unless it is already present.
    ///
    /// Progress always starts at 0.0 and ends at 1.0, whatever the outcome.
    /// An explicit call always tries to install, even after an earlier
    /// automatic attempt failed.
    pub async fn ensure_available(
        &self,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf, ResolveError> {
        let emitter = ProgressEmitter::new(progress);
        if let Some(path) = self.tool_path() {
            emitter.emit(1.0);
            return Ok(path);
        }

        emitter.emit(0.0);
        let _guard = self.install_lock.lock().await;
        let result = match self.tool_path() {
            Some(path) => Ok(path),
            None => {
                self.download_attempted.store(true, Ordering::SeqCst);
                self.install(&emitter).await
            }
        };
        emitter.emit(1.0);
        result
    }

    /// Self-update an installed tool; installs it when missing
    pub async fn update_tool(&self, progress: Option<&ProgressFn>) -> Result<(), ResolveError> {
        let Some(tool) = self.tool_path() else {
            return self.ensure_available(progress).await.map(|_| ());
        };

        let emitter = ProgressEmitter::new(progress);
        emitter.emit(0.0);

        let timeout = self.config.snapshot().process_timeout.max(UPDATE_TIMEOUT);
        let cancel = self.cancel_token();
        let result = tools::self_update(&tool, timeout, &cancel).await;
        emitter.emit(1.0);

        match result? {
            Some(version) => tracing::info!("[yt-dlp] updated, now at {}", version),
            None => tracing::info!("[yt-dlp] update finished"),
        }
        Ok(())
    }

    /// Resolve `url`, returning failures as a stream with `success == false`
    pub async fn resolve(&self, url: &str, options: &ResolveOptions) -> ResolvedStream {
        match self.try_resolve(url, options).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("[yt-dlp] resolution of {} failed: {}", url, e);
                ResolvedStream::failed(url, &e)
            }
        }
    }

    pub async fn try_resolve(
        &self,
        url: &str,
        options: &ResolveOptions,
    ) -> Result<ResolvedStream, ResolveError> {
        let url = Self::checked_url(url)?;
        let config = self.config.snapshot();
        let tool = self.gate(&config).await?;

        let timeout = options
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(config.process_timeout);
        let cancel = self.cancel_token();

        ResolutionPipeline::new(&tool, timeout, &cancel)
            .resolve(url, options)
            .await
    }

    /// Title, liveness and duration without choosing a format
    pub async fn probe(&self, url: &str) -> Result<ProbeInfo, ResolveError> {
        let url = Self::checked_url(url)?;
        let config = self.config.snapshot();
        let tool = self.gate(&config).await?;
        let cancel = self.cancel_token();

        ResolutionPipeline::new(&tool, config.process_timeout, &cancel)
            .probe(url)
            .await
    }

    /// Kill every in-flight child; later calls run normally
    pub fn cancel(&self) {
        let mut guard = match self.cancel.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let previous = std::mem::replace(&mut *guard, CancellationToken::new());
        previous.cancel();
        tracing::info!("[yt-dlp] cancelled in-flight calls");
    }

    fn checked_url(url: &str) -> Result<&str, ResolveError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ResolveError::InvalidInput("empty URL".to_string()));
        }
        if !hosts::can_resolve(url) {
            return Err(ResolveError::UnsupportedUrl(url.to_string()));
        }
        Ok(url)
    }

    /// Availability gate with the one-shot auto-install
    async fn gate(&self, config: &ResolverConfig) -> Result<PathBuf, ResolveError> {
        if let Some(path) = self.tool_path() {
            return Ok(path);
        }
        if !config.auto_download {
            return Err(ResolveError::ToolUnavailable);
        }

        let _guard = self.install_lock.lock().await;
        if let Some(path) = self.tool_path() {
            return Ok(path);
        }
        if self.download_attempted.swap(true, Ordering::SeqCst) {
            return Err(ResolveError::ToolUnavailable);
        }

        self.install(&ProgressEmitter::silent()).await.map_err(|e| {
            tracing::warn!("[yt-dlp] automatic install failed: {}", e);
            ResolveError::ToolUnavailable
        })
    }

    /// Caller holds `install_lock`
    async fn install(&self, emitter: &ProgressEmitter<'_>) -> Result<PathBuf, ResolveError> {
        let dir = self.config.snapshot().effective_install_dir();
        tracing::info!("[yt-dlp] installing into {}", dir.display());

        let path = self.installer.install(&dir, emitter).await?;
        if !path.is_file() {
            return Err(ResolveError::Install(format!(
                "{} missing after install",
                path.display()
            )));
        }
        self.remember_tool_path(path.clone());
        Ok(path)
    }

    fn cancel_token(&self) -> CancellationToken {
        match self.cancel.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Record `path` as both the configured and the cached binary
    fn remember_tool_path(&self, path: PathBuf) {
        let mut location = self.location();
        self.config.set_tool_path(path.clone());
        *location = Some(path);
    }

    fn location(&self) -> MutexGuard<'_, Option<PathBuf>> {
        match self.location.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

#[async_trait]
impl UrlResolver for YtDlpResolver {
    fn info(&self) -> &ResolverInfo {
        &INFO
    }

    fn can_resolve(&self, url: &str) -> bool {
        self.can_handle(url)
    }

    async fn resolve(&self, url: &str, options: &ResolveOptions) -> ResolvedStream {
        YtDlpResolver::resolve(self, url, options).await
    }

    async fn probe(&self, url: &str) -> Result<ProbeInfo, ResolveError> {
        YtDlpResolver::probe(self, url).await
    }

    fn is_available(&self) -> bool {
        YtDlpResolver::is_available(self)
    }

    async fn ensure_available(&self, progress: Option<&ProgressFn>) -> Result<(), ResolveError> {
        YtDlpResolver::ensure_available(self, progress).await.map(|_| ())
    }

    async fn update_tool(&self, progress: Option<&ProgressFn>) -> Result<(), ResolveError> {
        YtDlpResolver::update_tool(self, progress).await
    }

    async fn tool_version(&self) -> Option<ToolVersion> {
        YtDlpResolver::tool_version(self).await
    }

    fn set_tool_path(&self, path: &Path) {
        YtDlpResolver::set_tool_path(self, path)
    }

    fn cancel(&self) {
        YtDlpResolver::cancel(self)
    }
}
