// Resolver and installer trait definitions

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::errors::ResolveError;
use super::models::{ProbeInfo, ResolveOptions, ResolvedStream, ResolverInfo};
use super::tools::ToolVersion;

/// Progress callback, called with values in `0.0..=1.0`
pub type ProgressFn = dyn Fn(f32) + Send + Sync;

/// The operation table a host drives a resolver through
#[async_trait]
pub trait UrlResolver: Send + Sync {
    fn info(&self) -> &ResolverInfo;

    /// Cheap, side-effect free host check
    fn can_resolve(&self, url: &str) -> bool;

    /// Resolve `url`; failures come back as a stream with `success == false`
    async fn resolve(&self, url: &str, options: &ResolveOptions) -> ResolvedStream;

    /// Title / liveness / duration without committing to a format
    async fn probe(&self, url: &str) -> Result<ProbeInfo, ResolveError>;

    fn is_available(&self) -> bool;

    async fn ensure_available(&self, progress: Option<&ProgressFn>) -> Result<(), ResolveError>;

    async fn update_tool(&self, progress: Option<&ProgressFn>) -> Result<(), ResolveError>;

    async fn tool_version(&self) -> Option<ToolVersion>;

    fn set_tool_path(&self, path: &Path);

    /// Abort in-flight calls, killing their child processes
    fn cancel(&self);
}

/// Fetches the yt-dlp binary into a directory
#[async_trait]
pub trait ToolInstaller: Send + Sync {
    /// Must be idempotent: an existing binary is left in place and returned
    async fn install(
        &self,
        target_dir: &Path,
        progress: &ProgressEmitter<'_>,
    ) -> Result<PathBuf, ResolveError>;
}

/// Progress emitter helper; a no-op when no callback was supplied
pub struct ProgressEmitter<'a> {
    callback: Option<&'a ProgressFn>,
}

impl<'a> ProgressEmitter<'a> {
    pub fn new(callback: Option<&'a ProgressFn>) -> Self {
        Self { callback }
    }

    pub fn silent() -> Self {
        Self { callback: None }
    }

    pub fn emit(&self, fraction: f32) {
        if let Some(callback) = self.callback {
            callback(fraction.clamp(0.0, 1.0));
        }
    }
}
