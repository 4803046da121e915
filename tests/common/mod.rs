//! Shared helpers: stub yt-dlp scripts and a scripted installer.

#![allow(dead_code)]

use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use ytdlp_resolver::resolver::{ProgressEmitter, ToolInstaller};
use ytdlp_resolver::{ResolveError, ResolverConfig, YtDlpResolver};

pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Write an executable `/bin/sh` script named `name` into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A fake yt-dlp living in its own temp directory
pub struct StubTool {
    dir: TempDir,
    path: PathBuf,
}

impl StubTool {
    /// `body` sees the real argument vector in `"$@"`
    pub fn new(body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = write_script(dir.path(), "yt-dlp", body);
        Self { dir, path }
    }

    /// Stub that answers each pipeline step the way yt-dlp would
    pub fn with_steps(is_live: &str, get_url: &str, metadata: &str) -> Self {
        Self::new(&format!(
            r#"case "$*" in
  *"--print is_live --"*) {is_live} ;;
  *--get-url*) {get_url} ;;
  *"--print title"*) {metadata} ;;
  *) echo "unexpected: $*" >&2; exit 64 ;;
esac"#
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file path inside the stub's directory, for markers and captured args
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn resolver(&self) -> YtDlpResolver {
        YtDlpResolver::new(ResolverConfig {
            tool_path: Some(self.path.clone()),
            auto_download: false,
            process_timeout: Duration::from_secs(10),
            ..Default::default()
        })
    }
}

/// Installer that counts calls and either drops a stub script or fails
pub struct ScriptedInstaller {
    calls: AtomicUsize,
    script: Option<String>,
}

impl ScriptedInstaller {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: None,
        }
    }

    pub fn installing(body: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Some(body.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolInstaller for ScriptedInstaller {
    async fn install(
        &self,
        target_dir: &Path,
        progress: &ProgressEmitter<'_>,
    ) -> Result<PathBuf, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress.emit(0.5);
        match &self.script {
            Some(body) => {
                std::fs::create_dir_all(target_dir)?;
                Ok(write_script(target_dir, "yt-dlp", body))
            }
            None => Err(ResolveError::Install("offline".to_string())),
        }
    }
}

/// Config whose explicit tool path does not exist, so nothing is auto-detected
pub fn missing_tool_config(dir: &Path, auto_download: bool) -> ResolverConfig {
    ResolverConfig {
        tool_path: Some(dir.join("missing").join("yt-dlp")),
        install_dir: Some(dir.join("install")),
        auto_download,
        process_timeout: Duration::from_secs(10),
    }
}
