// Downloads the yt-dlp release binary for this platform

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::errors::ResolveError;
use super::tools::ToolLocator;
use super::traits::{ProgressEmitter, ToolInstaller};

pub const RELEASES_BASE: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download/";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub struct GithubReleaseInstaller {
    client: reqwest::Client,
    base_url: String,
}

impl GithubReleaseInstaller {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("[install] falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: RELEASES_BASE.to_string(),
        }
    }

    /// Point at a mirror; must end with `/`
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Release asset for the running platform
    pub fn asset_name() -> &'static str {
        if cfg!(target_os = "windows") {
            "yt-dlp.exe"
        } else if cfg!(target_os = "macos") {
            "yt-dlp_macos"
        } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
            "yt-dlp_linux_aarch64"
        } else {
            "yt-dlp"
        }
    }

    pub fn download_url(&self) -> String {
        format!("{}{}", self.base_url, Self::asset_name())
    }

    async fn fetch(
        &self,
        url: &str,
        partial: &Path,
        progress: &ProgressEmitter<'_>,
    ) -> Result<u64, ResolveError> {
        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ResolveError::Install(format!(
                "HTTP {} fetching {}",
                response.status(),
                url
            )));
        }

        let total = response.content_length().filter(|len| *len > 0);
        let mut file = tokio::fs::File::create(partial).await?;
        let mut downloaded = 0u64;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            if let Some(total) = total {
                // 1.0 is reserved for "installed"
                progress.emit((downloaded as f32 / total as f32).min(0.99));
            }
        }
        file.flush().await?;

        if downloaded == 0 {
            return Err(ResolveError::Install(format!("empty download from {}", url)));
        }
        Ok(downloaded)
    }
}

impl Default for GithubReleaseInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolInstaller for GithubReleaseInstaller {
    async fn install(
        &self,
        target_dir: &Path,
        progress: &ProgressEmitter<'_>,
    ) -> Result<PathBuf, ResolveError> {
        let target = target_dir.join(ToolLocator::binary_name());
        if target.is_file() {
            tracing::debug!("[install] {} already present", target.display());
            progress.emit(1.0);
            return Ok(target);
        }

        tokio::fs::create_dir_all(target_dir).await?;
        progress.emit(0.0);

        let url = self.download_url();
        let partial = target.with_extension("part");
        tracing::info!("[install] downloading {} -> {}", url, target.display());

        let bytes = match self.fetch(&url, &partial, progress).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        place(&partial, &target).await?;
        tracing::info!("[install] installed yt-dlp ({} bytes)", bytes);
        progress.emit(1.0);
        Ok(target)
    }
}

/// Marks the finished download executable and moves it over the final name.
/// The partial file never outlives a failure here.
async fn place(partial: &Path, target: &Path) -> Result<(), ResolveError> {
    let result = async {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o755);
            tokio::fs::set_permissions(partial, perms).await?;
        }
        tokio::fs::rename(partial, target).await
    }
    .await;

    result.map_err(|e| {
        let _ = std::fs::remove_file(partial);
        ResolveError::Install(format!("cannot install {}: {}", target.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_joins_base_and_asset() {
        let installer = GithubReleaseInstaller::new().with_base_url("https://mirror.example/dl/");
        assert_eq!(
            installer.download_url(),
            format!("https://mirror.example/dl/{}", GithubReleaseInstaller::asset_name())
        );
        assert!(GithubReleaseInstaller::new()
            .download_url()
            .starts_with(RELEASES_BASE));
    }

    #[tokio::test]
    async fn existing_binary_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(ToolLocator::binary_name());
        std::fs::write(&target, b"already here").unwrap();

        // unroutable base: any network access would fail the test
        let installer = GithubReleaseInstaller::new().with_base_url("http://127.0.0.1:9/");
        let installed = installer
            .install(dir.path(), &ProgressEmitter::silent())
            .await
            .unwrap();

        assert_eq!(installed, target);
        assert_eq!(std::fs::read(&target).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_partial_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(ToolLocator::binary_name());
        let partial = target.with_extension("part");
        std::fs::write(&partial, b"downloaded").unwrap();
        // a non-empty directory cannot be replaced by a file
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"").unwrap();

        let err = place(&partial, &target).await.unwrap_err();

        assert_eq!(err.kind(), crate::resolver::ErrorKind::InstallFailure);
        assert!(!partial.exists());
        assert!(target.join("keep").exists());
    }
}
