//! Binary acquisition: platform → release → download → verify → install.
//!
//! The binary is streamed into a staging file next to the target path,
//! marked executable, verified against `checksums.txt` when the release has
//! one, and only then renamed over the configured path. A failed
//! verification deletes the staged file, so an unverified binary never sits
//! at the target path.
//!
//! Releases without a manifest install unverified (with a warning) unless
//! [`InstallSettings::require_checksum`] is set.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bgr_schema::{
    CHECKSUM_MANIFEST_NAME, ChecksumManifest, GitHubRepo, PlatformId, Sha256Digest,
    UnsupportedPlatform,
};
use reqwest::Client;
use thiserror::Error;

use crate::io::download::{self, DownloadError};
use crate::platform::PlatformResolver;
use crate::release::{ReleaseError, ReleaseSource};
use crate::reporter::{NullReporter, Reporter};

#[derive(Error, Debug)]
pub enum InstallError {
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatform),

    #[error("Failed to fetch release information for {repo}@{version}: {source}")]
    ReleaseLookupFailed {
        repo: GitHubRepo,
        version: String,
        #[source]
        source: ReleaseError,
    },

    #[error("Binary '{asset}' not found in release {tag}")]
    AssetNotFound { asset: String, tag: String },

    #[error("Checksum verification failed for '{asset}': {reason}")]
    ChecksumVerificationFailed { asset: String, reason: String },

    #[error("Failed to download '{asset}': {source}")]
    Download {
        asset: String,
        #[source]
        source: DownloadError,
    },

    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InstallError {
    fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What to install and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    pub repo: GitHubRepo,
    /// `latest` or an exact tag.
    pub version: String,
    pub binary_path: PathBuf,
    /// Configured platform; takes precedence over detection.
    pub platform: Option<String>,
    pub require_checksum: bool,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub platform: PlatformId,
    pub tag: String,
    pub asset_name: String,
    pub path: PathBuf,
    pub sha256: Sha256Digest,
    /// False when the release carried no checksum manifest.
    pub verified: bool,
}

/// Installs the platform binary from a [`ReleaseSource`].
pub struct BinaryInstaller {
    settings: InstallSettings,
    source: Arc<dyn ReleaseSource>,
    client: Client,
    resolver: PlatformResolver,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for BinaryInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryInstaller")
            .field("settings", &self.settings)
            .field("source", &self.source.key())
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl BinaryInstaller {
    pub fn new(settings: InstallSettings, source: Arc<dyn ReleaseSource>, client: Client) -> Self {
        Self {
            settings,
            source,
            client,
            resolver: PlatformResolver::host(),
            reporter: Arc::new(NullReporter),
        }
    }

    pub fn with_resolver(mut self, resolver: PlatformResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn settings(&self) -> &InstallSettings {
        &self.settings
    }

    /// Override > configured platform > host detection.
    pub fn resolve_platform(
        &self,
        platform_override: Option<&str>,
    ) -> Result<PlatformId, UnsupportedPlatform> {
        match platform_override.or(self.settings.platform.as_deref()) {
            Some(name) => name.parse(),
            None => self.resolver.resolve(),
        }
    }

    /// Run the full install. Any failure aborts with nothing new left at
    /// the binary path.
    pub async fn install(
        &self,
        platform_override: Option<&str>,
        version_override: Option<&str>,
    ) -> Result<InstallReport, InstallError> {
        let platform = self.resolve_platform(platform_override)?;
        let asset_name = platform.asset_name();
        let version = version_override.unwrap_or(self.settings.version.as_str());
        let repo = &self.settings.repo;

        self.reporter
            .info(&format!("Installing bg-remover for platform: {platform}"));
        tracing::info!(%repo, %version, %platform, "installing binary");

        let release = self
            .source
            .get_release(repo, version)
            .await
            .map_err(|source| InstallError::ReleaseLookupFailed {
                repo: repo.clone(),
                version: version.to_string(),
                source,
            })?;

        let asset = release
            .asset(asset_name)
            .ok_or_else(|| InstallError::AssetNotFound {
                asset: asset_name.to_string(),
                tag: release.tag_name.clone(),
            })?;
        let manifest_asset = release.asset(CHECKSUM_MANIFEST_NAME);

        if manifest_asset.is_none() && self.settings.require_checksum {
            return Err(InstallError::ChecksumVerificationFailed {
                asset: asset_name.to_string(),
                reason: format!(
                    "release {} has no {CHECKSUM_MANIFEST_NAME} and checksums are required",
                    release.tag_name
                ),
            });
        }

        let binary_path = &self.settings.binary_path;
        let bin_dir = match binary_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&bin_dir)
            .map_err(|e| InstallError::io("Failed to create install directory", &bin_dir, e))?;

        // Dropping the staged path deletes it, which covers every early return below.
        let staged = tempfile::Builder::new()
            .prefix(".bg-remover-")
            .suffix(".partial")
            .tempfile_in(&bin_dir)
            .map_err(|e| InstallError::io("Failed to create staging file", &bin_dir, e))?
            .into_temp_path();

        self.reporter.section(&format!("Downloading {asset_name}"));
        let streamed = download::download_to_file(
            &self.client,
            &asset.browser_download_url,
            &staged,
            asset_name,
            self.reporter.as_ref(),
        )
        .await
        .map_err(|source| InstallError::Download {
            asset: asset_name.to_string(),
            source,
        })?;

        set_executable(&staged)
            .map_err(|e| InstallError::io("Failed to set executable permission", &staged, e))?;

        let (sha256, verified) = match manifest_asset {
            Some(manifest_asset) => {
                self.reporter.section("Verifying checksum");
                let text = download::download_text(&self.client, &manifest_asset.browser_download_url)
                    .await
                    .map_err(|source| InstallError::Download {
                        asset: CHECKSUM_MANIFEST_NAME.to_string(),
                        source,
                    })?;

                let manifest = ChecksumManifest::parse(&text);
                match manifest.verify_file(asset_name, &staged) {
                    Ok(actual) => {
                        self.reporter.success("Checksum verified successfully.");
                        (actual, true)
                    }
                    Err(e) => {
                        drop(staged);
                        self.reporter.error("Checksum verification failed!");
                        tracing::warn!(asset = asset_name, error = %e, "checksum verification failed");
                        return Err(InstallError::ChecksumVerificationFailed {
                            asset: asset_name.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            None => {
                self.reporter.warning(&format!(
                    "Release {} has no {CHECKSUM_MANIFEST_NAME}; installing without verification.",
                    release.tag_name
                ));
                tracing::warn!(tag = %release.tag_name, "installing unverified binary");
                (streamed, false)
            }
        };

        staged
            .persist(binary_path)
            .map_err(|e| InstallError::io("Failed to move binary into place", binary_path, e.error))?;

        self.reporter.success(&format!(
            "Binary installed successfully at: {}",
            binary_path.display()
        ));
        tracing::info!(path = %binary_path.display(), tag = %release.tag_name, verified, "binary installed");

        Ok(InstallReport {
            platform,
            tag: release.tag_name.clone(),
            asset_name: asset_name.to_string(),
            path: binary_path.clone(),
            sha256,
            verified,
        })
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{AssetDescriptor, ReleaseDescriptor};
    use async_trait::async_trait;

    /// Release source that serves a fixed descriptor, or fails.
    struct FixedSource(Option<ReleaseDescriptor>);

    #[async_trait]
    impl ReleaseSource for FixedSource {
        fn key(&self) -> String {
            "fixed".to_string()
        }

        async fn get_release(
            &self,
            _repo: &GitHubRepo,
            _version: &str,
        ) -> Result<ReleaseDescriptor, ReleaseError> {
            self.0.clone().ok_or_else(|| ReleaseError::Status {
                url: "fixed".to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }

    fn settings(dir: &Path) -> InstallSettings {
        InstallSettings {
            repo: GitHubRepo::new("org/tool").unwrap(),
            version: "latest".to_string(),
            binary_path: dir.join("bin").join("bg-remover"),
            platform: None,
            require_checksum: false,
        }
    }

    fn release(assets: &[&str]) -> ReleaseDescriptor {
        ReleaseDescriptor {
            tag_name: "v1.0.0".to_string(),
            assets: assets
                .iter()
                .map(|name| AssetDescriptor {
                    name: (*name).to_string(),
                    browser_download_url: format!("http://127.0.0.1:9/{name}"),
                })
                .collect(),
        }
    }

    fn installer(dir: &Path, source: FixedSource) -> BinaryInstaller {
        BinaryInstaller::new(settings(dir), Arc::new(source), Client::new())
            .with_resolver(PlatformResolver::new("linux", dir.join("no-marker")))
    }

    #[test]
    fn platform_override_beats_config_and_detection() {
        let dir = tempfile::tempdir().unwrap();
        let mut inst = installer(dir.path(), FixedSource(None));
        assert_eq!(inst.resolve_platform(None).unwrap(), PlatformId::Ubuntu);

        inst.settings.platform = Some("alpine".to_string());
        assert_eq!(inst.resolve_platform(None).unwrap(), PlatformId::Alpine);
        assert_eq!(
            inst.resolve_platform(Some("macos-arm64")).unwrap(),
            PlatformId::MacosArm64
        );
    }

    #[tokio::test]
    async fn unknown_platform_override_fails_before_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let inst = installer(dir.path(), FixedSource(None));
        let err = inst.install(Some("windows"), None).await.unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedPlatform(_)));
    }

    #[tokio::test]
    async fn lookup_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let inst = installer(dir.path(), FixedSource(None));
        let err = inst.install(None, None).await.unwrap_err();
        assert!(matches!(err, InstallError::ReleaseLookupFailed { .. }));
        assert!(!inst.settings().binary_path.exists());
    }

    #[tokio::test]
    async fn missing_asset_is_reported_with_tag() {
        let dir = tempfile::tempdir().unwrap();
        let inst = installer(dir.path(), FixedSource(Some(release(&["bg-remover-alpine-x86_64"]))));
        let err = inst.install(None, None).await.unwrap_err();
        match err {
            InstallError::AssetNotFound { asset, tag } => {
                assert_eq!(asset, "bg-remover-ubuntu-x86_64");
                assert_eq!(tag, "v1.0.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn required_checksum_without_manifest_fails_before_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut inst = installer(dir.path(), FixedSource(Some(release(&["bg-remover-ubuntu-x86_64"]))));
        inst.settings.require_checksum = true;
        let err = inst.install(None, None).await.unwrap_err();
        assert!(matches!(err, InstallError::ChecksumVerificationFailed { .. }));
        assert!(!inst.settings().binary_path.exists());
    }
}
