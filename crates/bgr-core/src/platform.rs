//! Host platform detection.

use std::path::{Path, PathBuf};

use bgr_schema::{PlatformId, UnsupportedPlatform};

/// Marker file present on Alpine Linux.
pub const ALPINE_MARKER: &str = "/etc/alpine-release";

/// Maps an OS family (plus a distribution marker on Linux) to a [`PlatformId`].
#[derive(Debug, Clone)]
pub struct PlatformResolver {
    os: String,
    alpine_marker: PathBuf,
}

impl PlatformResolver {
    /// Resolver for the running host.
    pub fn host() -> Self {
        Self::new(std::env::consts::OS, ALPINE_MARKER)
    }

    pub fn new(os: impl Into<String>, alpine_marker: impl AsRef<Path>) -> Self {
        Self {
            os: os.into(),
            alpine_marker: alpine_marker.as_ref().to_path_buf(),
        }
    }

    /// Resolve the platform. A Linux host without the Alpine marker is the
    /// generic glibc variant, never an error.
    pub fn resolve(&self) -> Result<PlatformId, UnsupportedPlatform> {
        let platform = match self.os.to_lowercase().as_str() {
            "macos" | "darwin" => PlatformId::MacosArm64,
            "linux" if self.alpine_marker.exists() => PlatformId::Alpine,
            "linux" => PlatformId::Ubuntu,
            other => return Err(UnsupportedPlatform::new(other)),
        };
        tracing::debug!(os = %self.os, %platform, "resolved host platform");
        Ok(platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macos_resolves_to_arm64() {
        let r = PlatformResolver::new("macos", "/nonexistent/marker");
        assert_eq!(r.resolve().unwrap(), PlatformId::MacosArm64);
        let r = PlatformResolver::new("Darwin", "/nonexistent/marker");
        assert_eq!(r.resolve().unwrap(), PlatformId::MacosArm64);
    }

    #[test]
    fn linux_with_marker_is_alpine() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("alpine-release");
        std::fs::write(&marker, "3.19.1\n").unwrap();
        let r = PlatformResolver::new("linux", &marker);
        assert_eq!(r.resolve().unwrap(), PlatformId::Alpine);
    }

    #[test]
    fn linux_without_marker_defaults_to_ubuntu() {
        let dir = tempfile::tempdir().unwrap();
        let r = PlatformResolver::new("linux", dir.path().join("alpine-release"));
        assert_eq!(r.resolve().unwrap(), PlatformId::Ubuntu);
    }

    #[test]
    fn other_families_are_unsupported() {
        for os in ["windows", "freebsd", "android", ""] {
            let err = PlatformResolver::new(os, "/nonexistent").resolve().unwrap_err();
            assert_eq!(err.name, os);
        }
    }
}
