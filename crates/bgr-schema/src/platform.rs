//! Supported platforms and their release assets.

/// Platform a prebuilt bg-remover binary is published for.
///
/// The set is closed: each variant has exactly one release asset, listed in
/// [`PLATFORM_ASSETS`]. Anything else is rejected with
/// [`UnsupportedPlatform`].
///
/// # Example
///
/// ```
/// use bgr_schema::PlatformId;
///
/// let platform: PlatformId = "ubuntu".parse().unwrap();
/// assert_eq!(platform.asset_name(), "bg-remover-ubuntu-x86_64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformId {
    /// Alpine Linux (musl), `x86_64`
    Alpine,
    /// Glibc-based Linux, `x86_64`
    Ubuntu,
    /// macOS on Apple Silicon
    MacosArm64,
}

/// Static platform to release-asset table.
pub const PLATFORM_ASSETS: &[(PlatformId, &str)] = &[
    (PlatformId::Alpine, "bg-remover-alpine-x86_64"),
    (PlatformId::Ubuntu, "bg-remover-ubuntu-x86_64"),
    (PlatformId::MacosArm64, "bg-remover-macos-arm64"),
];

impl PlatformId {
    /// Every supported platform, in table order.
    pub const ALL: [PlatformId; 3] = [Self::Alpine, Self::Ubuntu, Self::MacosArm64];

    /// Canonical identifier, as accepted by `--platform`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alpine => "alpine",
            Self::Ubuntu => "ubuntu",
            Self::MacosArm64 => "macos-arm64",
        }
    }

    /// Name of the release asset holding this platform's binary.
    pub fn asset_name(&self) -> &'static str {
        PLATFORM_ASSETS
            .iter()
            .find(|(id, _)| id == self)
            .map_or("", |(_, name)| *name)
    }

    /// Comma separated list of supported identifiers, for error messages.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(PlatformId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlatformId {
    type Err = UnsupportedPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alpine" => Ok(Self::Alpine),
            "ubuntu" => Ok(Self::Ubuntu),
            "macos-arm64" => Ok(Self::MacosArm64),
            _ => Err(UnsupportedPlatform::new(s)),
        }
    }
}

/// A platform name outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported platform: {name} (supported platforms: {supported})")]
pub struct UnsupportedPlatform {
    /// The rejected platform or OS name.
    pub name: String,
    /// Supported identifiers, comma separated.
    pub supported: String,
}

impl UnsupportedPlatform {
    /// Build the error for `name`, filling in the supported list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supported: PlatformId::supported_list(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_has_an_asset() {
        for platform in PlatformId::ALL {
            assert!(platform.asset_name().starts_with("bg-remover-"));
        }
    }

    #[test]
    fn parses_canonical_names() {
        assert_eq!("alpine".parse::<PlatformId>(), Ok(PlatformId::Alpine));
        assert_eq!("Ubuntu".parse::<PlatformId>(), Ok(PlatformId::Ubuntu));
        assert_eq!(
            "macos-arm64".parse::<PlatformId>(),
            Ok(PlatformId::MacosArm64)
        );
    }

    #[test]
    fn rejects_unknown_platform() {
        let err = "windows".parse::<PlatformId>().unwrap_err();
        assert_eq!(err.name, "windows");
        assert!(err.to_string().contains("alpine, ubuntu, macos-arm64"));
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&PlatformId::MacosArm64).unwrap();
        assert_eq!(json, "\"macos-arm64\"");
    }
}
