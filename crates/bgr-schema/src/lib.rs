//! Shared types for the bg-remover orchestration workspace.
//!
//! Everything in this crate is pure data plus local hashing: which platforms
//! exist and what their release asset is called, validated SHA-256 digests,
//! checksum manifests and `owner/repo` references. Network and process side
//! effects live in `bgr-core`.

pub mod hash;
pub mod manifest;
pub mod platform;
pub mod repo;

// Re-exports
pub use hash::*;
pub use manifest::{ChecksumError, ChecksumManifest, ManifestEntry};
pub use platform::*;
pub use repo::GitHubRepo;

/// Name of the release asset that carries the checksum manifest.
pub const CHECKSUM_MANIFEST_NAME: &str = "checksums.txt";
