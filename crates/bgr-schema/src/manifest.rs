//! Checksum manifests (`checksums.txt`).
//!
//! One entry per line: `<sha256 hex> <asset name>`, optionally followed by
//! more whitespace separated fields which are ignored. The `sha256sum`
//! layout (two spaces, `*` binary marker) parses the same way. Blank lines
//! and `#` comments are skipped.

use std::path::Path;

use crate::hash::Sha256Digest;

/// Reasons a file fails verification against a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// No manifest line names the asset.
    #[error("no checksum entry for '{name}'")]
    MissingEntry {
        /// Asset that was looked up.
        name: String,
    },

    /// The first line naming the asset does not carry a valid digest.
    #[error("malformed checksum entry for '{name}': {line}")]
    Malformed {
        /// Asset that was looked up.
        name: String,
        /// The offending manifest line.
        line: String,
    },

    /// The digest differs from the one listed.
    #[error("checksum mismatch for '{name}': expected {expected}, got {actual}")]
    Mismatch {
        /// Asset that was looked up.
        name: String,
        /// Digest listed in the manifest.
        expected: Sha256Digest,
        /// Digest of the file on disk.
        actual: Sha256Digest,
    },

    /// The file could not be read for hashing.
    #[error("failed to hash {path}: {source}")]
    Io {
        /// File being hashed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A single manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Asset name as written (binary marker stripped).
    pub name: String,
    /// Parsed digest, `None` when the first field is not a valid SHA256.
    pub digest: Option<Sha256Digest>,
    /// Raw line, kept for error reporting.
    pub line: String,
}

/// Parsed checksum manifest, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    entries: Vec<ManifestEntry>,
}

impl ChecksumManifest {
    /// Parse manifest text. Never fails: lines that do not have at least two
    /// fields are skipped, and invalid digests are kept as `None` so they
    /// still shadow later lines for the same name.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let digest = fields.next()?;
                let name = fields.next()?.trim_start_matches('*');
                Some(ManifestEntry {
                    name: name.to_string(),
                    digest: Sha256Digest::new(digest).ok(),
                    line: line.to_string(),
                })
            })
            .collect();

        Self { entries }
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// First entry whose name equals `name` exactly.
    pub fn find(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Check a precomputed digest against the entry for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::MissingEntry`] when no line names the asset,
    /// [`ChecksumError::Malformed`] when that line's digest is invalid, and
    /// [`ChecksumError::Mismatch`] when the digests differ.
    pub fn verify(&self, name: &str, actual: &Sha256Digest) -> Result<(), ChecksumError> {
        let entry = self.find(name).ok_or_else(|| ChecksumError::MissingEntry {
            name: name.to_string(),
        })?;

        let expected = entry.digest.as_ref().ok_or_else(|| ChecksumError::Malformed {
            name: name.to_string(),
            line: entry.line.clone(),
        })?;

        if expected != actual {
            return Err(ChecksumError::Mismatch {
                name: name.to_string(),
                expected: expected.clone(),
                actual: actual.clone(),
            });
        }

        Ok(())
    }

    /// Hash `path` and check it against the entry for `name`.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify), plus [`ChecksumError::Io`] if the
    /// file cannot be read.
    pub fn verify_file(&self, name: &str, path: &Path) -> Result<Sha256Digest, ChecksumError> {
        let actual = Sha256Digest::compute_file(path).map_err(|source| ChecksumError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.verify(name, &actual)?;
        Ok(actual)
    }
}
