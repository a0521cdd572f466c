//! Disk-to-disk background removal.
//!
//! A transfer stages the input blob into a private directory, runs the
//! binary on it, and copies the result back out. The staging directory is a
//! [`TempDir`] owned by the call, so it is removed however the call ends.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::execution::{ExecutionError, ExecutionService};
use crate::storage::{Disks, StorageError};

/// Per-call staging directory holding the temp input and output files.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

impl StagingArea {
    /// Allocate a fresh `bg_remover_*` directory under `parent`. The input
    /// keeps the extension of `source_path`; the output is always PNG and is
    /// not created here.
    pub fn allocate(parent: &Path, source_path: &str) -> Result<Self, ExecutionError> {
        std::fs::create_dir_all(parent).map_err(|source| ExecutionError::TempFileAllocationFailed {
            dir: parent.to_path_buf(),
            source,
        })?;

        let dir = tempfile::Builder::new()
            .prefix("bg_remover_")
            .tempdir_in(parent)
            .map_err(|source| ExecutionError::TempFileAllocationFailed {
                dir: parent.to_path_buf(),
                source,
            })?;

        let input_name = match Path::new(source_path).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("input.{ext}"),
            _ => "input".to_string(),
        };
        let input = dir.path().join(input_name);
        let output = dir.path().join("output.png");

        Ok(Self { dir, input, output })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Moves blobs between logical disks and the execution service.
#[derive(Debug)]
pub struct StorageBridge {
    service: ExecutionService,
    disks: Disks,
    temp_dir: PathBuf,
}

impl StorageBridge {
    pub fn new(service: ExecutionService, disks: Disks, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            service,
            disks,
            temp_dir: temp_dir.into(),
        }
    }

    pub fn service(&self) -> &ExecutionService {
        &self.service
    }

    pub fn disks(&self) -> &Disks {
        &self.disks
    }

    /// Read `input_path` from `input_disk`, remove its background, and write
    /// the PNG result to `output_path` on `output_disk`.
    pub fn transfer(
        &self,
        input_disk: &str,
        input_path: &str,
        output_disk: &str,
        output_path: &str,
    ) -> Result<(), ExecutionError> {
        let read_failed = |source: StorageError| ExecutionError::StorageReadFailed {
            disk: input_disk.to_string(),
            path: input_path.to_string(),
            source,
        };
        let write_failed = |source: StorageError| ExecutionError::StorageWriteFailed {
            disk: output_disk.to_string(),
            path: output_path.to_string(),
            source,
        };

        let source = self.disks.disk(input_disk).map_err(read_failed)?;
        let target = self.disks.disk(output_disk).map_err(write_failed)?;

        let staging = StagingArea::allocate(&self.temp_dir, input_path)?;
        tracing::debug!(
            staging = %staging.path().display(),
            input_disk,
            input_path,
            output_disk,
            output_path,
            "transfer started"
        );

        let blob = source.get(input_path).map_err(read_failed)?;
        std::fs::write(staging.input(), &blob).map_err(|e| ExecutionError::Staging {
            path: staging.input().to_path_buf(),
            source: e,
        })?;

        self.service.run(staging.input(), staging.output())?;

        let result = std::fs::read(staging.output()).map_err(|e| ExecutionError::Staging {
            path: staging.output().to_path_buf(),
            source: e,
        })?;
        target.put(output_path, &result).map_err(write_failed)?;

        tracing::info!(
            input_disk,
            input_path,
            output_disk,
            output_path,
            bytes = result.len(),
            "background removed"
        );
        Ok(())
    }
}
