//! `bg-remover run`
use std::path::Path;

use anyhow::{Context, Result};
use bgr_core::{Config, ExecutionService, Reporter};

/// Process one local file.
pub fn run(config: &Config, input: &Path, output: &Path, reporter: &dyn Reporter) -> Result<()> {
    let service = ExecutionService::new(&config.binary_path, config.timeout());
    service
        .run(input, output)
        .with_context(|| format!("Failed to remove background from {}", input.display()))?;

    reporter.success(&format!("Wrote {}", output.display()));
    Ok(())
}
