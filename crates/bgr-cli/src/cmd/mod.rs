//! Subcommand implementations.

pub mod install;
pub mod run;
pub mod status;
pub mod transfer;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bgr_core::{Config, NullReporter, Reporter};

use crate::ui::ConsoleReporter;

/// Load configuration from `path`, the default file, and the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load configuration")
}

/// Console output unless `quiet`.
pub fn reporter(quiet: bool) -> Arc<dyn Reporter> {
    if quiet {
        Arc::new(NullReporter)
    } else {
        Arc::new(ConsoleReporter::new())
    }
}
