//! bg-remover - background removal binary manager
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Installs the prebuilt `bg-remover` binary for the host platform from its
//! GitHub releases and runs it, either on local files or between configured
//! storage disks.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.bg-remover/
//! ├── bin/bg-remover   # Installed binary
//! └── config.toml      # Optional configuration
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use bgr_core::USER_AGENT;

/// Guide for building the binary on platforms without a prebuilt release.
pub const FORKING_URL: &str = "https://github.com/artisan-build/bg-remover/blob/main/FORKING.md";

#[derive(Debug, Parser)]
#[command(name = "bg-remover")]
#[command(author, version = env!("BGR_VERSION"), about = "Install and run the bg-remover binary")]
pub struct Cli {
    /// Configuration file (default: ~/.bg-remover/config.toml)
    #[arg(long, global = true, env = "BG_REMOVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install the bg-remover binary for this platform
    Install {
        /// Platform to install (alpine, ubuntu, macos-arm64)
        #[arg(long)]
        platform: Option<String>,
        /// Version to install (default: latest)
        #[arg(long)]
        version: Option<String>,
    },
    /// Remove the background of a local image
    Run {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,
        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Remove the background of an image stored on a disk
    Transfer {
        /// Source, as DISK:PATH (a bare PATH uses the `local` disk)
        #[arg(long)]
        from: DiskPath,
        /// Destination, as DISK:PATH
        #[arg(long)]
        to: DiskPath,
        /// Run through the configured queue instead of inline
        #[arg(long)]
        queued: bool,
    },
    /// Show configuration and binary health
    Status,
}

/// A path on a named storage disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskPath {
    pub disk: String,
    pub path: String,
}

impl FromStr for DiskPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (disk, path) = s.split_once(':').unwrap_or(("local", s));
        if disk.is_empty() || path.is_empty() {
            return Err(format!("expected DISK:PATH, got '{s}'"));
        }
        Ok(Self {
            disk: disk.to_string(),
            path: path.to_string(),
        })
    }
}

impl fmt::Display for DiskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.disk, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn disk_path_parsing() {
        let p: DiskPath = "uploads:images/a.jpg".parse().unwrap();
        assert_eq!(p.disk, "uploads");
        assert_eq!(p.path, "images/a.jpg");
        assert_eq!(p.to_string(), "uploads:images/a.jpg");

        let bare: DiskPath = "a.jpg".parse().unwrap();
        assert_eq!(bare.disk, "local");

        assert!("uploads:".parse::<DiskPath>().is_err());
        assert!(":a.jpg".parse::<DiskPath>().is_err());
    }

    #[test]
    fn parses_transfer_flags() {
        let cli = Cli::try_parse_from([
            "bg-remover",
            "-q",
            "transfer",
            "--from",
            "uploads:a.jpg",
            "--to",
            "public:a.png",
            "--queued",
        ])
        .unwrap();
        assert!(cli.quiet);
        match cli.command {
            Commands::Transfer { from, to, queued } => {
                assert_eq!(from.disk, "uploads");
                assert_eq!(to.path, "a.png");
                assert!(queued);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
