//! `bg-remover status`: configuration and binary health.
use std::path::Path;

use bgr_core::{Config, ExecutionError, ExecutionService, PlatformResolver, QueueTarget};
use bgr_schema::PlatformId;
use crossterm::style::Stylize;

const LABEL_WIDTH: usize = 14;

fn row(label: &str, value: impl std::fmt::Display) {
    let label = format!("{label:<LABEL_WIDTH$}");
    println!("  {} {value}", label.dark_grey());
}

/// Print what is configured and whether the binary is usable.
///
/// Never fails on an unhealthy binary; that is what it reports.
pub fn status(config: &Config, config_path: Option<&Path>) {
    let service = ExecutionService::new(&config.binary_path, config.timeout());

    println!("{}", "bg-remover".bold());
    row("version", env!("BGR_VERSION"));
    let config_file = config_path.map_or_else(bgr_core::default_config_path, Path::to_path_buf);
    let config_label = if config_file.is_file() {
        config_file.display().to_string()
    } else {
        format!("{} (not found, using defaults)", config_file.display())
    };
    row("config", config_label);
    println!();

    println!("{}", "Platform".bold());
    match PlatformResolver::host().resolve() {
        Ok(platform) => row("detected", platform),
        Err(e) => row("detected", e.to_string().red()),
    }
    if let Some(platform) = &config.platform {
        row("configured", platform);
    }
    row(
        "supported",
        PlatformId::ALL
            .iter()
            .map(|p| format!("{p} ({})", p.asset_name()))
            .collect::<Vec<_>>()
            .join(", "),
    );
    println!();

    println!("{}", "Binary".bold());
    row("path", config.binary_path.display());
    row("release", format!("{}@{}", config.github.repo, config.github.version));
    match service.check_binary() {
        Ok(()) => {
            row("installed", "yes".green());
            row("executable", "yes".green());
            match service.probe() {
                Ok(output) => {
                    let first = output.stdout.lines().next().unwrap_or("").trim().to_string();
                    row("--help", if first.is_empty() { "ok".to_string() } else { first });
                }
                Err(e) => row("--help", e.to_string().red()),
            }
        }
        Err(ExecutionError::BinaryNotExecutable { .. }) => {
            row("installed", "yes".green());
            row("executable", "no".red());
        }
        Err(_) => {
            row("installed", "no (run 'bg-remover install')".yellow());
        }
    }
    println!();

    println!("{}", "Execution".bold());
    row("timeout", format!("{}s", config.timeout));
    row("temp dir", config.temp_dir.display());
    row("queue", QueueTarget::from(&config.queue));
    let disks = config.disks();
    row("disks", disks.names().collect::<Vec<_>>().join(", "));
}
