//! bg-remover - install and run the background removal binary

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bgr_cli::cmd;
use bgr_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never mix with command output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cmd::load_config(cli.config.as_deref())?;
    let reporter = cmd::reporter(cli.quiet);
    tracing::debug!(
        binary = %config.binary_path.display(),
        repo = %config.github.repo,
        timeout_secs = config.timeout,
        "configuration loaded"
    );

    match cli.command {
        Commands::Install { platform, version } => {
            cmd::install::install(&config, platform.as_deref(), version.as_deref(), &reporter).await
        }
        Commands::Run { input, output } => {
            // Blocking subprocess wait; keep it off the async workers.
            tokio::task::spawn_blocking(move || {
                cmd::run::run(&config, &input, &output, reporter.as_ref())
            })
            .await?
        }
        Commands::Transfer { from, to, queued } => {
            tokio::task::spawn_blocking(move || {
                cmd::transfer::transfer(&config, &from, &to, queued, reporter.as_ref())
            })
            .await?
        }
        Commands::Status => {
            cmd::status::status(&config, cli.config.as_deref());
            Ok(())
        }
    }
}
