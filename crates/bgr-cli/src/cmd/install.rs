//! `bg-remover install`
use std::sync::Arc;

use anyhow::{Context, Result};
use bgr_core::{BinaryInstaller, Config, GitHubReleases, InstallError, Reporter};
use reqwest::Client;

/// Download, verify and install the binary for this (or the given) platform.
pub async fn install(
    config: &Config,
    platform: Option<&str>,
    version: Option<&str>,
    reporter: &Arc<dyn Reporter>,
) -> Result<()> {
    let settings = config.install_settings()?;
    let client = Client::builder()
        .user_agent(crate::USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;
    let source = GitHubReleases::new(client.clone(), config.github.api_url.as_str())
        .with_token(config.github.token.clone());

    let installer = BinaryInstaller::new(settings, Arc::new(source), client)
        .with_reporter(Arc::clone(reporter));

    match installer.install(platform, version).await {
        Ok(report) => {
            reporter.info(&format!("Release: {}", report.tag));
            reporter.info(&format!("SHA256:  {}", report.sha256));
            Ok(())
        }
        Err(InstallError::UnsupportedPlatform(e)) => {
            reporter.error(&format!("Unsupported platform: {}", e.name));
            reporter.info(&format!("Supported platforms: {}", e.supported));
            reporter.info(&format!("For other platforms, see: {}", crate::FORKING_URL));
            Err(e.into())
        }
        Err(e) => {
            reporter.error(&e.to_string());
            Err(e).context("Installation failed")
        }
    }
}
