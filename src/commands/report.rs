use crate::client::{save_report, HttpChatClient};
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Handle `tablechat report`
///
/// Downloads the generated report into `output`, or the current
/// directory when none is given.
pub async fn run_report(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let client = HttpChatClient::new(&config.server)?;
    let dir = output.unwrap_or_else(|| PathBuf::from("."));

    let path = download_report_to(&client, &dir).await?;
    println!("{}", format!("Saved report to {}", path.display()).green());
    Ok(())
}

/// Download the report and write it into `dir`
///
/// # Errors
///
/// Returns an error if the download fails or the file cannot be written
pub async fn download_report_to(client: &HttpChatClient, dir: &Path) -> Result<PathBuf> {
    let report = client.download_report().await?;
    let path = save_report(&report, dir).await?;
    tracing::info!(path = %path.display(), "Report saved");
    Ok(path)
}
