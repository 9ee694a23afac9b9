use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use snapfetch_core::{CrawlConfig, Pipeline, Report};

#[derive(Args, Clone, Debug)]
pub struct DownloadArg {
    /// JSON report to read; defaults to the one for the configured channel.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl DownloadArg {
    pub async fn run(self, config: CrawlConfig) -> Result<()> {
        let path = self.report.unwrap_or_else(|| config.json_report_path());
        let Some(report) = Report::load(&path)? else {
            bail!("no report at {}; run `snapfetch crawl` first", path.display());
        };

        let total = report.len();
        let pipeline = Pipeline::from_config(config).context("failed to set up downloads")?;
        let downloaded = pipeline.download(&report).await.context("downloads aborted")?;

        println!(
            "{downloaded} of {total} artifacts downloaded to {}",
            pipeline.config().downloads_dir().display()
        );
        Ok(())
    }
}
