use anyhow::{Context, Result};
use clap::{ArgAction, Args, builder::BoolishValueParser};
use snapfetch_core::{CrawlConfig, OsType, Pipeline};

#[derive(Args, Clone, Debug)]
pub struct CrawlArg {
    /// Ignore ledgers and the previous report, resolving every release again.
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
    )]
    pub force: Option<bool>,

    /// Download the resolved artifacts once the report is written.
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
    )]
    pub download: Option<bool>,

    /// Only crawl these OS types.
    #[arg(long = "os", value_delimiter = ',')]
    pub os_types: Vec<OsType>,
}

impl CrawlArg {
    pub fn apply(&self, config: &mut CrawlConfig) {
        if let Some(force) = self.force {
            config.force = force;
        }
        if let Some(download) = self.download {
            config.download = download;
        }
        if !self.os_types.is_empty() {
            config.os_types = self.os_types.clone();
        }
    }

    pub async fn run(self, mut config: CrawlConfig) -> Result<()> {
        self.apply(&mut config);

        let pipeline = Pipeline::from_config(config).context("failed to set up the crawl")?;
        let summary = pipeline.run().await.context("crawl aborted")?;

        println!(
            "{} new versions, {} resolved, {} dropped, {} in report",
            summary.new_versions, summary.resolved, summary.dropped, summary.reported
        );
        if pipeline.config().download {
            println!("{} artifacts downloaded", summary.downloaded);
        }
        Ok(())
    }
}
