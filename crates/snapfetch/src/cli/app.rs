use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use snapfetch_core::CrawlConfig;

use super::{crawl::CrawlArg, download::DownloadArg, ls::LsArg};

#[derive(Clone, Debug, Parser)]
#[command(name = "snapfetch", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,

    /// Raise log verbosity; `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// TOML file with crawl settings.
    #[arg(short, long, global = true, env = "SNAPFETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for ledgers, reports and downloads.
    #[arg(short, long, global = true, env = "SNAPFETCH_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Release channel.
    #[arg(long, global = true, env = "SNAPFETCH_CHANNEL")]
    pub channel: Option<String>,

    /// Disable progress bars.
    #[arg(long, global = true)]
    pub no_progress: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "c", name = "crawl", about = "Resolve new releases and write the report")]
    Crawl(CrawlArg),
    #[command(alias = "dl", name = "download", about = "Download every artifact in a report")]
    Download(DownloadArg),
    #[command(alias = "list", name = "ls", about = "Summarise a report")]
    Ls(LsArg),
}

impl App {
    /// Settings file first, then flags.
    pub fn crawl_config(&self) -> Result<CrawlConfig> {
        let mut config = match &self.config {
            Some(path) => CrawlConfig::load(path).with_context(|| format!("failed to load {}", path.display()))?,
            None => CrawlConfig::default(),
        };

        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(channel) = &self.channel {
            config.channel = channel.clone();
        }
        if self.no_progress {
            config.progress = false;
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.crawl_config()?;
        match self.cmd {
            Commands::Crawl(arg) => arg.run(config).await,
            Commands::Download(arg) => arg.run(config).await,
            Commands::Ls(arg) => arg.run(&config),
        }
    }
}
