use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use snapfetch_core::{CrawlConfig, Report, ui::Formatter};

#[derive(Args, Clone, Debug)]
pub struct LsArg {
    /// JSON report to read; defaults to the one for the configured channel.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl LsArg {
    pub fn run(self, config: &CrawlConfig) -> Result<()> {
        let path = self.report.unwrap_or_else(|| config.json_report_path());
        match Report::load(&path)? {
            Some(report) => {
                let table = Formatter::default()
                    .with_header(path.display().to_string())
                    .with_footer(format!("{} records", report.len()))
                    .build(report.summary());
                println!("{table}");
            }
            None => println!("no report at {}", path.display()),
        }
        Ok(())
    }
}
