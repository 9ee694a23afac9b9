//! The crawl, stage by stage.
//!
//! Each stage is one [`Batch`] that fully drains before the next starts, so
//! a version only enters a stage once its previous stage has completed. A
//! unit that fails is logged where it fails and is simply absent from every
//! later stage's input.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use snapfetch_fetch::{Batch, BatchReport, HttpClient, Transport};
use tracing::{info, warn};

use crate::catalog::{Catalog, versions_of};
use crate::config::{CrawlConfig, Endpoints};
use crate::download::Downloader;
use crate::error::{ResolveError, Result};
use crate::index::{IndexBuilder, PositionIndex};
use crate::ledger::Ledger;
use crate::matcher::Matcher;
use crate::os::OsType;
use crate::record::{self, BasePosition, ByOs, PositionLookup, ResolutionRecord, UnitKey};
use crate::report::Report;
use crate::select::{ArtifactSelector, LargestArtifact};
use crate::ui::{ProgressTracker, ProgressTrackerBuilder, Tracker, TrackerBuilder};

/// Unit counts per stage of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub new_versions:   usize,
    pub base_positions: usize,
    pub resolved:       usize,
    /// Records in the written report, previous runs included.
    pub reported:       usize,
    pub downloaded:     usize,
    /// Units dropped by a reported failure in any stage.
    pub dropped:        usize,
}

/// Ledger contents to persist once the run has succeeded.
struct PendingLedger {
    ledger:   Ledger,
    contents: Vec<Value>,
}

pub struct Pipeline<C: HttpClient> {
    config:    CrawlConfig,
    client:    Arc<C>,
    endpoints: Arc<Endpoints>,
    selector:  Arc<dyn ArtifactSelector>,
}

impl Pipeline<Transport> {
    /// Pipeline over a reqwest transport built from `config.transport`.
    pub fn from_config(config: CrawlConfig) -> Result<Self> {
        config.validate()?;
        let transport = Transport::new(config.transport.to_options())?;
        Ok(Self::new(config, Arc::new(transport)))
    }
}

impl<C: HttpClient + 'static> Pipeline<C> {
    pub fn new(config: CrawlConfig, client: Arc<C>) -> Self {
        let endpoints = Arc::new(config.endpoints());
        let selector = Arc::new(LargestArtifact::new(config.excluded_names.iter().cloned()));
        Self {
            config,
            client,
            endpoints,
            selector,
        }
    }

    pub fn with_selector(mut self, selector: Arc<dyn ArtifactSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &CrawlConfig { &self.config }

    /// Run every stage, write the report and ledgers, then optionally
    /// download.
    ///
    /// # Errors
    ///
    /// Catalog and index failures abort before any unit runs. A stage whose
    /// units panicked aborts after that stage; nothing is persisted.
    pub async fn run(&self) -> Result<CrawlSummary> {
        self.config.validate()?;
        let mut summary = CrawlSummary::default();

        let catalog = Catalog::new(Arc::clone(&self.client), Arc::clone(&self.endpoints))
            .with_delay(self.config.resolve_delay());

        let (lookups, ledgers) = self.new_versions(&catalog).await?;
        summary.new_versions = record::count(&lookups);
        info!(versions = summary.new_versions, "new versions to resolve");

        let indexes = IndexBuilder::new(Arc::clone(&self.client), Arc::clone(&self.endpoints))
            .build_all(lookups.keys().copied())
            .await?;

        let positions = self.resolve_positions(&catalog, &lookups).await?;
        summary.base_positions = record::count(&positions);

        let records = self.resolve_downloads(&indexes, &positions).await?;
        summary.resolved = record::count(&records);
        summary.dropped = summary.new_versions.saturating_sub(summary.resolved);

        let mut report = Report::from_records(&records);
        if !self.config.force {
            if let Some(previous) = Report::load(&self.config.json_report_path())? {
                report.merge_previous(previous);
            }
        }
        report.write(&self.config.json_report_path(), &self.config.csv_report_path())?;
        summary.reported = report.len();

        for pending in ledgers {
            let PendingLedger { mut ledger, contents } = pending;
            ledger.store(contents)?;
        }

        if self.config.download {
            let current = Report::from_records(&records);
            summary.downloaded = self.download(&current).await?;
            summary.dropped += summary.resolved.saturating_sub(summary.downloaded);
        }

        info!(?summary, "crawl finished");
        Ok(summary)
    }

    /// Fetch release history and diff it against each ledger. OS types without
    /// new versions drop out here.
    async fn new_versions(&self, catalog: &Catalog<C>) -> Result<(ByOs<PositionLookup>, Vec<PendingLedger>)> {
        let mut lookups = ByOs::new();
        let mut pending = Vec::new();

        for &os in &self.config.os_types {
            let fetched = catalog.fetch_releases(os).await?;
            let ledger = Ledger::load(self.config.ledger_path(os))?;
            let new = ledger.new_releases(&fetched, self.config.force);

            let versions = versions_of(&new);
            info!(%os, new_releases = new.len(), versions = versions.len(), "ledger diffed");
            for version in versions {
                let lookup = catalog.position_lookup(&version);
                record::insert(&mut lookups, UnitKey::new(os, version), lookup);
            }

            if self.config.force || !ledger.exists() || !new.is_empty() {
                let contents = ledger.updated(&fetched, &new, self.config.force);
                pending.push(PendingLedger { ledger, contents });
            }
        }

        Ok((lookups, pending))
    }

    async fn resolve_positions(
        &self,
        catalog: &Catalog<C>,
        lookups: &ByOs<PositionLookup>,
    ) -> Result<ByOs<BasePosition>> {
        let len = record::count(lookups);
        let (batch, tracker) = self.stage(self.config.resolve_workers, "positions", len);

        let units = record::units(lookups).map(|(key, lookup)| {
            let catalog = catalog.clone();
            let lookup = lookup.clone();
            (key, async move { catalog.resolve_base_position(lookup).await })
        });
        let report = batch.run(units).await?;
        tracker.finish();

        Ok(collect("base positions", report))
    }

    async fn resolve_downloads(
        &self,
        indexes: &BTreeMap<OsType, Arc<PositionIndex>>,
        positions: &ByOs<BasePosition>,
    ) -> Result<ByOs<ResolutionRecord>> {
        let matcher = Matcher::new(
            Arc::clone(&self.client),
            Arc::clone(&self.endpoints),
            Arc::clone(&self.selector),
        )
        .with_radius(self.config.position_radius);

        let len = record::count(positions);
        let (batch, tracker) = self.stage(self.config.position_workers, "downloads", len);

        let units = record::units(positions).filter_map(|(key, base)| {
            let index = Arc::clone(indexes.get(&key.os)?);
            let matcher = matcher.clone();
            let base = base.clone();
            Some((key, async move { matcher.resolve_download(&index, &base).await }))
        });
        let report = batch.run(units).await?;
        tracker.finish();

        Ok(collect("download urls", report))
    }

    /// Download every record of `report`. Returns how many succeeded.
    pub async fn download(&self, report: &Report) -> Result<usize> {
        let downloader = Downloader::new(Arc::clone(&self.client), self.config.downloads_dir());
        let (batch, tracker) = self.stage(self.config.download_workers, "download", report.len());

        let units = report.records().filter_map(|(os, version, record)| {
            let os = match OsType::from_str(os) {
                Ok(os) => os,
                Err(e) => {
                    warn!(%os, %version, error = %e, "skipping record");
                    return None;
                }
            };
            let key = UnitKey::new(os, version);
            let downloader = downloader.clone();
            let url = record.download_url.clone();
            let unit_key = key.clone();
            Some((key, async move { downloader.download(&unit_key, &url).await }))
        });
        let outcome = batch.run(units).await?;
        tracker.finish();

        info!(
            downloaded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            root = %downloader.root().display(),
            "downloads finished"
        );
        Ok(outcome.succeeded.len())
    }

    fn stage(&self, workers: usize, name: &str, len: usize) -> (Batch, ProgressTracker) {
        let tracker = ProgressTrackerBuilder::default()
            .with_len(len as u64)
            .with_prefix(name)
            .with_finish("done")
            .hidden(!self.config.progress)
            .build();
        let batch = Batch::new(workers).on_complete(tracker.hook());
        (batch, tracker)
    }
}

fn collect<T>(stage: &str, report: BatchReport<UnitKey, T, ResolveError>) -> ByOs<T> {
    info!(stage, succeeded = report.succeeded.len(), dropped = report.failed.len(), "stage finished");

    let mut out = ByOs::new();
    for (key, value) in report.succeeded {
        record::insert(&mut out, key, value);
    }
    out
}
