//! Aggregate report of resolved download URLs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snapfetch_fs::{AtomicWriteOptions, atomic_write, read_if_exists};
use tabled::Tabled;
use tracing::info;

use crate::error::{Error, Result};
use crate::record::{ByOs, ResolutionRecord};

pub const CSV_HEADER: [&str; 7] = [
    "os",
    "version",
    "position_url",
    "position",
    "download_position",
    "download_prefix",
    "download_url",
];

/// `os → version → record`, as persisted.
///
/// Keyed by the OS name rather than [`crate::OsType`] so that a report
/// written by a build with other OS types still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    entries: BTreeMap<String, BTreeMap<String, ResolutionRecord>>,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    os:                &'a str,
    version:           &'a str,
    position_url:      &'a str,
    position:          u64,
    download_position: u64,
    download_prefix:   &'a str,
    download_url:      &'a str,
}

/// One line of the `ls` table.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct SummaryRow {
    #[tabled(rename = "OS")]
    pub os:              String,
    #[tabled(rename = "Versions")]
    pub versions:        usize,
    #[tabled(rename = "Newest Position")]
    pub newest_position: u64,
    #[tabled(rename = "Newest Version")]
    pub newest_version:  String,
}

impl Report {
    pub fn new() -> Self { Self::default() }

    pub fn from_records(records: &ByOs<ResolutionRecord>) -> Self {
        let entries = records
            .iter()
            .map(|(os, versions)| (os.to_string(), versions.clone()))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, os: impl Into<String>, version: impl Into<String>, record: ResolutionRecord) {
        self.entries.entry(os.into()).or_default().insert(version.into(), record);
    }

    pub fn get(&self, os: &str, version: &str) -> Option<&ResolutionRecord> {
        self.entries.get(os).and_then(|versions| versions.get(version))
    }

    pub fn len(&self) -> usize { self.entries.values().map(BTreeMap::len).sum() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Every record, in OS then version order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &str, &ResolutionRecord)> {
        self.entries.iter().flat_map(|(os, versions)| {
            versions
                .iter()
                .map(move |(version, record)| (os.as_str(), version.as_str(), record))
        })
    }

    /// Fold in a previously persisted report. Entries already present here
    /// win; entries only in `previous` are kept as they were.
    pub fn merge_previous(&mut self, previous: Report) {
        for (os, versions) in previous.entries {
            let current = self.entries.entry(os).or_default();
            for (version, record) in versions {
                current.entry(version).or_insert(record);
            }
        }
    }

    /// `None` when no report has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let Some(bytes) = read_if_exists(path)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| Error::Document {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> { serde_json::to_vec_pretty(self) }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;
        for (os, version, record) in self.records() {
            writer.serialize(CsvRow {
                os,
                version,
                position_url: &record.position_url,
                position: record.position,
                download_position: record.download_position,
                download_prefix: &record.download_prefix,
                download_url: &record.download_url,
            })?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Csv(csv::Error::from(e.into_error())))
    }

    /// Write both renderings, each atomically.
    pub fn write(&self, json_path: &Path, csv_path: &Path) -> Result<()> {
        let json = self.to_json().map_err(|source| Error::Document {
            path: json_path.to_path_buf(),
            source,
        })?;
        atomic_write(json_path, &json, AtomicWriteOptions::new().sync(true))?;
        atomic_write(csv_path, &self.to_csv()?, AtomicWriteOptions::new().sync(true))?;

        info!(
            records = self.len(),
            json = %json_path.display(),
            csv = %csv_path.display(),
            "report written"
        );
        Ok(())
    }

    pub fn summary(&self) -> Vec<SummaryRow> {
        self.entries
            .iter()
            .map(|(os, versions)| {
                let newest = versions.iter().max_by_key(|(_, record)| record.download_position);
                SummaryRow {
                    os:              os.clone(),
                    versions:        versions.len(),
                    newest_position: newest.map(|(_, r)| r.download_position).unwrap_or_default(),
                    newest_version:  newest.map(|(v, _)| v.clone()).unwrap_or_default(),
                }
            })
            .collect()
    }
}
