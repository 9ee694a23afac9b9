//! Crawl configuration.
//!
//! Defaults target the public Chromium snapshot bucket and the omahaproxy
//! release catalog. A TOML file can override any field; the CLI layers its own
//! flags on top of whatever the file produced.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snapfetch_fetch::{TransportOptions, data::DEFAULT_STATUS_FORCELIST};
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::os::OsType;

pub const DEFAULT_CATALOG_HOST: &str = "https://omahaproxy.appspot.com";
pub const DEFAULT_STORAGE_API: &str = "https://www.googleapis.com/storage/v1";
pub const DEFAULT_BUCKET: &str = "chromium-browser-snapshots";

/// Fields requested from the listing API.
const LISTING_FIELDS: &str = "items(kind,mediaLink,metadata,name,size,updated),kind,prefixes,nextPageToken";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlConfig {
    pub channel:          String,
    pub catalog_host:     String,
    pub storage_api:      String,
    pub bucket:           String,
    pub output_dir:       PathBuf,
    pub os_types:         Vec<OsType>,
    /// Ignore ledgers and previous reports.
    pub force:            bool,
    /// Download resolved artifacts after writing the report.
    pub download:         bool,
    pub progress:         bool,
    pub position_radius:  u64,
    pub resolve_workers:  usize,
    pub position_workers: usize,
    pub download_workers: usize,
    /// Pause after each base-position lookup.
    pub resolve_delay_ms: u64,
    /// Artifact names containing any of these are never selected.
    pub excluded_names:   Vec<String>,
    pub transport:        TransportConfig,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            channel:          "stable".to_string(),
            catalog_host:     DEFAULT_CATALOG_HOST.to_string(),
            storage_api:      DEFAULT_STORAGE_API.to_string(),
            bucket:           DEFAULT_BUCKET.to_string(),
            output_dir:       PathBuf::from("."),
            os_types:         OsType::ALL.to_vec(),
            force:            false,
            download:         false,
            progress:         true,
            position_radius:  100,
            resolve_workers:  3,
            position_workers: 100,
            download_workers: 10,
            resolve_delay_ms: 5_000,
            excluded_names:   crate::select::DEFAULT_EXCLUDED_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            transport:        TransportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    pub timeout_secs:         u64,
    pub total_retries:        u32,
    pub connect_retries:      u32,
    pub read_retries:         u32,
    pub backoff_factor_ms:    u64,
    pub max_backoff_secs:     u64,
    pub status_forcelist:     Vec<u16>,
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs:         300,
            total_retries:        10,
            connect_retries:      10,
            read_retries:         10,
            backoff_factor_ms:    3_000,
            max_backoff_secs:     120,
            status_forcelist:     DEFAULT_STATUS_FORCELIST.to_vec(),
            accept_invalid_certs: true,
        }
    }
}

impl TransportConfig {
    pub fn to_options(&self) -> TransportOptions {
        TransportOptions::default()
            .timeout(Duration::from_secs(self.timeout_secs))
            .total_retries(self.total_retries)
            .connect_retries(self.connect_retries)
            .read_retries(self.read_retries)
            .backoff_factor(Duration::from_millis(self.backoff_factor_ms))
            .max_backoff(Duration::from_secs(self.max_backoff_secs))
            .status_forcelist(self.status_forcelist.iter().copied())
            .accept_invalid_certs(self.accept_invalid_certs)
    }
}

impl CrawlConfig {
    /// Read a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = snapfetch_fs::atomic_read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        toml::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let workers = [
            ("resolve_workers", self.resolve_workers),
            ("position_workers", self.position_workers),
            ("download_workers", self.download_workers),
        ];
        for (name, value) in workers {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be at least 1")));
            }
        }
        if self.position_radius == 0 {
            return Err(Error::Config("position_radius must be at least 1".into()));
        }
        if self.channel.trim().is_empty() {
            return Err(Error::Config("channel must not be empty".into()));
        }
        if self.os_types.is_empty() {
            return Err(Error::Config("at least one OS type is required".into()));
        }
        Ok(())
    }

    pub fn resolve_delay(&self) -> Duration { Duration::from_millis(self.resolve_delay_ms) }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            catalog_host: self.catalog_host.trim_end_matches('/').to_string(),
            storage_api:  self.storage_api.trim_end_matches('/').to_string(),
            bucket:       self.bucket.clone(),
            channel:      self.channel.clone(),
        }
    }

    pub fn ledger_path(&self, os: OsType) -> PathBuf { self.output_dir.join(format!("{os}.history.json")) }

    pub fn json_report_path(&self) -> PathBuf {
        self.output_dir.join(format!("chromium.{}.json", self.channel))
    }

    pub fn csv_report_path(&self) -> PathBuf {
        self.output_dir.join(format!("chromium.{}.csv", self.channel))
    }

    pub fn downloads_dir(&self) -> PathBuf { self.output_dir.join("Downloads") }
}

/// Remote URL layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub catalog_host: String,
    pub storage_api:  String,
    pub bucket:       String,
    pub channel:      String,
}

impl Endpoints {
    /// Delimited listing of `prefix`, optionally continuing from a page token.
    /// Query values are form-encoded.
    pub fn listing_url(&self, prefix: &str, page_token: Option<&str>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("delimiter", "/")
            .append_pair("prefix", prefix)
            .append_pair("fields", LISTING_FIELDS);
        if let Some(token) = page_token {
            query.append_pair("pageToken", token);
        }
        format!("{}/b/{}/o?{}", self.storage_api, self.bucket, query.finish())
    }

    pub fn history_url(&self, os: OsType) -> String {
        format!(
            "{}/history.json?channel={}&os={}",
            self.catalog_host,
            self.channel,
            os.catalog_os()
        )
    }

    pub fn deps_url(&self, version: &str) -> String {
        format!("{}/deps.json?version={}", self.catalog_host, version)
    }
}
