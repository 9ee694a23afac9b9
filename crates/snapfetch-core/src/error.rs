//! Error types for snapfetch-core.
//!
//! [`Error`] aborts a crawl. [`ResolveError`] belongs to a single
//! (OS type, version) unit: it is logged and the unit is dropped from every
//! later stage.

use std::path::PathBuf;

use snapfetch_fetch::{BatchError, FetchError};
use thiserror::Error;

use crate::os::OsType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("building the position index for {os} failed: {source}")]
    Index {
        os:     OsType,
        #[source]
        source: ResolveError,
    },

    #[error("fetching release history for {os} failed: {source}")]
    Catalog {
        os:     OsType,
        #[source]
        source: ResolveError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path:   PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Document {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Persist(#[from] snapfetch_fs::Error),

    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error(transparent)]
    Transport(FetchError),

    #[error("malformed response from {url}: {source}")]
    Body {
        url:    String,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{field}` missing from {url}")]
    MissingField { field: &'static str, url: String },

    #[error("`{field}` in {url} is not a build position: {value}")]
    Malformed {
        field: &'static str,
        url:   String,
        value: String,
    },

    #[error("no published position within {radius} of {position}")]
    NoNearbyPosition { position: u64, radius: u64 },

    #[error("search around {position} reached the bottom of the bucket at radius {radius}")]
    BelowFirstPosition { position: u64, radius: u64 },

    #[error("no downloadable artifact listed under {url}")]
    NoCandidate { url: String },

    #[error("download failed: {0}")]
    Download(#[source] FetchError),
}

impl From<FetchError> for ResolveError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Status { status, url } => ResolveError::Status { status, url },
            other => ResolveError::Transport(other),
        }
    }
}
