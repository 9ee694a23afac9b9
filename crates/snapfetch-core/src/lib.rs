//! Snapshot crawl: discover published build positions, resolve release
//! versions to the nearest published snapshot and fetch the artifacts.
//!
//! Stages, in order:
//! - [`catalog`] - release history per OS type and declared base positions
//! - [`index`] - every published position per OS type
//! - [`matcher`] - nearest published position and artifact selection
//! - [`download`] - streaming artifacts to disk
//!
//! [`pipeline::Pipeline`] runs them with bounded concurrency and writes the
//! [`report::Report`] and [`ledger::Ledger`] files.

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod index;
pub mod ledger;
pub mod matcher;
pub mod os;
pub mod pipeline;
pub mod record;
mod remote;
pub mod report;
pub mod select;
pub mod ui;

#[cfg(test)]
mod testing;

pub use config::{CrawlConfig, Endpoints, TransportConfig};
pub use error::{Error, ResolveError, Result};
pub use os::OsType;
pub use pipeline::{CrawlSummary, Pipeline};
pub use record::{BasePosition, ByOs, PositionLookup, ResolutionRecord, UnitKey};
pub use report::Report;
pub use select::{ArtifactSelector, LargestArtifact, ListingItem};
