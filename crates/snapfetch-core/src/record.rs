//! Per (OS type, version) records, one type per pipeline stage.
//!
//! A unit that fails a stage simply has no entry in that stage's output map.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::os::OsType;

/// Values keyed by OS type, then release version.
pub type ByOs<T> = BTreeMap<OsType, BTreeMap<String, T>>;

/// Identifies one unit of work in a stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey {
    pub os:      OsType,
    pub version: String,
}

impl UnitKey {
    pub fn new(os: OsType, version: impl Into<String>) -> Self {
        Self {
            os,
            version: version.into(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}/{}", self.os, self.version) }
}

/// A newly observed version with the URL that declares its base position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionLookup {
    pub position_url: String,
}

/// The build position the catalog declares for a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePosition {
    pub position_url: String,
    pub position:     u64,
}

/// A fully resolved version, as persisted in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub position_url:      String,
    /// Declared base position.
    pub position:          u64,
    /// Published position actually used, possibly adjusted.
    pub download_position: u64,
    /// Listing URL of the resolved position.
    pub download_prefix:   String,
    pub download_url:      String,
}

pub(crate) fn count<T>(map: &ByOs<T>) -> usize { map.values().map(BTreeMap::len).sum() }

/// Units of `map`, in OS then version order.
pub(crate) fn units<T>(map: &ByOs<T>) -> impl Iterator<Item = (UnitKey, &T)> {
    map.iter().flat_map(|(os, versions)| {
        versions
            .iter()
            .map(move |(version, value)| (UnitKey::new(*os, version.as_str()), value))
    })
}

/// Insert `value` under its unit key.
pub(crate) fn insert<T>(map: &mut ByOs<T>, key: UnitKey, value: T) {
    map.entry(key.os).or_default().insert(key.version, value);
}
