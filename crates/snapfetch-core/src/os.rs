//! OS types partitioning the snapshot bucket and the release catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Platform a snapshot was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    Mac,
    Win,
    Win64,
    Linux,
    Linux64,
    Android,
}

impl OsType {
    pub const ALL: [OsType; 6] = [
        OsType::Mac,
        OsType::Win,
        OsType::Win64,
        OsType::Linux,
        OsType::Linux64,
        OsType::Android,
    ];

    pub fn all() -> impl Iterator<Item = OsType> { Self::ALL.into_iter() }

    pub fn as_str(self) -> &'static str {
        match self {
            OsType::Mac => "mac",
            OsType::Win => "win",
            OsType::Win64 => "win64",
            OsType::Linux => "linux",
            OsType::Linux64 => "linux64",
            OsType::Android => "android",
        }
    }

    /// Top-level directory in the snapshot bucket.
    pub fn bucket_prefix(self) -> &'static str {
        match self {
            OsType::Mac => "Mac/",
            OsType::Win => "Win/",
            OsType::Win64 => "Win_x64/",
            OsType::Linux => "Linux/",
            OsType::Linux64 => "Linux_x64/",
            OsType::Android => "Android/",
        }
    }

    /// Identifier used by the release catalog. 64-bit Linux has no history
    /// of its own and shares the Linux one.
    pub fn catalog_os(self) -> &'static str {
        match self {
            OsType::Linux64 => "linux",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OsType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        OsType::all()
            .find(|os| os.as_str() == needle)
            .ok_or_else(|| Error::Config(format!("unknown OS type: {s}")))
    }
}
