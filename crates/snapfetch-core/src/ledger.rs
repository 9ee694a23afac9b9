//! Per-OS history ledger: releases seen by earlier runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use snapfetch_fs::{AtomicWriteOptions, atomic_write, read_if_exists};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    seen: Option<Vec<Value>>,
}

impl Ledger {
    /// A missing file is an empty ledger, not an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let seen = match read_if_exists(&path)? {
            Some(bytes) => Some(serde_json::from_slice(&bytes).map_err(|source| Error::Document {
                path: path.clone(),
                source,
            })?),
            None => None,
        };

        debug!(path = %path.display(), exists = seen.is_some(), "ledger loaded");
        Ok(Self { path, seen })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn exists(&self) -> bool { self.seen.is_some() }

    pub fn seen(&self) -> &[Value] { self.seen.as_deref().unwrap_or_default() }

    /// Fetched releases this ledger has not recorded yet, compared by full
    /// value. Without a ledger, or when forced, every release is new.
    pub fn new_releases(&self, fetched: &[Value], force: bool) -> Vec<Value> {
        let seen = match &self.seen {
            Some(seen) if !force => seen,
            _ => return fetched.to_vec(),
        };

        let known: HashSet<String> = seen.iter().map(Value::to_string).collect();
        fetched
            .iter()
            .filter(|release| !known.contains(&release.to_string()))
            .cloned()
            .collect()
    }

    /// Contents to persist after a run: the old ledger plus `new`, or just
    /// `fetched` when forced or starting fresh.
    pub fn updated(&self, fetched: &[Value], new: &[Value], force: bool) -> Vec<Value> {
        match &self.seen {
            Some(seen) if !force => seen.iter().chain(new).cloned().collect(),
            _ => fetched.to_vec(),
        }
    }

    pub fn store(&mut self, releases: Vec<Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&releases).map_err(|source| Error::Document {
            path: self.path.clone(),
            source,
        })?;
        atomic_write(&self.path, &bytes, AtomicWriteOptions::new().sync(true))?;

        debug!(path = %self.path.display(), releases = releases.len(), "ledger stored");
        self.seen = Some(releases);
        Ok(())
    }
}
