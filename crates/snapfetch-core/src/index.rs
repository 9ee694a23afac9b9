//! Discovery of every published build position under an OS type's prefix.
//!
//! The listing API pages through delimited prefixes (`Mac/123456/`) with a
//! continuation token. A token chain is stateful on the server side, so pages
//! for one OS type are requested strictly one after another.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use snapfetch_fetch::HttpClient;
use tracing::{debug, info};

use crate::config::Endpoints;
use crate::error::{Error, ResolveError, Result};
use crate::os::OsType;
use crate::remote::get_json;
use crate::select::ListingItem;

static POSITION_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new("/(.*?)/").expect("static regex"));

/// One page of a delimited bucket listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub prefixes:        Option<Vec<String>>,
    pub items:           Option<Vec<ListingItem>>,
    pub next_page_token: Option<String>,
}

/// Published positions for one OS type, mapped to their storage prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    entries: HashMap<String, String>,
}

impl PositionIndex {
    pub fn new() -> Self { Self::default() }

    /// Build from full prefixes; prefixes without a position segment are skipped.
    pub fn from_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        index.merge(prefixes);
        index
    }

    /// Discard everything and start over from `prefixes`.
    pub fn replace<I, S>(&mut self, prefixes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.entries.clear();
        self.merge(prefixes);
    }

    /// Add `prefixes`. Re-inserting a known prefix is a no-op.
    pub fn merge<I, S>(&mut self, prefixes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for prefix in prefixes {
            let prefix = prefix.as_ref();
            match position_of(prefix) {
                Some(position) => {
                    self.entries.insert(position.to_string(), prefix.to_string());
                }
                None => debug!(prefix, "prefix carries no position segment"),
            }
        }
    }

    pub fn prefix(&self, position: &str) -> Option<&str> { self.entries.get(position).map(String::as_str) }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// The first path segment after the OS directory: `Mac/681094/` yields `681094`.
pub fn position_of(prefix: &str) -> Option<&str> {
    POSITION_SEGMENT
        .captures(prefix)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
}

pub struct IndexBuilder<C: HttpClient> {
    client:    Arc<C>,
    endpoints: Arc<Endpoints>,
}

impl<C: HttpClient> IndexBuilder<C> {
    pub fn new(client: Arc<C>, endpoints: Arc<Endpoints>) -> Self { Self { client, endpoints } }

    /// Page through the listing for `os` until no continuation token remains.
    ///
    /// # Errors
    ///
    /// Any failed page aborts the build: a partial index would silently
    /// resolve versions to the wrong position.
    pub async fn build(&self, os: OsType) -> Result<PositionIndex> {
        let mut index = PositionIndex::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let url = self.endpoints.listing_url(os.bucket_prefix(), token.as_deref());
            let page: ListingPage = get_json(self.client.as_ref(), &url)
                .await
                .map_err(|source| Error::Index { os, source })?;

            match (page.prefixes, pages) {
                (Some(prefixes), 0) => index.replace(&prefixes),
                (Some(prefixes), _) => index.merge(&prefixes),
                (None, 0) => {
                    return Err(Error::Index {
                        os,
                        source: ResolveError::MissingField {
                            field: "prefixes",
                            url,
                        },
                    });
                }
                (None, _) => debug!(%os, %url, "page without prefixes"),
            }
            pages += 1;

            match page.next_page_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        info!(%os, pages, positions = index.len(), "position index built");
        Ok(index)
    }

    /// Build indexes for several OS types, one after another.
    pub async fn build_all(
        &self,
        os_types: impl IntoIterator<Item = OsType>,
    ) -> Result<BTreeMap<OsType, Arc<PositionIndex>>> {
        let mut indexes = BTreeMap::new();
        for os in os_types {
            info!(%os, "collecting published positions");
            let index = self.build(os).await?;
            indexes.insert(os, Arc::new(index));
        }
        Ok(indexes)
    }
}
