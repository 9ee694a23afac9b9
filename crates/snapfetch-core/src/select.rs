//! Choosing the artifact to download from a position's listing.

use serde::Deserialize;

/// Substrings marking auxiliary or test artifacts rather than the browser
/// archive itself.
pub const DEFAULT_EXCLUDED_NAMES: [&str; 5] = ["browser_tests", "syms", "shell", "host", "exe"];

/// One object in a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    pub name:       String,
    /// Decimal byte count, string-encoded by the API.
    #[serde(default)]
    pub size:       String,
    pub media_link: String,
}

impl ListingItem {
    pub fn size_bytes(&self) -> Option<u64> { self.size.trim().parse().ok() }
}

/// Picks the item to download from a listing.
pub trait ArtifactSelector: Send + Sync {
    fn select<'a>(&self, items: &'a [ListingItem]) -> Option<&'a ListingItem>;
}

/// Skips excluded names, then takes the largest item. Archive formats differ
/// across OS types, but the packaged browser is reliably the biggest object.
#[derive(Debug, Clone)]
pub struct LargestArtifact {
    excluded: Vec<String>,
}

impl Default for LargestArtifact {
    fn default() -> Self { Self::new(DEFAULT_EXCLUDED_NAMES) }
}

impl LargestArtifact {
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool { self.excluded.iter().any(|e| name.contains(e.as_str())) }
}

impl ArtifactSelector for LargestArtifact {
    fn select<'a>(&self, items: &'a [ListingItem]) -> Option<&'a ListingItem> {
        let mut best: Option<(&ListingItem, u64)> = None;

        for item in items.iter().filter(|i| !self.is_excluded(&i.name)) {
            let Some(size) = item.size_bytes() else {
                continue;
            };
            // strict comparison: the first of equally large items wins
            if best.is_none_or(|(_, max)| size > max) {
                best = Some((item, size));
            }
        }

        best.map(|(item, _)| item)
    }
}
