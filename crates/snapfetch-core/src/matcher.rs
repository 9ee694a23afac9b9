//! Resolution of a declared base position to a published position and the
//! artifact to download from it.
//!
//! Publication is sparse: most declared positions have no snapshot of their
//! own, so the search walks outward from the declared position, trying the
//! higher neighbour before the lower one at each distance.

use std::sync::Arc;

use snapfetch_fetch::HttpClient;
use tracing::debug;

use crate::config::Endpoints;
use crate::error::ResolveError;
use crate::index::{ListingPage, PositionIndex};
use crate::record::{BasePosition, ResolutionRecord};
use crate::remote::get_json;
use crate::select::ArtifactSelector;

pub const DEFAULT_RADIUS: u64 = 100;

/// Nearest published position to `declared`, with its storage prefix.
///
/// # Errors
///
/// [`ResolveError::BelowFirstPosition`] once the lower candidate would drop
/// to zero, [`ResolveError::NoNearbyPosition`] when `radius` is exhausted.
pub fn nearest_position(index: &PositionIndex, declared: u64, radius: u64) -> Result<(u64, &str), ResolveError> {
    if let Some(prefix) = index.prefix(&declared.to_string()) {
        return Ok((declared, prefix));
    }

    for i in 1..=radius {
        if i >= declared {
            return Err(ResolveError::BelowFirstPosition {
                position: declared,
                radius:   i,
            });
        }
        for candidate in [declared.saturating_add(i), declared - i] {
            if let Some(prefix) = index.prefix(&candidate.to_string()) {
                return Ok((candidate, prefix));
            }
        }
    }

    Err(ResolveError::NoNearbyPosition {
        position: declared,
        radius,
    })
}

pub struct Matcher<C: HttpClient> {
    client:    Arc<C>,
    endpoints: Arc<Endpoints>,
    selector:  Arc<dyn ArtifactSelector>,
    radius:    u64,
}

impl<C: HttpClient> Clone for Matcher<C> {
    fn clone(&self) -> Self {
        Self {
            client:    Arc::clone(&self.client),
            endpoints: Arc::clone(&self.endpoints),
            selector:  Arc::clone(&self.selector),
            radius:    self.radius,
        }
    }
}

impl<C: HttpClient> Matcher<C> {
    pub fn new(client: Arc<C>, endpoints: Arc<Endpoints>, selector: Arc<dyn ArtifactSelector>) -> Self {
        Self {
            client,
            endpoints,
            selector,
            radius: DEFAULT_RADIUS,
        }
    }

    pub fn with_radius(mut self, radius: u64) -> Self {
        self.radius = radius;
        self
    }

    pub fn radius(&self) -> u64 { self.radius }

    /// Find the published position for `base`, list it and pick the artifact.
    pub async fn resolve_download(
        &self,
        index: &PositionIndex,
        base: &BasePosition,
    ) -> Result<ResolutionRecord, ResolveError> {
        let (download_position, prefix) = nearest_position(index, base.position, self.radius)?;
        if download_position != base.position {
            debug!(declared = base.position, download_position, "using nearest published position");
        }

        let url = self.endpoints.listing_url(prefix, None);
        let listing: ListingPage = get_json(self.client.as_ref(), &url).await?;
        let items = listing.items.ok_or_else(|| ResolveError::MissingField {
            field: "items",
            url:   url.clone(),
        })?;

        let chosen = self
            .selector
            .select(&items)
            .ok_or_else(|| ResolveError::NoCandidate { url: url.clone() })?;
        debug!(name = %chosen.name, size = %chosen.size, "artifact selected");

        Ok(ResolutionRecord {
            position_url: base.position_url.clone(),
            position: base.position,
            download_position,
            download_url: chosen.media_link.clone(),
            download_prefix: url,
        })
    }
}
