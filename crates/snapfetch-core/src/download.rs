use std::path::{Path, PathBuf};
use std::sync::Arc;

use snapfetch_fetch::{Fetcher, HttpClient};
use tracing::info;

use crate::error::ResolveError;
use crate::record::UnitKey;

/// Every artifact is stored under this name, whatever its archive format.
pub const ARTIFACT_FILE_NAME: &str = "chrome.zip";

/// `<root>/<os>/<version>/chrome.zip`
pub fn destination(root: &Path, key: &UnitKey) -> PathBuf {
    root.join(key.os.as_str()).join(&key.version).join(ARTIFACT_FILE_NAME)
}

/// Streams resolved artifacts below a downloads root.
pub struct Downloader<C: HttpClient> {
    fetcher: Fetcher<C>,
    root:    Arc<PathBuf>,
}

impl<C: HttpClient> Clone for Downloader<C> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            root:    Arc::clone(&self.root),
        }
    }
}

impl<C: HttpClient> Downloader<C> {
    pub fn new(client: Arc<C>, root: impl Into<PathBuf>) -> Self {
        Self {
            fetcher: Fetcher::new(client),
            root:    Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Existing files are overwritten. A failed transfer leaves a truncated
    /// file behind; the next run rewrites it.
    pub async fn download(&self, key: &UnitKey, url: &str) -> Result<PathBuf, ResolveError> {
        let path = destination(&self.root, key);
        info!(unit = %key, path = %path.display(), "downloading");

        let bytes = self.fetcher.fetch(url, &path).await.map_err(ResolveError::Download)?;

        info!(unit = %key, bytes, "downloaded");
        Ok(path)
    }
}
