use std::path::Path;
use std::sync::Arc;

use futures_util::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::http::HttpClient;
use crate::error::FetchError;

/// Streams a URL straight to a file.
///
/// The destination is truncated on open and written chunk by chunk; the body
/// is never held in memory. A failed transfer leaves whatever was written so
/// far in place.
pub struct Fetcher<C: HttpClient> {
    client: Arc<C>,
}

impl<C: HttpClient> Clone for Fetcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: Arc<C>) -> Self { Self { client } }

    /// Download `url` into `destination`, creating parent directories.
    /// Returns the number of bytes written.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut stream = self.client.stream(url).await?;

        let io_err = |source| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(destination).await.map_err(io_err)?;

        let mut bytes_written = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            file.write_all(&chunk).await.map_err(io_err)?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;

        debug!(url, path = %destination.display(), bytes_written, "download finished");
        Ok(bytes_written)
    }
}
