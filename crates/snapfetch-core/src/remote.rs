use serde::de::DeserializeOwned;
use snapfetch_fetch::HttpClient;
use tracing::debug;

use crate::error::ResolveError;

/// GET a JSON document. Anything but a 200 is an error.
pub(crate) async fn get_json<C, T>(client: &C, url: &str) -> Result<T, ResolveError>
where
    C: HttpClient,
    T: DeserializeOwned,
{
    let response = client.get(url).await?;
    debug!(url, status = response.status, bytes = response.body.len(), "fetched");

    if response.status != 200 {
        return Err(ResolveError::Status {
            status: response.status,
            url:    url.to_string(),
        });
    }

    response.json().map_err(|source| ResolveError::Body {
        url: url.to_string(),
        source,
    })
}
