use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::data::HttpResponse;
use crate::error::FetchError;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Asynchronous HTTP client abstraction.
///
/// This is the minimal interface the crawl stages need: buffered GETs for JSON
/// documents and a streamed GET for artifacts.
///
/// # Implementations
///
/// - [`Transport`]: Production implementation using `reqwest`, with retries
/// - In-memory implementations for testing
pub trait HttpClient: Send + Sync {
    /// Perform a GET and buffer the whole body.
    ///
    /// Any status is returned as `Ok`; it is up to the caller to decide what a
    /// non-2xx response means.
    ///
    /// # Errors
    ///
    /// Returns an error when no response could be obtained at all.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, FetchError>> + Send;

    /// Open a streaming GET and return the response body as a stream.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for a non-2xx response, or a transport
    /// error when the connection fails.
    fn stream(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<BoxStream<'static, Result<Bytes, FetchError>>, FetchError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::sync::Arc;

    use futures_util::StreamExt;
    use tracing::debug;

    use super::*;
    use crate::core::{RetryBudget, RetryKind};
    use crate::data::TransportOptions;

    /// Production HTTP client: reqwest plus a bounded retry policy.
    ///
    /// Cloning is cheap and shares the connection pool.
    #[derive(Clone, Debug)]
    pub struct Transport {
        client:  reqwest::Client,
        options: Arc<TransportOptions>,
    }

    impl Transport {
        pub fn new(options: TransportOptions) -> Result<Self, FetchError> {
            let client = reqwest::Client::builder()
                .connect_timeout(options.timeout)
                .read_timeout(options.timeout)
                .danger_accept_invalid_certs(options.accept_invalid_certs)
                .build()
                .map_err(FetchError::ClientBuild)?;

            Ok(Self {
                client,
                options: Arc::new(options),
            })
        }

        pub fn options(&self) -> &TransportOptions { &self.options }

        /// Send until a response arrives whose status is not in the forcelist,
        /// or the budget runs out. In the latter case the last response wins.
        async fn send(
            &self,
            url: &str,
            budget: &mut RetryBudget,
        ) -> Result<reqwest::Response, FetchError> {
            loop {
                match self.client.get(url).send().await {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        if !self.options.is_retryable_status(status) {
                            return Ok(response);
                        }
                        let Some(delay) = budget.consume(RetryKind::Status) else {
                            debug!(url, status, "retries exhausted, returning last response");
                            return Ok(response);
                        };
                        debug!(url, status, retry = budget.attempts(), ?delay, "retrying");
                        tokio::time::sleep(delay).await;
                    }
                    Err(source) => {
                        let delay = classify(&source).and_then(|kind| budget.consume(kind));
                        let Some(delay) = delay else {
                            return Err(FetchError::Request {
                                url: url.to_string(),
                                source,
                            });
                        };
                        debug!(url, error = %source, retry = budget.attempts(), ?delay, "retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    fn classify(e: &reqwest::Error) -> Option<RetryKind> {
        if e.is_connect() {
            Some(RetryKind::Connect)
        } else if e.is_timeout() || e.is_body() || e.is_decode() {
            Some(RetryKind::Read)
        } else {
            None
        }
    }

    impl HttpClient for Transport {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            let mut budget = RetryBudget::new(&self.options);
            loop {
                let response = self.send(url, &mut budget).await?;
                let status = response.status().as_u16();

                match response.bytes().await {
                    Ok(body) => return Ok(HttpResponse { status, body }),
                    Err(source) => {
                        let Some(delay) = budget.consume(RetryKind::Read) else {
                            return Err(FetchError::Request {
                                url: url.to_string(),
                                source,
                            });
                        };
                        debug!(url, error = %source, "body read failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        async fn stream(
            &self,
            url: &str,
        ) -> Result<BoxStream<'static, Result<Bytes, FetchError>>, FetchError> {
            let mut budget = RetryBudget::new(&self.options);
            let response = self.send(url, &mut budget).await?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                return Err(FetchError::Status {
                    status,
                    url: url.to_string(),
                });
            }

            let url = url.to_string();
            let stream = response.bytes_stream().map(move |chunk| {
                chunk.map_err(|source| FetchError::Request {
                    url: url.clone(),
                    source,
                })
            });

            Ok(Box::pin(stream))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::Transport;
