//! In-memory HTTP client for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use snapfetch_fetch::{BoxStream, FetchError, HttpClient, HttpResponse};

#[derive(Default)]
pub(crate) struct StaticClient {
    routes: HashMap<String, (u16, String)>,
    calls:  Mutex<Vec<String>>,
}

impl StaticClient {
    pub(crate) fn new() -> Self { Self::default() }

    pub(crate) fn route(mut self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.routes.insert(url.into(), (status, body.into()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }

    fn lookup(&self, url: &str) -> (u16, String) {
        self.calls.lock().unwrap().push(url.to_string());
        self.routes.get(url).cloned().unwrap_or((404, String::new()))
    }
}

impl HttpClient for StaticClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let (status, body) = self.lookup(url);
        Ok(HttpResponse::new(status, body))
    }

    async fn stream(
        &self,
        url: &str,
    ) -> Result<BoxStream<'static, Result<Bytes, FetchError>>, FetchError> {
        let (status, body) = self.lookup(url);
        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        let chunks = vec![Ok(Bytes::from(body))];
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}
