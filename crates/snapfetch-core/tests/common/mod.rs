//! Shared fixtures: an in-memory client and a crawl config rooted in a
//! temporary directory.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;
use snapfetch_core::{CrawlConfig, Endpoints, OsType};
use snapfetch_fetch::{BoxStream, FetchError, HttpClient, HttpResponse};

#[derive(Default)]
pub struct MockClient {
    routes: HashMap<String, (u16, String)>,
    panics: HashSet<String>,
    calls:  Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self { Self::default() }

    pub fn route(mut self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.routes.insert(url.into(), (status, body.into()));
        self
    }

    /// Requests for `url` panic inside the calling task.
    pub fn panic_on(mut self, url: impl Into<String>) -> Self {
        self.panics.insert(url.into());
        self
    }

    pub fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }

    pub fn calls_to(&self, url: &str) -> usize { self.calls().iter().filter(|c| *c == url).count() }

    fn lookup(&self, url: &str) -> (u16, String) {
        self.calls.lock().unwrap().push(url.to_string());
        if self.panics.contains(url) {
            panic!("mock client asked to fail on {url}");
        }
        self.routes.get(url).cloned().unwrap_or((404, String::new()))
    }
}

impl HttpClient for MockClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let (status, body) = self.lookup(url);
        Ok(HttpResponse::new(status, body))
    }

    async fn stream(&self, url: &str) -> Result<BoxStream<'static, Result<Bytes, FetchError>>, FetchError> {
        let (status, body) = self.lookup(url);
        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }
        let half = body.len() / 2;
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&body.as_bytes()[..half])),
            Ok(Bytes::copy_from_slice(&body.as_bytes()[half..])),
        ];
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}

pub fn config(output: &Path, os_types: &[OsType]) -> CrawlConfig {
    CrawlConfig {
        output_dir: output.to_path_buf(),
        os_types: os_types.to_vec(),
        progress: false,
        resolve_delay_ms: 0,
        ..CrawlConfig::default()
    }
}

pub fn endpoints() -> Endpoints { CrawlConfig::default().endpoints() }

/// Release history body for `versions`.
pub fn history(os: OsType, versions: &[&str]) -> String {
    let releases: Vec<_> = versions
        .iter()
        .map(|v| serde_json::json!({"channel": "stable", "os": os.catalog_os(), "version": v}))
        .collect();
    serde_json::to_string(&releases).unwrap()
}

pub fn prefixes(os: OsType, positions: &[u64]) -> String {
    let prefixes: Vec<_> = positions
        .iter()
        .map(|p| format!("{}{p}/", os.bucket_prefix()))
        .collect();
    serde_json::json!({ "prefixes": prefixes }).to_string()
}

pub fn deps(position: u64) -> String { serde_json::json!({"chromium_base_position": position.to_string()}).to_string() }

/// `(name, size, mediaLink)` items.
pub fn items(items: &[(&str, u64, &str)]) -> String {
    let items: Vec<_> = items
        .iter()
        .map(|(name, size, link)| serde_json::json!({"name": name, "size": size.to_string(), "mediaLink": link}))
        .collect();
    serde_json::json!({ "items": items }).to_string()
}
