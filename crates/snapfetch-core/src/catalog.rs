//! Release catalog: release history per OS type and the declared base
//! position of each version.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use snapfetch_fetch::HttpClient;
use tracing::{debug, info};

use crate::config::Endpoints;
use crate::error::{Error, ResolveError, Result};
use crate::os::OsType;
use crate::record::{BasePosition, PositionLookup};
use crate::remote::get_json;

const BASE_POSITION_FIELD: &str = "chromium_base_position";

pub struct Catalog<C: HttpClient> {
    client:    Arc<C>,
    endpoints: Arc<Endpoints>,
    delay:     Duration,
}

impl<C: HttpClient> Clone for Catalog<C> {
    fn clone(&self) -> Self {
        Self {
            client:    Arc::clone(&self.client),
            endpoints: Arc::clone(&self.endpoints),
            delay:     self.delay,
        }
    }
}

impl<C: HttpClient> Catalog<C> {
    pub fn new(client: Arc<C>, endpoints: Arc<Endpoints>) -> Self {
        Self {
            client,
            endpoints,
            delay: Duration::ZERO,
        }
    }

    /// Pause after every base-position lookup, successful or not.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Full release history of the configured channel for `os`.
    ///
    /// # Errors
    ///
    /// Fatal: there is nothing to diff against without it.
    pub async fn fetch_releases(&self, os: OsType) -> Result<Vec<Value>> {
        let url = self.endpoints.history_url(os);
        let releases: Vec<Value> = get_json(self.client.as_ref(), &url)
            .await
            .map_err(|source| Error::Catalog { os, source })?;

        info!(%os, releases = releases.len(), "release history fetched");
        Ok(releases)
    }

    pub fn position_lookup(&self, version: &str) -> PositionLookup {
        PositionLookup {
            position_url: self.endpoints.deps_url(version),
        }
    }

    /// Declared base position of one version.
    pub async fn resolve_base_position(&self, lookup: PositionLookup) -> std::result::Result<BasePosition, ResolveError> {
        let result = self.lookup_base_position(&lookup.position_url).await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let position = result?;

        debug!(url = %lookup.position_url, position, "base position resolved");
        Ok(BasePosition {
            position_url: lookup.position_url,
            position,
        })
    }

    async fn lookup_base_position(&self, url: &str) -> std::result::Result<u64, ResolveError> {
        let document: Value = get_json(self.client.as_ref(), url).await?;
        parse_base_position(&document, url)
    }
}

/// Versions named by `releases`, in catalog order. Entries without a string
/// `version` are skipped.
pub fn versions_of(releases: &[Value]) -> Vec<String> {
    releases
        .iter()
        .filter_map(|release| release.get("version").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// The base position is published as a JSON number or as a decimal string.
/// Numbers may carry a zero fraction (`500.0`); strings must be integers.
fn parse_base_position(document: &Value, url: &str) -> std::result::Result<u64, ResolveError> {
    let malformed = |value: &Value| ResolveError::Malformed {
        field: BASE_POSITION_FIELD,
        url:   url.to_string(),
        value: value.to_string(),
    };

    match document.get(BASE_POSITION_FIELD) {
        None | Some(Value::Null) => Err(ResolveError::MissingField {
            field: BASE_POSITION_FIELD,
            url:   url.to_string(),
        }),
        Some(value @ Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .ok_or_else(|| malformed(value)),
        Some(value @ Value::String(s)) => s.trim().parse().map_err(|_| malformed(value)),
        Some(other) => Err(malformed(other)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::CrawlConfig;
    use crate::testing::StaticClient;

    fn catalog(client: StaticClient) -> Catalog<StaticClient> {
        Catalog::new(Arc::new(client), Arc::new(CrawlConfig::default().endpoints()))
    }

    #[test]
    fn test_versions_of() {
        let releases = vec![
            json!({"version": "77.0.3865.120", "os": "mac"}),
            json!({"os": "mac"}),
            json!({"version": 77}),
            json!({"version": "76.0.3809.132"}),
        ];
        assert_eq!(versions_of(&releases), vec!["77.0.3865.120", "76.0.3809.132"]);
    }

    #[test]
    fn test_parse_base_position() {
        assert_eq!(parse_base_position(&json!({"chromium_base_position": "681094"}), "u").unwrap(), 681094);
        assert_eq!(parse_base_position(&json!({"chromium_base_position": 681094}), "u").unwrap(), 681094);
        assert_eq!(parse_base_position(&json!({"chromium_base_position": 500.0}), "u").unwrap(), 500);
        assert!(matches!(
            parse_base_position(&json!({"chromium_base_position": 500.5}), "u"),
            Err(ResolveError::Malformed { .. })
        ));

        assert!(matches!(
            parse_base_position(&json!({"chromium_base_position": null}), "u"),
            Err(ResolveError::MissingField { .. })
        ));
        assert!(matches!(
            parse_base_position(&json!({}), "u"),
            Err(ResolveError::MissingField { .. })
        ));
        assert!(matches!(
            parse_base_position(&json!({"chromium_base_position": "68x"}), "u"),
            Err(ResolveError::Malformed { .. })
        ));
        assert!(matches!(
            parse_base_position(&json!({"chromium_base_position": -4}), "u"),
            Err(ResolveError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_releases_uses_catalog_os() {
        let endpoints = CrawlConfig::default().endpoints();
        let client = StaticClient::new().route(
            endpoints.history_url(OsType::Linux),
            200,
            r#"[{"version":"1.0.0.1"},{"version":"1.0.0.2"}]"#,
        );

        let releases = catalog(client).fetch_releases(OsType::Linux64).await.unwrap();
        assert_eq!(releases.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_releases_failure_is_fatal() {
        let err = catalog(StaticClient::new()).fetch_releases(OsType::Mac).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Catalog {
                os: OsType::Mac,
                source: ResolveError::Status { status: 404, .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_non_array_history_is_fatal() {
        let endpoints = CrawlConfig::default().endpoints();
        let client = StaticClient::new().route(endpoints.history_url(OsType::Win), 200, r#"{"version":"1"}"#);

        let err = catalog(client).fetch_releases(OsType::Win).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Catalog {
                source: ResolveError::Body { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_resolve_base_position() {
        let endpoints = CrawlConfig::default().endpoints();
        let url = endpoints.deps_url("10.0.0.1");
        let client = StaticClient::new().route(&url, 200, r#"{"chromium_base_position":"500"}"#);
        let catalog = catalog(client);

        let base = catalog
            .resolve_base_position(catalog.position_lookup("10.0.0.1"))
            .await
            .unwrap();

        assert_eq!(base.position, 500);
        assert_eq!(base.position_url, url);
    }

    #[tokio::test]
    async fn test_resolve_base_position_reports_status() {
        let catalog = catalog(StaticClient::new());
        let err = catalog
            .resolve_base_position(catalog.position_lookup("10.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Status { status: 404, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_follows_failed_lookups_too() {
        let catalog = catalog(StaticClient::new()).with_delay(Duration::from_secs(5));
        let started = tokio::time::Instant::now();

        let _ = catalog.resolve_base_position(catalog.position_lookup("1")).await;

        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
