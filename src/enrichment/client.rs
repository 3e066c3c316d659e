//! HTTP client for the local enrichment service.

use super::{Enrichment, EnrichmentLookup};
use crate::resilience::{GuardError, ServiceGuard};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
enum LookupError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(reqwest::StatusCode),
}

impl LookupError {
    fn is_retryable(&self) -> bool {
        match self {
            LookupError::Transport(e) => e.is_timeout() || e.is_connect(),
            LookupError::Status(status) => status.is_server_error() || status.as_u16() == 429,
        }
    }
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    filter: LookupFilter<'a>,
}

#[derive(Debug, Serialize)]
struct LookupFilter<'a> {
    artist: &'a str,
    title: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    tracks: Vec<serde_json::Value>,
}

impl LookupResponse {
    /// The first candidate, if it is a JSON object.
    fn into_first(self) -> Enrichment {
        match self.tracks.into_iter().next() {
            Some(serde_json::Value::Object(map)) => map,
            _ => Enrichment::new(),
        }
    }
}

/// Client for the enrichment service.
pub struct HttpEnrichmentClient {
    client: reqwest::Client,
    url: String,
    guard: ServiceGuard,
}

impl HttpEnrichmentClient {
    /// # Arguments
    /// * `url` - Full lookup endpoint (e.g., "http://127.0.0.1:8000/api/v1/tracks")
    /// * `timeout` - Per-request timeout
    /// * `guard` - Retry and circuit-breaker policy for the service
    pub fn new(url: &str, timeout: Duration, guard: ServiceGuard) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create enrichment HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            guard,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<LookupResponse, LookupError> {
        let body = LookupRequest {
            filter: LookupFilter { artist, title },
        };
        let response = self.client.get(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl EnrichmentLookup for HttpEnrichmentClient {
    async fn lookup(&self, artist: &str, title: &str) -> Enrichment {
        let result = self
            .guard
            .call(LookupError::is_retryable, || self.fetch(artist, title))
            .await;

        match result {
            Ok(response) => {
                let enrichment = response.into_first();
                debug!(
                    artist,
                    title,
                    fields = enrichment.len(),
                    "Enrichment lookup complete"
                );
                enrichment
            }
            Err(GuardError::Open(service)) => {
                debug!(artist, title, service = %service, "Skipping enrichment, breaker open");
                Enrichment::new()
            }
            Err(GuardError::Failed(LookupError::Status(status)))
                if status == reqwest::StatusCode::NOT_FOUND =>
            {
                debug!(artist, title, "No enrichment match");
                Enrichment::new()
            }
            Err(GuardError::Failed(e)) => {
                warn!(artist, title, error = %e, "Enrichment lookup failed");
                Enrichment::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitBreakerConfig, RetryPolicy};
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Enrichment {
        serde_json::from_value::<LookupResponse>(value)
            .unwrap()
            .into_first()
    }

    #[test]
    fn test_first_candidate_is_used() {
        let enrichment = parse(json!({
            "tracks": [
                {"title": "One", "label": "First"},
                {"title": "One", "label": "Second"}
            ]
        }));
        assert_eq!(enrichment["label"], "First");
    }

    #[test]
    fn test_no_candidates_is_empty() {
        assert!(parse(json!({"tracks": []})).is_empty());
        assert!(parse(json!({})).is_empty());
        assert!(parse(json!({"tracks": ["not an object"]})).is_empty());
    }

    #[test]
    fn test_request_body_shape() {
        let body = LookupRequest {
            filter: LookupFilter {
                artist: "Surgeon",
                title: "Floorshow",
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"filter": {"artist": "Surgeon", "title": "Floorshow"}})
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_yields_empty() {
        let client = HttpEnrichmentClient::new(
            "http://127.0.0.1:9/api/v1/tracks",
            Duration::from_millis(200),
            ServiceGuard::new("enrichment", CircuitBreakerConfig::default(), RetryPolicy::none()),
        )
        .unwrap();
        assert!(client.lookup("Artist", "Title").await.is_empty());
    }
}
