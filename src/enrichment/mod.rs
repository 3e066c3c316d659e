//! Supplementary per-track metadata from the local lookup service.
//!
//! Lookups never fail from the caller's point of view: any problem is
//! logged and yields an empty [`Enrichment`].

mod client;

pub use client::HttpEnrichmentClient;

use crate::config::{EnrichmentSettings, PipelineSettings};
use crate::resilience::{RetryPolicy, ServiceGuard};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque lookup result, only ever used as prompt context.
pub type Enrichment = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait EnrichmentLookup: Send + Sync {
    async fn lookup(&self, artist: &str, title: &str) -> Enrichment;
}

/// Lookup used when enrichment is disabled.
pub struct NoopEnrichment;

#[async_trait]
impl EnrichmentLookup for NoopEnrichment {
    async fn lookup(&self, _artist: &str, _title: &str) -> Enrichment {
        Enrichment::new()
    }
}

/// Build the lookup the pipeline should use for these settings.
pub fn build_enrichment(
    settings: &EnrichmentSettings,
    pipeline: &PipelineSettings,
) -> Result<Arc<dyn EnrichmentLookup>> {
    if !settings.enabled {
        return Ok(Arc::new(NoopEnrichment));
    }
    let guard = ServiceGuard::new(
        "enrichment",
        pipeline.breaker_config(),
        RetryPolicy::new(pipeline),
    );
    Ok(Arc::new(HttpEnrichmentClient::new(
        &settings.url,
        settings.timeout,
        guard,
    )?))
}
