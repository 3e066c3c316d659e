//! The import, retag and export pipelines over the track store.

mod export;
mod import;

pub use export::{export_library, ExportOutcome};
pub use import::{ImportReport, RetagReport};

use crate::config::TaggingSettings;
use crate::enrichment::{Enrichment, EnrichmentLookup};
use crate::library_xml::TrackAttributes;
use crate::tagging::{CategorizedTags, TagGenerator, TaggingConfig};
use crate::track_store::TrackStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Enrichment and generation for one track.
#[derive(Debug, Clone)]
pub struct TrackWork {
    pub track: TrackAttributes,
}

/// A finished unit of work.
#[derive(Debug, Clone)]
pub struct TaggedTrack {
    pub track: TrackAttributes,
    /// What the lookup returned; the tags were generated from it.
    pub enrichment: Enrichment,
    pub tags: CategorizedTags,
}

impl TrackWork {
    pub fn new(track: TrackAttributes) -> Self {
        Self { track }
    }

    pub async fn run(
        self,
        enrichment: &dyn EnrichmentLookup,
        generator: &TagGenerator,
        config: &TaggingConfig,
    ) -> TaggedTrack {
        let artist = self.track.artist().unwrap_or_default();
        let title = self.track.name().unwrap_or_default();
        let context = enrichment.lookup(artist, title).await;
        let tags = generator.generate(&self.track, &context, config).await;
        TaggedTrack {
            track: self.track,
            enrichment: context,
            tags,
        }
    }
}

/// Everything a batch needs besides its input.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn TrackStore>,
    enrichment: Arc<dyn EnrichmentLookup>,
    generator: TagGenerator,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn TrackStore>,
        enrichment: Arc<dyn EnrichmentLookup>,
        generator: TagGenerator,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            enrichment,
            generator,
            concurrency: concurrency.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn TrackStore> {
        &self.store
    }

    /// Freeze the tagging settings for one batch.
    ///
    /// The run override wins over the stored tag limit.
    pub fn tagging_config(&self, settings: &TaggingSettings) -> Result<TaggingConfig> {
        let tag_limit = match settings.tag_limit_override {
            Some(limit) => limit,
            None => self.store.get_tag_limit()?,
        };
        let config = TaggingConfig {
            tag_limit,
            response_schema: settings.response_schema,
        };
        info!(
            tag_limit = config.tag_limit,
            backend = self.generator.backend_name(),
            concurrency = self.concurrency,
            "Tagging batch configured"
        );
        Ok(config)
    }
}
