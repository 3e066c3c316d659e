//! Tag generation backends and the strategy that picks one.

use super::categories::{quota_for, CategorizedTags, TagCategory, TaggingConfig};
use super::prompt::{build_prompt, response_schema};
use crate::config::{GenerationSettings, PipelineSettings};
use crate::enrichment::Enrichment;
use crate::library_xml::TrackAttributes;
use crate::llm::{
    CompletionOptions, FinishReason, LlmError, LlmProvider, Message, OpenAIProvider,
    ResponseFormat,
};
use crate::resilience::{GuardError, RetryPolicy, ServiceGuard};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a service response could not be turned into tags.
#[derive(Debug, Error)]
pub enum TagParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("missing category \"{0}\"")]
    MissingCategory(&'static str),

    #[error("category \"{0}\" is not an array")]
    NotAnArray(&'static str),

    #[error("category \"{0}\" contains a non-string tag")]
    NotAString(&'static str),
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse a generation response into tags.
///
/// Every category must be present as an array of strings. Blank tags are
/// dropped and arrays longer than the category quota are truncated; keys
/// outside the six categories are ignored.
pub fn parse_tag_response(
    raw: &str,
    config: &TaggingConfig,
) -> Result<CategorizedTags, TagParseError> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))?;
    let object = value.as_object().ok_or(TagParseError::NotAnObject)?;

    let mut tags = CategorizedTags::default();
    for category in TagCategory::ALL {
        let key = category.key();
        let items = object
            .get(key)
            .ok_or(TagParseError::MissingCategory(key))?
            .as_array()
            .ok_or(TagParseError::NotAnArray(key))?;

        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let tag = item.as_str().ok_or(TagParseError::NotAString(key))?.trim();
            if !tag.is_empty() {
                values.push(tag.to_string());
            }
        }

        let quota = quota_for(category, config);
        if values.len() > quota {
            debug!(
                category = key,
                returned = values.len(),
                quota,
                "Truncating category to quota"
            );
            values.truncate(quota);
        }
        tags.insert(category, values);
    }
    Ok(tags)
}

#[async_trait]
pub trait TagBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Tags for one track. Failures yield an empty mapping.
    async fn generate(
        &self,
        track: &TrackAttributes,
        enrichment: &Enrichment,
        config: &TaggingConfig,
    ) -> CategorizedTags;
}

/// Fixed tag set used when no generation credential is configured.
pub struct MockTagBackend;

impl MockTagBackend {
    pub fn tags() -> CategorizedTags {
        CategorizedTags::from_pairs([
            (TagCategory::PrimaryGenre, vec!["techno"]),
            (TagCategory::SubGenre, vec!["hard techno", "industrial"]),
            (TagCategory::EnergyVibe, vec!["peak hour", "aggressive"]),
            (TagCategory::SituationEnvironment, vec!["main floor"]),
            (TagCategory::Components, vec!["vocal", "remix"]),
            (TagCategory::TimePeriod, vec!["2010s"]),
        ])
    }
}

#[async_trait]
impl TagBackend for MockTagBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        _track: &TrackAttributes,
        _enrichment: &Enrichment,
        _config: &TaggingConfig,
    ) -> CategorizedTags {
        Self::tags()
    }
}

/// Backend calling a chat completion service.
pub struct LlmTagBackend {
    provider: Arc<dyn LlmProvider>,
    guard: ServiceGuard,
    temperature: f32,
    timeout: Duration,
}

impl LlmTagBackend {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        guard: ServiceGuard,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            guard,
            temperature,
            timeout,
        }
    }

    fn options(&self, config: &TaggingConfig) -> CompletionOptions {
        let response_format = if config.response_schema {
            ResponseFormat::JsonSchema {
                name: "track_tags".to_string(),
                schema: response_schema(config),
            }
        } else {
            ResponseFormat::JsonObject
        };
        CompletionOptions {
            temperature: self.temperature,
            timeout: self.timeout,
            response_format,
        }
    }
}

#[async_trait]
impl TagBackend for LlmTagBackend {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn generate(
        &self,
        track: &TrackAttributes,
        enrichment: &Enrichment,
        config: &TaggingConfig,
    ) -> CategorizedTags {
        let messages = [Message::user(build_prompt(track, enrichment, config))];
        let options = self.options(config);
        let name = track.name().unwrap_or_default();
        let artist = track.artist().unwrap_or_default();

        let response = match self
            .guard
            .call(LlmError::is_retryable, || {
                self.provider.complete(&messages, &options)
            })
            .await
        {
            Ok(response) => response,
            Err(GuardError::Open(service)) => {
                debug!(name, artist, service = %service, "Skipping generation, breaker open");
                return CategorizedTags::default();
            }
            Err(GuardError::Failed(e)) => {
                warn!(name, artist, error = %e, "Tag generation request failed");
                return CategorizedTags::default();
            }
        };

        if response.finish_reason != FinishReason::Stop {
            warn!(
                name,
                artist,
                finish_reason = ?response.finish_reason,
                "Tag response did not complete, discarding"
            );
            return CategorizedTags::default();
        }

        match parse_tag_response(&response.message.content, config) {
            Ok(tags) => {
                debug!(name, artist, tags = tags.count(), "Generated tags");
                tags
            }
            Err(e) => {
                warn!(name, artist, error = %e, "Discarding malformed tag response");
                CategorizedTags::default()
            }
        }
    }
}

/// The generation strategy for a run, chosen once at startup.
#[derive(Clone)]
pub struct TagGenerator {
    backend: Arc<dyn TagBackend>,
}

impl TagGenerator {
    pub fn new(backend: Arc<dyn TagBackend>) -> Self {
        Self { backend }
    }

    pub fn mock() -> Self {
        Self::new(Arc::new(MockTagBackend))
    }

    /// Live backend when the credential variable is set, mock otherwise.
    pub fn from_settings(generation: &GenerationSettings, pipeline: &PipelineSettings) -> Self {
        let Some(api_key) = generation.api_key() else {
            info!(
                env = %generation.api_key_env,
                "No generation credential configured, using mock tags"
            );
            return Self::mock();
        };

        info!(
            base_url = %generation.base_url,
            model = %generation.model,
            "Using generation service"
        );
        let provider = OpenAIProvider::new(
            generation.base_url.clone(),
            generation.model.clone(),
            Some(api_key),
        );
        let guard = ServiceGuard::new(
            "generation",
            pipeline.breaker_config(),
            RetryPolicy::new(pipeline),
        );
        Self::new(Arc::new(LlmTagBackend::new(
            Arc::new(provider),
            guard,
            generation.temperature,
            generation.timeout,
        )))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn generate(
        &self,
        track: &TrackAttributes,
        enrichment: &Enrichment,
        config: &TaggingConfig,
    ) -> CategorizedTags {
        self.backend.generate(track, enrichment, config).await
    }
}
