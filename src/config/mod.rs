mod file_config;

pub use file_config::{
    EnrichmentConfig, FileConfig, GenerationConfig, PipelineConfig, TaggingFileConfig,
};

use crate::resilience::{CircuitBreakerConfig, RetryPolicy};
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_FILE: &str = "tag_genius.db";
pub const DEFAULT_ENRICHMENT_URL: &str = "http://127.0.0.1:8000/api/v1/tracks";
pub const DEFAULT_GENERATION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub enrichment_url: Option<String>,
    pub no_enrichment: bool,
    pub tag_limit: Option<u32>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub enrichment: EnrichmentSettings,
    pub generation: GenerationSettings,
    pub tagging: TaggingSettings,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub enabled: bool,
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout: Duration,
    pub temperature: f32,
}

impl GenerationSettings {
    /// The generation credential, if the configured variable holds one.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaggingSettings {
    /// Overrides the stored tag limit for this run only.
    pub tag_limit_override: Option<u32>,
    pub response_schema: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Tracks whose network work may be in flight at once.
    pub concurrency: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub breaker_failure_threshold: u32,
    pub breaker_cooldown_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let breaker = CircuitBreakerConfig::default();
        Self {
            concurrency: 1,
            max_retries: retry.max_retries,
            initial_backoff_ms: retry.initial_backoff_ms,
            max_backoff_ms: retry.max_backoff_ms,
            backoff_multiplier: retry.backoff_multiplier,
            breaker_failure_threshold: breaker.failure_threshold,
            breaker_cooldown_secs: breaker.cooldown.as_secs(),
        }
    }
}

impl PipelineSettings {
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            cooldown: Duration::from_secs(self.breaker_cooldown_secs),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let enrichment_file = file.enrichment.unwrap_or_default();
        let enrichment = EnrichmentSettings {
            enabled: enrichment_file.enabled.unwrap_or(!cli.no_enrichment),
            url: enrichment_file
                .url
                .or_else(|| cli.enrichment_url.clone())
                .unwrap_or_else(|| DEFAULT_ENRICHMENT_URL.to_string()),
            timeout: Duration::from_secs(enrichment_file.timeout_sec.unwrap_or(10)),
        };

        let generation_file = file.generation.unwrap_or_default();
        let temperature = generation_file.temperature.unwrap_or(0.3);
        if !(0.0..=2.0).contains(&temperature) {
            bail!("generation.temperature must be within 0.0..=2.0, got {}", temperature);
        }
        let generation = GenerationSettings {
            base_url: generation_file
                .base_url
                .unwrap_or_else(|| DEFAULT_GENERATION_BASE_URL.to_string()),
            model: generation_file
                .model
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            api_key_env: generation_file
                .api_key_env
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            timeout: Duration::from_secs(generation_file.timeout_sec.unwrap_or(60)),
            temperature,
        };

        let tagging_file = file.tagging.unwrap_or_default();
        let tagging = TaggingSettings {
            tag_limit_override: tagging_file.tag_limit.or(cli.tag_limit),
            response_schema: tagging_file.response_schema.unwrap_or(false),
        };

        // Pipeline settings - merge file config with defaults
        let defaults = PipelineSettings::default();
        let pipeline_file = file.pipeline.unwrap_or_default();
        let pipeline = PipelineSettings {
            concurrency: pipeline_file
                .concurrency
                .or(cli.concurrency)
                .unwrap_or(defaults.concurrency),
            max_retries: pipeline_file.max_retries.unwrap_or(defaults.max_retries),
            initial_backoff_ms: pipeline_file
                .initial_backoff_ms
                .unwrap_or(defaults.initial_backoff_ms),
            max_backoff_ms: pipeline_file
                .max_backoff_ms
                .unwrap_or(defaults.max_backoff_ms),
            backoff_multiplier: pipeline_file
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
            breaker_failure_threshold: pipeline_file
                .breaker_failure_threshold
                .unwrap_or(defaults.breaker_failure_threshold),
            breaker_cooldown_secs: pipeline_file
                .breaker_cooldown_secs
                .unwrap_or(defaults.breaker_cooldown_secs),
        };
        if pipeline.concurrency == 0 {
            bail!("pipeline.concurrency must be at least 1");
        }
        if pipeline.backoff_multiplier < 1.0 {
            bail!(
                "pipeline.backoff_multiplier must be >= 1.0, got {}",
                pipeline.backoff_multiplier
            );
        }

        Ok(Self {
            db_path,
            enrichment,
            generation,
            tagging,
            pipeline,
        })
    }
}
