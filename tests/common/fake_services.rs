//! In-process stand-ins for the enrichment and generation services.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tag_genius::config::PipelineSettings;
use tag_genius::enrichment::{EnrichmentLookup, HttpEnrichmentClient};
use tag_genius::llm::OpenAIProvider;
use tag_genius::resilience::{CircuitBreakerConfig, RetryPolicy, ServiceGuard};
use tag_genius::tagging::LlmTagBackend;
use tag_genius::TagGenerator;
use tokio::net::TcpListener;

pub const ENRICHMENT_PATH: &str = "/api/v1/tracks";

/// A generation reply carrying more tags than any quota allows.
pub const GENEROUS_TAG_REPLY: &str = r#"{
    "primary_genre": ["house", "garage"],
    "sub_genre": ["chicago house", "acid house", "jackin house"],
    "energy_vibe": ["groovy", "uplifting", "raw"],
    "situation_environment": ["warm up", "after hours", "rooftop"],
    "components": ["vocal", "drum machine", "bassline"],
    "time_period": ["1980s", "1990s"]
}"#;

#[derive(Default)]
struct FakeState {
    enrichment_status: Mutex<Option<StatusCode>>,
    not_found_prefix: Mutex<Option<String>>,
    enrichment_calls: AtomicUsize,
    enrichment_filters: Mutex<Vec<Value>>,
    generation_reply: Mutex<String>,
    generation_status: Mutex<Option<StatusCode>>,
    generation_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    response_formats: Mutex<Vec<Value>>,
}

async fn lookup_track(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.enrichment_calls.fetch_add(1, Ordering::SeqCst);
    let filter = body["filter"].clone();
    state.enrichment_filters.lock().unwrap().push(filter.clone());

    if let Some(status) = *state.enrichment_status.lock().unwrap() {
        return status.into_response();
    }
    if let Some(prefix) = state.not_found_prefix.lock().unwrap().as_deref() {
        let title = filter["title"].as_str().unwrap_or_default();
        if title.starts_with(prefix) {
            return StatusCode::NOT_FOUND.into_response();
        }
    }
    Json(json!({
        "tracks": [
            {
                "title": filter["title"],
                "artist": filter["artist"],
                "styles": ["fake style"],
                "source": "fake-enrichment"
            },
            {"title": "ignored second candidate"}
        ]
    }))
    .into_response()
}

async fn chat_completions(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.generation_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(prompt) = body["messages"][0]["content"].as_str() {
        state.prompts.lock().unwrap().push(prompt.to_string());
    }
    state
        .response_formats
        .lock()
        .unwrap()
        .push(body["response_format"].clone());

    if let Some(status) = *state.generation_status.lock().unwrap() {
        return (status, "generation unavailable").into_response();
    }
    let content = state.generation_reply.lock().unwrap().clone();
    Json(json!({
        "choices": [
            {"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
    }))
    .into_response()
}

/// Both fake services on one ephemeral port.
pub struct FakeServices {
    pub base_url: String,
    state: Arc<FakeState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeServices {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeState::default());
        *state.generation_reply.lock().unwrap() = GENEROUS_TAG_REPLY.to_string();

        let app = Router::new()
            .route(ENRICHMENT_PATH, get(lookup_track))
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Fake services failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn enrichment_url(&self) -> String {
        format!("{}{}", self.base_url, ENRICHMENT_PATH)
    }

    pub fn generation_base_url(&self) -> String {
        format!("{}/v1", self.base_url)
    }

    pub fn fail_enrichment(&self, status: StatusCode) {
        *self.state.enrichment_status.lock().unwrap() = Some(status);
    }

    /// Answer 404 for titles starting with `prefix`, as a service does for
    /// tracks it has never heard of.
    pub fn not_found_for_titles(&self, prefix: &str) {
        *self.state.not_found_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn fail_generation(&self, status: StatusCode) {
        *self.state.generation_status.lock().unwrap() = Some(status);
    }

    pub fn set_generation_reply(&self, reply: &str) {
        *self.state.generation_reply.lock().unwrap() = reply.to_string();
    }

    pub fn enrichment_calls(&self) -> usize {
        self.state.enrichment_calls.load(Ordering::SeqCst)
    }

    pub fn generation_calls(&self) -> usize {
        self.state.generation_calls.load(Ordering::SeqCst)
    }

    pub fn enrichment_filters(&self) -> Vec<Value> {
        self.state.enrichment_filters.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state.prompts.lock().unwrap().clone()
    }

    pub fn response_formats(&self) -> Vec<Value> {
        self.state.response_formats.lock().unwrap().clone()
    }

    /// Enrichment client pointed at the fake service.
    pub fn enrichment_client(&self, breaker: CircuitBreakerConfig) -> Arc<dyn EnrichmentLookup> {
        let guard = ServiceGuard::new("enrichment", breaker, RetryPolicy::none());
        Arc::new(
            HttpEnrichmentClient::new(&self.enrichment_url(), Duration::from_secs(5), guard)
                .expect("Failed to create enrichment client"),
        )
    }

    /// Live generator pointed at the fake service.
    pub fn generator(&self, breaker: CircuitBreakerConfig) -> TagGenerator {
        let provider = OpenAIProvider::new(
            self.generation_base_url(),
            "fake-model",
            Some("test-key".to_string()),
        );
        let guard = ServiceGuard::new("generation", breaker, RetryPolicy::none());
        TagGenerator::new(Arc::new(LlmTagBackend::new(
            Arc::new(provider),
            guard,
            0.3,
            Duration::from_secs(5),
        )))
    }
}

impl Drop for FakeServices {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Breaker settings that never trip during a test.
pub fn lenient_breaker() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 0,
        ..PipelineSettings::default().breaker_config()
    }
}
