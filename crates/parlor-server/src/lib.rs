//! Parlor server library logic.

pub mod background;
pub mod call;
pub mod config;
pub mod twiml;

use axum::{
    extract::{DefaultBodyLimit, Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use config::{BusinessConfig, Config};
use parlor_calendar::CalendarClient;
use parlor_dialog::{AssistantPolicy, ConversationPolicy, KeywordPolicy};
use parlor_notify::NotifyClient;
use parlor_session::SessionStore;
use parlor_voice::{AudioCache, TtsService};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};

/// Maximum request body size (64 KiB). Webhook forms are tiny; anything
/// larger is not a legitimate telephony callback.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
pub struct AppState {
    /// Active call sessions keyed by the provider's call id.
    pub sessions: SessionStore,
    /// The conversation policy driving every call on this server.
    pub policy: ConversationPolicy,
    /// Speech synthesis service.
    pub tts: Arc<TtsService>,
    /// Synthesized audio awaiting playback.
    pub audio: Arc<AudioCache>,
    /// Calendar availability and event writes.
    pub calendar: Arc<CalendarClient>,
    /// Confirmation message sender.
    pub notify: Arc<NotifyClient>,
    /// Front-desk behavior settings (greeting, goodbye, business name).
    pub business: BusinessConfig,
    /// Externally reachable base URL for audio links, empty to derive
    /// from request headers.
    pub public_url: String,
}

impl AppState {
    /// Wires up all services from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let calendar = Arc::new(CalendarClient::new(config.calendar.clone()));
        let policy = match config.policy.kind.as_str() {
            "assistant" => {
                ConversationPolicy::Assistant(AssistantPolicy::new(config.assistant.clone()))
            }
            "keyword" => ConversationPolicy::Keyword(KeywordPolicy::new(calendar.clone())),
            other => {
                tracing::warn!(kind = other, "unknown policy kind, falling back to keyword");
                ConversationPolicy::Keyword(KeywordPolicy::new(calendar.clone()))
            }
        };

        Self {
            sessions: SessionStore::new(),
            policy,
            tts: Arc::new(TtsService::new(config.tts.clone())),
            audio: Arc::new(AudioCache::new()),
            calendar,
            notify: Arc::new(NotifyClient::new(config.notify.clone())),
            business: config.business.clone(),
            public_url: config.server.public_url.clone(),
        }
    }
}

/// API error type mapping to HTTP status codes. The TwiML webhooks never
/// use it (they always answer with markup); it covers the plain HTTP
/// endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handler for `GET /audio/{audioId}`. Serves cached synthesized audio
/// exactly while it is fresh; expired or unknown handles are 404.
async fn audio_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(audio_id): Path<String>,
) -> Result<Response, ApiError> {
    let stored = state
        .audio
        .get(&audio_id)
        .ok_or_else(|| ApiError::NotFound(format!("no audio for handle: {}", audio_id)))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, stored.mime_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        stored.bytes,
    )
        .into_response())
}

/// Builds the application router with all routes.
///
/// The state is shared with the background tasks, so it arrives
/// pre-wrapped in an `Arc`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/incoming-call", post(call::incoming_call_handler))
        .route("/process-speech", post(call::process_speech_handler))
        .route("/audio/{audioId}", get(audio_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(state))
}
