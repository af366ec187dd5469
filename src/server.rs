//! HTTP front door.
//!
//! Serves the portal UI and the JSON API. Every component is loaded once at
//! startup into an [`AppState`] and shared read-only across requests; a load
//! failure degrades the corresponding feature instead of aborting.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Subsystem readiness flags (always 200) |
//! | `GET`  | `/` | Static UI page |
//! | `GET`  | `/static/{*path}` | Static asset passthrough |
//! | `POST` | `/get_farmer_data` | Record lookup by RTC number |
//! | `POST` | `/chat` | Scheme question → completion service |
//!
//! # Error Contract
//!
//! Every JSON response carries `success`. Lookup failures put their message
//! in `error`; chat failures put theirs in `reply` (the UI renders it as the
//! bot's answer). Completion failures are logged with full detail and
//! surfaced only as a generic apology.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted — the UI may be hosted
//! separately from the API.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::completion::{CompletionBackend, GeminiBackend};
use crate::config::Config;
use crate::error::PortalError;
use crate::knowledge::KnowledgeBase;
use crate::prompt;
use crate::records::RecordStore;

/// Shared application state, constructed once before any request is served.
///
/// Each component is `None` when its startup load failed; handlers translate
/// that into the matching degraded-feature error.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub knowledge: Option<Arc<KnowledgeBase>>,
    pub records: Option<Arc<RecordStore>>,
    pub completion: Option<Arc<dyn CompletionBackend>>,
}

impl AppState {
    /// Assemble state from already-built parts. Tests use this to inject a
    /// stub completion backend.
    pub fn new(
        config: Config,
        knowledge: Option<KnowledgeBase>,
        records: Option<RecordStore>,
        completion: Option<Arc<dyn CompletionBackend>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            knowledge: knowledge.map(Arc::new),
            records: records.map(Arc::new),
            completion,
        }
    }

    /// Load every component from disk and environment. Failures are logged
    /// and leave the component absent; nothing here aborts the process.
    pub fn initialize(config: Config) -> Self {
        let knowledge = match KnowledgeBase::load(&config.data.schemes_path) {
            Ok(kb) => {
                tracing::info!(path = %config.data.schemes_path.display(), "schemes loaded");
                Some(kb)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load schemes — chat disabled");
                None
            }
        };

        let records = match RecordStore::load(&config.data.farmer_csv_path) {
            Ok(store) => {
                tracing::info!(
                    path = %config.data.farmer_csv_path.display(),
                    rows = store.len(),
                    "farmer data loaded"
                );
                Some(store)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load farmer data — lookups disabled");
                None
            }
        };

        let completion = match GeminiBackend::from_env(&config.completion) {
            Some(backend) => {
                tracing::info!(model = backend.model(), "completion backend configured");
                Some(Arc::new(backend) as Arc<dyn CompletionBackend>)
            }
            None => {
                tracing::warn!(
                    var = %config.completion.api_key_env,
                    "API key not found — chatbot will not work"
                );
                None
            }
        };

        Self::new(config, knowledge, records, completion)
    }
}

/// Build the portal router over the given state.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.data.static_dir.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/get_farmer_data", post(handle_farmer_data))
        .route("/chat", post(handle_chat))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(&static_dir))
        .layer(cors)
        .with_state(state)
}

/// Start the portal server: load all components, log the startup summary,
/// bind, and serve until the process is terminated.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::initialize(config);

    tracing::info!(
        schemes = state.knowledge.is_some(),
        farmer_rows = state.records.as_ref().map(|r| r.len()).unwrap_or(0),
        api_configured = state.completion.is_some(),
        "starting farmer portal"
    );

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "portal listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// A failure already translated for one route family: HTTP status, the JSON
/// field the message belongs in, and the user-facing message.
struct AppError {
    status: StatusCode,
    field: &'static str,
    message: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert("success".to_string(), serde_json::Value::Bool(false));
        body.insert(self.field.to_string(), serde_json::Value::from(self.message));
        (self.status, Json(serde_json::Value::Object(body))).into_response()
    }
}

/// Map a [`PortalError`] for the lookup route; the message lands in the
/// `error` field.
fn lookup_error(err: PortalError) -> AppError {
    let (status, message) = match err {
        PortalError::MissingInput => (StatusCode::BAD_REQUEST, "RTC number is required."),
        PortalError::NotFound => (
            StatusCode::NOT_FOUND,
            "Farmer with this RTC number not found.",
        ),
        PortalError::DataUnavailable => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Farmer data is not available on the server.",
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred."),
    };
    AppError {
        status,
        field: "error",
        message,
    }
}

/// Map a [`PortalError`] for the chat route; the message lands in the
/// `reply` field, where the UI renders it as the bot's answer. Completion
/// detail never reaches the client.
fn chat_error(err: PortalError) -> AppError {
    let (status, message) = match err {
        PortalError::MissingInput => (
            StatusCode::BAD_REQUEST,
            "Invalid request. Please provide a message.",
        ),
        PortalError::DataUnavailable => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Knowledge base not loaded. Please contact administrator.",
        ),
        PortalError::NotConfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Chatbot API is not configured. Please contact administrator.",
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sorry, I encountered an error. Please try again later.",
        ),
    };
    AppError {
        status,
        field: "reply",
        message,
    }
}

/// Elapsed wall-clock seconds, rounded to 3 decimal places.
fn elapsed_secs(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    knowledge_base_loaded: bool,
    farmer_data_loaded: bool,
    api_key_configured: bool,
}

/// Always 200; reports which subsystems came up at startup.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        knowledge_base_loaded: state.knowledge.is_some(),
        farmer_data_loaded: state.records.is_some(),
        api_key_configured: state.completion.is_some(),
    })
}

// ============ POST /get_farmer_data ============

#[derive(Deserialize)]
struct LookupRequest {
    rtc: Option<String>,
}

/// JSON response body for a successful lookup.
#[derive(Serialize)]
struct LookupResponse {
    success: bool,
    data: serde_json::Map<String, serde_json::Value>,
    elapsed: f64,
}

/// Record lookup. The store is consulted only when it loaded at startup and
/// the request carries a non-empty `rtc`.
async fn handle_farmer_data(
    State(state): State<AppState>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, AppError> {
    let start = Instant::now();

    let store = state
        .records
        .as_ref()
        .ok_or_else(|| lookup_error(PortalError::DataUnavailable))?;

    let rtc = request.rtc.unwrap_or_default();
    let data = store.lookup(&rtc).map_err(lookup_error)?;

    Ok(Json(LookupResponse {
        success: true,
        data,
        elapsed: elapsed_secs(start),
    }))
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

/// JSON response body for a successful chat exchange.
#[derive(Serialize)]
struct ChatResponse {
    success: bool,
    reply: String,
    elapsed: f64,
}

/// Chat. Validation runs in a fixed order: message presence, then knowledge
/// base, then credential. A bad request is reported as a bad request even on
/// a misconfigured deployment.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let start = Instant::now();

    let message = request.message.unwrap_or_default();
    if message.is_empty() {
        return Err(chat_error(PortalError::MissingInput));
    }

    let knowledge = state
        .knowledge
        .as_ref()
        .ok_or_else(|| chat_error(PortalError::DataUnavailable))?;

    let backend = state
        .completion
        .as_ref()
        .ok_or_else(|| chat_error(PortalError::NotConfigured))?;

    let prompt = prompt::compose(&knowledge.text, &message).map_err(chat_error)?;

    let reply = backend.complete(&prompt).await.map_err(|e| {
        tracing::error!(error = %e, "chatbot completion failed");
        chat_error(PortalError::Completion(e))
    })?;

    Ok(Json(ChatResponse {
        success: true,
        reply,
        elapsed: elapsed_secs(start),
    }))
}
