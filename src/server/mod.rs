//! Companion backend for the vetting gate.
//!
//! Serves the `/chat` contract the widget talks to by forwarding each
//! visitor message, under a fixed system prompt, to an OpenAI-compatible
//! completions API. A missing API key never stops the server from coming
//! up; it only makes every chat request fail with a 500.

pub mod completions;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use completions::{CompletionsClient, DEFAULT_MODEL, GROQ_BASE_URL};

pub const SYSTEM_PROMPT: &str = "You are the strategic assistant of Evangelista & Co. Answer in a \
professional, concise and business-oriented way.";

const STATUS_MESSAGE: &str = "Evangelista & Co. systems operational";
const MISSING_KEY_DETAIL: &str = "Server error: API key not configured";

pub struct ServerConfig {
    pub port: u16,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl ServerConfig {
    pub fn from_env(port: u16, model: Option<String>) -> Self {
        Self {
            port,
            api_key: env::var("GROQ_API_KEY").ok().filter(|key| !key.trim().is_empty()),
            base_url: env::var("GROQ_BASE_URL").unwrap_or_else(|_| GROQ_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    completions: Option<Arc<CompletionsClient>>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let completions = match &config.api_key {
            Some(key) => Some(Arc::new(CompletionsClient::new(
                key.clone(),
                &config.base_url,
                config.model.clone(),
            ))),
            None => {
                error!("CRITICAL: GROQ_API_KEY not found in environment variables");
                None
            }
        };
        Self { completions }
    }
}

/// Incoming chat request. Only `message` is used; the widget's history
/// and any other fields are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatAnswer {
    pub response: String,
}

/// Error body in the `{"detail": ...}` shape the widget's backend has always used.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/chat", post(chat))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({ "status": STATUS_MESSAGE }))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let Json(request) = payload?;
    let Some(client) = state.completions.as_ref() else {
        return Err(ApiError::internal(MISSING_KEY_DETAIL));
    };

    match client.complete(SYSTEM_PROMPT, &request.message).await {
        Ok(response) => Ok(Json(ChatAnswer { response })),
        Err(e) => {
            error!(model = client.model(), "Internal error: {}", e);
            Err(ApiError::internal(e.to_string()))
        }
    }
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, model = %config.model, "Vetting gate backend listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
