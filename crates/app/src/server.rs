use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use research_copilot_core::{
    AnswerBody, PipelineError, PipelineResponse, RetrievedChunk, SharedPipeline, Strategy,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SharedPipeline>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub strategy: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: AnswerBody,
    pub retrieved: Vec<RetrievedChunk>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/strategies", get(strategies))
        .route("/ask", post(ask))
        .route("/api/query", post(query))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for research-copilot server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("research-copilot listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Html(include_str!("../ui/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"research-copilot"}))
}

async fn strategies() -> impl IntoResponse {
    let ids: Vec<&str> = Strategy::ALL.iter().map(Strategy::id).collect();
    Json(json!({"strategies": ids, "default": Strategy::default().id()}))
}

async fn ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(request) = payload.map_err(rejection_error)?;
    let response = run_query(&state, request).await?;
    Ok(Json(AskResponse {
        answer: response.answer,
        retrieved: response.retrieved_chunks,
    }))
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let Json(request) = payload.map_err(rejection_error)?;
    run_query(&state, request).await.map(Json)
}

fn rejection_error(rejection: JsonRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": rejection.body_text()})),
    )
}

async fn run_query(state: &AppState, request: AskRequest) -> Result<PipelineResponse, ApiError> {
    let strategy = match request.strategy.as_deref().map(str::trim) {
        None | Some("") => Strategy::default(),
        Some(raw) => raw
            .parse::<Strategy>()
            .map_err(|error| api_error(PipelineError::from(error)))?,
    };

    state
        .pipeline
        .query(&request.question, strategy)
        .await
        .map_err(api_error)
}

fn api_error(error: PipelineError) -> ApiError {
    let status = if error.is_bad_request() {
        StatusCode::BAD_REQUEST
    } else {
        error!(error = %error, "query failed");
        StatusCode::BAD_GATEWAY
    };
    (status, Json(json!({"error": error.to_string()})))
}
