//! Drone HTTP API
//!
//! 启动: cargo run --bin drone-web --features web
//! POST / {"messages": [{"role": "user", "content": "..."}]} -> {"answer": "..."}

#![cfg(feature = "web")]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use drone::config::load_config;
use drone::core::{AgentBuilder, AgentComponents};
use drone::memory::Message;
use drone::{observability, run_agent};

struct AppState {
    components: AgentComponents,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<Message>,
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    answer: String,
    conversation_id: String,
    actions: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// POST /：每个请求新建会话状态，跑完整循环
async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.messages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "messages must not be empty".to_string(),
            }),
        ));
    }
    match run_agent(&state.components, req.messages, req.conversation_id, None).await {
        Ok(run) => Ok(Json(ChatResponse {
            answer: run.answer,
            conversation_id: run.state.conversation_id.clone(),
            actions: run.state.actions().len(),
        })),
        Err(e) => {
            tracing::error!(error = %e, "agent run failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: e.to_string() }),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    cfg.ensure_dirs().context("Failed to create workspace directories")?;
    let bind = cfg.web.bind.clone();

    let components = AgentBuilder::new(cfg).build().context("Failed to build agent")?;
    let state = Arc::new(AppState { components });

    let app = Router::new()
        .route("/", post(api_chat))
        .route("/health", get(|| async { "OK" }))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!("Drone API: http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}
