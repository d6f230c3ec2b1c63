//! HTTP server assembly.

use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tokio::net::TcpListener,
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use crate::{
    state::{GatewayState, SERVICE_NAME, VERSION},
    webhook::webhook_handler,
};

// ── Shared app state ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

// ── Server startup ──────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(gateway: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/webhook", post(webhook_handler))
        .layer(cors)
        .with_state(AppState { gateway })
}

/// Bind and serve until ctrl-c.
pub async fn serve(gateway: Arc<GatewayState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_app(gateway);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.gateway.line_configured() {
        "ok"
    } else {
        "missing LINE credentials"
    };
    Json(serde_json::json!({
        "message": format!("{SERVICE_NAME} is running"),
        "status": status,
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": VERSION,
        "line_configured": state.gateway.line_configured(),
    }))
}
