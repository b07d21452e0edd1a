//! HTTP surface: router, shared state, and the query endpoints.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{ServerConfig, SessionConfig};
use crate::directory::DirectoryEntry;
use crate::error::AppError;
use crate::handler::websocket_handler;
use crate::hub::{Hub, HubHandle, HubStats};
use crate::message::{ChatEvent, UsernameCheck, UsernameValidity};
use crate::store::MessageStore;
use crate::types::{RoomCode, Username};

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub store: Arc<dyn MessageStore>,
    pub session: SessionConfig,
}

/// Build the relay's router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/chat/{room}", get(chat_history))
        .route("/online-users/{room}", get(online_users))
        .route("/valid-username/{room}", post(valid_username))
        .route("/api/health", get(health_check))
        .route("/api/stats", get(hub_stats))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Open the store, start the hub, bind and serve until Ctrl+C
pub async fn run_server(config: ServerConfig) -> Result<(), AppError> {
    let store = config.open_store()?;
    let (hub, _hub_task) = Hub::spawn(store.clone(), config.hub.clone());
    info!("Hub started (unique usernames: {})", config.hub.unique_usernames);

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Chat relay listening on {}", listener.local_addr()?);
    info!("Connect to: ws://{}/ws", config.addr);

    let state = AppState {
        hub,
        store,
        session: config.session.clone(),
    };
    serve(listener, state, shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// `GET /chat/{room}`: room history, oldest first
async fn chat_history(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<Vec<ChatEvent>>, AppError> {
    let room_code = RoomCode::parse(room)?;
    Ok(Json(state.store.history(room_code.as_str())?))
}

/// `GET /online-users/{room}`
async fn online_users(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<Vec<DirectoryEntry>>, AppError> {
    let room_code = RoomCode::parse(room)?;
    Ok(Json(state.hub.directory(room_code).await?))
}

/// `POST /valid-username/{room}` with `{"username": ..}`
///
/// A malformed username is simply not valid; only a bad room code is a
/// request error.
async fn valid_username(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(check): Json<UsernameCheck>,
) -> Result<Json<UsernameValidity>, AppError> {
    let room_code = RoomCode::parse(room)?;
    let valid = match Username::parse(check.username) {
        Ok(name) => {
            state
                .hub
                .is_username_available(room_code, name.to_string())
                .await?
        }
        Err(_) => false,
    };
    Ok(Json(UsernameValidity { valid }))
}

/// `GET /api/health`
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// `GET /api/stats`
async fn hub_stats(State(state): State<AppState>) -> Result<Json<HubStats>, AppError> {
    Ok(Json(state.hub.stats().await?))
}
