//! HTTP endpoints for room administration.
//!
//! Room creation and registration happen here; game play itself runs over the
//! WebSocket at `/ws`.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::error::RoomError;
use crate::state::AppState;
use crate::types::*;
use crate::ws;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(default, alias = "secret")]
    pub password: String,
    #[serde(default, alias = "adminNickname")]
    pub admin_nick: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_id: RoomId,
    #[serde(default, alias = "secret")]
    pub password: String,
    #[serde(default, alias = "nickname")]
    pub nick: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub ok: bool,
}

/// List every room.
///
/// GET /api/rooms
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummary>> {
    Json(state.registry.list_rooms().await)
}

/// Create a room; the caller becomes its admin.
///
/// POST /api/createRoom
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, RoomError> {
    let room = state
        .registry
        .create_room(&req.password, &req.admin_nick)
        .await?;

    Ok(Json(CreateRoomResponse {
        room_id: room.id.clone(),
    }))
}

/// Register a nickname before the game starts.
///
/// POST /api/join
pub async fn join(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, RoomError> {
    state
        .registry
        .register_participant(&req.room_id, &req.password, &req.nick)
        .await?;

    Ok(Json(JoinResponse { ok: true }))
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

/// The full application router
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/rooms", get(list_rooms))
        .route("/api/createRoom", post(create_room))
        .route("/api/join", post(join))
        .route("/healthz", get(healthz))
        .fallback_service(static_dir)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
