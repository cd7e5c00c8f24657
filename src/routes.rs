use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::shared::AppState;
use crate::websockets::websocket_handler;

pub fn create_router(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config.cors_origin);

    Router::new()
        .route("/", get(|| async { "Debate server is running" }))
        .route("/health", get(health))
        .route("/ws", get(websocket_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!(origin = %origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

async fn health(State(app_state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": app_state.connection_registry.connection_count().await,
        "activeRooms": app_state.membership.active_room_count().await,
    }))
}
