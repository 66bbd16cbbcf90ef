use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::{server::AppState, types::ApiResponse};

pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<ApiResponse<Value>> {
    Json(ApiResponse::ok(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "API endpoint",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "spotify": "/spotify",
            "riot": "/riot"
        }
    }))
}
