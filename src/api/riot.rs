use std::sync::Arc;

use axum::{Extension, extract::Path, http::StatusCode, response::Json};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    server::AppState,
    types::{ApiResponse, KeyCheck, RiotProfile},
};

pub async fn summoner(
    Extension(state): Extension<Arc<AppState>>,
    Path((game_name, tag)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<RiotProfile>>> {
    let (game_name, tag) = (game_name.trim(), tag.trim());
    if game_name.is_empty() || tag.is_empty() {
        return Err(ApiError::BadRequest {
            error: "Missing required parameters".to_string(),
            message: "gameName and tag are required".to_string(),
        });
    }
    if !state.riot.has_api_key() {
        return Err(ApiError::BadRequest {
            error: "Riot API not configured".to_string(),
            message: "RIOT_API_KEY not configured".to_string(),
        });
    }

    let cache_key = format!("{}#{}", game_name, tag).to_lowercase();
    if let Some(profile) = state.riot_cache.get(&cache_key).await {
        debug!(riot_id = %profile.riot_id, "Serving cached Riot profile");
        return Ok(Json(ApiResponse::ok(profile)));
    }

    let profile = state
        .riot
        .summoner_info(game_name, tag)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch summoner information", e))?;
    state.riot_cache.put(&cache_key, profile.clone()).await;

    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn test_key(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<KeyCheck>>) {
    let check = state.riot.test_key().await;
    if check.is_valid() {
        return (StatusCode::OK, Json(ApiResponse::ok(check)));
    }

    let envelope = ApiResponse {
        success: false,
        error: Some(check.message.clone()),
        message: check.details.clone(),
        data: Some(check),
    };
    (StatusCode::BAD_REQUEST, Json(envelope))
}
