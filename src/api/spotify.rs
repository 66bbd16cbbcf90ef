use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, Query},
    response::{Json, Redirect},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    server::AppState,
    spotify::DEFAULT_RECENT_LIMIT,
    types::{ApiResponse, AuthStatus, LogoutOutcome, PlaybackSnapshot, RecentlyPlayed},
};

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<String>,
}

pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<LoginParams>,
) -> ApiResult<Redirect> {
    let url = state
        .auth
        .authorize_url(params.state.as_deref())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Redirect::to(&url))
}

/// Completes the OAuth flow and sends the browser back to the portfolio.
pub async fn callback(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let project_url = &state.config.project_url;
    let failed = |reason: &str| Redirect::to(&format!("{}/?error={}#stats", project_url, reason));

    if let Some(error) = params.error {
        warn!(%error, "Spotify authorization was denied");
        return failed("auth_failed");
    }
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return failed("no_code");
    };

    let grant = match state.auth.exchange_code(&code).await {
        Ok(grant) => grant,
        Err(e) => {
            warn!(error = %e, "Token exchange failed");
            return failed("token_exchange_failed");
        }
    };
    let spotify_user_id = match state.auth.current_user_id(&grant.access_token).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Failed to look up Spotify account");
            return failed("token_exchange_failed");
        }
    };

    state.tokens.set_token(
        &spotify_user_id,
        &grant.access_token,
        grant.refresh_token.as_deref(),
    );
    let frontend_id = params.state.filter(|s| !s.is_empty());
    if let Some(frontend_id) = &frontend_id {
        state.users.map_user_ids(frontend_id, &spotify_user_id);
    }
    info!(user_id = %spotify_user_id, "Spotify login completed");

    let user_id = frontend_id.unwrap_or(spotify_user_id);
    Redirect::to(&format!(
        "{}/?auth=success&userId={}#stats",
        project_url,
        url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect::<String>()
    ))
}

pub async fn currently_playing(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<PlaybackSnapshot>>> {
    let user_id = resolve_user(&state, &user_id)?;
    let snapshot = state
        .spotify
        .currently_playing(&user_id)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch currently playing track", e))?;
    Ok(Json(ApiResponse::ok(snapshot)))
}

pub async fn recently_played(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(params): Query<RecentParams>,
) -> ApiResult<Json<ApiResponse<RecentlyPlayed>>> {
    let user_id = resolve_user(&state, &user_id)?;
    let limit = params
        .limit
        .and_then(|l| l.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_RECENT_LIMIT);

    let recent = state
        .spotify
        .recently_played(&user_id, limit)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch recently played tracks", e))?;
    Ok(Json(ApiResponse::ok(recent)))
}

pub async fn auth_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<AuthStatus>>> {
    let user_id = resolve_user(&state, &user_id)?;
    let authenticated = state.tokens.get_valid_access_token(&user_id).await.is_some();
    let message = if authenticated {
        "User is authenticated"
    } else {
        "User not authenticated"
    };

    Ok(Json(ApiResponse::ok(AuthStatus {
        authenticated,
        message: message.to_string(),
    })))
}

pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<LogoutOutcome>>> {
    let user_id = resolve_user(&state, &user_id)?;
    info!(%user_id, "Logging out");
    Ok(Json(ApiResponse::ok(state.tokens.logout(&user_id))))
}

fn resolve_user(state: &AppState, user_id: &str) -> ApiResult<String> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest {
            error: "User ID is required".to_string(),
            message: "Please provide a valid user ID".to_string(),
        });
    }
    Ok(state.users.resolve(user_id))
}
