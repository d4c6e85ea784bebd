use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::playback::{DeviceSummary, PlaybackStarted, SkipResponse, StartPlaybackRequest},
    error::AppError,
    routes::identity::CurrentUser,
    services::playback_service::{self, SkipDirection},
    state::SharedState,
};

/// Endpoints controlling auto-play on the caller's device.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/playback/devices", get(list_devices))
        .route("/playback/start", post(start_playback))
        .route("/playback/stop", post(stop_playback))
        .route("/playback/next", post(next_item))
        .route("/playback/previous", post(previous_item))
}

/// Devices of the caller's music provider account.
#[utoipa::path(
    get,
    path = "/playback/devices",
    tag = "playback",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Available devices", body = [DeviceSummary]),
        (status = 409, description = "Music provider not connected"),
        (status = 502, description = "Music provider failed")
    )
)]
pub async fn list_devices(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<DeviceSummary>>, AppError> {
    Ok(Json(playback_service::list_devices(&state, &user_id).await?))
}

/// Start auto-play from the current item.
#[utoipa::path(
    post,
    path = "/playback/start",
    tag = "playback",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    request_body(content = StartPlaybackRequest, description = "Optional device selection"),
    responses(
        (status = 200, description = "Auto-play started", body = PlaybackStarted),
        (status = 409, description = "No game, placeholder card or no device")
    )
)]
pub async fn start_playback(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    payload: Option<Json<StartPlaybackRequest>>,
) -> Result<Json<PlaybackStarted>, AppError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    request.validate()?;
    Ok(Json(
        playback_service::start_playback(&state, &user_id, request).await?,
    ))
}

/// Stop auto-play and restore the device volume.
#[utoipa::path(
    post,
    path = "/playback/stop",
    tag = "playback",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    responses((status = 204, description = "Auto-play stopped or was not running"))
)]
pub async fn stop_playback(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> StatusCode {
    playback_service::stop_playback(&state, &user_id).await;
    StatusCode::NO_CONTENT
}

/// Skip to the next item.
#[utoipa::path(
    post,
    path = "/playback/next",
    tag = "playback",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Cursor after the skip", body = SkipResponse),
        (status = 404, description = "No card dealt yet")
    )
)]
pub async fn next_item(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SkipResponse>, AppError> {
    Ok(Json(
        playback_service::skip(&state, &user_id, SkipDirection::Next).await?,
    ))
}

/// Skip back to the previous item.
#[utoipa::path(
    post,
    path = "/playback/previous",
    tag = "playback",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Cursor after the skip", body = SkipResponse),
        (status = 404, description = "No card dealt yet")
    )
)]
pub async fn previous_item(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SkipResponse>, AppError> {
    Ok(Json(
        playback_service::skip(&state, &user_id, SkipDirection::Previous).await?,
    ))
}
