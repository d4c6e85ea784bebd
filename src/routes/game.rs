use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::game::{AdvanceRequest, CreateGameRequest, SessionSnapshot},
    error::AppError,
    routes::identity::CurrentUser,
    services::game_service,
    state::SharedState,
};

/// Endpoints driving the caller's bingo game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/current", get(current_game))
        .route("/games/current/cells/{index}/toggle", post(toggle_cell))
        .route("/games/current/advance", post(advance))
}

/// Deal a new card, stopping any running auto-play.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    request_body(content = CreateGameRequest, description = "Optional dealing options"),
    responses(
        (status = 201, description = "Card dealt", body = SessionSnapshot),
        (status = 422, description = "Not enough tracks and fallback disabled"),
        (status = 502, description = "Music provider failed and fallback disabled")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    payload: Option<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let snapshot = game_service::create_game(&state, &user_id, request).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Snapshot of the caller's current game.
#[utoipa::path(
    get,
    path = "/games/current",
    tag = "games",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Current game", body = SessionSnapshot),
        (status = 404, description = "No card dealt yet")
    )
)]
pub async fn current_game(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(game_service::current_game(&state, &user_id).await?))
}

/// Mark or unmark a cell. Completing a pattern ends the game.
#[utoipa::path(
    post,
    path = "/games/current/cells/{index}/toggle",
    tag = "games",
    params(
        ("X-User-Id" = String, Header, description = "Authenticated user id"),
        ("index" = usize, Path, description = "Row-major cell position in 0..25")
    ),
    responses(
        (status = 200, description = "Updated game", body = SessionSnapshot),
        (status = 400, description = "Cell outside the card"),
        (status = 404, description = "No card dealt yet")
    )
)]
pub async fn toggle_cell(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(index): Path<usize>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        game_service::toggle_cell(&state, &user_id, index).await?,
    ))
}

/// Move the item cursor.
#[utoipa::path(
    post,
    path = "/games/current/advance",
    tag = "games",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    request_body = AdvanceRequest,
    responses(
        (status = 200, description = "Updated game", body = SessionSnapshot),
        (status = 400, description = "Index outside the card's items"),
        (status = 404, description = "No card dealt yet")
    )
)]
pub async fn advance(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(
        game_service::advance(&state, &user_id, payload.index).await?,
    ))
}
