use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{routes::identity::CurrentUser, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/session",
    tag = "sse",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    responses((status = 200, description = "Session and playback events of the caller", content_type = "text/event-stream", body = String))
)]
/// Stream `session.updated` and `playback.status` events of the caller.
pub async fn session_stream(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let subscription = sse_service::subscribe(&state, &user_id).await;
    info!(user_id = %user_id, "New session SSE connection");
    sse_service::to_sse_stream(state, subscription, user_id)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/session", get(session_stream))
}
