use axum::Router;

use crate::state::SharedState;

pub mod credentials;
pub mod docs;
pub mod game;
pub mod health;
pub mod identity;
pub mod playback;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(game::router())
        .merge(playback::router())
        .merge(credentials::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };

    use super::*;
    use crate::{
        error::AppError,
        routes::identity::CurrentUser,
        test_support::{FakeProvider, state_with},
    };

    fn user() -> CurrentUser {
        CurrentUser("p1".into())
    }

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[tokio::test]
    async fn game_flow_through_handlers() {
        let (state, _, _) = state_with(FakeProvider::default()).await;

        let err = game::current_game(State(state.clone()), user()).await.unwrap_err();
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);

        let (status, Json(created)) = game::create_game(State(state.clone()), user(), None)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(created.card.placeholder);

        let Json(toggled) = game::toggle_cell(State(state.clone()), user(), Path(0))
            .await
            .unwrap();
        assert_eq!(toggled.marked_cells, vec![0]);

        let err = game::toggle_cell(State(state.clone()), user(), Path(25))
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);

        let err = playback::start_playback(State(state.clone()), user(), None)
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::CONFLICT);

        let status = playback::stop_playback(State(state.clone()), user()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(skipped) = playback::next_item(State(state.clone()), user())
            .await
            .unwrap();
        assert_eq!(skipped.index, 1);
    }

    #[tokio::test]
    async fn health_and_credentials() {
        let (state, _, _) = state_with(FakeProvider::default()).await;
        let _app = router(state.clone());

        let Json(health) = health::healthcheck(State(state.clone())).await;
        assert_eq!(health.status, "ok");

        let Json(status) = credentials::credential_status(State(state.clone()), user())
            .await
            .unwrap();
        assert!(!status.connected);

        let err = credentials::delete_credentials(State(state.clone()), user())
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);

        state.clear_store().await;
        let err = credentials::credential_status(State(state), user())
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::SERVICE_UNAVAILABLE);
    }
}
