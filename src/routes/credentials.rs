use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use validator::Validate;

use crate::{
    dto::credentials::{CredentialStatus, UpsertCredentialsRequest},
    error::AppError,
    routes::identity::CurrentUser,
    services::credential_service,
    state::SharedState,
};

/// Endpoints linking the caller's music provider account.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/credentials",
        get(credential_status)
            .put(upsert_credentials)
            .delete(delete_credentials),
    )
}

/// Whether the caller's provider account is connected.
#[utoipa::path(
    get,
    path = "/credentials",
    tag = "credentials",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Connection status", body = CredentialStatus),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn credential_status(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CredentialStatus>, AppError> {
    Ok(Json(credential_service::status(&state, &user_id).await?))
}

/// Store provider tokens obtained by the client.
#[utoipa::path(
    put,
    path = "/credentials",
    tag = "credentials",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    request_body = UpsertCredentialsRequest,
    responses(
        (status = 200, description = "Tokens stored", body = CredentialStatus),
        (status = 400, description = "Invalid tokens or expiry"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn upsert_credentials(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<UpsertCredentialsRequest>,
) -> Result<Json<CredentialStatus>, AppError> {
    payload.validate()?;
    Ok(Json(
        credential_service::upsert(&state, &user_id, payload).await?,
    ))
}

/// Disconnect the caller's provider account.
#[utoipa::path(
    delete,
    path = "/credentials",
    tag = "credentials",
    params(("X-User-Id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 204, description = "Tokens removed"),
        (status = 404, description = "No tokens stored"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn delete_credentials(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<StatusCode, AppError> {
    credential_service::delete(&state, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
