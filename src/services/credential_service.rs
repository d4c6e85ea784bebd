use std::{
    future::Future,
    sync::Arc,
    time::{Duration, SystemTime},
};

use tracing::{debug, info, warn};

use crate::{
    dao::{bingo_store::BingoStore, models::CredentialEntity},
    dto::{
        credentials::{CredentialStatus, UpsertCredentialsRequest},
        parse_rfc3339,
    },
    error::ServiceError,
    provider::ProviderError,
    state::SharedState,
};

/// Connection state of the user's provider account.
pub async fn status(state: &SharedState, user_id: &str) -> Result<CredentialStatus, ServiceError> {
    let store = state.require_store().await?;
    let status = store
        .get_credentials(user_id)
        .await?
        .as_ref()
        .map(CredentialStatus::from)
        .unwrap_or_else(CredentialStatus::disconnected);
    Ok(status)
}

/// Store the tokens the client obtained from its own OAuth exchange.
pub async fn upsert(
    state: &SharedState,
    user_id: &str,
    request: UpsertCredentialsRequest,
) -> Result<CredentialStatus, ServiceError> {
    let expires_at = parse_rfc3339(&request.expires_at)
        .map_err(|err| ServiceError::InvalidInput(format!("expires_at: {err}")))?;
    let record = CredentialEntity {
        user_id: user_id.to_string(),
        access_token: request.access_token,
        refresh_token: request.refresh_token,
        expires_at,
        scope: request.scope,
        updated_at: SystemTime::now(),
    };

    let store = state.require_store().await?;
    store.upsert_credentials(record.clone()).await?;
    info!(user_id, "music provider connected");
    Ok(CredentialStatus::from(&record))
}

/// Forget the user's provider tokens.
pub async fn delete(state: &SharedState, user_id: &str) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    if store.delete_credentials(user_id).await? {
        info!(user_id, "music provider disconnected");
        Ok(())
    } else {
        Err(ServiceError::NotFound("music provider not connected".into()))
    }
}

/// Run `op` with a valid access token of `user_id`.
///
/// An expired record is refreshed before the first call. When `op` reports a
/// rejected credential the token is refreshed once and `op` retried once; the
/// second outcome is returned as is.
pub async fn with_access_token<T, F, Fut>(
    state: &SharedState,
    user_id: &str,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let store = state.require_store().await?;
    let mut record = store
        .get_credentials(user_id)
        .await?
        .ok_or_else(|| ServiceError::InvalidState("music provider not connected".into()))?;

    let mut refreshed = false;
    if record.is_expired(SystemTime::now()) {
        debug!(user_id, "access token expired; refreshing before use");
        record = refresh(state, &store, record).await?;
        refreshed = true;
    }

    match op(record.access_token.clone()).await {
        Err(err) if err.is_credential_expired() && !refreshed => {
            debug!(user_id, "access token rejected; refreshing and retrying once");
            let record = refresh(state, &store, record).await?;
            Ok(op(record.access_token).await?)
        }
        result => Ok(result?),
    }
}

async fn refresh(
    state: &SharedState,
    store: &Arc<dyn BingoStore>,
    record: CredentialEntity,
) -> Result<CredentialEntity, ServiceError> {
    let token = state.provider().refresh_token(&record.refresh_token).await?;
    let now = SystemTime::now();
    let renewed = CredentialEntity {
        user_id: record.user_id,
        access_token: token.access_token,
        refresh_token: token.refresh_token.unwrap_or(record.refresh_token),
        expires_at: now + Duration::from_secs(token.expires_in),
        scope: token.scope.or(record.scope),
        updated_at: now,
    };

    if let Err(err) = store.upsert_credentials(renewed.clone()).await {
        warn!(user_id = %renewed.user_id, error = %err, "failed to persist refreshed credentials");
    }
    Ok(renewed)
}
