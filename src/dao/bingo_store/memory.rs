use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    bingo_store::BingoStore,
    models::{CredentialEntity, SessionEntity, SessionUpdate},
    storage::{StorageError, StorageResult},
};

/// Process-local store used when no database is configured.
///
/// Records live as long as the process; nothing is written to disk.
#[derive(Clone, Default)]
pub struct InMemoryBingoStore {
    sessions: Arc<DashMap<Uuid, SessionEntity>>,
    credentials: Arc<DashMap<String, CredentialEntity>>,
}

impl InMemoryBingoStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BingoStore for InMemoryBingoStore {
    fn create_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
        let sessions = Arc::clone(&self.sessions);
        Box::pin(async move {
            let id = session.id;
            sessions.insert(id, session);
            Ok(id)
        })
    }

    fn update_session(
        &self,
        id: Uuid,
        update: SessionUpdate,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let sessions = Arc::clone(&self.sessions);
        Box::pin(async move {
            let mut entry = sessions
                .get_mut(&id)
                .ok_or_else(|| StorageError::missing("session", id))?;
            update.apply(entry.value_mut());
            Ok(())
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let sessions = Arc::clone(&self.sessions);
        Box::pin(async move { Ok(sessions.get(&id).map(|entry| entry.value().clone())) })
    }

    fn get_credentials(
        &self,
        user_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<CredentialEntity>>> {
        let credentials = Arc::clone(&self.credentials);
        let user_id = user_id.to_string();
        Box::pin(async move { Ok(credentials.get(&user_id).map(|entry| entry.value().clone())) })
    }

    fn upsert_credentials(
        &self,
        record: CredentialEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let credentials = Arc::clone(&self.credentials);
        Box::pin(async move {
            credentials.insert(record.user_id.clone(), record);
            Ok(())
        })
    }

    fn delete_credentials(&self, user_id: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let credentials = Arc::clone(&self.credentials);
        let user_id = user_id.to_string();
        Box::pin(async move { Ok(credentials.remove(&user_id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::CardEntity;

    fn session() -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            user_id: "player".into(),
            card: CardEntity {
                id: Uuid::new_v4(),
                placeholder: true,
                items: Vec::new(),
            },
            marked_cells: Vec::new(),
            completed: false,
            winning_pattern: None,
            current_item_index: 0,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
            completed_at: None,
        }
    }

    fn credentials(user: &str, token: &str) -> CredentialEntity {
        CredentialEntity {
            user_id: user.into(),
            access_token: token.into(),
            refresh_token: "refresh".into(),
            expires_at: SystemTime::now(),
            scope: None,
            updated_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn sessions_are_created_and_updated() {
        let store = InMemoryBingoStore::new();
        let entity = session();
        let id = store.create_session(entity.clone()).await.unwrap();
        assert_eq!(id, entity.id);

        store
            .update_session(id, SessionUpdate::cursor(4))
            .await
            .unwrap();
        let stored = store.find_session(id).await.unwrap().unwrap();
        assert_eq!(stored.current_item_index, 4);
    }

    #[tokio::test]
    async fn updating_unknown_session_is_missing() {
        let store = InMemoryBingoStore::new();
        let err = store
            .update_session(Uuid::new_v4(), SessionUpdate::cursor(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Missing { entity: "session", .. }));
    }

    #[tokio::test]
    async fn credentials_upsert_replace_and_delete() {
        let store = InMemoryBingoStore::new();
        assert!(store.get_credentials("player").await.unwrap().is_none());

        store.upsert_credentials(credentials("player", "one")).await.unwrap();
        store.upsert_credentials(credentials("player", "two")).await.unwrap();
        let stored = store.get_credentials("player").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "two");

        assert!(store.delete_credentials("player").await.unwrap());
        assert!(!store.delete_credentials("player").await.unwrap());
    }
}
