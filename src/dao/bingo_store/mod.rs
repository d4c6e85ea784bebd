#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use crate::dao::models::{CredentialEntity, SessionEntity, SessionUpdate};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for bingo sessions and provider credentials.
pub trait BingoStore: Send + Sync {
    fn create_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<Uuid>>;
    fn update_session(
        &self,
        id: Uuid,
        update: SessionUpdate,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    fn get_credentials(
        &self,
        user_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<CredentialEntity>>>;
    fn upsert_credentials(
        &self,
        credentials: CredentialEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_credentials(&self, user_id: &str) -> BoxFuture<'static, StorageResult<bool>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
