use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{bingo_store::BingoStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the storage backend and keep the shared state in degraded mode
/// while it is unavailable. Gameplay keeps running in memory meanwhile.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn BingoStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_store(Arc::clone(&store)).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                if !watch_health(&state, store.as_ref()).await {
                    state.clear_store().await;
                }
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll `store` until reconnecting fails [`MAX_RECONNECT_ATTEMPTS`] times in a row.
async fn watch_health(state: &SharedState, store: &dyn BingoStore) -> bool {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                if !reconnect(state, store).await {
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    return false;
                }
                state.update_degraded(false);
                sleep(HEALTH_POLL_INTERVAL).await;
            }
        }
    }
}

async fn reconnect(state: &SharedState, store: &dyn BingoStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use futures::{FutureExt, future::BoxFuture};
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            bingo_store::memory::InMemoryBingoStore,
            models::{CredentialEntity, SessionEntity, SessionUpdate},
            storage::StorageResult,
        },
        state::AppState,
        test_support::{FakeProvider, SharedFake},
    };

    /// Memory store whose health can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryBingoStore,
        healthy: AtomicBool,
        reconnects: Mutex<u32>,
    }

    impl FlakyStore {
        fn status(&self) -> StorageResult<()> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(StorageError::unavailable("down".into(), std::io::Error::other("down")))
            }
        }
    }

    impl BingoStore for FlakyStore {
        fn create_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
            self.inner.create_session(session)
        }

        fn update_session(
            &self,
            id: Uuid,
            update: SessionUpdate,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.update_session(id, update)
        }

        fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
            self.inner.find_session(id)
        }

        fn get_credentials(
            &self,
            user_id: &str,
        ) -> BoxFuture<'static, StorageResult<Option<CredentialEntity>>> {
            self.inner.get_credentials(user_id)
        }

        fn upsert_credentials(&self, record: CredentialEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.upsert_credentials(record)
        }

        fn delete_credentials(&self, user_id: &str) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete_credentials(user_id)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let status = self.status();
            async move { status }.boxed()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            *self.reconnects.lock().unwrap() += 1;
            let status = self.status();
            async move { status }.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn outage_toggles_degraded_mode() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(SharedFake(Arc::new(FakeProvider::default()))),
        );
        let store = Arc::new(FlakyStore::default());
        store.healthy.store(true, Ordering::SeqCst);

        let connect_store = Arc::clone(&store);
        let supervisor = tokio::spawn(run(Arc::clone(&state), move || {
            let store: Arc<dyn BingoStore> = connect_store.clone();
            async move { Ok(store) }
        }));

        sleep(Duration::from_millis(100)).await;
        assert!(!state.is_degraded());

        store.healthy.store(false, Ordering::SeqCst);
        sleep(HEALTH_POLL_INTERVAL + Duration::from_millis(100)).await;
        assert!(state.is_degraded());

        store.healthy.store(true, Ordering::SeqCst);
        sleep(INITIAL_DELAY * 2).await;
        assert!(!state.is_degraded());
        assert!(*store.reconnects.lock().unwrap() >= 2);

        supervisor.abort();
    }
}
