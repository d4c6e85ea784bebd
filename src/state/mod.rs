pub mod session;
mod sse;
pub mod table;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use tracing::debug;

use crate::{
    bingo::patterns::PatternCatalog,
    config::AppConfig,
    dao::bingo_store::BingoStore,
    error::ServiceError,
    provider::MusicProvider,
    services::session_mirror::{SessionMirror, StoreSlot},
};

pub use self::sse::SseHub;
pub use self::table::GameTable;

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, collaborators and per-user tables.
pub struct AppState {
    config: AppConfig,
    catalog: &'static PatternCatalog,
    provider: Arc<dyn MusicProvider>,
    store: StoreSlot,
    mirror: SessionMirror,
    degraded: watch::Sender<bool>,
    tables: DashMap<String, Arc<GameTable>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    /// Must be called inside a Tokio runtime: the session mirror task is spawned here.
    pub fn new(config: AppConfig, provider: Arc<dyn MusicProvider>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let catalog = PatternCatalog::for_variant(config.pattern_catalog);
        let store: StoreSlot = Arc::new(RwLock::new(None));
        Arc::new(Self {
            config,
            catalog,
            provider,
            mirror: SessionMirror::spawn(Arc::clone(&store)),
            store,
            degraded: degraded_tx,
            tables: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Pattern catalog new sessions are evaluated against.
    pub fn catalog(&self) -> &'static PatternCatalog {
        self.catalog
    }

    /// Music provider shared by every user.
    pub fn provider(&self) -> Arc<dyn MusicProvider> {
        Arc::clone(&self.provider)
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn BingoStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_store(&self) -> Result<Arc<dyn BingoStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Best-effort writer mirroring session changes to the store.
    pub fn mirror(&self) -> &SessionMirror {
        &self.mirror
    }

    /// Install a store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn BingoStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Table of `user_id`, created on first use.
    pub fn table(&self, user_id: &str) -> Arc<GameTable> {
        if let Some(table) = self.tables.get(user_id) {
            return Arc::clone(table.value());
        }
        let entry = self
            .tables
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(GameTable::new(self.catalog)));
        Arc::clone(entry.value())
    }

    /// Drop the table of `user_id` when it is idle and nobody else holds it.
    ///
    /// Tables with a session are kept, so the map holds at most one table per
    /// user who has dealt a game plus the ones currently in use.
    pub fn release_table(&self, user_id: &str) -> bool {
        let removed = self
            .tables
            .remove_if(user_id, |_, table| {
                Arc::strong_count(table) == 1 && table.is_idle()
            })
            .is_some();
        if removed {
            debug!(user_id, "released idle game table");
        }
        removed
    }

    /// Table of `user_id` if the user has played already.
    pub fn existing_table(&self, user_id: &str) -> Option<Arc<GameTable>> {
        self.tables
            .get(user_id)
            .map(|table| Arc::clone(table.value()))
    }
}
