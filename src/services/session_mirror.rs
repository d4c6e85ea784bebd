use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::{
    bingo_store::BingoStore,
    models::{SessionEntity, SessionUpdate},
};

/// Shared slot holding the installed store.
pub type StoreSlot = Arc<RwLock<Option<Arc<dyn BingoStore>>>>;

#[derive(Debug)]
enum MirrorOp {
    Create(SessionEntity),
    Update(Uuid, SessionUpdate),
}

/// Best-effort persistence of session changes.
///
/// Writes are queued and applied in order by one background task, so gameplay
/// never waits on storage and an update never overtakes the create it follows.
/// Failures and degraded mode are logged and the write is dropped.
#[derive(Clone)]
pub struct SessionMirror {
    sender: mpsc::UnboundedSender<MirrorOp>,
}

impl SessionMirror {
    /// Spawn the writer task draining into whatever store `slot` holds.
    pub fn spawn(slot: StoreSlot) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(drain(slot, receiver));
        Self { sender }
    }

    /// Queue the creation of a session record.
    pub fn create(&self, session: SessionEntity) {
        self.enqueue(MirrorOp::Create(session));
    }

    /// Queue a partial update of a session record.
    pub fn update(&self, id: Uuid, update: SessionUpdate) {
        self.enqueue(MirrorOp::Update(id, update));
    }

    fn enqueue(&self, op: MirrorOp) {
        if self.sender.send(op).is_err() {
            warn!("session mirror stopped; dropping write");
        }
    }
}

async fn drain(slot: StoreSlot, mut receiver: mpsc::UnboundedReceiver<MirrorOp>) {
    while let Some(op) = receiver.recv().await {
        let store = slot.read().await.as_ref().cloned();
        let Some(store) = store else {
            debug!(?op, "no storage installed; session write skipped");
            continue;
        };

        match op {
            MirrorOp::Create(session) => {
                let id = session.id;
                if let Err(err) = store.create_session(session).await {
                    warn!(session_id = %id, error = %err, "failed to mirror session creation");
                }
            }
            MirrorOp::Update(id, update) => {
                if let Err(err) = store.update_session(id, update).await {
                    warn!(session_id = %id, error = %err, "failed to mirror session update");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::dao::{bingo_store::memory::InMemoryBingoStore, models::CardEntity};

    fn entity() -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            user_id: "u".into(),
            card: CardEntity {
                id: Uuid::new_v4(),
                placeholder: false,
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

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn writes_are_applied_in_order() {
        let store = InMemoryBingoStore::new();
        let slot: StoreSlot = Arc::new(RwLock::new(Some(Arc::new(store.clone()))));
        let mirror = SessionMirror::spawn(slot);

        let session = entity();
        let id = session.id;
        mirror.create(session);
        mirror.update(id, SessionUpdate::cursor(2));
        mirror.update(id, SessionUpdate::cursor(5));
        settle().await;

        let stored = store.find_session(id).await.unwrap().unwrap();
        assert_eq!(stored.current_item_index, 5);
    }

    #[tokio::test]
    async fn writes_without_store_are_dropped() {
        let slot: StoreSlot = Arc::new(RwLock::new(None));
        let mirror = SessionMirror::spawn(Arc::clone(&slot));
        let session = entity();
        let id = session.id;
        mirror.create(session);
        settle().await;

        let store = InMemoryBingoStore::new();
        *slot.write().await = Some(Arc::new(store.clone()));
        mirror.update(id, SessionUpdate::cursor(1));
        settle().await;
        assert!(store.find_session(id).await.unwrap().is_none());
    }
}
