use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{
    bingo::card::{CandidateItem, Card},
    state::session::BingoSession,
};

/// Candidate item as persisted alongside a card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemEntity {
    /// Provider identifier.
    pub id: String,
    /// Title as returned by the provider.
    pub title: String,
    /// Primary artist.
    pub artist: String,
    /// Duration in milliseconds.
    pub duration_ms: u64,
    /// Artwork URLs.
    #[serde(default)]
    pub images: Vec<String>,
}

/// Card as persisted. Cells are derived from the item order on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardEntity {
    /// Card identifier.
    pub id: Uuid,
    /// Whether this is the offline placeholder card.
    pub placeholder: bool,
    /// The 24 items in fill order.
    pub items: Vec<ItemEntity>,
}

/// Historical record of a bingo session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Session identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: String,
    /// Card played.
    pub card: CardEntity,
    /// Marked cell positions, sorted.
    pub marked_cells: Vec<usize>,
    /// Whether a pattern has been completed.
    pub completed: bool,
    /// Name of the winning pattern.
    pub winning_pattern: Option<String>,
    /// Index of the item currently playing.
    pub current_item_index: usize,
    /// When the session was created.
    pub created_at: SystemTime,
    /// Last mirrored change.
    pub updated_at: SystemTime,
    /// When the session was completed.
    pub completed_at: Option<SystemTime>,
}

/// Partial update applied to a stored session. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    /// New marked cell set.
    pub marked_cells: Option<Vec<usize>>,
    /// New completion flag.
    pub completed: Option<bool>,
    /// Winning pattern name.
    pub winning_pattern: Option<String>,
    /// New item cursor.
    pub current_item_index: Option<usize>,
    /// Completion time.
    pub completed_at: Option<SystemTime>,
}

impl SessionUpdate {
    /// Update mirroring the full mutable state of `session`.
    pub fn from_session(session: &BingoSession) -> Self {
        Self {
            marked_cells: Some(session.marked.iter().copied().collect()),
            completed: Some(session.is_completed()),
            winning_pattern: session.winning_pattern.map(str::to_string),
            current_item_index: Some(session.current_index),
            completed_at: session.completed_at,
        }
    }

    /// Update that only moves the item cursor.
    pub fn cursor(index: usize) -> Self {
        Self {
            current_item_index: Some(index),
            ..Self::default()
        }
    }

    /// Apply the present fields to `entity` and bump its update time.
    pub fn apply(self, entity: &mut SessionEntity) {
        if let Some(marked) = self.marked_cells {
            entity.marked_cells = marked;
        }
        if let Some(completed) = self.completed {
            entity.completed = completed;
        }
        if let Some(pattern) = self.winning_pattern {
            entity.winning_pattern = Some(pattern);
        }
        if let Some(index) = self.current_item_index {
            entity.current_item_index = index;
        }
        if let Some(completed_at) = self.completed_at {
            entity.completed_at = Some(completed_at);
        }
        entity.updated_at = SystemTime::now();
    }
}

/// Music provider credentials linked to a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialEntity {
    /// Owning user.
    pub user_id: String,
    /// Bearer token for provider API calls.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: String,
    /// Access token expiry.
    pub expires_at: SystemTime,
    /// Granted scopes.
    pub scope: Option<String>,
    /// Last time the record changed.
    pub updated_at: SystemTime,
}

impl CredentialEntity {
    /// Whether the access token expired before `now`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at < now
    }
}

impl From<&CandidateItem> for ItemEntity {
    fn from(item: &CandidateItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            artist: item.artist.clone(),
            duration_ms: item.duration_ms,
            images: item.images.clone(),
        }
    }
}

impl From<&Card> for CardEntity {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            placeholder: card.placeholder,
            items: card.items.iter().map(ItemEntity::from).collect(),
        }
    }
}

impl From<&BingoSession> for SessionEntity {
    fn from(session: &BingoSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id.clone(),
            card: CardEntity::from(session.card.as_ref()),
            marked_cells: session.marked.iter().copied().collect(),
            completed: session.is_completed(),
            winning_pattern: session.winning_pattern.map(str::to_string),
            current_item_index: session.current_index,
            created_at: session.created_at,
            updated_at: SystemTime::now(),
            completed_at: session.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn entity() -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            user_id: "u".into(),
            card: CardEntity {
                id: Uuid::new_v4(),
                placeholder: false,
                items: Vec::new(),
            },
            marked_cells: vec![1, 2],
            completed: false,
            winning_pattern: None,
            current_item_index: 3,
            created_at: SystemTime::UNIX_EPOCH,
            updated_at: SystemTime::UNIX_EPOCH,
            completed_at: None,
        }
    }

    #[test]
    fn cursor_update_touches_only_the_index() {
        let mut stored = entity();
        SessionUpdate::cursor(7).apply(&mut stored);
        assert_eq!(stored.current_item_index, 7);
        assert_eq!(stored.marked_cells, vec![1, 2]);
        assert!(!stored.completed);
        assert!(stored.updated_at > SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn completion_update_records_pattern() {
        let mut stored = entity();
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        SessionUpdate {
            completed: Some(true),
            winning_pattern: Some("Top Row".into()),
            completed_at: Some(at),
            ..SessionUpdate::default()
        }
        .apply(&mut stored);
        assert!(stored.completed);
        assert_eq!(stored.winning_pattern.as_deref(), Some("Top Row"));
        assert_eq!(stored.completed_at, Some(at));
    }

    #[test]
    fn credentials_expire_strictly_before_now() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let mut record = CredentialEntity {
            user_id: "u".into(),
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: now,
            scope: None,
            updated_at: now,
        };
        assert!(!record.is_expired(now));
        record.expires_at = now - Duration::from_secs(1);
        assert!(record.is_expired(now));
    }
}
