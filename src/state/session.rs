use std::{collections::BTreeSet, sync::Arc, time::SystemTime};

use thiserror::Error;
use uuid::Uuid;

use crate::bingo::{
    FREE_CELL, GRID_CELLS,
    card::Card,
    patterns::PatternCatalog,
};

/// Lifecycle of a player's game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No card has been dealt yet.
    Fresh,
    /// A card is in play and no pattern has been completed.
    Active,
    /// A pattern was completed. Terminal until a new game starts.
    Completed,
}

/// Errors raised by session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The operation needs a dealt card.
    #[error("no active session")]
    NoActiveSession,
    /// Cell index outside the 5x5 grid.
    #[error("cell {index} is outside the card")]
    CellOutOfRange {
        /// Rejected cell index.
        index: usize,
    },
    /// Item index outside the card's item list.
    #[error("item index {index} out of range (card has {item_count} items)")]
    IndexOutOfRange {
        /// Rejected item index.
        index: usize,
        /// Number of items on the card.
        item_count: usize,
    },
}

/// Effect of a toggle on the marked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Nothing changed (free cell, or the session is completed).
    Unchanged,
    /// The cell was added to the marked set.
    Marked,
    /// The cell was removed from the marked set.
    Unmarked,
    /// The cell was marked and completed the named pattern.
    Completed(&'static str),
}

/// One player's game against one card.
#[derive(Debug, Clone)]
pub struct BingoSession {
    /// Session identifier.
    pub id: Uuid,
    /// Opaque identifier of the owning user.
    pub user_id: String,
    /// Card the session plays against.
    pub card: Arc<Card>,
    /// Marked cell positions. The free cell is implicit.
    pub marked: BTreeSet<usize>,
    /// Name of the winning pattern once completed.
    pub winning_pattern: Option<&'static str>,
    /// Index of the item currently playing.
    pub current_index: usize,
    /// When the card was dealt.
    pub created_at: SystemTime,
    /// When the session was completed.
    pub completed_at: Option<SystemTime>,
}

impl BingoSession {
    /// Whether a pattern has been completed.
    pub fn is_completed(&self) -> bool {
        self.winning_pattern.is_some()
    }

    /// Number of items the cursor can point at.
    pub fn item_count(&self) -> usize {
        self.card.item_count()
    }
}

/// Owns a player's marked cells, completion status and item cursor.
///
/// Completion is monotonic: once a pattern wins, toggles are ignored until
/// [`SessionStateMachine::start`] deals a new card.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    catalog: &'static PatternCatalog,
    session: Option<BingoSession>,
}

impl SessionStateMachine {
    /// Create a state machine in the `Fresh` phase.
    pub fn new(catalog: &'static PatternCatalog) -> Self {
        Self {
            catalog,
            session: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        match &self.session {
            None => SessionPhase::Fresh,
            Some(session) if session.is_completed() => SessionPhase::Completed,
            Some(_) => SessionPhase::Active,
        }
    }

    /// Current session, if a card has been dealt.
    pub fn session(&self) -> Option<&BingoSession> {
        self.session.as_ref()
    }

    /// Deal `card`, abandoning any previous session.
    pub fn start(&mut self, id: Uuid, user_id: String, card: Arc<Card>) -> &BingoSession {
        self.session.insert(BingoSession {
            id,
            user_id,
            card,
            marked: BTreeSet::new(),
            winning_pattern: None,
            current_index: 0,
            created_at: SystemTime::now(),
            completed_at: None,
        })
    }

    /// Flip the marked state of `index` and evaluate the card.
    pub fn toggle_cell(&mut self, index: usize) -> Result<ToggleOutcome, SessionError> {
        let catalog = self.catalog;
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;

        if index >= GRID_CELLS {
            return Err(SessionError::CellOutOfRange { index });
        }
        if session.is_completed() || index == FREE_CELL {
            return Ok(ToggleOutcome::Unchanged);
        }

        if !session.marked.insert(index) {
            session.marked.remove(&index);
            return Ok(ToggleOutcome::Unmarked);
        }

        match catalog.evaluate(&session.marked) {
            Some(pattern) => {
                session.winning_pattern = Some(pattern);
                session.completed_at = Some(SystemTime::now());
                Ok(ToggleOutcome::Completed(pattern))
            }
            None => Ok(ToggleOutcome::Marked),
        }
    }

    /// Move the item cursor. Allowed while active or completed.
    pub fn advance_to(&mut self, index: usize) -> Result<(), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NoActiveSession)?;
        let item_count = session.item_count();
        if index >= item_count {
            return Err(SessionError::IndexOutOfRange { index, item_count });
        }
        session.current_index = index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bingo::{
        card::{CandidateItem, generate},
        patterns::BASE_CATALOG,
    };

    fn card(items: usize) -> Arc<Card> {
        let pool: Vec<_> = (0..items.max(24))
            .map(|n| CandidateItem {
                id: format!("track-{n}"),
                title: format!("Song {n}"),
                artist: "Band".into(),
                duration_ms: 180_000,
                images: Vec::new(),
            })
            .collect();
        Arc::new(generate(&pool).unwrap())
    }

    fn started() -> SessionStateMachine {
        let mut sm = SessionStateMachine::new(&BASE_CATALOG);
        sm.start(Uuid::new_v4(), "user-1".into(), card(24));
        sm
    }

    #[test]
    fn starts_fresh() {
        let sm = SessionStateMachine::new(&BASE_CATALOG);
        assert_eq!(sm.phase(), SessionPhase::Fresh);
        assert!(sm.session().is_none());
    }

    #[test]
    fn operations_need_a_card() {
        let mut sm = SessionStateMachine::new(&BASE_CATALOG);
        assert_eq!(sm.toggle_cell(0), Err(SessionError::NoActiveSession));
        assert_eq!(sm.advance_to(0), Err(SessionError::NoActiveSession));
    }

    #[test]
    fn start_resets_marks_and_cursor() {
        let mut sm = started();
        sm.toggle_cell(3).unwrap();
        sm.advance_to(7).unwrap();

        sm.start(Uuid::new_v4(), "user-1".into(), card(24));
        let session = sm.session().unwrap();
        assert_eq!(sm.phase(), SessionPhase::Active);
        assert!(session.marked.is_empty());
        assert_eq!(session.current_index, 0);
    }

    #[test]
    fn toggle_is_its_own_inverse() {
        let mut sm = started();
        sm.toggle_cell(7).unwrap();
        for index in [0, 7, 19, 24] {
            let before = sm.session().unwrap().marked.contains(&index);
            sm.toggle_cell(index).unwrap();
            sm.toggle_cell(index).unwrap();
            assert_eq!(sm.session().unwrap().marked.contains(&index), before);
        }
        assert_eq!(sm.phase(), SessionPhase::Active);
    }

    #[test]
    fn free_cell_is_not_togglable() {
        let mut sm = started();
        assert_eq!(sm.toggle_cell(FREE_CELL), Ok(ToggleOutcome::Unchanged));
        assert!(sm.session().unwrap().marked.is_empty());
    }

    #[test]
    fn out_of_grid_cell_is_rejected() {
        let mut sm = started();
        assert_eq!(
            sm.toggle_cell(25),
            Err(SessionError::CellOutOfRange { index: 25 })
        );
    }

    #[test]
    fn completing_a_row_is_terminal() {
        let mut sm = started();
        for index in [0, 1, 2, 3] {
            assert_eq!(sm.toggle_cell(index), Ok(ToggleOutcome::Marked));
        }
        assert_eq!(sm.phase(), SessionPhase::Active);

        assert_eq!(sm.toggle_cell(4), Ok(ToggleOutcome::Completed("Top Row")));
        assert_eq!(sm.phase(), SessionPhase::Completed);

        let before = sm.session().unwrap().clone();
        assert_eq!(sm.toggle_cell(4), Ok(ToggleOutcome::Unchanged));
        assert_eq!(sm.toggle_cell(10), Ok(ToggleOutcome::Unchanged));
        let after = sm.session().unwrap();
        assert_eq!(after.marked, before.marked);
        assert_eq!(after.winning_pattern, Some("Top Row"));
        assert_eq!(after.completed_at, before.completed_at);
    }

    #[test]
    fn advance_is_bounded_and_keeps_state_on_error() {
        let mut sm = started();
        sm.advance_to(23).unwrap();
        assert_eq!(
            sm.advance_to(24),
            Err(SessionError::IndexOutOfRange {
                index: 24,
                item_count: 24
            })
        );
        assert_eq!(sm.session().unwrap().current_index, 23);
    }

    #[test]
    fn advance_still_works_after_completion() {
        let mut sm = started();
        for index in [0, 4, 20, 24] {
            sm.toggle_cell(index).unwrap();
        }
        assert_eq!(sm.phase(), SessionPhase::Completed);
        sm.advance_to(5).unwrap();
        assert_eq!(sm.session().unwrap().current_index, 5);
        assert_eq!(sm.phase(), SessionPhase::Completed);
    }

    #[test]
    fn start_leaves_completed_phase() {
        let mut sm = started();
        for index in [0, 1, 2, 3, 4] {
            sm.toggle_cell(index).unwrap();
        }
        sm.start(Uuid::new_v4(), "user-1".into(), card(24));
        assert_eq!(sm.phase(), SessionPhase::Active);
    }
}
