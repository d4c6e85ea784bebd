use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    bingo::card::{CandidateItem, Card, Cell},
    dto::format_system_time,
    state::session::BingoSession,
};

/// Payload of `POST /games`. The body may be omitted entirely.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateGameRequest {
    /// Deal the placeholder card when no real card can be built. Defaults to `true`.
    #[serde(default)]
    pub allow_fallback: Option<bool>,
}

impl CreateGameRequest {
    /// Whether the placeholder card may be dealt.
    pub fn allow_fallback(&self) -> bool {
        self.allow_fallback.unwrap_or(true)
    }
}

/// Payload of `POST /games/current/advance`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceRequest {
    /// Target item index.
    pub index: usize,
}

/// Track shown on a card cell.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
    pub images: Vec<String>,
}

impl From<&CandidateItem> for ItemSummary {
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

/// One grid position as rendered by clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CellSummary {
    /// Row-major position in `0..25`.
    pub position: usize,
    /// Display label.
    pub label: String,
    /// Whether this is the free center cell.
    pub free: bool,
    /// Item behind a content cell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemSummary>,
}

impl From<&Cell> for CellSummary {
    fn from(cell: &Cell) -> Self {
        Self {
            position: cell.position,
            label: cell.label().to_string(),
            free: cell.is_free(),
            item: cell.item().map(ItemSummary::from),
        }
    }
}

/// A dealt card.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CardSummary {
    pub id: Uuid,
    /// True for the offline placeholder card.
    pub placeholder: bool,
    /// The 25 cells in position order.
    pub cells: Vec<CellSummary>,
}

impl From<&Card> for CardSummary {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            placeholder: card.placeholder,
            cells: card.cells.iter().map(CellSummary::from).collect(),
        }
    }
}

/// Phase of a dealt session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhaseDto {
    Active,
    Completed,
}

/// Full view of the caller's current game.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub card: CardSummary,
    /// Marked positions in ascending order. The free cell is implicit.
    pub marked_cells: Vec<usize>,
    pub phase: SessionPhaseDto,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_pattern: Option<String>,
    pub current_item_index: usize,
    pub item_count: usize,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 completion time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<&BingoSession> for SessionSnapshot {
    fn from(session: &BingoSession) -> Self {
        let phase = if session.is_completed() {
            SessionPhaseDto::Completed
        } else {
            SessionPhaseDto::Active
        };
        Self {
            session_id: session.id,
            card: CardSummary::from(session.card.as_ref()),
            marked_cells: session.marked.iter().copied().collect(),
            phase,
            completed: session.is_completed(),
            winning_pattern: session.winning_pattern.map(str::to_string),
            current_item_index: session.current_index,
            item_count: session.item_count(),
            created_at: format_system_time(session.created_at),
            completed_at: session.completed_at.map(format_system_time),
        }
    }
}
