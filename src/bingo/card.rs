use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{CONTENT_CELLS, FREE_CELL, GRID_CELLS, title::clean_title};

/// Label shown on the free center cell.
pub const FREE_LABEL: &str = "FREE";

/// Track-like item a card cell can hold. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Provider identifier, unique within a pool.
    pub id: String,
    /// Display title as returned by the provider.
    pub title: String,
    /// Primary artist name.
    pub artist: String,
    /// Track duration in milliseconds.
    pub duration_ms: u64,
    /// Artwork URLs, largest first.
    pub images: Vec<String>,
}

/// Content of a single grid position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellKind {
    /// The center cell, always marked and never togglable.
    Free,
    /// A cell bound to one candidate item.
    Content {
        /// Item shown on this cell.
        item: CandidateItem,
        /// Derived `"<artist> - <clean title>"` label.
        label: String,
    },
}

/// One grid position of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Row-major position in `0..25`.
    pub position: usize,
    /// What the cell holds.
    pub kind: CellKind,
}

impl Cell {
    /// Text displayed on the cell.
    pub fn label(&self) -> &str {
        match &self.kind {
            CellKind::Free => FREE_LABEL,
            CellKind::Content { label, .. } => label,
        }
    }

    /// Whether this is the free center cell.
    pub fn is_free(&self) -> bool {
        matches!(self.kind, CellKind::Free)
    }

    /// Item bound to the cell, if any.
    pub fn item(&self) -> Option<&CandidateItem> {
        match &self.kind {
            CellKind::Free => None,
            CellKind::Content { item, .. } => Some(item),
        }
    }
}

/// A generated 5x5 bingo card. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Identifier unique per generation.
    pub id: Uuid,
    /// Exactly 25 cells in position order.
    pub cells: Vec<Cell>,
    /// The 24 items used to fill the content cells, in fill order.
    pub items: Vec<CandidateItem>,
    /// True for the offline placeholder card.
    pub placeholder: bool,
}

impl Card {
    /// Number of playable items on the card.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// Failures raised while building a card.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The pool does not hold enough distinct items to fill every content cell.
    #[error("insufficient pool: need {required} distinct items, got {actual}")]
    InsufficientPool {
        /// Distinct items a card needs.
        required: usize,
        /// Distinct items the pool provided.
        actual: usize,
    },
}

/// Build a card from the first 24 distinct items of `pool`.
///
/// No randomness happens here: callers wanting a shuffled card shuffle the
/// pool first. Items repeating an earlier identifier are skipped.
pub fn generate(pool: &[CandidateItem]) -> Result<Card, GenerationError> {
    let mut seen = HashSet::new();
    let items: Vec<CandidateItem> = pool
        .iter()
        .filter(|item| seen.insert(item.id.as_str()))
        .take(CONTENT_CELLS)
        .cloned()
        .collect();

    if items.len() < CONTENT_CELLS {
        let actual = pool
            .iter()
            .map(|item| item.id.as_str())
            .collect::<HashSet<_>>()
            .len();
        return Err(GenerationError::InsufficientPool {
            required: CONTENT_CELLS,
            actual,
        });
    }

    Ok(build_card(items, false))
}

/// Fixed, de-identified card offered when no pool can be fetched.
pub fn placeholder_card() -> Card {
    let items = (1..=CONTENT_CELLS)
        .map(|n| CandidateItem {
            id: format!("placeholder-{n:02}"),
            title: format!("Song {n}"),
            artist: format!("Artist {n}"),
            duration_ms: 0,
            images: Vec::new(),
        })
        .collect();
    build_card(items, true)
}

/// Display label for a content cell.
pub fn cell_label(item: &CandidateItem) -> String {
    format!("{} - {}", item.artist, clean_title(&item.title))
}

fn build_card(items: Vec<CandidateItem>, placeholder: bool) -> Card {
    let cells = (0..GRID_CELLS)
        .map(|position| {
            let kind = if position == FREE_CELL {
                CellKind::Free
            } else {
                let slot = if position < FREE_CELL {
                    position
                } else {
                    position - 1
                };
                let item = items[slot].clone();
                let label = cell_label(&item);
                CellKind::Content { item, label }
            };
            Cell { position, kind }
        })
        .collect();

    Card {
        id: Uuid::new_v4(),
        cells,
        items,
        placeholder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> CandidateItem {
        CandidateItem {
            id: id.into(),
            title: format!("Title {id} (feat. Guest)"),
            artist: format!("Artist {id}"),
            duration_ms: 200_000,
            images: vec![format!("https://img.example/{id}.jpg")],
        }
    }

    fn pool(count: usize) -> Vec<CandidateItem> {
        (0..count).map(|n| item(&format!("t{n}"))).collect()
    }

    #[test]
    fn free_cell_sits_in_the_center() {
        let card = generate(&pool(24)).unwrap();
        assert_eq!(card.cells.len(), GRID_CELLS);
        assert!(card.cells[FREE_CELL].is_free());
        assert_eq!(card.cells[FREE_CELL].label(), FREE_LABEL);
        assert_eq!(card.cells.iter().filter(|cell| cell.is_free()).count(), 1);
        for (position, cell) in card.cells.iter().enumerate() {
            assert_eq!(cell.position, position);
        }
    }

    #[test]
    fn content_cells_follow_skip_order() {
        let pool = pool(30);
        let card = generate(&pool).unwrap();
        assert_eq!(card.items, pool[..24].to_vec());
        for k in 0..24 {
            let position = if k < 12 { k } else { k + 1 };
            assert_eq!(card.cells[position].item(), Some(&pool[k]));
        }
    }

    #[test]
    fn labels_use_artist_and_clean_title() {
        let card = generate(&pool(24)).unwrap();
        assert_eq!(card.cells[0].label(), "Artist t0 - Title t0");
        assert_eq!(card.cells[13].label(), "Artist t12 - Title t12");
        assert!(card.cells.iter().all(|cell| !cell.label().is_empty()));
    }

    #[test]
    fn duplicates_are_skipped_and_counted_once() {
        let mut items = pool(23);
        items.insert(5, item("t0"));
        let err = generate(&items).unwrap_err();
        assert_eq!(
            err,
            GenerationError::InsufficientPool {
                required: 24,
                actual: 23
            }
        );

        items.push(item("t99"));
        let card = generate(&items).unwrap();
        let ids: HashSet<_> = card.items.iter().map(|item| item.id.clone()).collect();
        assert_eq!(ids.len(), 24);
        assert_eq!(card.items[23].id, "t99");
    }

    #[test]
    fn small_pool_is_rejected() {
        assert_eq!(
            generate(&[]).unwrap_err(),
            GenerationError::InsufficientPool {
                required: 24,
                actual: 0
            }
        );
    }

    #[test]
    fn pool_is_left_untouched_and_ids_are_fresh() {
        let pool = pool(24);
        let snapshot = pool.clone();
        let first = generate(&pool).unwrap();
        let second = generate(&pool).unwrap();
        assert_eq!(pool, snapshot);
        assert_ne!(first.id, second.id);
        assert!(!first.placeholder);
    }

    #[test]
    fn placeholder_card_is_complete() {
        let card = placeholder_card();
        assert!(card.placeholder);
        assert_eq!(card.item_count(), 24);
        assert_eq!(card.cells[0].label(), "Artist 1 - Song 1");
        assert_eq!(card.cells[24].label(), "Artist 24 - Song 24");
    }
}
