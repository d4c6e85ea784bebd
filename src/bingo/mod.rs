//! Bingo engine: pattern catalog, win evaluation, title cleaning and card generation.

/// Card model and generator.
pub mod card;
/// Winning pattern catalog and evaluator.
pub mod patterns;
/// Display title cleaning.
pub mod title;

/// Number of cells on a card (5x5, row-major).
pub const GRID_CELLS: usize = 25;
/// Position of the always-marked free cell.
pub const FREE_CELL: usize = 12;
/// Number of content cells, i.e. items a card consumes from its pool.
pub const CONTENT_CELLS: usize = GRID_CELLS - 1;
