use std::collections::BTreeSet;

use serde::Deserialize;

use super::FREE_CELL;

/// A named winning shape expressed as fixed cell positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    /// Human readable name reported when the pattern wins.
    pub name: &'static str,
    /// Row-major cell positions that must all be marked.
    pub cells: &'static [usize],
}

const fn pattern(name: &'static str, cells: &'static [usize]) -> Pattern {
    Pattern { name, cells }
}

const BASE_PATTERNS: [Pattern; 13] = [
    pattern("Top Row", &[0, 1, 2, 3, 4]),
    pattern("Second Row", &[5, 6, 7, 8, 9]),
    pattern("Third Row", &[10, 11, 12, 13, 14]),
    pattern("Fourth Row", &[15, 16, 17, 18, 19]),
    pattern("Bottom Row", &[20, 21, 22, 23, 24]),
    pattern("Left Column", &[0, 5, 10, 15, 20]),
    pattern("Second Column", &[1, 6, 11, 16, 21]),
    pattern("Third Column", &[2, 7, 12, 17, 22]),
    pattern("Fourth Column", &[3, 8, 13, 18, 23]),
    pattern("Right Column", &[4, 9, 14, 19, 24]),
    pattern("Main Diagonal", &[0, 6, 12, 18, 24]),
    pattern("Anti Diagonal", &[4, 8, 12, 16, 20]),
    pattern("Four Corners", &[0, 4, 20, 24]),
];

const EXTENDED_PATTERNS: [Pattern; 15] = [
    BASE_PATTERNS[0],
    BASE_PATTERNS[1],
    BASE_PATTERNS[2],
    BASE_PATTERNS[3],
    BASE_PATTERNS[4],
    BASE_PATTERNS[5],
    BASE_PATTERNS[6],
    BASE_PATTERNS[7],
    BASE_PATTERNS[8],
    BASE_PATTERNS[9],
    BASE_PATTERNS[10],
    BASE_PATTERNS[11],
    BASE_PATTERNS[12],
    pattern("Center Cross", &[2, 6, 12, 18, 22]),
    // Same cells as "Third Row", which always wins first.
    pattern("Middle Row", &[10, 11, 12, 13, 14]),
];

/// Which catalog the server evaluates cards against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternVariant {
    /// Rows, columns, diagonals and four corners.
    #[default]
    Base,
    /// Base catalog plus the center cross and middle row shapes.
    Extended,
}

/// Ordered, immutable list of winning patterns.
///
/// Declaration order is the tie-break: when several patterns are satisfied at
/// once, the first one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternCatalog {
    patterns: &'static [Pattern],
}

/// The 13-pattern catalog.
pub static BASE_CATALOG: PatternCatalog = PatternCatalog {
    patterns: &BASE_PATTERNS,
};

/// The 15-pattern catalog.
pub static EXTENDED_CATALOG: PatternCatalog = PatternCatalog {
    patterns: &EXTENDED_PATTERNS,
};

impl PatternCatalog {
    /// Resolve the static catalog for a configured variant.
    pub fn for_variant(variant: PatternVariant) -> &'static PatternCatalog {
        match variant {
            PatternVariant::Base => &BASE_CATALOG,
            PatternVariant::Extended => &EXTENDED_CATALOG,
        }
    }

    /// Patterns in evaluation order.
    pub fn patterns(&self) -> &'static [Pattern] {
        self.patterns
    }

    /// Return the name of the first satisfied pattern, if any.
    ///
    /// The free cell counts as marked whether or not it appears in `marked`.
    pub fn evaluate(&self, marked: &BTreeSet<usize>) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|pattern| {
                pattern
                    .cells
                    .iter()
                    .all(|cell| *cell == FREE_CELL || marked.contains(cell))
            })
            .map(|pattern| pattern.name)
    }
}
