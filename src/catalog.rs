//! Read-only reference table of the detectable pattern kinds.
//!
//! The table is a `static` array built at compile time; lookups hand out
//! `&'static` entries, so it is shared freely between threads.

use crate::Direction;

/// The nine pattern kinds the detector can emit
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum PatternKind {
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
    BullishMarubozu,
    BearishMarubozu,
    MorningStar,
    EveningStar,
}

impl PatternKind {
    pub const ALL: [PatternKind; 9] = [
        PatternKind::Doji,
        PatternKind::Hammer,
        PatternKind::ShootingStar,
        PatternKind::BullishEngulfing,
        PatternKind::BearishEngulfing,
        PatternKind::BullishMarubozu,
        PatternKind::BearishMarubozu,
        PatternKind::MorningStar,
        PatternKind::EveningStar,
    ];

    /// Catalog record for this kind
    #[inline]
    pub fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    #[inline]
    pub fn category(self) -> Category {
        self.entry().category
    }

    #[inline]
    pub fn signal(self) -> Direction {
        self.entry().signal
    }

    #[inline]
    pub fn score(self) -> u8 {
        self.entry().score
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a pattern says about the market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Category {
    Indecision,
    BullishReversal,
    BearishReversal,
    StrongBullish,
    StrongBearish,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Indecision => "Indecision",
            Category::BullishReversal => "Bullish Reversal",
            Category::BearishReversal => "Bearish Reversal",
            Category::StrongBullish => "Strong Bullish",
            Category::StrongBearish => "Strong Bearish",
        }
    }
}

/// One row of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CatalogEntry {
    pub kind: PatternKind,
    pub name: &'static str,
    pub category: Category,
    pub signal: Direction,
    pub description: &'static str,
    pub meaning: &'static str,
    pub reliability: &'static str,
    /// Scoring weight: 1 weak, 2 medium, 3 strong
    pub score: u8,
}

// Order must follow the PatternKind discriminants.
static CATALOG: [CatalogEntry; 9] = [
    CatalogEntry {
        kind: PatternKind::Doji,
        name: "Doji",
        category: Category::Indecision,
        signal: Direction::Neutral,
        description: "A Doji represents market indecision. The open and close prices are nearly equal, creating a cross-like appearance.",
        meaning: "Indicates uncertainty and potential reversal. Traders should wait for confirmation before making decisions.",
        reliability: "Medium - Requires confirmation from next candle",
        score: 1,
    },
    CatalogEntry {
        kind: PatternKind::Hammer,
        name: "Hammer",
        category: Category::BullishReversal,
        signal: Direction::Bullish,
        description: "A bullish reversal pattern with a small body at the top and a long lower shadow (at least twice the body size).",
        meaning: "Suggests buyers are stepping in after a decline. Often signals a potential upward reversal, especially after a downtrend.",
        reliability: "High - Strong bullish reversal signal",
        score: 2,
    },
    CatalogEntry {
        kind: PatternKind::ShootingStar,
        name: "Shooting Star",
        category: Category::BearishReversal,
        signal: Direction::Bearish,
        description: "A bearish reversal pattern with a small body at the bottom and a long upper shadow (at least twice the body size).",
        meaning: "Indicates sellers are taking control after an uptrend. Suggests potential downward reversal.",
        reliability: "High - Strong bearish reversal signal",
        score: 2,
    },
    CatalogEntry {
        kind: PatternKind::BullishEngulfing,
        name: "Bullish Engulfing",
        category: Category::BullishReversal,
        signal: Direction::Bullish,
        description: "A two-candle pattern where a large bullish candle completely engulfs the previous bearish candle.",
        meaning: "Shows strong buying pressure overwhelming sellers. Indicates potential trend reversal from bearish to bullish.",
        reliability: "High - Very strong bullish reversal signal",
        score: 3,
    },
    CatalogEntry {
        kind: PatternKind::BearishEngulfing,
        name: "Bearish Engulfing",
        category: Category::BearishReversal,
        signal: Direction::Bearish,
        description: "A two-candle pattern where a large bearish candle completely engulfs the previous bullish candle.",
        meaning: "Shows strong selling pressure overwhelming buyers. Indicates potential trend reversal from bullish to bearish.",
        reliability: "High - Very strong bearish reversal signal",
        score: 3,
    },
    CatalogEntry {
        kind: PatternKind::BullishMarubozu,
        name: "Bullish Marubozu",
        category: Category::StrongBullish,
        signal: Direction::Bullish,
        description: "A strong bullish candle with no shadows - opens at the low and closes at the high.",
        meaning: "Indicates strong buying pressure throughout the session. Suggests continuation of upward momentum.",
        reliability: "Medium - Strong continuation signal",
        score: 2,
    },
    CatalogEntry {
        kind: PatternKind::BearishMarubozu,
        name: "Bearish Marubozu",
        category: Category::StrongBearish,
        signal: Direction::Bearish,
        description: "A strong bearish candle with no shadows - opens at the high and closes at the low.",
        meaning: "Indicates strong selling pressure throughout the session. Suggests continuation of downward momentum.",
        reliability: "Medium - Strong continuation signal",
        score: 2,
    },
    CatalogEntry {
        kind: PatternKind::MorningStar,
        name: "Morning Star",
        category: Category::BullishReversal,
        signal: Direction::Bullish,
        description: "A three-candle bullish reversal pattern: bearish candle, small body (star), then large bullish candle.",
        meaning: "Signals potential reversal from downtrend to uptrend. The 'star' represents indecision before the bullish move.",
        reliability: "High - Strong bullish reversal signal",
        score: 3,
    },
    CatalogEntry {
        kind: PatternKind::EveningStar,
        name: "Evening Star",
        category: Category::BearishReversal,
        signal: Direction::Bearish,
        description: "A three-candle bearish reversal pattern: bullish candle, small body (star), then large bearish candle.",
        meaning: "Signals potential reversal from uptrend to downtrend. The 'star' represents indecision before the bearish move.",
        reliability: "High - Strong bearish reversal signal",
        score: 3,
    },
];

/// Look up a kind's record
#[inline]
pub fn lookup(kind: PatternKind) -> &'static CatalogEntry {
    kind.entry()
}

/// Every catalog row, in kind order
pub fn entries() -> &'static [CatalogEntry] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_kinds() {
        for kind in PatternKind::ALL {
            assert_eq!(lookup(kind).kind, kind);
        }
        assert_eq!(entries().len(), PatternKind::ALL.len());
    }

    #[test]
    fn test_scores_in_range() {
        assert!(entries().iter().all(|e| (1..=3).contains(&e.score)));
        assert_eq!(PatternKind::Doji.score(), 1);
        assert_eq!(PatternKind::MorningStar.score(), 3);
    }

    #[test]
    fn test_signal_matches_category() {
        for e in entries() {
            match e.category {
                Category::Indecision => assert_eq!(e.signal, Direction::Neutral),
                Category::BullishReversal | Category::StrongBullish => {
                    assert_eq!(e.signal, Direction::Bullish)
                }
                Category::BearishReversal | Category::StrongBearish => {
                    assert_eq!(e.signal, Direction::Bearish)
                }
            }
        }
    }

    #[test]
    fn test_reference_texts() {
        let hammer = lookup(PatternKind::Hammer);
        assert_eq!(hammer.reliability, "High - Strong bullish reversal signal");
        assert_eq!(
            lookup(PatternKind::Doji).reliability,
            "Medium - Requires confirmation from next candle"
        );
        assert_eq!(
            lookup(PatternKind::BearishEngulfing).reliability,
            "High - Very strong bearish reversal signal"
        );
        assert!(lookup(PatternKind::EveningStar)
            .meaning
            .starts_with("Signals potential reversal from uptrend to downtrend."));
        assert!(entries().iter().all(|e| e.description.ends_with('.') && e.meaning.ends_with('.')));
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(PatternKind::ShootingStar.to_string(), "Shooting Star");
    }
}
