use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("unknown deck {0:?} (expected new, again or good)")]
    Unknown(String),
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// Review state bucket a card belongs to.
///
/// - `New`: never graded.
/// - `Again`: in short-interval practice.
/// - `Good`: graduated once its interval reached 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Deck {
    #[default]
    New,
    Again,
    Good,
}

impl Deck {
    /// All decks in overview order.
    pub const ALL: [Deck; 3] = [Deck::New, Deck::Again, Deck::Good];

    /// Human-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Deck::New => "New",
            Deck::Again => "Again",
            Deck::Good => "Good",
        }
    }
}

impl fmt::Display for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deck::New => f.write_str("NEW"),
            Deck::Again => f.write_str("AGAIN"),
            Deck::Good => f.write_str("GOOD"),
        }
    }
}

impl FromStr for Deck {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Deck::New),
            "again" => Ok(Deck::Again),
            "good" => Ok(Deck::Good),
            _ => Err(DeckError::Unknown(s.to_owned())),
        }
    }
}
