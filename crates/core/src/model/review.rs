use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::TrackId;

//
// ─── REVIEW GRADE ─────────────────────────────────────────────────────────────
//

/// Two-button rating for a clip review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewGrade {
    /// Did not recognise the track. Card is due again immediately.
    Again,
    /// Recognised the track. Interval grows by the card's easiness.
    Good,
}

impl ReviewGrade {
    /// Maps the "was it good?" answer onto a grade.
    #[must_use]
    pub fn from_is_good(is_good: bool) -> Self {
        if is_good { Self::Good } else { Self::Again }
    }

    #[must_use]
    pub fn is_good(self) -> bool {
        matches!(self, Self::Good)
    }
}

impl fmt::Display for ReviewGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewGrade::Again => f.write_str("again"),
            ReviewGrade::Good => f.write_str("good"),
        }
    }
}

//
// ─── REVIEW LOG ───────────────────────────────────────────────────────────────
//

/// Record of a single grading event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLog {
    pub card_id: TrackId,
    pub reviewed_at: DateTime<Utc>,
    pub grade: ReviewGrade,
}

impl ReviewLog {
    #[must_use]
    pub fn new(card_id: TrackId, grade: ReviewGrade, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            card_id,
            reviewed_at,
            grade,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
