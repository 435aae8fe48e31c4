use chrono::{DateTime, Utc};

use crate::model::{Card, Deck, ReviewGrade, ReviewLog, ReviewState};

//
// ─── CONSTANTS ─────────────────────────────────────────────────────────────────
//

/// Ease factor given to freshly loaded cards.
pub const INITIAL_EASINESS: f64 = 2.5;

/// Easiness never drops below this floor.
pub const MIN_EASINESS: f64 = 1.3;

/// Easiness lost on an "Again" grade.
pub const AGAIN_EASINESS_PENALTY: f64 = 0.2;

/// Easiness gained on a "Good" grade.
pub const GOOD_EASINESS_BONUS: f64 = 0.1;

/// A card graduates to the `GOOD` deck once its interval reaches this many days.
pub const GRADUATION_INTERVAL_DAYS: u32 = 30;

pub const MILLIS_PER_DAY: i64 = 86_400_000;

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Outcome of applying a grade: the rescheduled card and its log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedReview {
    pub card: Card,
    pub log: ReviewLog,
}

/// Two-parameter SM-2 variant (easiness + interval) with Again/Good grades.
///
/// # Transitions
///
/// - Again: easiness drops by 0.2 (floored at 1.3), interval resets to 1 day,
///   the card lands in `AGAIN` and is due immediately.
/// - Good: easiness grows by 0.1, interval becomes `ceil(interval * easiness)`
///   (at least 1), and the card graduates to `GOOD` once that reaches 30 days.
///
/// Both grades bump `reps`. There is no terminal state: a graduated card graded
/// "Again" is demoted back to `AGAIN`.
///
/// # Examples
///
/// ```
/// # use memorizer_core::model::{Card, Deck, ReviewGrade, TrackId};
/// # use memorizer_core::scheduler::Scheduler;
/// let card = Card::new(TrackId::new("t1"), "https://img", 200_000, 0)?;
/// let next = Scheduler::new().next_state(&card.review_state(), ReviewGrade::Good, 0);
///
/// assert_eq!(next.interval, 1);
/// assert_eq!(next.deck, Deck::Again);
/// # Ok::<(), memorizer_core::model::CardError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Computes the scheduling state that follows `state` after `grade` at `now_ms`.
    #[must_use]
    pub fn next_state(&self, state: &ReviewState, grade: ReviewGrade, now_ms: i64) -> ReviewState {
        let reps = state.reps.saturating_add(1);

        match grade {
            ReviewGrade::Again => ReviewState {
                easiness: (state.easiness - AGAIN_EASINESS_PENALTY).max(MIN_EASINESS),
                interval: 1,
                next_due: now_ms,
                deck: Deck::Again,
                reps,
            },
            ReviewGrade::Good => {
                let easiness = (state.easiness + GOOD_EASINESS_BONUS).max(MIN_EASINESS);
                let interval = grown_interval(state.interval, easiness);
                let deck = if interval >= GRADUATION_INTERVAL_DAYS {
                    Deck::Good
                } else {
                    Deck::Again
                };
                let next_due =
                    now_ms.saturating_add(i64::from(interval).saturating_mul(MILLIS_PER_DAY));

                ReviewState {
                    easiness,
                    interval,
                    next_due,
                    deck,
                    reps,
                }
            }
        }
    }

    /// Grades `card` at `reviewed_at`, returning the new card value and a log entry.
    ///
    /// The input card is left untouched.
    #[must_use]
    pub fn apply_review(
        &self,
        card: &Card,
        grade: ReviewGrade,
        reviewed_at: DateTime<Utc>,
    ) -> AppliedReview {
        let next = self.next_state(&card.review_state(), grade, reviewed_at.timestamp_millis());

        AppliedReview {
            card: card.with_review_state(next),
            log: ReviewLog::new(card.id().clone(), grade, reviewed_at),
        }
    }
}

/// `ceil(interval * easiness)`, or 1 when that product is zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grown_interval(interval: u32, easiness: f64) -> u32 {
    let product = (f64::from(interval) * easiness).ceil();
    if product <= 0.0 {
        1
    } else if product >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        product as u32
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
