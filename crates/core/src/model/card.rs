use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{deck::Deck, ids::TrackId};
use crate::playback::CLIP_LENGTH_MS;
use crate::scheduler::{INITIAL_EASINESS, MIN_EASINESS};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CardError {
    #[error("track id cannot be empty")]
    EmptyId,

    #[error("track {0} has no artwork")]
    MissingArtwork(TrackId),

    #[error("clip start {start}ms is outside the playable range of a {duration}ms track")]
    ClipStartOutOfRange { start: u64, duration: u64 },

    #[error("easiness must be finite and at least 1.3, got {0}")]
    InvalidEasiness(f64),
}

//
// ─── TRACK DESCRIPTOR ──────────────────────────────────────────────────────────
//

/// A track as delivered by the track source, before it becomes a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    pub id: TrackId,
    #[serde(default)]
    pub artwork_url: Option<String>,
    pub duration_ms: u64,
}

impl TrackDescriptor {
    #[must_use]
    pub fn new(id: impl Into<TrackId>, artwork_url: Option<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            artwork_url,
            duration_ms,
        }
    }

    /// Artwork URL, if present and non-blank.
    #[must_use]
    pub fn artwork(&self) -> Option<&str> {
        self.artwork_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

//
// ─── REVIEW STATE ──────────────────────────────────────────────────────────────
//

/// Scheduling fields of a card; the part the scheduler rewrites on each grade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewState {
    pub easiness: f64,
    pub interval: u32,
    /// Milliseconds since the Unix epoch.
    pub next_due: i64,
    pub deck: Deck,
    pub reps: u32,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            easiness: INITIAL_EASINESS,
            interval: 0,
            next_due: 0,
            deck: Deck::New,
            reps: 0,
        }
    }
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// Valid clip start offsets for a track of the given duration.
///
/// Empty when the track is no longer than one clip.
#[must_use]
pub fn clip_start_range(duration_ms: u64) -> Range<u64> {
    0..duration_ms.saturating_sub(CLIP_LENGTH_MS)
}

/// Scheduling record for one reviewable track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    id: TrackId,
    artwork_url: String,
    duration_ms: u64,
    easiness: f64,
    interval: u32,
    next_due: i64,
    deck: Deck,
    reps: u32,
    playback_start_position: u64,
}

impl Card {
    /// Creates a fresh card in the `NEW` deck.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyId` for a blank id and
    /// `CardError::ClipStartOutOfRange` if the start offset leaves no room for a full clip.
    pub fn new(
        id: TrackId,
        artwork_url: impl Into<String>,
        duration_ms: u64,
        playback_start_position: u64,
    ) -> Result<Self, CardError> {
        Self::from_persisted(
            id,
            artwork_url,
            duration_ms,
            playback_start_position,
            ReviewState::default(),
        )
    }

    /// Creates a fresh card from a track descriptor.
    ///
    /// # Errors
    ///
    /// Returns `CardError::MissingArtwork` when the track has no artwork, plus the errors of
    /// [`Card::new`].
    pub fn from_track(
        track: &TrackDescriptor,
        playback_start_position: u64,
    ) -> Result<Self, CardError> {
        let artwork = track
            .artwork()
            .ok_or_else(|| CardError::MissingArtwork(track.id.clone()))?;
        Self::new(
            track.id.clone(),
            artwork,
            track.duration_ms,
            playback_start_position,
        )
    }

    /// Rehydrates a card with an existing scheduling state.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if any field violates the card invariants.
    pub fn from_persisted(
        id: TrackId,
        artwork_url: impl Into<String>,
        duration_ms: u64,
        playback_start_position: u64,
        state: ReviewState,
    ) -> Result<Self, CardError> {
        let card = Self {
            id,
            artwork_url: artwork_url.into(),
            duration_ms,
            easiness: state.easiness,
            interval: state.interval,
            next_due: state.next_due,
            deck: state.deck,
            reps: state.reps,
            playback_start_position,
        };
        card.validate()?;
        Ok(card)
    }

    /// Checks the card invariants. Deserialized cards must pass this before use.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), CardError> {
        if self.id.is_blank() {
            return Err(CardError::EmptyId);
        }
        if !self.easiness.is_finite() || self.easiness < MIN_EASINESS {
            return Err(CardError::InvalidEasiness(self.easiness));
        }
        let range = clip_start_range(self.duration_ms);
        let start_ok = if range.is_empty() {
            self.playback_start_position == 0
        } else {
            range.contains(&self.playback_start_position)
        };
        if !start_ok {
            return Err(CardError::ClipStartOutOfRange {
                start: self.playback_start_position,
                duration: self.duration_ms,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &TrackId {
        &self.id
    }

    #[must_use]
    pub fn artwork_url(&self) -> &str {
        &self.artwork_url
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    #[must_use]
    pub fn easiness(&self) -> f64 {
        self.easiness
    }

    #[must_use]
    pub fn interval(&self) -> u32 {
        self.interval
    }

    #[must_use]
    pub fn next_due(&self) -> i64 {
        self.next_due
    }

    #[must_use]
    pub fn deck(&self) -> Deck {
        self.deck
    }

    #[must_use]
    pub fn reps(&self) -> u32 {
        self.reps
    }

    #[must_use]
    pub fn playback_start_position(&self) -> u64 {
        self.playback_start_position
    }

    /// True once `now_ms` has reached the card's due time.
    #[must_use]
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.next_due <= now_ms
    }

    #[must_use]
    pub fn review_state(&self) -> ReviewState {
        ReviewState {
            easiness: self.easiness,
            interval: self.interval,
            next_due: self.next_due,
            deck: self.deck,
            reps: self.reps,
        }
    }

    /// Returns a copy carrying the given scheduling state. Identity and clip fields are kept.
    pub(crate) fn with_review_state(&self, state: ReviewState) -> Self {
        Self {
            easiness: state.easiness,
            interval: state.interval,
            next_due: state.next_due,
            deck: state.deck,
            reps: state.reps,
            ..self.clone()
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
