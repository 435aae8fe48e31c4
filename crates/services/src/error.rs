//! Shared error types for the services crate.

use thiserror::Error;

use memorizer_core::model::Deck;
use storage::repository::StorageError;

use crate::session::AnswerOutcome;

/// Errors emitted by a `TrackSource`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackSourceError {
    #[error("playlist {0} not found")]
    NotFound(String),
    #[error("track source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed track listing: {0}")]
    Malformed(String),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("deck {0} has no cards to review")]
    EmptyDeck(Deck),
    #[error(transparent)]
    TrackSource(#[from] TrackSourceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The grade was applied in memory but the new state could not be written.
    #[error("answer was applied but not saved: {source}")]
    AnswerNotSaved {
        outcome: Box<AnswerOutcome>,
        source: StorageError,
    },
}
