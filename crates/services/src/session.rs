use std::sync::Arc;

use rand::Rng;

use memorizer_core::classifier::DeckCounts;
use memorizer_core::model::{Card, Deck, ReviewGrade, ReviewLog, TrackDescriptor};
use memorizer_core::queue::QueueProgress;
use memorizer_core::session::SessionStore;
use storage::repository::{STORAGE_KEY, SessionStateRepository, StorageError};

use crate::Clock;
use crate::diagnostics::DiagnosticLog;
use crate::error::SessionError;
use crate::tracks::{TrackSource, cards_from_tracks};

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// Counts shown on the deck-selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckOverview {
    pub counts: DeckCounts,
    pub active_deck: Option<Deck>,
    pub total_cards: usize,
}

/// Presentation-agnostic snapshot of the review screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewView {
    pub deck: Deck,
    pub current: Card,
    /// Next card in the queue; its track can be pre-loaded.
    pub upcoming: Option<Card>,
    pub progress: QueueProgress,
    pub is_playing: bool,
    pub playback_percent: f64,
}

/// Result of answering the current card.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub card: Card,
    pub log: ReviewLog,
    /// The queue ran out; the caller should go back to the deck overview.
    pub deck_complete: bool,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Session store bound to a storage backend.
///
/// The snapshot is read once by [`PersistentSession::hydrate`] and written after every
/// committed mutation. Playback flags are never written.
pub struct PersistentSession {
    store: SessionStore,
    repo: Arc<dyn SessionStateRepository>,
    key: String,
    diagnostics: DiagnosticLog,
}

impl PersistentSession {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn SessionStateRepository>) -> Self {
        Self {
            store: SessionStore::new(clock),
            repo,
            key: STORAGE_KEY.to_owned(),
            diagnostics: DiagnosticLog::new(),
        }
    }

    /// Use a different storage key, e.g. to keep several profiles in one database.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Mutable clock access, mainly to advance fixed clocks in tests.
    pub fn clock_mut(&mut self) -> &mut Clock {
        self.store.clock_mut()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.store.has_hydrated()
    }

    /// Read the stored session back and raise the hydration flag.
    ///
    /// Only the first call does anything. A stored record that cannot be decoded or
    /// restored is reported to the diagnostic log and the session starts empty.
    /// Returns whether a stored session was restored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the backend cannot be reached.
    pub async fn hydrate(&mut self) -> Result<bool, SessionError> {
        if self.store.has_hydrated() {
            return Ok(false);
        }

        let restored = match self.repo.load_state(&self.key).await {
            Ok(Some(snapshot)) => match self.store.restore(snapshot) {
                Ok(()) => true,
                Err(err) => {
                    self.report_error(format!("Discarding stored session: {err}"));
                    false
                }
            },
            Ok(None) => false,
            Err(err @ (StorageError::Serialization(_) | StorageError::UnsupportedVersion { .. })) => {
                self.report_error(format!("Discarding stored session: {err}"));
                false
            }
            Err(err) => return Err(err.into()),
        };

        self.store.mark_hydrated();
        if restored {
            let count = self.store.cards().len();
            self.report_info(format!("Restored session with {count} cards"));
        }
        Ok(restored)
    }

    /// Fetch a playlist and replace the card set with fresh cards made from it.
    ///
    /// Returns the number of cards loaded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::TrackSource` if the playlist cannot be fetched and
    /// `SessionError::Storage` if the new state cannot be persisted.
    pub async fn load_tracks(
        &mut self,
        source: &dyn TrackSource,
        playlist_id: &str,
    ) -> Result<usize, SessionError> {
        let tracks = self.fetch(source, playlist_id).await?;
        let cards = cards_from_tracks(&tracks, &mut rand::rng());
        self.commit_load(tracks.len(), cards).await
    }

    /// Like [`PersistentSession::load_tracks`], drawing clip starts from `rng`.
    ///
    /// # Errors
    ///
    /// See [`PersistentSession::load_tracks`].
    pub async fn load_tracks_with_rng<R: Rng + ?Sized>(
        &mut self,
        source: &dyn TrackSource,
        playlist_id: &str,
        rng: &mut R,
    ) -> Result<usize, SessionError> {
        let tracks = self.fetch(source, playlist_id).await?;
        let cards = cards_from_tracks(&tracks, rng);
        self.commit_load(tracks.len(), cards).await
    }

    async fn fetch(
        &mut self,
        source: &dyn TrackSource,
        playlist_id: &str,
    ) -> Result<Vec<TrackDescriptor>, SessionError> {
        self.report_info(format!("Fetching tracks for playlist {playlist_id}"));
        match source.fetch_tracks(playlist_id).await {
            Ok(tracks) => Ok(tracks),
            Err(err) => {
                self.report_error(format!("Failed to fetch tracks: {err}"));
                Err(err.into())
            }
        }
    }

    async fn commit_load(&mut self, fetched: usize, cards: Vec<Card>) -> Result<usize, SessionError> {
        let skipped = fetched.saturating_sub(cards.len());
        if skipped > 0 {
            self.report_info(format!("Skipped {skipped} tracks without artwork"));
        }
        self.store.load(cards);
        let loaded = self.store.cards().len();
        self.flush().await?;
        self.report_success(format!("Loaded {loaded} tracks"));
        Ok(loaded)
    }

    /// Replace the card set with `cards` directly.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the new state cannot be persisted.
    pub async fn load_cards(&mut self, cards: Vec<Card>) -> Result<(), SessionError> {
        self.store.load(cards);
        self.flush().await
    }

    /// Select a deck to review, or return to the overview with `None`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyDeck` when the deck has no eligible cards and
    /// `SessionError::Storage` if the new state cannot be persisted.
    pub async fn select_deck(&mut self, deck: Option<Deck>) -> Result<(), SessionError> {
        if let Some(deck) = deck {
            if !self.store.deck_counts().is_selectable(deck) {
                return Err(SessionError::EmptyDeck(deck));
            }
        }
        self.store.select_deck(deck);
        if let Some(deck) = deck {
            let size = self.store.queue().len();
            self.report_info(format!("Reviewing {deck} deck with {size} cards"));
        }
        self.flush().await
    }

    /// Re-snapshot the queue of the active deck.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the new state cannot be persisted.
    pub async fn refill_queue(&mut self) -> Result<(), SessionError> {
        self.store.refill_queue();
        self.flush().await
    }

    /// Grade the current card.
    ///
    /// Returns `None` when there is no current card; nothing is written in that case.
    /// When the grade empties the queue the review is over; the active deck is kept so
    /// the overview can still point at it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AnswerNotSaved`, carrying the outcome, if the graded state
    /// cannot be persisted.
    pub async fn answer(&mut self, grade: ReviewGrade) -> Result<Option<AnswerOutcome>, SessionError> {
        let Some(outcome) = self.store.grade(grade) else {
            return Ok(None);
        };

        self.report_info(format!(
            "Answered {} as {grade}, next deck {}",
            outcome.card.id(),
            outcome.card.deck()
        ));
        if outcome.queue_exhausted {
            self.report_info("Review queue is empty, returning to deck overview.");
            self.report_success("Deck complete! Returning to overview.");
        }

        let outcome = AnswerOutcome {
            card: outcome.card,
            log: outcome.log,
            deck_complete: outcome.queue_exhausted,
        };
        match self.flush().await {
            Ok(()) => Ok(Some(outcome)),
            Err(SessionError::Storage(source)) => Err(SessionError::AnswerNotSaved {
                outcome: Box::new(outcome),
                source,
            }),
            Err(err) => Err(err),
        }
    }

    /// Record the playing flag reported by the playback device. Not persisted.
    pub fn set_playing(&mut self, is_playing: bool) {
        self.store.set_playing(is_playing);
    }

    /// Stop playback once the clip window has elapsed. Returns true if it did.
    pub fn pause_if_clip_finished(&mut self) -> bool {
        if !self.store.clip_finished() {
            return false;
        }
        self.store.set_playing(false);
        true
    }

    /// Drop the stored record and reset the session. Hydration stays raised.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the record cannot be removed.
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        self.repo.clear_state(&self.key).await?;
        self.store.reset();
        self.report_info("Cleared stored session");
        Ok(())
    }

    /// Per-deck counts, or `None` until the session has been hydrated.
    #[must_use]
    pub fn deck_overview(&self) -> Option<DeckOverview> {
        self.store.has_hydrated().then(|| DeckOverview {
            counts: self.store.deck_counts(),
            active_deck: self.store.active_deck(),
            total_cards: self.store.cards().len(),
        })
    }

    /// The review screen, if a deck is active and a card is queued.
    #[must_use]
    pub fn review_view(&self) -> Option<ReviewView> {
        let deck = self.store.active_deck()?;
        let current = self.store.current_card()?.clone();
        let playback = self.store.playback();
        Some(ReviewView {
            deck,
            current,
            upcoming: self.store.upcoming_card().cloned(),
            progress: self.store.progress(),
            is_playing: playback.is_playing(),
            playback_percent: self.store.playback_progress(),
        })
    }

    /// Write the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the backend rejects the write.
    pub async fn flush(&mut self) -> Result<(), SessionError> {
        let snapshot = self.store.snapshot();
        if let Err(err) = self.repo.save_state(&self.key, &snapshot).await {
            self.report_error(format!("Failed to save session: {err}"));
            return Err(err.into());
        }
        Ok(())
    }

    fn report_info(&mut self, message: impl Into<String>) {
        let now = self.store.clock().now();
        self.diagnostics.info(now, message);
    }

    fn report_success(&mut self, message: impl Into<String>) {
        let now = self.store.clock().now();
        self.diagnostics.success(now, message);
    }

    fn report_error(&mut self, message: impl Into<String>) {
        let now = self.store.clock().now();
        self.diagnostics.error(now, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::LogKind;
    use async_trait::async_trait;
    use memorizer_core::model::TrackId;
    use memorizer_core::session::SessionSnapshot;
    use memorizer_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    /// Reads nothing and rejects every write.
    struct ReadOnlyRepository;

    #[async_trait]
    impl SessionStateRepository for ReadOnlyRepository {
        async fn load_state(&self, _key: &str) -> Result<Option<SessionSnapshot>, StorageError> {
            Ok(None)
        }

        async fn save_state(&self, _key: &str, _snapshot: &SessionSnapshot) -> Result<(), StorageError> {
            Err(StorageError::Connection("database is read-only".into()))
        }

        async fn clear_state(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn card(id: &str) -> Card {
        Card::new(TrackId::new(id), "art", 200_000, 0).unwrap()
    }

    async fn hydrated(repo: &InMemoryRepository) -> PersistentSession {
        let mut session = PersistentSession::new(fixed_clock(), Arc::new(repo.clone()));
        session.hydrate().await.unwrap();
        session
    }

    #[tokio::test]
    async fn overview_is_hidden_until_hydrated() {
        let repo = InMemoryRepository::new();
        let mut session = PersistentSession::new(fixed_clock(), Arc::new(repo));
        assert!(session.deck_overview().is_none());

        assert!(!session.hydrate().await.unwrap());
        let overview = session.deck_overview().unwrap();
        assert_eq!(overview.total_cards, 0);
        assert_eq!(overview.counts, DeckCounts::default());
    }

    #[tokio::test]
    async fn second_hydrate_is_noop() {
        let repo = InMemoryRepository::new();
        let mut first = hydrated(&repo).await;
        first.load_cards(vec![card("a")]).await.unwrap();

        let mut session = PersistentSession::new(fixed_clock(), Arc::new(repo.clone()));
        assert!(session.hydrate().await.unwrap());
        session.load_cards(vec![card("x"), card("y")]).await.unwrap();
        assert!(!session.hydrate().await.unwrap());
        assert_eq!(session.store().cards().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_record_starts_fresh() {
        let repo = InMemoryRepository::new();
        repo.insert_raw(STORAGE_KEY, "{not json").unwrap();

        let session = hydrated(&repo).await;
        assert!(session.is_hydrated());
        assert!(session.store().cards().is_empty());
        assert_eq!(session.diagnostics().latest().unwrap().kind, LogKind::Error);
    }

    #[tokio::test]
    async fn empty_deck_cannot_be_selected() {
        let repo = InMemoryRepository::new();
        let mut session = hydrated(&repo).await;
        session.load_cards(vec![card("a")]).await.unwrap();

        let err = session.select_deck(Some(Deck::Good)).await.unwrap_err();
        assert!(matches!(err, SessionError::EmptyDeck(Deck::Good)));
        session.select_deck(Some(Deck::New)).await.unwrap();
        assert_eq!(session.store().active_deck(), Some(Deck::New));
    }

    #[tokio::test]
    async fn answering_last_card_returns_to_overview() {
        let repo = InMemoryRepository::new();
        let mut session = hydrated(&repo).await;
        session.load_cards(vec![card("a"), card("b")]).await.unwrap();
        session.select_deck(Some(Deck::New)).await.unwrap();

        let first = session.answer(ReviewGrade::Good).await.unwrap().unwrap();
        assert!(!first.deck_complete);
        let last = session.answer(ReviewGrade::Again).await.unwrap().unwrap();
        assert!(last.deck_complete);

        assert_eq!(session.store().active_deck(), Some(Deck::New));
        assert!(session.store().queue().is_empty());
        assert!(session.review_view().is_none());
        assert!(session.answer(ReviewGrade::Good).await.unwrap().is_none());
        assert_eq!(
            session.diagnostics().latest().unwrap().message,
            "Deck complete! Returning to overview."
        );
        // "a" is due tomorrow, "b" right away
        assert_eq!(session.deck_overview().unwrap().counts.again, 1);
    }

    #[tokio::test]
    async fn failed_save_keeps_answer_outcome() {
        let mut session = PersistentSession::new(fixed_clock(), Arc::new(ReadOnlyRepository));
        session.hydrate().await.unwrap();
        assert!(session.load_cards(vec![card("a")]).await.is_err());
        assert!(session.select_deck(Some(Deck::New)).await.is_err());

        let (outcome, source) = match session.answer(ReviewGrade::Good).await {
            Err(SessionError::AnswerNotSaved { outcome, source }) => (outcome, source),
            other => panic!("expected AnswerNotSaved, got {other:?}"),
        };
        assert_eq!(outcome.card.id(), &TrackId::new("a"));
        assert_eq!(outcome.card.reps(), 1);
        assert!(outcome.deck_complete);
        assert!(matches!(source, StorageError::Connection(_)));

        assert_eq!(session.store().card(&TrackId::new("a")).unwrap().reps(), 1);
        assert_eq!(session.diagnostics().latest().unwrap().kind, LogKind::Error);
    }

    #[tokio::test]
    async fn playback_changes_are_not_flushed() {
        let repo = InMemoryRepository::new();
        let mut session = hydrated(&repo).await;
        session.load_cards(vec![card("a")]).await.unwrap();
        let before = repo.raw(STORAGE_KEY).unwrap();

        session.set_playing(true);
        assert_eq!(repo.raw(STORAGE_KEY).unwrap(), before);
        assert!(session.store().playback().is_playing());
    }

    #[tokio::test]
    async fn clip_window_pauses_playback() {
        let repo = InMemoryRepository::new();
        let mut session = hydrated(&repo).await;
        session.set_playing(true);
        assert!(!session.pause_if_clip_finished());

        session.clock_mut().advance(chrono::Duration::seconds(15));
        assert!(session.pause_if_clip_finished());
        assert!(!session.store().playback().is_playing());
    }

    #[tokio::test]
    async fn clear_removes_record_but_stays_hydrated() {
        let repo = InMemoryRepository::new();
        let mut session = hydrated(&repo).await;
        session.load_cards(vec![card("a")]).await.unwrap();
        assert!(repo.raw(STORAGE_KEY).unwrap().is_some());

        session.clear().await.unwrap();
        assert!(repo.raw(STORAGE_KEY).unwrap().is_none());
        assert!(session.store().cards().is_empty());
        assert!(session.deck_overview().is_some());
    }
}
