use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::{self, DeckCounts, DeckPartition};
use crate::model::{Card, CardError, Deck, ReviewGrade, ReviewLog, TrackId};
use crate::playback::PlaybackState;
use crate::queue::{QueueProgress, ReviewQueue};
use crate::scheduler::Scheduler;
use crate::time::Clock;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a persisted session cannot be restored.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("card {0} appears more than once")]
    DuplicateCard(TrackId),

    #[error("queued card {0} is not in the card set")]
    UnknownQueuedCard(TrackId),

    #[error("card {id} is invalid: {source}")]
    InvalidCard {
        id: TrackId,
        #[source]
        source: CardError,
    },
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Persisted portion of the session. Playback flags are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub cards: Vec<Card>,
    pub active_deck: Option<Deck>,
    pub queue: Vec<TrackId>,
    pub initial_queue_size: usize,
    #[serde(rename = "_hasHydrated", default)]
    pub has_hydrated: bool,
}

//
// ─── GRADE OUTCOME ─────────────────────────────────────────────────────────────
//

/// Result of grading the current card.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub card: Card,
    pub log: ReviewLog,
    /// True when this grade emptied the queue; the caller returns to the overview.
    pub queue_exhausted: bool,
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Single owner of all scheduling state: card set, active deck, queue and playback flags.
///
/// Every operation is synchronous. Persistence is layered on top by serializing
/// [`SessionStore::snapshot`] after each committed mutation.
pub struct SessionStore {
    clock: Clock,
    scheduler: Scheduler,
    cards: Vec<Card>,
    index: HashMap<TrackId, usize>,
    active_deck: Option<Deck>,
    queue: ReviewQueue,
    playback: PlaybackState,
    has_hydrated: bool,
}

impl SessionStore {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            scheduler: Scheduler::new(),
            cards: Vec::new(),
            index: HashMap::new(),
            active_deck: None,
            queue: ReviewQueue::new(),
            playback: PlaybackState::default(),
            has_hydrated: false,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Mutable clock access, mainly to advance fixed clocks in tests.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    // ─── card set ──────────────────────────────────────────────────────────────

    /// Replaces the whole card set with `cards`.
    ///
    /// Repeated ids keep the position of their first occurrence and the value of the last.
    /// The queue becomes every loaded id in order, so the first card is current.
    /// The active deck is left untouched.
    pub fn load(&mut self, cards: Vec<Card>) {
        self.cards.clear();
        self.index.clear();
        for card in cards {
            if let Some(&pos) = self.index.get(card.id()) {
                self.cards[pos] = card;
            } else {
                self.index.insert(card.id().clone(), self.cards.len());
                self.cards.push(card);
            }
        }
        let ids = self.cards.iter().map(|card| card.id().clone()).collect();
        self.queue.refill(ids);
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[must_use]
    pub fn card(&self, id: &TrackId) -> Option<&Card> {
        self.index.get(id).map(|&pos| &self.cards[pos])
    }

    // ─── decks and queue ───────────────────────────────────────────────────────

    #[must_use]
    pub fn active_deck(&self) -> Option<Deck> {
        self.active_deck
    }

    /// Sets the active deck and snapshots its queue; `None` clears the queue.
    pub fn select_deck(&mut self, deck: Option<Deck>) {
        self.active_deck = deck;
        if deck.is_some() {
            self.refill_queue();
        } else {
            self.queue.clear();
        }
    }

    /// Re-snapshots the queue for the active deck. No-op when no deck is active.
    pub fn refill_queue(&mut self) {
        let Some(deck) = self.active_deck else {
            return;
        };
        let ids = classifier::eligible_ids(&self.cards, deck, self.clock.now_millis());
        self.queue.refill(ids);
    }

    #[must_use]
    pub fn partition(&self) -> DeckPartition {
        classifier::partition(&self.cards, self.clock.now_millis())
    }

    #[must_use]
    pub fn deck_counts(&self) -> DeckCounts {
        self.partition().counts()
    }

    #[must_use]
    pub fn queue(&self) -> &ReviewQueue {
        &self.queue
    }

    #[must_use]
    pub fn progress(&self) -> QueueProgress {
        self.queue.progress()
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        self.queue.head().and_then(|id| self.card(id))
    }

    /// The card queued right after the current one, for pre-loading its track.
    #[must_use]
    pub fn upcoming_card(&self) -> Option<&Card> {
        self.queue.upcoming().and_then(|id| self.card(id))
    }

    /// Grades the current card, commits the result and advances the queue.
    ///
    /// Playback is flagged as stopped first. Returns `None` without touching the card set
    /// when there is no current card.
    pub fn grade(&mut self, grade: ReviewGrade) -> Option<GradeOutcome> {
        self.set_playing(false);

        let pos = self.queue.head().and_then(|id| self.index.get(id).copied())?;
        let applied = self
            .scheduler
            .apply_review(&self.cards[pos], grade, self.clock.now());
        self.cards[pos] = applied.card.clone();
        let queue_exhausted = self.queue.advance();

        Some(GradeOutcome {
            card: applied.card,
            log: applied.log,
            queue_exhausted,
        })
    }

    // ─── playback ──────────────────────────────────────────────────────────────

    pub fn set_playing(&mut self, is_playing: bool) {
        let now = self.clock.now_millis();
        self.playback.set_playing(is_playing, now);
    }

    #[must_use]
    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    #[must_use]
    pub fn playback_progress(&self) -> f64 {
        self.playback.progress_percent(self.clock.now_millis())
    }

    #[must_use]
    pub fn clip_finished(&self) -> bool {
        self.playback.clip_finished(self.clock.now_millis())
    }

    // ─── hydration and persistence ─────────────────────────────────────────────

    #[must_use]
    pub fn has_hydrated(&self) -> bool {
        self.has_hydrated
    }

    /// Raises the hydration flag. Returns true only the first time.
    pub fn mark_hydrated(&mut self) -> bool {
        !std::mem::replace(&mut self.has_hydrated, true)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            cards: self.cards.clone(),
            active_deck: self.active_deck,
            queue: self.queue.ids().cloned().collect(),
            initial_queue_size: self.queue.initial_len(),
            has_hydrated: self.has_hydrated,
        }
    }

    /// Replaces the state with a persisted snapshot.
    ///
    /// Playback flags reset to defaults. The hydration flag is not taken from the
    /// snapshot; it is raised through [`SessionStore::mark_hydrated`].
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if the snapshot holds duplicate or invalid cards or
    /// queues an id that is not in the card set. The store is unchanged on error.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> Result<(), SessionStateError> {
        let mut index = HashMap::with_capacity(snapshot.cards.len());
        for (pos, card) in snapshot.cards.iter().enumerate() {
            card.validate()
                .map_err(|source| SessionStateError::InvalidCard {
                    id: card.id().clone(),
                    source,
                })?;
            if index.insert(card.id().clone(), pos).is_some() {
                return Err(SessionStateError::DuplicateCard(card.id().clone()));
            }
        }
        if let Some(missing) = snapshot.queue.iter().find(|id| !index.contains_key(*id)) {
            return Err(SessionStateError::UnknownQueuedCard(missing.clone()));
        }

        self.cards = snapshot.cards;
        self.index = index;
        self.active_deck = snapshot.active_deck;
        self.queue = ReviewQueue::from_parts(snapshot.queue, snapshot.initial_queue_size);
        self.playback = PlaybackState::default();
        Ok(())
    }

    /// Drops every card and the queue. Clock and hydration flag are kept.
    pub fn reset(&mut self) {
        self.cards.clear();
        self.index.clear();
        self.active_deck = None;
        self.queue.clear();
        self.playback = PlaybackState::default();
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("cards_len", &self.cards.len())
            .field("active_deck", &self.active_deck)
            .field("queue_len", &self.queue.len())
            .field("initial_queue_size", &self.queue.initial_len())
            .field("playback", &self.playback)
            .field("has_hydrated", &self.has_hydrated)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReviewState;
    use crate::scheduler::MILLIS_PER_DAY;
    use crate::time::fixed_clock;
    use chrono::Duration;

    fn new_card(id: &str) -> Card {
        Card::new(TrackId::new(id), format!("https://img/{id}"), 200_000, 1_000).unwrap()
    }

    fn card_in(id: &str, deck: Deck, next_due: i64) -> Card {
        let state = ReviewState {
            deck,
            next_due,
            interval: 1,
            reps: 1,
            ..ReviewState::default()
        };
        Card::from_persisted(TrackId::new(id), "art", 200_000, 0, state).unwrap()
    }

    fn ids(raw: &[&str]) -> Vec<TrackId> {
        raw.iter().map(|id| TrackId::new(*id)).collect()
    }

    fn queued(store: &SessionStore) -> Vec<TrackId> {
        store.queue().ids().cloned().collect()
    }

    #[test]
    fn load_replaces_cards_and_selects_first() {
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("old")]);
        store.load(vec![new_card("a"), new_card("b")]);

        assert_eq!(store.cards().len(), 2);
        assert!(store.card(&TrackId::new("old")).is_none());
        assert_eq!(store.current_card().unwrap().id(), &TrackId::new("a"));
        assert_eq!(store.progress().total, 2);
    }

    #[test]
    fn load_resets_initial_queue_size_to_loaded_count() {
        let now = fixed_clock().now_millis();
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("n1"), card_in("a1", Deck::Again, now)]);
        store.select_deck(Some(Deck::New));
        assert_eq!(store.queue().initial_len(), 1);

        store.load(vec![new_card("x"), new_card("y"), new_card("z")]);
        assert_eq!(store.queue().initial_len(), 3);
        assert_eq!(store.snapshot().initial_queue_size, 3);
        assert_eq!(store.active_deck(), Some(Deck::New));
        assert_eq!(store.progress().position, 1);
    }

    #[test]
    fn load_keeps_first_position_and_last_value_for_duplicates() {
        let mut store = SessionStore::new(fixed_clock());
        let replacement = Card::new(TrackId::new("a"), "second", 200_000, 0).unwrap();
        store.load(vec![new_card("a"), new_card("b"), replacement]);

        assert_eq!(queued(&store), ids(&["a", "b"]));
        assert_eq!(store.card(&TrackId::new("a")).unwrap().artwork_url(), "second");
    }

    #[test]
    fn select_new_deck_queues_new_cards_in_insertion_order() {
        let now = fixed_clock().now_millis();
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![
            new_card("n1"),
            card_in("a1", Deck::Again, now),
            new_card("n2"),
            card_in("g1", Deck::Good, now),
        ]);

        store.select_deck(Some(Deck::New));
        assert_eq!(queued(&store), ids(&["n1", "n2"]));
        assert_eq!(store.queue().initial_len(), 2);
        assert_eq!(store.active_deck(), Some(Deck::New));
    }

    #[test]
    fn select_none_clears_queue() {
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("a")]);
        store.select_deck(Some(Deck::New));
        store.select_deck(None);

        assert!(store.queue().is_empty());
        assert_eq!(store.queue().initial_len(), 0);
        assert!(store.current_card().is_none());
        assert_eq!(store.active_deck(), None);
    }

    #[test]
    fn grading_until_empty_signals_exhaustion_once() {
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("a"), new_card("b"), new_card("c")]);
        store.select_deck(Some(Deck::New));

        let mut signals = 0;
        while store.current_card().is_some() {
            let outcome = store.grade(ReviewGrade::Good).unwrap();
            if outcome.queue_exhausted {
                signals += 1;
            }
        }

        assert_eq!(signals, 1);
        assert_eq!(store.queue().len(), 0);
        assert!(store.grade(ReviewGrade::Good).is_none());
        assert!(store.cards().iter().all(|card| card.deck() == Deck::Again));
    }

    #[test]
    fn grade_without_current_card_is_noop() {
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("a")]);
        store.select_deck(None);
        let before = store.snapshot();

        assert!(store.grade(ReviewGrade::Again).is_none());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn grade_commits_card_and_stops_playback() {
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("a"), new_card("b")]);
        store.select_deck(Some(Deck::New));
        store.set_playing(true);

        let outcome = store.grade(ReviewGrade::Good).unwrap();
        assert!(!outcome.queue_exhausted);
        assert_eq!(outcome.log.card_id, TrackId::new("a"));
        assert!(!store.playback().is_playing());

        let stored = store.card(&TrackId::new("a")).unwrap();
        assert_eq!(stored.reps(), 1);
        assert_eq!(stored.interval(), 1);
        assert_eq!(store.current_card().unwrap().id(), &TrackId::new("b"));
    }

    #[test]
    fn again_grade_makes_card_immediately_available() {
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("a")]);
        store.select_deck(Some(Deck::New));
        store.grade(ReviewGrade::Again);

        assert_eq!(store.deck_counts().again, 1);
        store.select_deck(Some(Deck::Again));
        assert_eq!(queued(&store), ids(&["a"]));
    }

    #[test]
    fn queue_is_a_snapshot() {
        let now = fixed_clock().now_millis();
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![
            card_in("due", Deck::Again, now),
            card_in("soon", Deck::Again, now + MILLIS_PER_DAY),
        ]);
        store.select_deck(Some(Deck::Again));
        assert_eq!(queued(&store), ids(&["due"]));

        store.clock_mut().advance(Duration::days(2));
        assert_eq!(queued(&store), ids(&["due"]));

        store.refill_queue();
        assert_eq!(queued(&store), ids(&["due", "soon"]));
    }

    #[test]
    fn upcoming_card_is_second_in_queue() {
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("a"), new_card("b")]);
        assert_eq!(store.upcoming_card().unwrap().id(), &TrackId::new("b"));
        store.grade(ReviewGrade::Good);
        assert!(store.upcoming_card().is_none());
    }

    #[test]
    fn playback_progress_uses_store_clock() {
        let mut store = SessionStore::new(fixed_clock());
        store.set_playing(true);
        store.clock_mut().advance(Duration::milliseconds(3_000));
        assert_eq!(store.playback_progress(), 20.0);
        assert!(!store.clip_finished());
        store.clock_mut().advance(Duration::milliseconds(12_000));
        assert!(store.clip_finished());
    }

    #[test]
    fn snapshot_round_trip_resets_playback() {
        let mut store = SessionStore::new(fixed_clock());
        store.load(vec![new_card("a"), new_card("b"), new_card("c")]);
        store.select_deck(Some(Deck::New));
        store.grade(ReviewGrade::Good);
        store.set_playing(true);

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let snapshot: SessionSnapshot = serde_json::from_str(&json).unwrap();

        let mut restored = SessionStore::new(fixed_clock());
        restored.restore(snapshot).unwrap();

        assert_eq!(restored.cards(), store.cards());
        assert_eq!(restored.active_deck(), Some(Deck::New));
        assert_eq!(queued(&restored), ids(&["b", "c"]));
        assert_eq!(restored.queue().initial_len(), 3);
        assert_eq!(restored.playback(), PlaybackState::default());
    }

    #[test]
    fn snapshot_excludes_playback_fields() {
        let mut store = SessionStore::new(fixed_clock());
        store.set_playing(true);
        let value = serde_json::to_value(store.snapshot()).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();

        assert!(keys.contains(&"activeDeck"));
        assert!(keys.contains(&"initialQueueSize"));
        assert!(keys.contains(&"_hasHydrated"));
        assert!(!keys.iter().any(|k| k.contains("laying") || k.contains("playback")));
    }

    #[test]
    fn restore_rejects_duplicates_and_dangling_queue() {
        let mut store = SessionStore::new(fixed_clock());

        let dup = SessionSnapshot {
            cards: vec![new_card("a"), new_card("a")],
            ..SessionSnapshot::default()
        };
        assert!(matches!(
            store.restore(dup),
            Err(SessionStateError::DuplicateCard(id)) if id == TrackId::new("a")
        ));

        let dangling = SessionSnapshot {
            cards: vec![new_card("a")],
            queue: ids(&["a", "ghost"]),
            initial_queue_size: 2,
            ..SessionSnapshot::default()
        };
        assert!(matches!(
            store.restore(dangling),
            Err(SessionStateError::UnknownQueuedCard(id)) if id == TrackId::new("ghost")
        ));
        assert!(store.cards().is_empty());
    }

    #[test]
    fn restore_rejects_invalid_cards() {
        let json = r#"{
            "cards": [{
                "id": "a", "artworkUrl": "art", "durationMs": 200000,
                "easiness": 0.5, "interval": 0, "nextDue": 0, "deck": "NEW",
                "reps": 0, "playbackStartPosition": 0
            }],
            "activeDeck": null, "queue": [], "initialQueueSize": 0
        }"#;
        let snapshot: SessionSnapshot = serde_json::from_str(json).unwrap();
        let mut store = SessionStore::new(fixed_clock());
        assert!(matches!(
            store.restore(snapshot),
            Err(SessionStateError::InvalidCard { .. })
        ));
    }

    #[test]
    fn hydration_flag_is_raised_once() {
        let mut store = SessionStore::new(fixed_clock());
        assert!(!store.has_hydrated());
        assert!(store.mark_hydrated());
        assert!(!store.mark_hydrated());
        assert!(store.has_hydrated());

        store.reset();
        assert!(store.has_hydrated());
    }
}
