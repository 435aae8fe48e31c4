//! Partitions the card set into the three review decks.
//!
//! - `NEW`: every card still in the new deck, regardless of due time.
//! - `AGAIN`: cards in the again deck whose due time has been reached.
//! - `GOOD`: every graduated card. Graduated cards are not gated by due time.

use crate::model::{Card, Deck, TrackId};

/// Card ids per deck, in card-set insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckPartition {
    pub new: Vec<TrackId>,
    pub again: Vec<TrackId>,
    pub good: Vec<TrackId>,
}

impl DeckPartition {
    #[must_use]
    pub fn ids(&self, deck: Deck) -> &[TrackId] {
        match deck {
            Deck::New => &self.new,
            Deck::Again => &self.again,
            Deck::Good => &self.good,
        }
    }

    #[must_use]
    pub fn counts(&self) -> DeckCounts {
        DeckCounts {
            new: self.new.len(),
            again: self.again.len(),
            good: self.good.len(),
        }
    }
}

/// Number of eligible cards per deck, as shown on the deck overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeckCounts {
    pub new: usize,
    pub again: usize,
    pub good: usize,
}

impl DeckCounts {
    #[must_use]
    pub fn get(&self, deck: Deck) -> usize {
        match deck {
            Deck::New => self.new,
            Deck::Again => self.again,
            Deck::Good => self.good,
        }
    }

    /// A deck with no eligible cards cannot be selected.
    #[must_use]
    pub fn is_selectable(&self, deck: Deck) -> bool {
        self.get(deck) > 0
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.new + self.again + self.good
    }
}

/// Whether `card` is currently reviewable as part of `deck`.
#[must_use]
pub fn is_eligible(card: &Card, deck: Deck, now_ms: i64) -> bool {
    if card.deck() != deck {
        return false;
    }
    match deck {
        Deck::New | Deck::Good => true,
        Deck::Again => card.is_due(now_ms),
    }
}

/// Ids of the cards eligible for `deck`, in iteration order.
pub fn eligible_ids<'a>(
    cards: impl IntoIterator<Item = &'a Card>,
    deck: Deck,
    now_ms: i64,
) -> Vec<TrackId> {
    cards
        .into_iter()
        .filter(|card| is_eligible(card, deck, now_ms))
        .map(|card| card.id().clone())
        .collect()
}

/// Splits `cards` into the three decks.
pub fn partition<'a>(cards: impl IntoIterator<Item = &'a Card>, now_ms: i64) -> DeckPartition {
    let mut out = DeckPartition::default();
    for card in cards {
        if !is_eligible(card, card.deck(), now_ms) {
            continue;
        }
        let id = card.id().clone();
        match card.deck() {
            Deck::New => out.new.push(id),
            Deck::Again => out.again.push(id),
            Deck::Good => out.good.push(id),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReviewState;

    const NOW: i64 = 1_700_000_000_000;

    fn card(id: &str, deck: Deck, next_due: i64) -> Card {
        let state = ReviewState {
            deck,
            next_due,
            ..ReviewState::default()
        };
        Card::from_persisted(TrackId::new(id), "art", 200_000, 0, state).unwrap()
    }

    fn ids(raw: &[&str]) -> Vec<TrackId> {
        raw.iter().map(|id| TrackId::new(*id)).collect()
    }

    #[test]
    fn new_ignores_due_time() {
        let cards = vec![card("a", Deck::New, NOW + 1_000_000), card("b", Deck::New, 0)];
        let parts = partition(&cards, NOW);
        assert_eq!(parts.new, ids(&["a", "b"]));
    }

    #[test]
    fn again_is_gated_by_due_time() {
        let cards = vec![
            card("due", Deck::Again, NOW),
            card("later", Deck::Again, NOW + 1),
            card("past", Deck::Again, NOW - 1),
        ];
        let parts = partition(&cards, NOW);
        assert_eq!(parts.again, ids(&["due", "past"]));
    }

    #[test]
    fn good_is_never_gated() {
        let cards = vec![card("g", Deck::Good, NOW + 30 * 86_400_000)];
        let parts = partition(&cards, NOW);
        assert_eq!(parts.good, ids(&["g"]));
        assert!(is_eligible(&cards[0], Deck::Good, NOW));
    }

    #[test]
    fn every_card_lands_in_at_most_its_own_deck() {
        let cards = vec![
            card("n", Deck::New, 0),
            card("a", Deck::Again, 0),
            card("g", Deck::Good, 0),
        ];
        let parts = partition(&cards, NOW);
        assert_eq!(parts.ids(Deck::New), ids(&["n"]).as_slice());
        assert_eq!(parts.ids(Deck::Again), ids(&["a"]).as_slice());
        assert_eq!(parts.ids(Deck::Good), ids(&["g"]).as_slice());
        assert!(!is_eligible(&cards[0], Deck::Again, NOW));
    }

    #[test]
    fn eligible_ids_matches_partition_bucket() {
        let cards = vec![
            card("a1", Deck::Again, NOW - 5),
            card("n1", Deck::New, 0),
            card("a2", Deck::Again, NOW + 5),
            card("a3", Deck::Again, 0),
        ];
        let parts = partition(&cards, NOW);
        for deck in Deck::ALL {
            assert_eq!(eligible_ids(&cards, deck, NOW), parts.ids(deck));
        }
    }

    #[test]
    fn empty_decks_are_unselectable() {
        let cards = vec![card("n", Deck::New, 0), card("a", Deck::Again, NOW + 1)];
        let counts = partition(&cards, NOW).counts();
        assert_eq!(counts, DeckCounts { new: 1, again: 0, good: 0 });
        assert!(counts.is_selectable(Deck::New));
        assert!(!counts.is_selectable(Deck::Again));
        assert!(!counts.is_selectable(Deck::Good));
        assert_eq!(counts.total(), 1);
    }
}
