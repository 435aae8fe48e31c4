use std::collections::VecDeque;

use crate::model::TrackId;

/// Aggregated view of queue progress, useful for UI ("Card 3 of 10").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueProgress {
    /// 1-based position of the current card; 0 when the queue was empty from the start.
    pub position: usize,
    pub total: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// Ordered snapshot of card ids being stepped through for the active deck.
///
/// Refilling takes a fresh snapshot; cards that become eligible afterwards are not
/// injected into a live queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewQueue {
    ids: VecDeque<TrackId>,
    initial_len: usize,
}

impl ReviewQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a queue from persisted parts.
    #[must_use]
    pub fn from_parts(ids: Vec<TrackId>, initial_len: usize) -> Self {
        Self {
            ids: ids.into(),
            initial_len,
        }
    }

    /// Replaces the queue with `ids` and records its length as the initial size.
    pub fn refill(&mut self, ids: Vec<TrackId>) {
        self.initial_len = ids.len();
        self.ids = ids.into();
    }

    /// Empties the queue and zeroes the initial size.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.initial_len = 0;
    }

    #[must_use]
    pub fn head(&self) -> Option<&TrackId> {
        self.ids.front()
    }

    /// The id right after the head, if any.
    #[must_use]
    pub fn upcoming(&self) -> Option<&TrackId> {
        self.ids.get(1)
    }

    /// Pops the head. Returns true only when this call emptied the queue.
    pub fn advance(&mut self) -> bool {
        self.ids.pop_front().is_some() && self.ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn initial_len(&self) -> usize {
        self.initial_len
    }

    pub fn ids(&self) -> impl Iterator<Item = &TrackId> {
        self.ids.iter()
    }

    #[must_use]
    pub fn progress(&self) -> QueueProgress {
        let total = self.initial_len.max(self.ids.len());
        let remaining = self.ids.len();
        let position = if total == 0 {
            0
        } else {
            (total - remaining + 1).min(total)
        };
        QueueProgress {
            position,
            total,
            remaining,
            is_complete: remaining == 0,
        }
    }
}
