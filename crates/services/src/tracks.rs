use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;

use memorizer_core::model::{Card, TrackDescriptor, clip_start_range};

use crate::error::TrackSourceError;

/// Supplies the tracks of a playlist.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Fetch every track of `playlist_id`.
    ///
    /// # Errors
    ///
    /// Returns `TrackSourceError` if the playlist is unknown or cannot be read.
    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<TrackDescriptor>, TrackSourceError>;
}

/// In-memory track source keyed by playlist id.
#[derive(Debug, Clone, Default)]
pub struct StaticTrackSource {
    playlists: HashMap<String, Vec<TrackDescriptor>>,
}

impl StaticTrackSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_playlist(mut self, id: impl Into<String>, tracks: Vec<TrackDescriptor>) -> Self {
        self.playlists.insert(id.into(), tracks);
        self
    }
}

#[async_trait]
impl TrackSource for StaticTrackSource {
    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<TrackDescriptor>, TrackSourceError> {
        self.playlists
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| TrackSourceError::NotFound(playlist_id.to_owned()))
    }
}

/// Turns fetched tracks into fresh cards.
///
/// Tracks without artwork or with a blank id are skipped. Each card gets a
/// random clip start that leaves a full clip before the end of the track;
/// tracks too short for that start at 0.
pub fn cards_from_tracks<R: Rng + ?Sized>(tracks: &[TrackDescriptor], rng: &mut R) -> Vec<Card> {
    tracks
        .iter()
        .filter(|track| !track.id.is_blank() && track.artwork().is_some())
        .filter_map(|track| {
            let range = clip_start_range(track.duration_ms);
            let start = if range.is_empty() {
                0
            } else {
                rng.random_range(range)
            };
            Card::from_track(track, start).ok()
        })
        .collect()
}
