use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use memorizer_core::model::TrackDescriptor;
use services::{TrackSource, TrackSourceError};

/// Reads playlists from JSON files: the playlist id is a path relative to `root`.
///
/// A file holds an array of `{"id", "artworkUrl", "durationMs"}` objects.
#[derive(Debug, Clone)]
pub struct JsonFileTrackSource {
    root: PathBuf,
}

impl JsonFileTrackSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl TrackSource for JsonFileTrackSource {
    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<TrackDescriptor>, TrackSourceError> {
        let path = self.root.join(playlist_id);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                TrackSourceError::NotFound(playlist_id.to_owned())
            } else {
                TrackSourceError::Unavailable(format!("{}: {err}", path.display()))
            }
        })?;
        serde_json::from_str(&raw).map_err(|err| TrackSourceError::Malformed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("memorizer-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn reads_track_array() {
        let dir = scratch_dir("read");
        std::fs::write(
            dir.join("mix.json"),
            r#"[
                {"id": "t1", "artworkUrl": "https://img/1", "durationMs": 200000},
                {"id": "t2", "durationMs": 90000}
            ]"#,
        )
        .unwrap();

        let tracks = JsonFileTrackSource::new(&dir).fetch_tracks("mix.json").await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artwork(), Some("https://img/1"));
        assert_eq!(tracks[1].artwork_url, None);
    }

    #[tokio::test]
    async fn maps_missing_and_malformed_files() {
        let dir = scratch_dir("errors");
        std::fs::write(dir.join("bad.json"), "{").unwrap();
        let source = JsonFileTrackSource::new(&dir);

        assert!(matches!(
            source.fetch_tracks("absent.json").await,
            Err(TrackSourceError::NotFound(_))
        ));
        assert!(matches!(
            source.fetch_tracks("bad.json").await,
            Err(TrackSourceError::Malformed(_))
        ));
    }
}
