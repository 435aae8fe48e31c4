use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of a track. Every card is keyed by the track it plays.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    /// Creates a new `TrackId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Playback URI understood by the streaming service.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.0)
    }
}

impl fmt::Debug for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackId({})", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_display() {
        let id = TrackId::new("4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(id.to_string(), "4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn test_track_id_blank() {
        assert!(TrackId::new("").is_blank());
        assert!(TrackId::new("  ").is_blank());
        assert!(!TrackId::new("abc123").is_blank());
    }

    #[test]
    fn test_track_id_uri() {
        assert_eq!(TrackId::new("xyz").uri(), "spotify:track:xyz");
    }

    #[test]
    fn test_track_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&TrackId::new("t1")).unwrap();
        assert_eq!(json, "\"t1\"");
    }
}
