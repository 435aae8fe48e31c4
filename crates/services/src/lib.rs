#![forbid(unsafe_code)]

pub mod diagnostics;
pub mod error;
pub mod session;
pub mod tracks;

pub use memorizer_core::Clock;

pub use diagnostics::{DiagnosticLog, LogEntry, LogKind};
pub use error::{SessionError, TrackSourceError};
pub use session::{AnswerOutcome, DeckOverview, PersistentSession, ReviewView};
pub use tracks::{StaticTrackSource, TrackSource, cards_from_tracks};
