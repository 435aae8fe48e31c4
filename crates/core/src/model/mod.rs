mod card;
mod deck;
mod ids;
mod review;

pub use ids::TrackId;

pub use card::{Card, CardError, ReviewState, TrackDescriptor, clip_start_range};
pub use deck::{Deck, DeckError};
pub use review::{ReviewGrade, ReviewLog};
