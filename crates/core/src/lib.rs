#![forbid(unsafe_code)]

pub mod classifier;
pub mod model;
pub mod playback;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod time;

pub use time::Clock;
