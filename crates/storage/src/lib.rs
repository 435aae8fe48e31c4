#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, PersistedSession, SessionStateRepository, Storage, StorageError,
    STORAGE_KEY,
};
