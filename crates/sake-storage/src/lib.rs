//! Persistence layer for Sake.
//!
//! Owns the workspace state document: atomic JSON file storage, the
//! versioned default-tolerant schema, and the persistence manager that
//! the orchestration layer drives for save/load and autosave.

pub mod dto;
pub mod paths;
pub mod persistence;
pub mod storage;

pub use crate::dto::{STORAGE_VERSION, StoredState};
pub use crate::paths::SakePaths;
pub use crate::persistence::{LoadOutcome, PersistenceManager};
pub use crate::storage::AtomicJsonFile;
