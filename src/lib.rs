//! Contact lens wear tracking: the cycle model, its archive history and the
//! storage layer that persists and migrates it.

pub mod config;
pub mod crypto;
pub mod data_manager;
pub mod insights;
pub mod models;
pub mod status;
pub mod storage;
pub mod tracker;

pub use config::StorageConfig;
pub use data_manager::{DataError, DataManager};
pub use models::{CycleHistory, LensCycle, LensType};
pub use status::{CycleStatus, StatusColor};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use tracker::LensTracker;
