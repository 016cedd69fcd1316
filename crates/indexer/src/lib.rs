//! Incremental chain indexing: the persisted cache, sync orchestration,
//! token classification, and the derived views served to presentation
//! layers.

pub mod graph;
pub mod heatmap;
pub mod store;
pub mod sync;
pub mod tokens;
pub mod views;

pub use store::CacheStore;
pub use sync::SyncOrchestrator;
pub use views::{ViewKind, ViewServer};
