//! Persistence layer (local snapshot file).

pub mod snapshot;

pub use snapshot::{SnapshotStore, StoreState};
