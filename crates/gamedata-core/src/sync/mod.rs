//! Change detection and event delivery shared by the managers.
//!
//! - `TrackedCollection`: the items a feed knew about after its last sync
//! - `detect_changes`: Added/Removed between two collections, keyed by ID
//! - `EventEmitter`: synchronous publish/subscribe for manager events

pub mod diff;
pub mod events;

pub use diff::{detect_changes, ChangeEvent, ChangeSet, TrackedCollection};
pub use events::{Event, EventEmitter, ListenerId};
