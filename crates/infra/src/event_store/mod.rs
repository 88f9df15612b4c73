//! Append-only event log boundary.
//!
//! The `EventStore` trait is the only way events enter or leave storage.
//! Both backends share one validating `EventLog`, so optimistic concurrency,
//! version contiguity and type-tag stability hold no matter where events live.

pub mod file;
pub mod in_memory;
pub mod index;
mod log;
pub mod r#trait;

pub use file::FileEventStore;
pub use in_memory::InMemoryEventStore;
pub use index::StreamIndex;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
