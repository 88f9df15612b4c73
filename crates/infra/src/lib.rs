//! Infrastructure layer: event log backends, aggregate runtime, queries and
//! store configuration.

pub mod config;
pub mod event_store;
pub mod query;
pub mod runtime;


pub use config::{StoreBackend, StoreConfig, bootstrap, open_store};
pub use event_store::{
    EventStore, EventStoreError, FileEventStore, InMemoryEventStore, StoredEvent, UncommittedEvent,
};
pub use query::{EventFilter, TrackerQueries, query_events};
pub use runtime::{AggregateHandle, RuntimeError, execute_with_retry, rehydrate};
