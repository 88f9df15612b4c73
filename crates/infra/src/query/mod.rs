//! Read-side queries over the event log.
//!
//! `filter` scans raw events; `tracker` replays aggregates to answer
//! questions that span several entity types.

pub mod filter;
pub mod tracker;

pub use filter::{EventFilter, query_events};
pub use tracker::TrackerQueries;
