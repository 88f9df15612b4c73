//! Ad-hoc event inspection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stela_core::{AggregateId, AggregateType};

use crate::event_store::{EventStore, EventStoreError, StoredEvent};

/// Filter criteria for event queries. Every `None` field matches anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    pub aggregate_id: Option<AggregateId>,
    pub aggregate_type: Option<AggregateType>,
    /// Exact event name, e.g. `"HabitCreated"`.
    pub event_type: Option<String>,
    /// Inclusive lower bound on the event timestamp.
    pub occurred_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the event timestamp.
    pub occurred_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aggregate(mut self, aggregate_id: AggregateId) -> Self {
        self.aggregate_id = Some(aggregate_id);
        self
    }

    pub fn of_type(mut self, aggregate_type: AggregateType) -> Self {
        self.aggregate_type = Some(aggregate_type);
        self
    }

    pub fn named(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.occurred_after = Some(from);
        self.occurred_before = Some(to);
        self
    }

    pub fn matches(&self, event: &StoredEvent) -> bool {
        self.aggregate_id.is_none_or(|id| event.aggregate_id == id)
            && self.aggregate_type.is_none_or(|t| event.aggregate_type == t)
            && self
                .event_type
                .as_deref()
                .is_none_or(|name| event.event_type == name)
            && self.occurred_after.is_none_or(|from| event.timestamp >= from)
            && self.occurred_before.is_none_or(|to| event.timestamp < to)
    }
}

/// Every stored event matching `filter`, in `(timestamp, position)` order.
///
/// Narrows to one stream or one aggregate type through the index when the
/// filter allows it, and scans the whole log otherwise.
pub fn query_events<S>(store: &S, filter: &EventFilter) -> Result<Vec<StoredEvent>, EventStoreError>
where
    S: EventStore + ?Sized,
{
    let candidates = match (filter.aggregate_id, filter.aggregate_type) {
        (Some(id), _) => {
            let mut stream = store.load_stream(id)?;
            stream.sort_by(|a, b| (a.timestamp, a.position).cmp(&(b.timestamp, b.position)));
            stream
        }
        (None, Some(aggregate_type)) => store.events_of_type(aggregate_type)?,
        (None, None) => store.all_events()?,
    };

    Ok(candidates.into_iter().filter(|e| filter.matches(e)).collect())
}
