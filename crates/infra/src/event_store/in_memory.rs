use std::sync::RwLock;

use stela_core::{AggregateId, AggregateType, ExpectedVersion, Version};
use tracing::debug;

use super::log::EventLog;
use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// In-memory append-only event store.
///
/// Intended for tests and throwaway sessions. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: RwLock<EventLog>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all streams.
    pub fn len(&self) -> Result<usize, EventStoreError> {
        Ok(self.log.read().map_err(|_| EventStoreError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, EventStoreError> {
        Ok(self.len()? == 0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut log = self.log.write().map_err(|_| EventStoreError::Poisoned)?;

        let committed = log.prepare(events, expected_version)?;
        log.commit(&committed);

        if let Some(last) = committed.last() {
            debug!(
                aggregate_id = %last.aggregate_id,
                aggregate_type = %last.aggregate_type,
                version = %last.version,
                count = committed.len(),
                "appended events"
            );
        }
        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let log = self.log.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(log.load_stream(aggregate_id))
    }

    fn all_events(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let log = self.log.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(log.all_events())
    }

    fn latest_version(&self, aggregate_id: AggregateId) -> Result<Version, EventStoreError> {
        let log = self.log.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(log.current_version(aggregate_id))
    }

    fn aggregate_ids(&self, aggregate_type: AggregateType) -> Result<Vec<AggregateId>, EventStoreError> {
        let log = self.log.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(log.aggregate_ids(aggregate_type))
    }

    fn events_of_type(&self, aggregate_type: AggregateType) -> Result<Vec<StoredEvent>, EventStoreError> {
        let log = self.log.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(log.events_of_type(aggregate_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn event(
        aggregate_id: AggregateId,
        aggregate_type: AggregateType,
        version: u64,
        minute: i64,
    ) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type,
            event_type: "Anything".to_string(),
            schema_version: 1,
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute),
            version: Version::new(version),
            data: json!({}),
            metadata: None,
        }
    }

    #[test]
    fn append_and_load_in_version_order() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(
                vec![
                    event(id, AggregateType::Habit, 1, 0),
                    event(id, AggregateType::Habit, 2, 1),
                ],
                ExpectedVersion::NoStream,
            )
            .unwrap();
        store
            .append(vec![event(id, AggregateType::Habit, 3, 2)], ExpectedVersion::Exact(Version::new(2)))
            .unwrap();

        let stream = store.load_stream(id).unwrap();
        let versions: Vec<u64> = stream.iter().map(|e| e.version.get()).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_eq!(store.latest_version(id).unwrap(), Version::new(3));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn latest_version_of_unknown_stream_is_initial() {
        let store = InMemoryEventStore::new();
        assert_eq!(store.latest_version(AggregateId::new()).unwrap(), Version::INITIAL);
        assert!(store.load_stream(AggregateId::new()).unwrap().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn stale_expected_version_is_a_conflict() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, AggregateType::Goal, 1, 0)], ExpectedVersion::NoStream)
            .unwrap();

        let err = store
            .append(vec![event(id, AggregateType::Goal, 1, 1)], ExpectedVersion::NoStream)
            .unwrap_err();
        match err {
            EventStoreError::Conflict { actual, .. } => assert_eq!(actual, Version::new(1)),
            other => panic!("Expected Conflict, got {other:?}"),
        }
        let retry = store
            .append(vec![event(id, AggregateType::Goal, 1, 1)], ExpectedVersion::NoStream)
            .unwrap_err();
        assert!(retry.is_retryable());
        assert_eq!(store.load_stream(id).unwrap().len(), 1);
    }

    #[test]
    fn gaps_and_duplicates_are_rejected_even_without_expectation() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, AggregateType::Moment, 1, 0)], ExpectedVersion::Any)
            .unwrap();

        let dup = store
            .append(vec![event(id, AggregateType::Moment, 1, 1)], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(dup, EventStoreError::InvalidAppend(_)));

        let gap = store
            .append(vec![event(id, AggregateType::Moment, 3, 1)], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(gap, EventStoreError::InvalidAppend(_)));
    }

    #[test]
    fn stream_type_cannot_change() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store
            .append(vec![event(id, AggregateType::Habit, 1, 0)], ExpectedVersion::NoStream)
            .unwrap();

        let err = store
            .append(vec![event(id, AggregateType::Goal, 2, 1)], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn failed_batch_leaves_nothing_behind() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let err = store
            .append(
                vec![
                    event(id, AggregateType::Project, 1, 0),
                    event(id, AggregateType::Project, 2, 0),
                    event(id, AggregateType::Project, 4, 0),
                ],
                ExpectedVersion::NoStream,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
        assert!(store.is_empty().unwrap());
        assert!(store.aggregate_ids(AggregateType::Project).unwrap().is_empty());
    }

    #[test]
    fn mixed_batches_are_rejected() {
        let store = InMemoryEventStore::new();
        let err = store
            .append(
                vec![
                    event(AggregateId::new(), AggregateType::Habit, 1, 0),
                    event(AggregateId::new(), AggregateType::Habit, 2, 0),
                ],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
    }

    #[test]
    fn all_events_orders_by_timestamp_then_position() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        store
            .append(vec![event(a, AggregateType::Habit, 1, 5)], ExpectedVersion::NoStream)
            .unwrap();
        store
            .append(vec![event(b, AggregateType::Goal, 1, 0)], ExpectedVersion::NoStream)
            .unwrap();
        store
            .append(vec![event(b, AggregateType::Goal, 2, 5)], ExpectedVersion::Any)
            .unwrap();

        let all = store.all_events().unwrap();
        let order: Vec<(AggregateId, u64)> = all.iter().map(|e| (e.aggregate_id, e.position)).collect();
        assert_eq!(order, vec![(b, 2), (a, 1), (b, 3)]);
    }

    #[test]
    fn index_answers_type_scoped_reads() {
        let store = InMemoryEventStore::new();
        let h1 = AggregateId::new();
        let g1 = AggregateId::new();
        let h2 = AggregateId::new();

        store.append(vec![event(h1, AggregateType::Habit, 1, 0)], ExpectedVersion::NoStream).unwrap();
        store.append(vec![event(g1, AggregateType::Goal, 1, 1)], ExpectedVersion::NoStream).unwrap();
        store.append(vec![event(h2, AggregateType::Habit, 1, 2)], ExpectedVersion::NoStream).unwrap();
        store.append(vec![event(h1, AggregateType::Habit, 2, 3)], ExpectedVersion::Any).unwrap();

        assert_eq!(store.aggregate_ids(AggregateType::Habit).unwrap(), vec![h1, h2]);
        let habit_events = store.events_of_type(AggregateType::Habit).unwrap();
        assert_eq!(habit_events.len(), 3);
        assert!(habit_events.iter().all(|e| e.aggregate_type == AggregateType::Habit));
    }
}
