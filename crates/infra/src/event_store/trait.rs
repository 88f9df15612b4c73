use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use stela_core::{AggregateId, AggregateType, ExpectedVersion, Version};
use stela_events::{Event, EventDecodeError, EventEnvelope};
use std::sync::Arc;

/// An event ready to be appended to a stream.
///
/// The writer assigns `version` (the aggregate runtime stamps it when the
/// event is created); the store verifies it continues the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: AggregateType,

    pub event_type: String,
    pub schema_version: u32,
    pub timestamp: DateTime<Utc>,
    pub version: Version,

    pub data: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

/// A stored event in the append-only log.
///
/// `version` orders events inside one stream. `position` is the global append
/// order across all streams and breaks ties between equal timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub position: u64,
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: AggregateType,

    pub event_type: String,
    pub schema_version: u32,
    pub timestamp: DateTime<Utc>,
    pub version: Version,

    pub data: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

impl UncommittedEvent {
    /// Flatten a typed envelope into a storable record.
    pub fn from_envelope<E: Event>(envelope: &EventEnvelope<E>) -> Result<Self, EventStoreError> {
        let data = envelope
            .payload()
            .to_data()
            .map_err(|e| EventStoreError::Serialization(e.to_string()))?;

        Ok(Self {
            event_id: envelope.event_id(),
            aggregate_id: envelope.aggregate_id(),
            aggregate_type: envelope.aggregate_type(),
            event_type: envelope.event_type().to_string(),
            schema_version: envelope.payload().version(),
            timestamp: envelope.occurred_at(),
            version: envelope.version(),
            data,
            metadata: envelope.metadata().cloned(),
        })
    }

    pub(crate) fn into_stored(self, position: u64) -> StoredEvent {
        StoredEvent {
            position,
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            event_type: self.event_type,
            schema_version: self.schema_version,
            timestamp: self.timestamp,
            version: self.version,
            data: self.data,
            metadata: self.metadata,
        }
    }
}

impl StoredEvent {
    /// Decode the payload into the owning aggregate's typed event.
    pub fn decode<E: Event>(&self) -> Result<EventEnvelope<E>, EventDecodeError> {
        let payload = E::from_parts(&self.event_type, &self.data)?;
        let envelope = EventEnvelope::new(
            self.event_id,
            self.aggregate_id,
            self.aggregate_type,
            self.version,
            payload,
        );
        Ok(match &self.metadata {
            Some(metadata) => envelope.with_metadata(metadata.clone()),
            None => envelope,
        })
    }

    pub(crate) fn to_uncommitted(&self) -> UncommittedEvent {
        UncommittedEvent {
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            event_type: self.event_type.clone(),
            schema_version: self.schema_version,
            timestamp: self.timestamp,
            version: self.version,
            data: self.data.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Event store operation error.
///
/// These are **infrastructure errors** (storage, concurrency, stream shape) as
/// opposed to domain errors. Only `Conflict` is worth retrying: reload the
/// aggregate, re-run the command, save again.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency conflict on {aggregate_id}: expected {expected:?}, found {actual}")]
    Conflict {
        aggregate_id: AggregateId,
        expected: ExpectedVersion,
        actual: Version,
    },

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("corrupt log at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned")]
    Poisoned,
}

impl EventStoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EventStoreError::Conflict { .. })
    }
}

/// Append-only event log.
///
/// ## Append Semantics
///
/// `append()`:
/// - Requires every event in the batch to target the same aggregate id and type
/// - Rejects a type tag that differs from the stream's existing tag
/// - Checks optimistic concurrency (latest version must match `expected_version`)
/// - Requires versions to continue the stream without gaps or duplicates
/// - Persists the batch atomically (all or nothing)
///
/// ## Read Semantics
///
/// - `load_stream()` returns one stream in version order (empty if unknown)
/// - `all_events()` returns everything in `(timestamp, position)` order
/// - `aggregate_ids()` / `events_of_type()` answer from the stream index
///   instead of scanning every event
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn all_events(&self) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Highest version in the stream, `Version::INITIAL` when there is none.
    fn latest_version(&self, aggregate_id: AggregateId) -> Result<Version, EventStoreError> {
        Ok(self
            .load_stream(aggregate_id)?
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::INITIAL))
    }

    /// Ids of every stream with this tag, in order of stream creation.
    fn aggregate_ids(&self, aggregate_type: AggregateType) -> Result<Vec<AggregateId>, EventStoreError>;

    /// Events of every stream with this tag, in `(timestamp, position)` order.
    fn events_of_type(&self, aggregate_type: AggregateType) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(aggregate_id)
    }

    fn all_events(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).all_events()
    }

    fn latest_version(&self, aggregate_id: AggregateId) -> Result<Version, EventStoreError> {
        (**self).latest_version(aggregate_id)
    }

    fn aggregate_ids(&self, aggregate_type: AggregateType) -> Result<Vec<AggregateId>, EventStoreError> {
        (**self).aggregate_ids(aggregate_type)
    }

    fn events_of_type(&self, aggregate_type: AggregateType) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).events_of_type(aggregate_type)
    }
}
