use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stela_core::{AggregateId, AggregateType, Version};

use crate::Event;

/// Typed event plus the stream metadata it is appended with.
///
/// Notes:
/// - `version` is the 1-based position in the aggregate stream.
/// - `aggregate_type` is the owning state machine's tag.
/// - `metadata` is free-form and never read by domain logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    aggregate_id: AggregateId,
    aggregate_type: AggregateType,
    version: Version,
    occurred_at: DateTime<Utc>,
    metadata: Option<JsonValue>,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Stamp `payload` for `aggregate_id` at `version`, timestamped with the
    /// event's own occurrence time.
    pub fn new(
        event_id: Uuid,
        aggregate_id: AggregateId,
        aggregate_type: AggregateType,
        version: Version,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            aggregate_type,
            version,
            occurred_at: payload.occurred_at(),
            metadata: None,
            payload,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

impl<E> EventEnvelope<E> {
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> AggregateType {
        self.aggregate_type
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn metadata(&self) -> Option<&JsonValue> {
        self.metadata.as_ref()
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
