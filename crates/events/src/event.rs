use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Failure turning a stored `(event_type, data)` pair back into a typed event.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    /// The name is not part of the aggregate's vocabulary.
    #[error("unknown event type '{0}'")]
    UnknownType(String),

    /// The name is known but the payload does not match its shape.
    #[error("malformed '{event_type}' payload: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// The typed event could not be split into name + payload.
    #[error("event serialization failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A domain event belonging to one aggregate's closed vocabulary.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - designed to be **append-only**
///
/// Implementors are enums serialized adjacently tagged
/// (`#[serde(tag = "type", content = "data")]`) so the variant name is the
/// stored `event_type` and the variant body is the stored `data`.
pub trait Event: Clone + core::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Every event name this type can decode.
    const EVENT_TYPES: &'static [&'static str];

    /// Stable event name (e.g. "HabitCreated").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32 {
        1
    }

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// The payload stored under `data`.
    fn to_data(&self) -> Result<JsonValue, EventDecodeError> {
        let tagged = serde_json::to_value(self).map_err(EventDecodeError::Encode)?;
        match tagged {
            JsonValue::Object(mut map) => Ok(map.remove("data").unwrap_or(JsonValue::Null)),
            other => Ok(other),
        }
    }

    /// Rebuild a typed event from its stored name and payload.
    ///
    /// Names outside `EVENT_TYPES` fail loudly instead of being skipped.
    fn from_parts(event_type: &str, data: &JsonValue) -> Result<Self, EventDecodeError> {
        if !Self::EVENT_TYPES.contains(&event_type) {
            return Err(EventDecodeError::UnknownType(event_type.to_string()));
        }
        let tagged = serde_json::json!({ "type": event_type, "data": data });
        serde_json::from_value(tagged).map_err(|source| EventDecodeError::Payload {
            event_type: event_type.to_string(),
            source,
        })
    }
}
