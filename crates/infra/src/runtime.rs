//! Aggregate runtime: replay, command execution and persistence.
//!
//! ## Lifecycle
//!
//! ```text
//! AggregateHandle::new(store, id)
//!   ↓
//! load()      full replay of the stream, version 1 onwards
//!   ↓
//! execute()   handle → stamp version → apply → buffer   (repeatable)
//!   ↓
//! save()      append the whole buffer as one batch, expecting the
//!             version observed at load time
//! ```
//!
//! State changes as soon as `execute` returns; `save` only makes it durable.
//! Two handles that loaded the same version cannot both save: the second one
//! gets a conflict and must `load` again before retrying.

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use stela_core::{Aggregate, AggregateId, AggregateType, DomainError, ExpectedVersion, Version};
use stela_events::{Command, Event, EventDecodeError, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A command was rejected by the aggregate's rules. Recoverable.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The log refused or failed the operation.
    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// A stored payload did not match its event type's shape.
    #[error("failed to decode '{event_type}' at version {version}: {reason}")]
    Decode {
        event_type: String,
        version: Version,
        reason: String,
    },

    /// The loaded stream breaks a log invariant or names state that does not exist.
    #[error("corrupt stream {aggregate_id}: {reason}")]
    CorruptStream {
        aggregate_id: AggregateId,
        reason: String,
    },

    /// A command addressed a different aggregate than the handle's.
    #[error("command targets {target}, handle is bound to {bound}")]
    WrongAggregate {
        target: AggregateId,
        bound: AggregateId,
    },
}

impl RuntimeError {
    /// True for optimistic concurrency conflicts, the only retryable failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RuntimeError::Store(e) if e.is_retryable())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RuntimeError::Domain(DomainError::Validation(_)))
    }

    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            RuntimeError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Fold a stored stream into fresh aggregate state.
///
/// Checks the stream the same way the log does on append (ids, tag, versions
/// contiguous from 1) so a damaged backend cannot yield half-plausible state.
pub fn rehydrate<A>(aggregate_id: AggregateId, history: &[StoredEvent]) -> Result<A, RuntimeError>
where
    A: Aggregate,
    A::Event: Event,
{
    let mut aggregate = A::empty(aggregate_id);
    let mut expected = Version::INITIAL.next();

    for stored in history {
        validate_stored(aggregate_id, A::AGGREGATE_TYPE, expected, stored)?;
        let envelope = decode::<A::Event>(stored)?;
        aggregate
            .check_replay(envelope.payload())
            .map_err(|reason| RuntimeError::CorruptStream {
                aggregate_id,
                reason: format!("event {} at version {}: {reason}", stored.event_id, stored.version),
            })?;
        aggregate.apply(envelope.payload());
        expected = expected.next();
    }

    Ok(aggregate)
}

fn validate_stored(
    aggregate_id: AggregateId,
    aggregate_type: AggregateType,
    expected: Version,
    stored: &StoredEvent,
) -> Result<(), RuntimeError> {
    let corrupt = |reason: String| RuntimeError::CorruptStream {
        aggregate_id,
        reason,
    };

    if stored.aggregate_id != aggregate_id {
        return Err(corrupt(format!(
            "event {} belongs to {}",
            stored.event_id, stored.aggregate_id
        )));
    }
    if stored.aggregate_type != aggregate_type {
        return Err(corrupt(format!(
            "event {} is tagged '{}', expected '{}'",
            stored.event_id, stored.aggregate_type, aggregate_type
        )));
    }
    if stored.version != expected {
        return Err(corrupt(format!(
            "expected version {expected}, found {}",
            stored.version
        )));
    }
    Ok(())
}

fn decode<E: Event>(stored: &StoredEvent) -> Result<EventEnvelope<E>, RuntimeError> {
    stored.decode::<E>().map_err(|e| match e {
        EventDecodeError::UnknownType(name) => RuntimeError::Domain(DomainError::unknown_event_type(name)),
        other => RuntimeError::Decode {
            event_type: stored.event_type.clone(),
            version: stored.version,
            reason: other.to_string(),
        },
    })
}

/// A caller's in-memory view of one aggregate plus its unsaved events.
///
/// Each handle owns its state privately; two handles for the same id never
/// share anything except the store.
#[derive(Debug)]
pub struct AggregateHandle<A, S>
where
    A: Aggregate,
{
    store: S,
    state: A,
    version: Version,
    persisted: Version,
    pending: Vec<EventEnvelope<A::Event>>,
}

impl<A, S> AggregateHandle<A, S>
where
    A: Aggregate<Error = DomainError>,
    A::Command: Command,
    A::Event: Event,
    S: EventStore,
{
    /// Unloaded handle. Call `load` before mutating an existing aggregate.
    pub fn new(store: S, aggregate_id: AggregateId) -> Self {
        Self {
            store,
            state: A::empty(aggregate_id),
            version: Version::INITIAL,
            persisted: Version::INITIAL,
            pending: Vec::new(),
        }
    }

    /// `new` followed by `load`.
    pub fn open(store: S, aggregate_id: AggregateId) -> Result<Self, RuntimeError> {
        let mut handle = Self::new(store, aggregate_id);
        handle.load()?;
        Ok(handle)
    }

    pub fn id(&self) -> AggregateId {
        *self.state.id()
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    pub fn into_state(self) -> A {
        self.state
    }

    /// Version including unsaved events.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Version of the last event known to be in the log.
    pub fn persisted_version(&self) -> Version {
        self.persisted
    }

    pub fn uncommitted(&self) -> &[EventEnvelope<A::Event>] {
        &self.pending
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Replace local state with a full replay of the persisted stream.
    ///
    /// Unsaved events are discarded.
    pub fn load(&mut self) -> Result<(), RuntimeError> {
        let aggregate_id = self.id();
        let history = self.store.load_stream(aggregate_id)?;
        let state = rehydrate::<A>(aggregate_id, &history)?;

        self.version = history.last().map(|e| e.version).unwrap_or(Version::INITIAL);
        self.persisted = self.version;
        self.state = state;
        if !self.pending.is_empty() {
            debug!(%aggregate_id, dropped = self.pending.len(), "discarding unsaved events on load");
            self.pending.clear();
        }

        debug!(
            %aggregate_id,
            aggregate_type = %A::AGGREGATE_TYPE,
            version = %self.version,
            "loaded aggregate"
        );
        Ok(())
    }

    /// Run a command against current state.
    ///
    /// On success every produced event has already been applied and buffered;
    /// the returned slice holds just those events. On failure nothing changes.
    pub fn execute(&mut self, command: A::Command) -> Result<&[EventEnvelope<A::Event>], RuntimeError> {
        let bound = self.id();
        let target = command.target_aggregate_id();
        if target != bound {
            return Err(RuntimeError::WrongAggregate { target, bound });
        }

        let decided = self.state.handle(&command)?;
        let first_new = self.pending.len();
        for event in decided {
            let envelope = self.create_event(event);
            self.add_event(envelope);
        }
        Ok(&self.pending[first_new..])
    }

    /// Persist every buffered event as one atomic batch.
    ///
    /// On failure the buffer and state are left as they were. After a
    /// conflict, `load` (which drops the buffer) and re-run the command.
    pub fn save(&mut self) -> Result<Vec<StoredEvent>, RuntimeError> {
        if self.pending.is_empty() {
            return Ok(vec![]);
        }

        let batch = self
            .pending
            .iter()
            .map(UncommittedEvent::from_envelope)
            .collect::<Result<Vec<_>, _>>()?;
        let expected = ExpectedVersion::after(self.persisted);

        let committed = match self.store.append(batch, expected) {
            Ok(committed) => committed,
            Err(e) => {
                if e.is_retryable() {
                    warn!(aggregate_id = %self.id(), error = %e, "save lost a concurrent write race");
                }
                return Err(e.into());
            }
        };

        self.persisted = self.version;
        self.pending.clear();
        Ok(committed)
    }

    fn create_event(&mut self, event: A::Event) -> EventEnvelope<A::Event> {
        self.version = self.version.next();
        EventEnvelope::new(Uuid::now_v7(), self.id(), A::AGGREGATE_TYPE, self.version, event)
    }

    fn add_event(&mut self, envelope: EventEnvelope<A::Event>) {
        self.state.apply(envelope.payload());
        debug_assert_eq!(self.state.version(), envelope.version());
        self.pending.push(envelope);
    }
}

/// Load, execute and save, reloading and retrying on conflicts only.
///
/// Domain errors and storage faults are returned on the first occurrence.
pub fn execute_with_retry<A, S>(
    store: S,
    aggregate_id: AggregateId,
    command: A::Command,
    max_attempts: usize,
) -> Result<AggregateHandle<A, S>, RuntimeError>
where
    A: Aggregate<Error = DomainError>,
    A::Command: Command,
    A::Event: Event,
    S: EventStore + Clone,
{
    let mut attempt = 1;
    loop {
        let mut handle = AggregateHandle::<A, S>::open(store.clone(), aggregate_id)?;
        handle.execute(command.clone())?;
        match handle.save() {
            Ok(_) => return Ok(handle),
            Err(e) if e.is_conflict() && attempt < max_attempts => {
                debug!(%aggregate_id, attempt, "retrying after conflict");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
