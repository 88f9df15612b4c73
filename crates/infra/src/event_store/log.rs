//! Backend-independent log state shared by every `EventStore` implementation.

use std::collections::HashMap;

use stela_core::{AggregateId, AggregateType, ExpectedVersion, Version};

use super::index::StreamIndex;
use super::r#trait::{EventStoreError, StoredEvent, UncommittedEvent};

/// Events in append order plus per-stream offsets and the type index.
///
/// Validation happens in `prepare`; `commit` only publishes already-checked
/// events, so a backend can persist in between and skip `commit` on failure.
#[derive(Debug, Default)]
pub(crate) struct EventLog {
    events: Vec<StoredEvent>,
    streams: HashMap<AggregateId, Vec<usize>>,
    index: StreamIndex,
}

impl EventLog {
    pub(crate) fn current_version(&self, aggregate_id: AggregateId) -> Version {
        self.streams
            .get(&aggregate_id)
            .and_then(|offsets| offsets.last())
            .map(|&i| self.events[i].version)
            .unwrap_or(Version::INITIAL)
    }

    /// Validate a batch against the current log and assign global positions.
    pub(crate) fn prepare(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        // All events must target the same stream.
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type;

        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        // Enforce aggregate type stability across the stream.
        if let Some(existing) = self.index.type_of(aggregate_id) {
            if existing != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream {aggregate_id} is '{existing}', attempted append with '{aggregate_type}'"
                )));
            }
        }

        let current = self.current_version(aggregate_id);
        if !expected_version.matches(current) {
            return Err(EventStoreError::Conflict {
                aggregate_id,
                expected: expected_version,
                actual: current,
            });
        }

        let mut next = current.next();
        let mut position = self.events.len() as u64 + 1;
        let mut prepared = Vec::with_capacity(events.len());
        for e in events {
            if e.version != next {
                return Err(EventStoreError::InvalidAppend(format!(
                    "stream {aggregate_id} expects version {next}, got {}",
                    e.version
                )));
            }
            prepared.push(e.into_stored(position));
            next = next.next();
            position += 1;
        }

        Ok(prepared)
    }

    pub(crate) fn commit(&mut self, stored: &[StoredEvent]) {
        for e in stored {
            let offset = self.events.len();
            self.index.record(e.aggregate_id, e.aggregate_type);
            self.streams.entry(e.aggregate_id).or_default().push(offset);
            self.events.push(e.clone());
        }
    }

    /// Re-admit an event read back from durable storage.
    ///
    /// Runs the same checks as a fresh append, and additionally requires the
    /// recorded global position to match the replay position.
    pub(crate) fn restore(&mut self, stored: StoredEvent) -> Result<(), String> {
        let expected_position = self.events.len() as u64 + 1;
        if stored.position != expected_position {
            return Err(format!(
                "expected position {expected_position}, found {}",
                stored.position
            ));
        }
        let prepared = self
            .prepare(vec![stored.to_uncommitted()], ExpectedVersion::Any)
            .map_err(|e| e.to_string())?;
        self.commit(&prepared);
        Ok(())
    }

    pub(crate) fn load_stream(&self, aggregate_id: AggregateId) -> Vec<StoredEvent> {
        self.streams
            .get(&aggregate_id)
            .map(|offsets| offsets.iter().map(|&i| self.events[i].clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn all_events(&self) -> Vec<StoredEvent> {
        let mut all = self.events.clone();
        sort_by_time(&mut all);
        all
    }

    pub(crate) fn aggregate_ids(&self, aggregate_type: AggregateType) -> Vec<AggregateId> {
        self.index.ids(aggregate_type).to_vec()
    }

    pub(crate) fn events_of_type(&self, aggregate_type: AggregateType) -> Vec<StoredEvent> {
        let mut selected: Vec<StoredEvent> = self
            .index
            .ids(aggregate_type)
            .iter()
            .flat_map(|id| self.streams.get(id).into_iter().flatten())
            .map(|&i| self.events[i].clone())
            .collect();
        sort_by_time(&mut selected);
        selected
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }
}

/// Global order: wall-clock timestamp, then append position.
fn sort_by_time(events: &mut [StoredEvent]) {
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.position.cmp(&b.position))
    });
}
