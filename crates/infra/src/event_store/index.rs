//! In-memory stream index: aggregate type → stream ids.

use std::collections::HashMap;

use stela_core::{AggregateId, AggregateType};

/// Tracks which streams exist and which tag owns each one.
///
/// Updated only when a stream is created, so type-scoped reads skip the full
/// log scan.
#[derive(Debug, Default, Clone)]
pub struct StreamIndex {
    by_type: HashMap<AggregateType, Vec<AggregateId>>,
    stream_types: HashMap<AggregateId, AggregateType>,
}

impl StreamIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stream; returns false if it was already known.
    pub fn record(&mut self, aggregate_id: AggregateId, aggregate_type: AggregateType) -> bool {
        if self.stream_types.contains_key(&aggregate_id) {
            return false;
        }
        self.stream_types.insert(aggregate_id, aggregate_type);
        self.by_type.entry(aggregate_type).or_default().push(aggregate_id);
        true
    }

    pub fn type_of(&self, aggregate_id: AggregateId) -> Option<AggregateType> {
        self.stream_types.get(&aggregate_id).copied()
    }

    pub fn ids(&self, aggregate_type: AggregateType) -> &[AggregateId] {
        self.by_type
            .get(&aggregate_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn stream_count(&self) -> usize {
        self.stream_types.len()
    }
}
