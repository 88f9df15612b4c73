use stela_core::AggregateId;

/// A command targets a specific aggregate.
///
/// Commands represent **intent** ("pause this habit"). They are transient:
/// the aggregate either rejects them with a domain error or turns them into
/// events, which are what gets persisted.
///
/// Commands must specify which aggregate they target so the runtime can refuse
/// to run a command against a handle for a different identity.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
