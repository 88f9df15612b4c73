//! Aggregate root traits and the closed set of aggregate type tags.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::AggregateId;
use crate::version::Version;

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Position of the last event folded into this state.
    ///
    /// `Version::INITIAL` for a state that has seen no events.
    fn version(&self) -> Version;
}

/// Tag naming which state machine owns a stream.
///
/// Every event of one aggregate id carries the same tag. The tag is written
/// and read through this enum only, so writers and readers can never disagree
/// on spelling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    Habit,
    Aspiration,
    Activity,
    Project,
    Goal,
    Moment,
    WeeklyReflection,
    StelaMessage,
}

impl AggregateType {
    pub const ALL: [AggregateType; 8] = [
        AggregateType::Habit,
        AggregateType::Aspiration,
        AggregateType::Activity,
        AggregateType::Project,
        AggregateType::Goal,
        AggregateType::Moment,
        AggregateType::WeeklyReflection,
        AggregateType::StelaMessage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateType::Habit => "habit",
            AggregateType::Aspiration => "aspiration",
            AggregateType::Activity => "activity",
            AggregateType::Project => "project",
            AggregateType::Goal => "goal",
            AggregateType::Moment => "moment",
            AggregateType::WeeklyReflection => "weekly_reflection",
            AggregateType::StelaMessage => "stela_message",
        }
    }
}

impl core::fmt::Display for AggregateType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown aggregate type '{s}'")))
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO or side effects.
pub trait Aggregate: AggregateRoot<Id = AggregateId> + Clone {
    /// Stream tag stamped on every event this aggregate emits.
    const AGGREGATE_TYPE: AggregateType;

    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Empty, not-yet-created instance used as the replay seed.
    fn empty(id: AggregateId) -> Self;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations advance `version()` by exactly one per applied event.
    fn apply(&mut self, event: &Self::Event);

    /// Check that a stored event can follow the current state before it is
    /// replayed. An `Err` marks the stream as corrupt.
    fn check_replay(&self, _event: &Self::Event) -> Result<(), String> {
        Ok(())
    }

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
