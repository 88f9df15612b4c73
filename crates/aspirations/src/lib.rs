//! Aspirations and goals: the long-lived intentions habits and projects serve.

pub mod aspiration;
pub mod goal;

pub use aspiration::{
    Aspiration, AspirationCommand, AspirationCreated, AspirationEvent, AspirationLifecycle,
    AspirationStatusChanged, AspirationUpdated, CreateAspiration, UpdateAspiration,
};
pub use goal::{
    ArchiveGoal, CreateGoal, Goal, GoalArchived, GoalCommand, GoalCreated, GoalEvent, GoalUpdated,
    UpdateGoal,
};
