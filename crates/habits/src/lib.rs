//! Habits and the sessions logged against them (event-sourced).
//!
//! Pure domain logic only: commands in, events out, state by folding events.

pub mod activity;
pub mod habit;

pub use activity::{
    Activity, ActivityCommand, ActivityEvent, ActivityLogged, ActivityUpdated, LogActivity,
    ResistanceType, UpdateActivity,
};
pub use habit::{
    Cadence, CreateHabit, Habit, HabitCommand, HabitCreated, HabitEvent, HabitLifecycle,
    HabitStatusChanged, HabitUpdated, TrackingMetric, UpdateHabit,
};
