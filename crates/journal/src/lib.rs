//! Journal entries: moments, weekly reflections and daily messages.

pub mod moment;
pub mod reflection;
pub mod stela;

pub use moment::{
    CaptureMoment, DeleteMoment, Moment, MomentCaptionUpdated, MomentCaptured, MomentCommand,
    MomentDeleted, MomentEvent, UpdateMomentCaption,
};
pub use reflection::{
    CreateWeeklyReflection, UpdateWeeklyReflection, WeeklyReflection, WeeklyReflectionCommand,
    WeeklyReflectionCreated, WeeklyReflectionEvent, WeeklyReflectionUpdated,
};
pub use stela::{
    CreateStelaMessage, DismissReason, DismissStelaMessage, StelaMessage, StelaMessageCommand,
    StelaMessageCreated, StelaMessageDismissed, StelaMessageEvent,
};
