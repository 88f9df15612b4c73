//! Event vocabulary plumbing shared by every aggregate crate.

pub mod command;
pub mod envelope;
pub mod event;

pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::{Event, EventDecodeError};
