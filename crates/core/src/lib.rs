//! `stela-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every tracked
//! entity (no storage, no IO).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use aggregate::{Aggregate, AggregateRoot, AggregateType};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, PhaseId};
pub use version::{ExpectedVersion, Version};
