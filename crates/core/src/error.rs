//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a deterministic rule violation raised by a command or by
/// replay. These are recoverable by the caller; storage faults live in the
/// infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank title, mood out of range).
    #[error("validation failed: {0}")]
    Validation(String),

    /// `create` on an aggregate (or embedded entity) that already exists.
    #[error("already exists")]
    AlreadyExists,

    /// A mutator was issued before the aggregate was created.
    #[error("not found")]
    NotFound,

    /// A mutator was issued against an archived aggregate.
    #[error("archived: cannot mutate")]
    Archived,

    #[error("already archived")]
    AlreadyArchived,

    #[error("already paused")]
    AlreadyPaused,

    #[error("already dismissed")]
    AlreadyDismissed,

    #[error("already logged")]
    AlreadyLogged,

    #[error("already deleted")]
    AlreadyDeleted,

    /// A state change that is not allowed from the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Replay met an event name outside the aggregate's vocabulary.
    ///
    /// Signals a corrupted log or a writer/reader version skew.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn unknown_event_type(event_type: impl Into<String>) -> Self {
        Self::UnknownEventType(event_type.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Guard for non-blank text fields.
    pub fn ensure_not_blank(field: &str, value: &str) -> DomainResult<()> {
        if value.trim().is_empty() {
            return Err(Self::validation(format!("{field} cannot be empty")));
        }
        Ok(())
    }

    /// Guard for 1..=5 mood scores.
    pub fn ensure_mood(mood: Option<u8>) -> DomainResult<()> {
        match mood {
            Some(m) if !(1..=5).contains(&m) => {
                Err(Self::validation(format!("mood must be between 1 and 5 (got {m})")))
            }
            _ => Ok(()),
        }
    }
}
