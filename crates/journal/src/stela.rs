use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stela_core::{Aggregate, AggregateId, AggregateRoot, AggregateType, DomainError, Version};
use stela_events::{Command, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    NotRelevant,
    Done,
    Later,
}

/// Aggregate root: StelaMessage, the nudge shown for a calendar day.
///
/// Uniqueness per day is not enforced here; readers pick the newest live
/// message for a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StelaMessage {
    id: AggregateId,
    category: String,
    message: String,
    day: Option<NaiveDate>,
    created_at: Option<DateTime<Utc>>,
    dismissed_reason: Option<DismissReason>,
    dismissed_at: Option<DateTime<Utc>>,
    version: Version,
    created: bool,
}

impl StelaMessage {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.day
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn dismissed_reason(&self) -> Option<DismissReason> {
        self.dismissed_reason
    }

    pub fn dismissed_at(&self) -> Option<DateTime<Utc>> {
        self.dismissed_at
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed_reason.is_some()
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for StelaMessage {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStelaMessage {
    pub message_id: AggregateId,
    pub category: String,
    pub message: String,
    pub day: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissStelaMessage {
    pub message_id: AggregateId,
    pub reason: DismissReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StelaMessageCommand {
    CreateStelaMessage(CreateStelaMessage),
    DismissStelaMessage(DismissStelaMessage),
}

impl Command for StelaMessageCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            StelaMessageCommand::CreateStelaMessage(c) => c.message_id,
            StelaMessageCommand::DismissStelaMessage(c) => c.message_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StelaMessageCreated {
    pub message_id: AggregateId,
    pub category: String,
    pub message: String,
    pub day: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StelaMessageDismissed {
    pub message_id: AggregateId,
    pub reason: DismissReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StelaMessageEvent {
    StelaMessageCreated(StelaMessageCreated),
    StelaMessageDismissed(StelaMessageDismissed),
}

impl Event for StelaMessageEvent {
    const EVENT_TYPES: &'static [&'static str] = &["StelaMessageCreated", "StelaMessageDismissed"];

    fn event_type(&self) -> &'static str {
        match self {
            StelaMessageEvent::StelaMessageCreated(_) => "StelaMessageCreated",
            StelaMessageEvent::StelaMessageDismissed(_) => "StelaMessageDismissed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StelaMessageEvent::StelaMessageCreated(e) => e.occurred_at,
            StelaMessageEvent::StelaMessageDismissed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StelaMessage {
    const AGGREGATE_TYPE: AggregateType = AggregateType::StelaMessage;

    type Command = StelaMessageCommand;
    type Event = StelaMessageEvent;
    type Error = DomainError;

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            category: String::new(),
            message: String::new(),
            day: None,
            created_at: None,
            dismissed_reason: None,
            dismissed_at: None,
            version: Version::INITIAL,
            created: false,
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StelaMessageEvent::StelaMessageCreated(e) => {
                self.id = e.message_id;
                self.category = e.category.clone();
                self.message = e.message.clone();
                self.day = Some(e.day);
                self.created_at = Some(e.occurred_at);
                self.dismissed_reason = None;
                self.dismissed_at = None;
                self.created = true;
            }
            StelaMessageEvent::StelaMessageDismissed(e) => {
                self.dismissed_reason = Some(e.reason);
                self.dismissed_at = Some(e.occurred_at);
            }
        }

        self.version = self.version.next();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StelaMessageCommand::CreateStelaMessage(cmd) => {
                if self.created {
                    return Err(DomainError::AlreadyExists);
                }
                DomainError::ensure_not_blank("category", &cmd.category)?;
                DomainError::ensure_not_blank("message", &cmd.message)?;

                Ok(vec![StelaMessageEvent::StelaMessageCreated(StelaMessageCreated {
                    message_id: cmd.message_id,
                    category: cmd.category.clone(),
                    message: cmd.message.clone(),
                    day: cmd.day,
                    occurred_at: cmd.occurred_at,
                })])
            }
            StelaMessageCommand::DismissStelaMessage(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.is_dismissed() {
                    return Err(DomainError::AlreadyDismissed);
                }

                Ok(vec![StelaMessageEvent::StelaMessageDismissed(StelaMessageDismissed {
                    message_id: cmd.message_id,
                    reason: cmd.reason,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
