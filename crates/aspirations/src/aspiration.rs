use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stela_core::{Aggregate, AggregateId, AggregateRoot, AggregateType, DomainError, Version};
use stela_events::{Command, Event};

/// Aggregate root: Aspiration.
///
/// A long-lived intention that habits hang off. It can be paused and resumed
/// any number of times until it is archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aspiration {
    id: AggregateId,
    title: String,
    description: Option<String>,
    category: Option<String>,
    archived: bool,
    paused: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: Version,
    created: bool,
}

impl Aspiration {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl AggregateRoot for Aspiration {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// Command: CreateAspiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAspiration {
    pub aspiration_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateAspiration. `None` keeps, `Some(None)` clears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAspiration {
    pub aspiration_id: AggregateId,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PauseAspiration / ResumeAspiration / ArchiveAspiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspirationLifecycle {
    pub aspiration_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspirationCommand {
    CreateAspiration(CreateAspiration),
    UpdateAspiration(UpdateAspiration),
    PauseAspiration(AspirationLifecycle),
    ResumeAspiration(AspirationLifecycle),
    ArchiveAspiration(AspirationLifecycle),
}

impl Command for AspirationCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            AspirationCommand::CreateAspiration(c) => c.aspiration_id,
            AspirationCommand::UpdateAspiration(c) => c.aspiration_id,
            AspirationCommand::PauseAspiration(c)
            | AspirationCommand::ResumeAspiration(c)
            | AspirationCommand::ArchiveAspiration(c) => c.aspiration_id,
        }
    }
}

/// Event: AspirationCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspirationCreated {
    pub aspiration_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AspirationUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspirationUpdated {
    pub aspiration_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AspirationPaused / AspirationResumed / AspirationArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspirationStatusChanged {
    pub aspiration_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AspirationEvent {
    AspirationCreated(AspirationCreated),
    AspirationUpdated(AspirationUpdated),
    AspirationPaused(AspirationStatusChanged),
    AspirationResumed(AspirationStatusChanged),
    AspirationArchived(AspirationStatusChanged),
}

impl Event for AspirationEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "AspirationCreated",
        "AspirationUpdated",
        "AspirationPaused",
        "AspirationResumed",
        "AspirationArchived",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            AspirationEvent::AspirationCreated(_) => "AspirationCreated",
            AspirationEvent::AspirationUpdated(_) => "AspirationUpdated",
            AspirationEvent::AspirationPaused(_) => "AspirationPaused",
            AspirationEvent::AspirationResumed(_) => "AspirationResumed",
            AspirationEvent::AspirationArchived(_) => "AspirationArchived",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AspirationEvent::AspirationCreated(e) => e.occurred_at,
            AspirationEvent::AspirationUpdated(e) => e.occurred_at,
            AspirationEvent::AspirationPaused(e)
            | AspirationEvent::AspirationResumed(e)
            | AspirationEvent::AspirationArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Aspiration {
    const AGGREGATE_TYPE: AggregateType = AggregateType::Aspiration;

    type Command = AspirationCommand;
    type Event = AspirationEvent;
    type Error = DomainError;

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            title: String::new(),
            description: None,
            category: None,
            archived: false,
            paused: false,
            created_at: None,
            updated_at: None,
            version: Version::INITIAL,
            created: false,
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AspirationEvent::AspirationCreated(e) => {
                self.id = e.aspiration_id;
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.archived = false;
                self.paused = false;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            AspirationEvent::AspirationUpdated(e) => {
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.updated_at = Some(e.occurred_at);
            }
            AspirationEvent::AspirationPaused(e) => {
                self.paused = true;
                self.updated_at = Some(e.occurred_at);
            }
            AspirationEvent::AspirationResumed(e) => {
                self.paused = false;
                self.updated_at = Some(e.occurred_at);
            }
            AspirationEvent::AspirationArchived(e) => {
                self.archived = true;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version = self.version.next();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AspirationCommand::CreateAspiration(cmd) => self.handle_create(cmd),
            AspirationCommand::UpdateAspiration(cmd) => self.handle_update(cmd),
            AspirationCommand::PauseAspiration(cmd) => {
                self.ensure_mutable()?;
                if self.paused {
                    return Err(DomainError::AlreadyPaused);
                }
                Ok(vec![AspirationEvent::AspirationPaused(status_changed(cmd))])
            }
            AspirationCommand::ResumeAspiration(cmd) => {
                self.ensure_mutable()?;
                if !self.paused {
                    return Err(DomainError::invalid_transition("aspiration is not paused"));
                }
                Ok(vec![AspirationEvent::AspirationResumed(status_changed(cmd))])
            }
            AspirationCommand::ArchiveAspiration(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.archived {
                    return Err(DomainError::AlreadyArchived);
                }
                Ok(vec![AspirationEvent::AspirationArchived(status_changed(cmd))])
            }
        }
    }
}

impl Aspiration {
    fn ensure_mutable(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.archived {
            return Err(DomainError::Archived);
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateAspiration) -> Result<Vec<AspirationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::AlreadyExists);
        }
        DomainError::ensure_not_blank("title", &cmd.title)?;

        Ok(vec![AspirationEvent::AspirationCreated(AspirationCreated {
            aspiration_id: cmd.aspiration_id,
            title: cmd.title.clone(),
            description: cmd.description.clone(),
            category: cmd.category.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateAspiration) -> Result<Vec<AspirationEvent>, DomainError> {
        self.ensure_mutable()?;

        let title = cmd.title.clone().unwrap_or_else(|| self.title.clone());
        DomainError::ensure_not_blank("title", &title)?;

        Ok(vec![AspirationEvent::AspirationUpdated(AspirationUpdated {
            aspiration_id: cmd.aspiration_id,
            title,
            description: cmd.description.clone().unwrap_or_else(|| self.description.clone()),
            category: cmd.category.clone().unwrap_or_else(|| self.category.clone()),
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn status_changed(cmd: &AspirationLifecycle) -> AspirationStatusChanged {
    AspirationStatusChanged {
        aspiration_id: cmd.aspiration_id,
        occurred_at: cmd.occurred_at,
    }
}
