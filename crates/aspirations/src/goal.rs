use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stela_core::{Aggregate, AggregateId, AggregateRoot, AggregateType, DomainError, Version};
use stela_events::{Command, Event};

/// Aggregate root: Goal. A concrete outcome with an optional target date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    id: AggregateId,
    title: String,
    description: Option<String>,
    category: Option<String>,
    target_date: Option<NaiveDate>,
    archived: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: Version,
    created: bool,
}

impl Goal {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn target_date(&self) -> Option<NaiveDate> {
        self.target_date
    }

    pub fn is_archived(&self) -> bool {
        self.archived
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

impl AggregateRoot for Goal {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGoal {
    pub goal_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGoal {
    pub goal_id: AggregateId,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub target_date: Option<Option<NaiveDate>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveGoal {
    pub goal_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalCommand {
    CreateGoal(CreateGoal),
    UpdateGoal(UpdateGoal),
    ArchiveGoal(ArchiveGoal),
}

impl Command for GoalCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            GoalCommand::CreateGoal(c) => c.goal_id,
            GoalCommand::UpdateGoal(c) => c.goal_id,
            GoalCommand::ArchiveGoal(c) => c.goal_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalCreated {
    pub goal_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalUpdated {
    pub goal_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalArchived {
    pub goal_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GoalEvent {
    GoalCreated(GoalCreated),
    GoalUpdated(GoalUpdated),
    GoalArchived(GoalArchived),
}

impl Event for GoalEvent {
    const EVENT_TYPES: &'static [&'static str] = &["GoalCreated", "GoalUpdated", "GoalArchived"];

    fn event_type(&self) -> &'static str {
        match self {
            GoalEvent::GoalCreated(_) => "GoalCreated",
            GoalEvent::GoalUpdated(_) => "GoalUpdated",
            GoalEvent::GoalArchived(_) => "GoalArchived",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            GoalEvent::GoalCreated(e) => e.occurred_at,
            GoalEvent::GoalUpdated(e) => e.occurred_at,
            GoalEvent::GoalArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Goal {
    const AGGREGATE_TYPE: AggregateType = AggregateType::Goal;

    type Command = GoalCommand;
    type Event = GoalEvent;
    type Error = DomainError;

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            title: String::new(),
            description: None,
            category: None,
            target_date: None,
            archived: false,
            created_at: None,
            updated_at: None,
            version: Version::INITIAL,
            created: false,
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            GoalEvent::GoalCreated(e) => {
                self.id = e.goal_id;
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.target_date = e.target_date;
                self.archived = false;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            GoalEvent::GoalUpdated(e) => {
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.target_date = e.target_date;
                self.updated_at = Some(e.occurred_at);
            }
            GoalEvent::GoalArchived(e) => {
                self.archived = true;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version = self.version.next();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            GoalCommand::CreateGoal(cmd) => {
                if self.created {
                    return Err(DomainError::AlreadyExists);
                }
                DomainError::ensure_not_blank("title", &cmd.title)?;

                Ok(vec![GoalEvent::GoalCreated(GoalCreated {
                    goal_id: cmd.goal_id,
                    title: cmd.title.clone(),
                    description: cmd.description.clone(),
                    category: cmd.category.clone(),
                    target_date: cmd.target_date,
                    occurred_at: cmd.occurred_at,
                })])
            }
            GoalCommand::UpdateGoal(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.archived {
                    return Err(DomainError::Archived);
                }
                let title = cmd.title.clone().unwrap_or_else(|| self.title.clone());
                DomainError::ensure_not_blank("title", &title)?;

                Ok(vec![GoalEvent::GoalUpdated(GoalUpdated {
                    goal_id: cmd.goal_id,
                    title,
                    description: cmd.description.clone().unwrap_or_else(|| self.description.clone()),
                    category: cmd.category.clone().unwrap_or_else(|| self.category.clone()),
                    target_date: cmd.target_date.unwrap_or(self.target_date),
                    occurred_at: cmd.occurred_at,
                })])
            }
            GoalCommand::ArchiveGoal(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.archived {
                    return Err(DomainError::AlreadyArchived);
                }
                Ok(vec![GoalEvent::GoalArchived(GoalArchived {
                    goal_id: cmd.goal_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}
