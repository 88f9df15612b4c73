use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use stela_core::{Aggregate, AggregateId, AggregateRoot, AggregateType, DomainError, Version};
use stela_events::{Command, Event};

/// Aggregate root: WeeklyReflection, one entry per Monday-to-Sunday week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyReflection {
    id: AggregateId,
    week_start: Option<NaiveDate>,
    content: String,
    mood: Option<u8>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: Version,
    created: bool,
}

impl WeeklyReflection {
    pub fn week_start(&self) -> Option<NaiveDate> {
        self.week_start
    }

    /// The Sunday closing the week.
    pub fn week_end(&self) -> Option<NaiveDate> {
        self.week_start.and_then(week_end)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn mood(&self) -> Option<u8> {
        self.mood
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

fn week_end(start: NaiveDate) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(6))
}

impl AggregateRoot for WeeklyReflection {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWeeklyReflection {
    pub reflection_id: AggregateId,
    pub week_start: NaiveDate,
    pub content: String,
    pub mood: Option<u8>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateWeeklyReflection. `None` keeps, `Some(None)` clears the mood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateWeeklyReflection {
    pub reflection_id: AggregateId,
    pub content: Option<String>,
    pub mood: Option<Option<u8>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeeklyReflectionCommand {
    CreateWeeklyReflection(CreateWeeklyReflection),
    UpdateWeeklyReflection(UpdateWeeklyReflection),
}

impl Command for WeeklyReflectionCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            WeeklyReflectionCommand::CreateWeeklyReflection(c) => c.reflection_id,
            WeeklyReflectionCommand::UpdateWeeklyReflection(c) => c.reflection_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReflectionCreated {
    pub reflection_id: AggregateId,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub content: String,
    pub mood: Option<u8>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReflectionUpdated {
    pub reflection_id: AggregateId,
    pub content: String,
    pub mood: Option<u8>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WeeklyReflectionEvent {
    WeeklyReflectionCreated(WeeklyReflectionCreated),
    WeeklyReflectionUpdated(WeeklyReflectionUpdated),
}

impl Event for WeeklyReflectionEvent {
    const EVENT_TYPES: &'static [&'static str] =
        &["WeeklyReflectionCreated", "WeeklyReflectionUpdated"];

    fn event_type(&self) -> &'static str {
        match self {
            WeeklyReflectionEvent::WeeklyReflectionCreated(_) => "WeeklyReflectionCreated",
            WeeklyReflectionEvent::WeeklyReflectionUpdated(_) => "WeeklyReflectionUpdated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WeeklyReflectionEvent::WeeklyReflectionCreated(e) => e.occurred_at,
            WeeklyReflectionEvent::WeeklyReflectionUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for WeeklyReflection {
    const AGGREGATE_TYPE: AggregateType = AggregateType::WeeklyReflection;

    type Command = WeeklyReflectionCommand;
    type Event = WeeklyReflectionEvent;
    type Error = DomainError;

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            week_start: None,
            content: String::new(),
            mood: None,
            created_at: None,
            updated_at: None,
            version: Version::INITIAL,
            created: false,
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WeeklyReflectionEvent::WeeklyReflectionCreated(e) => {
                self.id = e.reflection_id;
                self.week_start = Some(e.week_start);
                self.content = e.content.clone();
                self.mood = e.mood;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            WeeklyReflectionEvent::WeeklyReflectionUpdated(e) => {
                self.content = e.content.clone();
                self.mood = e.mood;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version = self.version.next();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WeeklyReflectionCommand::CreateWeeklyReflection(cmd) => {
                if self.created {
                    return Err(DomainError::AlreadyExists);
                }
                if cmd.week_start.weekday() != Weekday::Mon {
                    return Err(DomainError::validation(format!(
                        "week must start on a Monday ({} is a {:?})",
                        cmd.week_start,
                        cmd.week_start.weekday()
                    )));
                }
                let end = week_end(cmd.week_start)
                    .ok_or_else(|| DomainError::validation("week start is out of range"))?;
                DomainError::ensure_mood(cmd.mood)?;

                Ok(vec![WeeklyReflectionEvent::WeeklyReflectionCreated(
                    WeeklyReflectionCreated {
                        reflection_id: cmd.reflection_id,
                        week_start: cmd.week_start,
                        week_end: end,
                        content: cmd.content.clone(),
                        mood: cmd.mood,
                        occurred_at: cmd.occurred_at,
                    },
                )])
            }
            WeeklyReflectionCommand::UpdateWeeklyReflection(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                let mood = cmd.mood.unwrap_or(self.mood);
                DomainError::ensure_mood(mood)?;

                Ok(vec![WeeklyReflectionEvent::WeeklyReflectionUpdated(
                    WeeklyReflectionUpdated {
                        reflection_id: cmd.reflection_id,
                        content: cmd.content.clone().unwrap_or_else(|| self.content.clone()),
                        mood,
                        occurred_at: cmd.occurred_at,
                    },
                )])
            }
        }
    }
}
