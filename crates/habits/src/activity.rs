use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stela_core::{Aggregate, AggregateId, AggregateRoot, AggregateType, DomainError, Version};
use stela_events::{Command, Event};

/// What stood in the way of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResistanceType {
    Tired,
    Busy,
    Unmotivated,
    Overwhelmed,
    Other,
}

/// Aggregate root: Activity, one logged session of a habit.
///
/// Logged exactly once, amendable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    id: AggregateId,
    habit_id: Option<AggregateId>,
    value: Option<f64>,
    completed: bool,
    notes: Option<String>,
    mood: Option<u8>,
    resistance_overcome: bool,
    resistance_type: Option<ResistanceType>,
    photos: Vec<String>,
    logged_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: Version,
    logged: bool,
}

impl Activity {
    pub fn habit_id(&self) -> Option<AggregateId> {
        self.habit_id
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn mood(&self) -> Option<u8> {
        self.mood
    }

    pub fn resistance_overcome(&self) -> bool {
        self.resistance_overcome
    }

    pub fn resistance_type(&self) -> Option<ResistanceType> {
        self.resistance_type
    }

    pub fn photos(&self) -> &[String] {
        &self.photos
    }

    pub fn logged_at(&self) -> Option<DateTime<Utc>> {
        self.logged_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_logged(&self) -> bool {
        self.logged
    }
}

impl AggregateRoot for Activity {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// Command: LogActivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogActivity {
    pub activity_id: AggregateId,
    pub habit_id: AggregateId,
    pub value: Option<f64>,
    pub completed: bool,
    pub notes: Option<String>,
    pub mood: Option<u8>,
    pub resistance_overcome: bool,
    pub resistance_type: Option<ResistanceType>,
    pub photos: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateActivity. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateActivity {
    pub activity_id: AggregateId,
    pub value: Option<Option<f64>>,
    pub completed: Option<bool>,
    pub notes: Option<Option<String>>,
    pub mood: Option<Option<u8>>,
    pub resistance_overcome: Option<bool>,
    pub resistance_type: Option<Option<ResistanceType>>,
    pub photos: Option<Vec<String>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivityCommand {
    LogActivity(LogActivity),
    UpdateActivity(UpdateActivity),
}

impl Command for ActivityCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            ActivityCommand::LogActivity(c) => c.activity_id,
            ActivityCommand::UpdateActivity(c) => c.activity_id,
        }
    }
}

/// Event: ActivityLogged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogged {
    pub activity_id: AggregateId,
    pub habit_id: AggregateId,
    pub value: Option<f64>,
    pub completed: bool,
    pub notes: Option<String>,
    pub mood: Option<u8>,
    pub resistance_overcome: bool,
    pub resistance_type: Option<ResistanceType>,
    pub photos: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ActivityUpdated (full amended details).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityUpdated {
    pub activity_id: AggregateId,
    pub value: Option<f64>,
    pub completed: bool,
    pub notes: Option<String>,
    pub mood: Option<u8>,
    pub resistance_overcome: bool,
    pub resistance_type: Option<ResistanceType>,
    pub photos: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ActivityEvent {
    ActivityLogged(ActivityLogged),
    ActivityUpdated(ActivityUpdated),
}

impl Event for ActivityEvent {
    const EVENT_TYPES: &'static [&'static str] = &["ActivityLogged", "ActivityUpdated"];

    fn event_type(&self) -> &'static str {
        match self {
            ActivityEvent::ActivityLogged(_) => "ActivityLogged",
            ActivityEvent::ActivityUpdated(_) => "ActivityUpdated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ActivityEvent::ActivityLogged(e) => e.occurred_at,
            ActivityEvent::ActivityUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Activity {
    const AGGREGATE_TYPE: AggregateType = AggregateType::Activity;

    type Command = ActivityCommand;
    type Event = ActivityEvent;
    type Error = DomainError;

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            habit_id: None,
            value: None,
            completed: false,
            notes: None,
            mood: None,
            resistance_overcome: false,
            resistance_type: None,
            photos: Vec::new(),
            logged_at: None,
            updated_at: None,
            version: Version::INITIAL,
            logged: false,
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ActivityEvent::ActivityLogged(e) => {
                self.id = e.activity_id;
                self.habit_id = Some(e.habit_id);
                self.value = e.value;
                self.completed = e.completed;
                self.notes = e.notes.clone();
                self.mood = e.mood;
                self.resistance_overcome = e.resistance_overcome;
                self.resistance_type = e.resistance_type;
                self.photos = e.photos.clone();
                self.logged_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.logged = true;
            }
            ActivityEvent::ActivityUpdated(e) => {
                self.value = e.value;
                self.completed = e.completed;
                self.notes = e.notes.clone();
                self.mood = e.mood;
                self.resistance_overcome = e.resistance_overcome;
                self.resistance_type = e.resistance_type;
                self.photos = e.photos.clone();
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version = self.version.next();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ActivityCommand::LogActivity(cmd) => self.handle_log(cmd),
            ActivityCommand::UpdateActivity(cmd) => self.handle_update(cmd),
        }
    }
}

fn ensure_value(value: Option<f64>) -> Result<(), DomainError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(DomainError::validation("value must be a non-negative number"))
        }
        _ => Ok(()),
    }
}

impl Activity {
    fn handle_log(&self, cmd: &LogActivity) -> Result<Vec<ActivityEvent>, DomainError> {
        if self.logged {
            return Err(DomainError::AlreadyLogged);
        }
        ensure_value(cmd.value)?;
        DomainError::ensure_mood(cmd.mood)?;

        Ok(vec![ActivityEvent::ActivityLogged(ActivityLogged {
            activity_id: cmd.activity_id,
            habit_id: cmd.habit_id,
            value: cmd.value,
            completed: cmd.completed,
            notes: cmd.notes.clone(),
            mood: cmd.mood,
            resistance_overcome: cmd.resistance_overcome,
            resistance_type: cmd.resistance_type,
            photos: cmd.photos.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateActivity) -> Result<Vec<ActivityEvent>, DomainError> {
        if !self.logged {
            return Err(DomainError::not_found());
        }

        let value = cmd.value.unwrap_or(self.value);
        ensure_value(value)?;
        let mood = cmd.mood.unwrap_or(self.mood);
        DomainError::ensure_mood(mood)?;

        Ok(vec![ActivityEvent::ActivityUpdated(ActivityUpdated {
            activity_id: cmd.activity_id,
            value,
            completed: cmd.completed.unwrap_or(self.completed),
            notes: cmd.notes.clone().unwrap_or_else(|| self.notes.clone()),
            mood,
            resistance_overcome: cmd.resistance_overcome.unwrap_or(self.resistance_overcome),
            resistance_type: cmd.resistance_type.unwrap_or(self.resistance_type),
            photos: cmd.photos.clone().unwrap_or_else(|| self.photos.clone()),
            occurred_at: cmd.occurred_at,
        })])
    }
}
