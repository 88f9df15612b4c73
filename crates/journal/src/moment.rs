use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stela_core::{Aggregate, AggregateId, AggregateRoot, AggregateType, DomainError, Version};
use stela_events::{Command, Event};

/// Aggregate root: Moment, a captured photo with an optional caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moment {
    id: AggregateId,
    photo_ref: String,
    caption: Option<String>,
    captured_at: Option<DateTime<Utc>>,
    deleted: bool,
    version: Version,
    created: bool,
}

impl Moment {
    pub fn photo_ref(&self) -> &str {
        &self.photo_ref
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Moment {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureMoment {
    pub moment_id: AggregateId,
    pub photo_ref: String,
    pub caption: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMomentCaption {
    pub moment_id: AggregateId,
    pub caption: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMoment {
    pub moment_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentCommand {
    CaptureMoment(CaptureMoment),
    UpdateMomentCaption(UpdateMomentCaption),
    DeleteMoment(DeleteMoment),
}

impl Command for MomentCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            MomentCommand::CaptureMoment(c) => c.moment_id,
            MomentCommand::UpdateMomentCaption(c) => c.moment_id,
            MomentCommand::DeleteMoment(c) => c.moment_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentCaptured {
    pub moment_id: AggregateId,
    pub photo_ref: String,
    pub caption: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentCaptionUpdated {
    pub moment_id: AggregateId,
    pub caption: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentDeleted {
    pub moment_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MomentEvent {
    MomentCaptured(MomentCaptured),
    MomentCaptionUpdated(MomentCaptionUpdated),
    MomentDeleted(MomentDeleted),
}

impl Event for MomentEvent {
    const EVENT_TYPES: &'static [&'static str] =
        &["MomentCaptured", "MomentCaptionUpdated", "MomentDeleted"];

    fn event_type(&self) -> &'static str {
        match self {
            MomentEvent::MomentCaptured(_) => "MomentCaptured",
            MomentEvent::MomentCaptionUpdated(_) => "MomentCaptionUpdated",
            MomentEvent::MomentDeleted(_) => "MomentDeleted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MomentEvent::MomentCaptured(e) => e.occurred_at,
            MomentEvent::MomentCaptionUpdated(e) => e.occurred_at,
            MomentEvent::MomentDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Moment {
    const AGGREGATE_TYPE: AggregateType = AggregateType::Moment;

    type Command = MomentCommand;
    type Event = MomentEvent;
    type Error = DomainError;

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            photo_ref: String::new(),
            caption: None,
            captured_at: None,
            deleted: false,
            version: Version::INITIAL,
            created: false,
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MomentEvent::MomentCaptured(e) => {
                self.id = e.moment_id;
                self.photo_ref = e.photo_ref.clone();
                self.caption = e.caption.clone();
                self.captured_at = Some(e.occurred_at);
                self.deleted = false;
                self.created = true;
            }
            MomentEvent::MomentCaptionUpdated(e) => {
                self.caption = e.caption.clone();
            }
            MomentEvent::MomentDeleted(_) => {
                self.deleted = true;
            }
        }

        self.version = self.version.next();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MomentCommand::CaptureMoment(cmd) => {
                if self.created {
                    return Err(DomainError::AlreadyExists);
                }
                DomainError::ensure_not_blank("photo_ref", &cmd.photo_ref)?;
                Ok(vec![MomentEvent::MomentCaptured(MomentCaptured {
                    moment_id: cmd.moment_id,
                    photo_ref: cmd.photo_ref.clone(),
                    caption: cmd.caption.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            MomentCommand::UpdateMomentCaption(cmd) => {
                self.ensure_live()?;
                Ok(vec![MomentEvent::MomentCaptionUpdated(MomentCaptionUpdated {
                    moment_id: cmd.moment_id,
                    caption: cmd.caption.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            MomentCommand::DeleteMoment(cmd) => {
                self.ensure_live()?;
                Ok(vec![MomentEvent::MomentDeleted(MomentDeleted {
                    moment_id: cmd.moment_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Moment {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.deleted {
            return Err(DomainError::AlreadyDeleted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 18, 30, 0).unwrap()
    }

    fn captured_moment() -> Moment {
        let moment_id = AggregateId::new();
        let mut moment = Moment::empty(moment_id);
        let events = moment
            .handle(&MomentCommand::CaptureMoment(CaptureMoment {
                moment_id,
                photo_ref: "photos/sunset.jpg".to_string(),
                caption: None,
                occurred_at: test_time(),
            }))
            .unwrap();
        moment.apply(&events[0]);
        moment
    }

    #[test]
    fn capture_then_caption() {
        let mut moment = captured_moment();
        assert_eq!(moment.photo_ref(), "photos/sunset.jpg");
        assert_eq!(moment.captured_at(), Some(test_time()));

        let events = moment
            .handle(&MomentCommand::UpdateMomentCaption(UpdateMomentCaption {
                moment_id: *moment.id(),
                caption: Some("pier at dusk".to_string()),
                occurred_at: test_time(),
            }))
            .unwrap();
        moment.apply(&events[0]);
        assert_eq!(moment.caption(), Some("pier at dusk"));
        assert_eq!(moment.version(), Version::new(2));
    }

    #[test]
    fn deleted_moment_rejects_everything() {
        let mut moment = captured_moment();
        let delete = MomentCommand::DeleteMoment(DeleteMoment {
            moment_id: *moment.id(),
            occurred_at: test_time(),
        });
        let events = moment.handle(&delete).unwrap();
        moment.apply(&events[0]);
        assert!(moment.is_deleted());

        assert_eq!(moment.handle(&delete).unwrap_err(), DomainError::AlreadyDeleted);
        let caption = MomentCommand::UpdateMomentCaption(UpdateMomentCaption {
            moment_id: *moment.id(),
            caption: None,
            occurred_at: test_time(),
        });
        match moment.handle(&caption).unwrap_err() {
            DomainError::AlreadyDeleted => {}
            _ => panic!("Expected AlreadyDeleted error"),
        }
    }

    #[test]
    fn blank_photo_ref_is_rejected() {
        let moment_id = AggregateId::new();
        let moment = Moment::empty(moment_id);
        let err = moment
            .handle(&MomentCommand::CaptureMoment(CaptureMoment {
                moment_id,
                photo_ref: " ".to_string(),
                caption: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
