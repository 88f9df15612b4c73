use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use stela_core::{Aggregate, AggregateId, AggregateRoot, AggregateType, DomainError, Version};
use stela_events::{Command, Event};

/// What a habit session measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMetric {
    Checkmark,
    Count,
    Duration,
    Distance,
}

/// How often a habit is meant to happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    Weekly { times_per_week: u8 },
    SpecificDays(Vec<Weekday>),
}

impl Cadence {
    fn validate(&self) -> Result<(), DomainError> {
        match self {
            Cadence::Daily => Ok(()),
            Cadence::Weekly { times_per_week } if (1..=7).contains(times_per_week) => Ok(()),
            Cadence::Weekly { times_per_week } => Err(DomainError::validation(format!(
                "times_per_week must be between 1 and 7 (got {times_per_week})"
            ))),
            Cadence::SpecificDays(days) if days.is_empty() => {
                Err(DomainError::validation("specific days cannot be empty"))
            }
            Cadence::SpecificDays(_) => Ok(()),
        }
    }
}

/// Aggregate root: Habit.
#[derive(Debug, Clone, PartialEq)]
pub struct Habit {
    id: AggregateId,
    title: String,
    description: Option<String>,
    category: Option<String>,
    aspiration_id: Option<AggregateId>,
    cadence: Cadence,
    reminder_time: Option<NaiveTime>,
    metric: TrackingMetric,
    unit: Option<String>,
    target: Option<f64>,
    archived: bool,
    paused: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: Version,
    created: bool,
}

impl Habit {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn aspiration_id(&self) -> Option<AggregateId> {
        self.aspiration_id
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    pub fn reminder_time(&self) -> Option<NaiveTime> {
        self.reminder_time
    }

    pub fn metric(&self) -> TrackingMetric {
        self.metric
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn target(&self) -> Option<f64> {
        self.target
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

impl AggregateRoot for Habit {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// Command: CreateHabit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateHabit {
    pub habit_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub aspiration_id: Option<AggregateId>,
    pub cadence: Cadence,
    pub reminder_time: Option<NaiveTime>,
    pub metric: TrackingMetric,
    pub unit: Option<String>,
    pub target: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateHabit.
///
/// `None` keeps the current value. For optional fields `Some(None)` clears it.
/// Metric, unit and target cannot be changed after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateHabit {
    pub habit_id: AggregateId,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub aspiration_id: Option<Option<AggregateId>>,
    pub cadence: Option<Cadence>,
    pub reminder_time: Option<Option<NaiveTime>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PauseHabit / ResumeHabit / ArchiveHabit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitLifecycle {
    pub habit_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HabitCommand {
    CreateHabit(CreateHabit),
    UpdateHabit(UpdateHabit),
    PauseHabit(HabitLifecycle),
    ResumeHabit(HabitLifecycle),
    ArchiveHabit(HabitLifecycle),
}

impl Command for HabitCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            HabitCommand::CreateHabit(c) => c.habit_id,
            HabitCommand::UpdateHabit(c) => c.habit_id,
            HabitCommand::PauseHabit(c) | HabitCommand::ResumeHabit(c) | HabitCommand::ArchiveHabit(c) => {
                c.habit_id
            }
        }
    }
}

/// Event: HabitCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitCreated {
    pub habit_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub aspiration_id: Option<AggregateId>,
    pub cadence: Cadence,
    pub reminder_time: Option<NaiveTime>,
    pub metric: TrackingMetric,
    pub unit: Option<String>,
    pub target: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: HabitUpdated (carries the full editable state after the update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitUpdated {
    pub habit_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub aspiration_id: Option<AggregateId>,
    pub cadence: Cadence,
    pub reminder_time: Option<NaiveTime>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: HabitPaused / HabitResumed / HabitArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitStatusChanged {
    pub habit_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HabitEvent {
    HabitCreated(HabitCreated),
    HabitUpdated(HabitUpdated),
    HabitPaused(HabitStatusChanged),
    HabitResumed(HabitStatusChanged),
    HabitArchived(HabitStatusChanged),
}

impl Event for HabitEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "HabitCreated",
        "HabitUpdated",
        "HabitPaused",
        "HabitResumed",
        "HabitArchived",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            HabitEvent::HabitCreated(_) => "HabitCreated",
            HabitEvent::HabitUpdated(_) => "HabitUpdated",
            HabitEvent::HabitPaused(_) => "HabitPaused",
            HabitEvent::HabitResumed(_) => "HabitResumed",
            HabitEvent::HabitArchived(_) => "HabitArchived",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            HabitEvent::HabitCreated(e) => e.occurred_at,
            HabitEvent::HabitUpdated(e) => e.occurred_at,
            HabitEvent::HabitPaused(e) | HabitEvent::HabitResumed(e) | HabitEvent::HabitArchived(e) => {
                e.occurred_at
            }
        }
    }
}

impl Aggregate for Habit {
    const AGGREGATE_TYPE: AggregateType = AggregateType::Habit;

    type Command = HabitCommand;
    type Event = HabitEvent;
    type Error = DomainError;

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            title: String::new(),
            description: None,
            category: None,
            aspiration_id: None,
            cadence: Cadence::Daily,
            reminder_time: None,
            metric: TrackingMetric::Checkmark,
            unit: None,
            target: None,
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
            HabitEvent::HabitCreated(e) => {
                self.id = e.habit_id;
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.aspiration_id = e.aspiration_id;
                self.cadence = e.cadence.clone();
                self.reminder_time = e.reminder_time;
                self.metric = e.metric;
                self.unit = e.unit.clone();
                self.target = e.target;
                self.archived = false;
                self.paused = false;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            HabitEvent::HabitUpdated(e) => {
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.aspiration_id = e.aspiration_id;
                self.cadence = e.cadence.clone();
                self.reminder_time = e.reminder_time;
                self.updated_at = Some(e.occurred_at);
            }
            HabitEvent::HabitPaused(e) => {
                self.paused = true;
                self.updated_at = Some(e.occurred_at);
            }
            HabitEvent::HabitResumed(e) => {
                self.paused = false;
                self.updated_at = Some(e.occurred_at);
            }
            HabitEvent::HabitArchived(e) => {
                self.archived = true;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version = self.version.next();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            HabitCommand::CreateHabit(cmd) => self.handle_create(cmd),
            HabitCommand::UpdateHabit(cmd) => self.handle_update(cmd),
            HabitCommand::PauseHabit(cmd) => self.handle_pause(cmd),
            HabitCommand::ResumeHabit(cmd) => self.handle_resume(cmd),
            HabitCommand::ArchiveHabit(cmd) => self.handle_archive(cmd),
        }
    }
}

impl Habit {
    fn ensure_mutable(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.archived {
            return Err(DomainError::Archived);
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateHabit) -> Result<Vec<HabitEvent>, DomainError> {
        if self.created {
            return Err(DomainError::AlreadyExists);
        }
        DomainError::ensure_not_blank("title", &cmd.title)?;
        cmd.cadence.validate()?;
        if let Some(target) = cmd.target {
            if !target.is_finite() || target < 0.0 {
                return Err(DomainError::validation("target must be a non-negative number"));
            }
        }
        if let Some(unit) = &cmd.unit {
            DomainError::ensure_not_blank("unit", unit)?;
        }

        Ok(vec![HabitEvent::HabitCreated(HabitCreated {
            habit_id: cmd.habit_id,
            title: cmd.title.clone(),
            description: cmd.description.clone(),
            category: cmd.category.clone(),
            aspiration_id: cmd.aspiration_id,
            cadence: cmd.cadence.clone(),
            reminder_time: cmd.reminder_time,
            metric: cmd.metric,
            unit: cmd.unit.clone(),
            target: cmd.target,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateHabit) -> Result<Vec<HabitEvent>, DomainError> {
        self.ensure_mutable()?;

        let title = cmd.title.clone().unwrap_or_else(|| self.title.clone());
        DomainError::ensure_not_blank("title", &title)?;
        let cadence = cmd.cadence.clone().unwrap_or_else(|| self.cadence.clone());
        cadence.validate()?;

        Ok(vec![HabitEvent::HabitUpdated(HabitUpdated {
            habit_id: cmd.habit_id,
            title,
            description: cmd.description.clone().unwrap_or_else(|| self.description.clone()),
            category: cmd.category.clone().unwrap_or_else(|| self.category.clone()),
            aspiration_id: cmd.aspiration_id.unwrap_or(self.aspiration_id),
            cadence,
            reminder_time: cmd.reminder_time.unwrap_or(self.reminder_time),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pause(&self, cmd: &HabitLifecycle) -> Result<Vec<HabitEvent>, DomainError> {
        self.ensure_mutable()?;
        if self.paused {
            return Err(DomainError::AlreadyPaused);
        }
        Ok(vec![HabitEvent::HabitPaused(status_changed(cmd))])
    }

    fn handle_resume(&self, cmd: &HabitLifecycle) -> Result<Vec<HabitEvent>, DomainError> {
        self.ensure_mutable()?;
        if !self.paused {
            return Err(DomainError::invalid_transition("habit is not paused"));
        }
        Ok(vec![HabitEvent::HabitResumed(status_changed(cmd))])
    }

    fn handle_archive(&self, cmd: &HabitLifecycle) -> Result<Vec<HabitEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.archived {
            return Err(DomainError::AlreadyArchived);
        }
        Ok(vec![HabitEvent::HabitArchived(status_changed(cmd))])
    }
}

fn status_changed(cmd: &HabitLifecycle) -> HabitStatusChanged {
    HabitStatusChanged {
        habit_id: cmd.habit_id,
        occurred_at: cmd.occurred_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_habit_id() -> AggregateId {
        AggregateId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 6, 7, 30, 0).unwrap()
    }

    fn create_cmd(habit_id: AggregateId) -> CreateHabit {
        CreateHabit {
            habit_id,
            title: "Walk".to_string(),
            description: None,
            category: Some("health".to_string()),
            aspiration_id: None,
            cadence: Cadence::Daily,
            reminder_time: NaiveTime::from_hms_opt(7, 0, 0),
            metric: TrackingMetric::Distance,
            unit: Some("miles".to_string()),
            target: Some(2.0),
            occurred_at: test_time(),
        }
    }

    fn lifecycle(habit_id: AggregateId) -> HabitLifecycle {
        HabitLifecycle {
            habit_id,
            occurred_at: test_time(),
        }
    }

    fn created_habit() -> Habit {
        let habit_id = test_habit_id();
        let mut habit = Habit::empty(habit_id);
        let events = habit
            .handle(&HabitCommand::CreateHabit(create_cmd(habit_id)))
            .unwrap();
        habit.apply(&events[0]);
        habit
    }

    fn run(habit: &mut Habit, cmd: HabitCommand) -> Result<(), DomainError> {
        for event in habit.handle(&cmd)? {
            habit.apply(&event);
        }
        Ok(())
    }

    #[test]
    fn create_habit_emits_habit_created_event() {
        let habit_id = test_habit_id();
        let habit = Habit::empty(habit_id);

        let events = habit
            .handle(&HabitCommand::CreateHabit(create_cmd(habit_id)))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            HabitEvent::HabitCreated(e) => {
                assert_eq!(e.habit_id, habit_id);
                assert_eq!(e.title, "Walk");
                assert_eq!(e.metric, TrackingMetric::Distance);
                assert_eq!(e.unit.as_deref(), Some("miles"));
                assert_eq!(e.target, Some(2.0));
            }
            _ => panic!("Expected HabitCreated event"),
        }
    }

    #[test]
    fn title_is_recorded_as_given() {
        let habit_id = test_habit_id();
        let mut habit = Habit::empty(habit_id);
        let mut cmd = create_cmd(habit_id);
        cmd.title = "  Walk ".to_string();

        run(&mut habit, HabitCommand::CreateHabit(cmd)).unwrap();
        assert_eq!(habit.title(), "  Walk ");

        let err = habit
            .handle(&HabitCommand::UpdateHabit(UpdateHabit {
                habit_id,
                title: Some("   ".to_string()),
                description: None,
                category: None,
                aspiration_id: None,
                cadence: None,
                reminder_time: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn created_habit_has_default_flags() {
        let habit = created_habit();
        assert!(habit.exists());
        assert!(!habit.is_archived());
        assert!(!habit.is_paused());
        assert_eq!(habit.version(), Version::new(1));
        assert_eq!(habit.created_at(), Some(test_time()));
    }

    #[test]
    fn create_rejects_duplicate_creation() {
        let mut habit = created_habit();
        let id = *habit.id();
        let err = run(&mut habit, HabitCommand::CreateHabit(create_cmd(id))).unwrap_err();
        assert_eq!(err, DomainError::AlreadyExists);
    }

    #[test]
    fn create_rejects_blank_title_and_bad_cadence() {
        let habit_id = test_habit_id();
        let habit = Habit::empty(habit_id);

        let mut cmd = create_cmd(habit_id);
        cmd.title = "  ".to_string();
        match habit.handle(&HabitCommand::CreateHabit(cmd)).unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for blank title"),
        }

        let mut cmd = create_cmd(habit_id);
        cmd.cadence = Cadence::Weekly { times_per_week: 0 };
        match habit.handle(&HabitCommand::CreateHabit(cmd)).unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for zero times per week"),
        }

        let mut cmd = create_cmd(habit_id);
        cmd.target = Some(-1.0);
        match habit.handle(&HabitCommand::CreateHabit(cmd)).unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for negative target"),
        }
    }

    #[test]
    fn update_keeps_unspecified_fields_and_metric() {
        let mut habit = created_habit();
        let habit_id = *habit.id();
        let aspiration = AggregateId::new();

        run(
            &mut habit,
            HabitCommand::UpdateHabit(UpdateHabit {
                habit_id,
                title: Some("Evening walk".to_string()),
                description: Some(Some("after dinner".to_string())),
                category: None,
                aspiration_id: Some(Some(aspiration)),
                cadence: Some(Cadence::SpecificDays(vec![Weekday::Mon, Weekday::Thu])),
                reminder_time: Some(None),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(habit.title(), "Evening walk");
        assert_eq!(habit.description(), Some("after dinner"));
        assert_eq!(habit.category(), Some("health"));
        assert_eq!(habit.aspiration_id(), Some(aspiration));
        assert_eq!(habit.reminder_time(), None);
        assert_eq!(habit.metric(), TrackingMetric::Distance);
        assert_eq!(habit.unit(), Some("miles"));
        assert_eq!(habit.target(), Some(2.0));
    }

    #[test]
    fn update_before_create_is_not_found() {
        let habit_id = test_habit_id();
        let habit = Habit::empty(habit_id);
        let err = habit
            .handle(&HabitCommand::PauseHabit(lifecycle(habit_id)))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn pause_is_an_independent_toggle() {
        let mut habit = created_habit();
        let id = *habit.id();

        run(&mut habit, HabitCommand::PauseHabit(lifecycle(id))).unwrap();
        assert!(habit.is_paused());
        assert_eq!(
            run(&mut habit, HabitCommand::PauseHabit(lifecycle(id))).unwrap_err(),
            DomainError::AlreadyPaused
        );

        run(&mut habit, HabitCommand::ResumeHabit(lifecycle(id))).unwrap();
        assert!(!habit.is_paused());
        match run(&mut habit, HabitCommand::ResumeHabit(lifecycle(id))).unwrap_err() {
            DomainError::InvalidTransition(_) => {}
            _ => panic!("Expected InvalidTransition when resuming an active habit"),
        }
    }

    #[test]
    fn archived_habit_rejects_mutation() {
        let mut habit = created_habit();
        let id = *habit.id();
        run(&mut habit, HabitCommand::ArchiveHabit(lifecycle(id))).unwrap();
        assert!(habit.is_archived());

        let update = HabitCommand::UpdateHabit(UpdateHabit {
            habit_id: id,
            title: Some("Run".to_string()),
            description: None,
            category: None,
            aspiration_id: None,
            cadence: None,
            reminder_time: None,
            occurred_at: test_time(),
        });
        assert_eq!(run(&mut habit, update).unwrap_err(), DomainError::Archived);
        assert_eq!(
            run(&mut habit, HabitCommand::PauseHabit(lifecycle(id))).unwrap_err(),
            DomainError::Archived
        );
        assert_eq!(
            run(&mut habit, HabitCommand::ArchiveHabit(lifecycle(id))).unwrap_err(),
            DomainError::AlreadyArchived
        );
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let habit = created_habit();
        let before = habit.clone();
        let id = *habit.id();

        let events1 = habit.handle(&HabitCommand::PauseHabit(lifecycle(id))).unwrap();
        let events2 = habit.handle(&HabitCommand::PauseHabit(lifecycle(id))).unwrap();

        assert_eq!(habit, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn events_serialize_with_type_and_data() {
        let habit_id = test_habit_id();
        let event = HabitEvent::HabitPaused(HabitStatusChanged {
            habit_id,
            occurred_at: test_time(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "HabitPaused");
        assert_eq!(event.to_data().unwrap(), json["data"]);

        let back = HabitEvent::from_parts("HabitPaused", &json["data"]).unwrap();
        assert_eq!(back, event);
        assert!(HabitEvent::from_parts("HabitDeleted", &json["data"]).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            /// Property: the same events always fold into the same state.
            #[test]
            fn apply_is_deterministic(
                title in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                toggles in proptest::collection::vec(any::<bool>(), 0..12),
            ) {
                let habit_id = test_habit_id();

                let mut events = vec![HabitEvent::HabitCreated(HabitCreated {
                    habit_id,
                    title,
                    description: None,
                    category: None,
                    aspiration_id: None,
                    cadence: Cadence::Daily,
                    reminder_time: None,
                    metric: TrackingMetric::Count,
                    unit: None,
                    target: Some(10.0),
                    occurred_at: test_time(),
                })];
                for pause in toggles {
                    let change = status_changed(&lifecycle(habit_id));
                    events.push(if pause {
                        HabitEvent::HabitPaused(change)
                    } else {
                        HabitEvent::HabitResumed(change)
                    });
                }

                let mut first = Habit::empty(habit_id);
                let mut second = Habit::empty(habit_id);
                for e in &events {
                    first.apply(e);
                }
                for e in &events {
                    second.apply(e);
                }

                prop_assert_eq!(&first, &second);
                prop_assert_eq!(first.version(), Version::new(events.len() as u64));
            }
        }
    }
}
