use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stela_core::{
    Aggregate, AggregateId, AggregateRoot, AggregateType, DomainError, Entity, PhaseId, Version,
};
use stela_events::{Command, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    NotStarted,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePhoto {
    pub photo_ref: String,
    pub caption: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// One stage of a project. Lives inside the project's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    id: PhaseId,
    name: String,
    status: PhaseStatus,
    notes: Option<String>,
    progress: u8,
    time_spent_minutes: u32,
    order: u32,
    photos: Vec<PhasePhoto>,
}

impl Phase {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> PhaseStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Percent complete, 0 to 100.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn time_spent_minutes(&self) -> u32 {
        self.time_spent_minutes
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn photos(&self) -> &[PhasePhoto] {
        &self.photos
    }
}

impl Entity for Phase {
    type Id = PhaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: Project.
///
/// Phases are kept in `order`; a new phase always goes last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    id: AggregateId,
    title: String,
    description: Option<String>,
    category: Option<String>,
    archived: bool,
    phases: Vec<Phase>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: Version,
    created: bool,
}

impl Project {
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

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phase(&self, phase_id: PhaseId) -> Option<&Phase> {
        Phase::find_by_id(&self.phases, &phase_id)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Share of phases marked complete, as a whole percent. Zero without phases.
    pub fn completion_percent(&self) -> u8 {
        if self.phases.is_empty() {
            return 0;
        }
        let done = self
            .phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Complete)
            .count();
        (done * 100 / self.phases.len()) as u8
    }

    fn phase_mut(&mut self, phase_id: PhaseId) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|p| p.id == phase_id)
    }
}

impl AggregateRoot for Project {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }
}

/// A phase supplied at project creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPhase {
    pub phase_id: PhaseId,
    pub name: String,
}

/// Command: CreateProject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProject {
    pub project_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub initial_phases: Vec<NewPhase>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProject. `None` keeps, `Some(None)` clears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProject {
    pub project_id: AggregateId,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPhase {
    pub project_id: AggregateId,
    pub phase_id: PhaseId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePhaseStatus {
    pub project_id: AggregateId,
    pub phase_id: PhaseId,
    pub status: PhaseStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdatePhase. `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePhase {
    pub project_id: AggregateId,
    pub phase_id: PhaseId,
    pub name: Option<String>,
    pub notes: Option<Option<String>>,
    pub progress: Option<u8>,
    pub time_spent_minutes: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPhasePhoto {
    pub project_id: AggregateId,
    pub phase_id: PhaseId,
    pub photo_ref: String,
    pub caption: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveProject {
    pub project_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectCommand {
    CreateProject(CreateProject),
    UpdateProject(UpdateProject),
    AddPhase(AddPhase),
    ChangePhaseStatus(ChangePhaseStatus),
    UpdatePhase(UpdatePhase),
    AddPhasePhoto(AddPhasePhoto),
    ArchiveProject(ArchiveProject),
}

impl Command for ProjectCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            ProjectCommand::CreateProject(c) => c.project_id,
            ProjectCommand::UpdateProject(c) => c.project_id,
            ProjectCommand::AddPhase(c) => c.project_id,
            ProjectCommand::ChangePhaseStatus(c) => c.project_id,
            ProjectCommand::UpdatePhase(c) => c.project_id,
            ProjectCommand::AddPhasePhoto(c) => c.project_id,
            ProjectCommand::ArchiveProject(c) => c.project_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreated {
    pub project_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdated {
    pub project_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseAdded {
    pub project_id: AggregateId,
    pub phase_id: PhaseId,
    pub name: String,
    pub order: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStatusChanged {
    pub project_id: AggregateId,
    pub phase_id: PhaseId,
    pub from: PhaseStatus,
    pub to: PhaseStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PhaseUpdated (full editable phase details after the update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseUpdated {
    pub project_id: AggregateId,
    pub phase_id: PhaseId,
    pub name: String,
    pub notes: Option<String>,
    pub progress: u8,
    pub time_spent_minutes: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePhotoAdded {
    pub project_id: AggregateId,
    pub phase_id: PhaseId,
    pub photo_ref: String,
    pub caption: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectArchived {
    pub project_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProjectEvent {
    ProjectCreated(ProjectCreated),
    ProjectUpdated(ProjectUpdated),
    PhaseAdded(PhaseAdded),
    PhaseStatusChanged(PhaseStatusChanged),
    PhaseUpdated(PhaseUpdated),
    PhasePhotoAdded(PhasePhotoAdded),
    ProjectArchived(ProjectArchived),
}

impl Event for ProjectEvent {
    const EVENT_TYPES: &'static [&'static str] = &[
        "ProjectCreated",
        "ProjectUpdated",
        "PhaseAdded",
        "PhaseStatusChanged",
        "PhaseUpdated",
        "PhasePhotoAdded",
        "ProjectArchived",
    ];

    fn event_type(&self) -> &'static str {
        match self {
            ProjectEvent::ProjectCreated(_) => "ProjectCreated",
            ProjectEvent::ProjectUpdated(_) => "ProjectUpdated",
            ProjectEvent::PhaseAdded(_) => "PhaseAdded",
            ProjectEvent::PhaseStatusChanged(_) => "PhaseStatusChanged",
            ProjectEvent::PhaseUpdated(_) => "PhaseUpdated",
            ProjectEvent::PhasePhotoAdded(_) => "PhasePhotoAdded",
            ProjectEvent::ProjectArchived(_) => "ProjectArchived",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProjectEvent::ProjectCreated(e) => e.occurred_at,
            ProjectEvent::ProjectUpdated(e) => e.occurred_at,
            ProjectEvent::PhaseAdded(e) => e.occurred_at,
            ProjectEvent::PhaseStatusChanged(e) => e.occurred_at,
            ProjectEvent::PhaseUpdated(e) => e.occurred_at,
            ProjectEvent::PhasePhotoAdded(e) => e.occurred_at,
            ProjectEvent::ProjectArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Project {
    const AGGREGATE_TYPE: AggregateType = AggregateType::Project;

    type Command = ProjectCommand;
    type Event = ProjectEvent;
    type Error = DomainError;

    fn empty(id: AggregateId) -> Self {
        Self {
            id,
            title: String::new(),
            description: None,
            category: None,
            archived: false,
            phases: Vec::new(),
            created_at: None,
            updated_at: None,
            version: Version::INITIAL,
            created: false,
        }
    }

    fn check_replay(&self, event: &Self::Event) -> Result<(), String> {
        let phase_id = match event {
            ProjectEvent::PhaseAdded(e) => {
                return match self.phase(e.phase_id) {
                    Some(_) => Err(format!("phase {} added twice", e.phase_id)),
                    None => Ok(()),
                };
            }
            ProjectEvent::PhaseStatusChanged(e) => e.phase_id,
            ProjectEvent::PhaseUpdated(e) => e.phase_id,
            ProjectEvent::PhasePhotoAdded(e) => e.phase_id,
            _ => return Ok(()),
        };
        match self.phase(phase_id) {
            Some(_) => Ok(()),
            None => Err(format!("unknown phase {phase_id}")),
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProjectEvent::ProjectCreated(e) => {
                self.id = e.project_id;
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.archived = false;
                self.phases.clear();
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            ProjectEvent::ProjectUpdated(e) => {
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.updated_at = Some(e.occurred_at);
            }
            ProjectEvent::PhaseAdded(e) => {
                self.phases.push(Phase {
                    id: e.phase_id,
                    name: e.name.clone(),
                    status: PhaseStatus::NotStarted,
                    notes: None,
                    progress: 0,
                    time_spent_minutes: 0,
                    order: e.order,
                    photos: Vec::new(),
                });
                self.updated_at = Some(e.occurred_at);
            }
            ProjectEvent::PhaseStatusChanged(e) => {
                if let Some(phase) = self.phase_mut(e.phase_id) {
                    phase.status = e.to;
                }
                self.updated_at = Some(e.occurred_at);
            }
            ProjectEvent::PhaseUpdated(e) => {
                if let Some(phase) = self.phase_mut(e.phase_id) {
                    phase.name = e.name.clone();
                    phase.notes = e.notes.clone();
                    phase.progress = e.progress;
                    phase.time_spent_minutes = e.time_spent_minutes;
                }
                self.updated_at = Some(e.occurred_at);
            }
            ProjectEvent::PhasePhotoAdded(e) => {
                if let Some(phase) = self.phase_mut(e.phase_id) {
                    phase.photos.push(PhasePhoto {
                        photo_ref: e.photo_ref.clone(),
                        caption: e.caption.clone(),
                        added_at: e.occurred_at,
                    });
                }
                self.updated_at = Some(e.occurred_at);
            }
            ProjectEvent::ProjectArchived(e) => {
                self.archived = true;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version = self.version.next();
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProjectCommand::CreateProject(cmd) => self.handle_create(cmd),
            ProjectCommand::UpdateProject(cmd) => self.handle_update(cmd),
            ProjectCommand::AddPhase(cmd) => self.handle_add_phase(cmd),
            ProjectCommand::ChangePhaseStatus(cmd) => self.handle_change_status(cmd),
            ProjectCommand::UpdatePhase(cmd) => self.handle_update_phase(cmd),
            ProjectCommand::AddPhasePhoto(cmd) => self.handle_add_photo(cmd),
            ProjectCommand::ArchiveProject(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.archived {
                    return Err(DomainError::AlreadyArchived);
                }
                Ok(vec![ProjectEvent::ProjectArchived(ProjectArchived {
                    project_id: cmd.project_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl Project {
    fn ensure_mutable(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.archived {
            return Err(DomainError::Archived);
        }
        Ok(())
    }

    fn existing_phase(&self, phase_id: PhaseId) -> Result<&Phase, DomainError> {
        self.phase(phase_id).ok_or(DomainError::NotFound)
    }

    /// Creation plus every initial phase, in one decision.
    fn handle_create(&self, cmd: &CreateProject) -> Result<Vec<ProjectEvent>, DomainError> {
        if self.created {
            return Err(DomainError::AlreadyExists);
        }
        DomainError::ensure_not_blank("title", &cmd.title)?;

        let mut events = Vec::with_capacity(1 + cmd.initial_phases.len());
        events.push(ProjectEvent::ProjectCreated(ProjectCreated {
            project_id: cmd.project_id,
            title: cmd.title.clone(),
            description: cmd.description.clone(),
            category: cmd.category.clone(),
            occurred_at: cmd.occurred_at,
        }));

        for (order, phase) in cmd.initial_phases.iter().enumerate() {
            DomainError::ensure_not_blank("phase name", &phase.name)?;
            if cmd.initial_phases[..order]
                .iter()
                .any(|earlier| earlier.phase_id == phase.phase_id)
            {
                return Err(DomainError::AlreadyExists);
            }
            events.push(ProjectEvent::PhaseAdded(PhaseAdded {
                project_id: cmd.project_id,
                phase_id: phase.phase_id,
                name: phase.name.clone(),
                order: order as u32,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_update(&self, cmd: &UpdateProject) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_mutable()?;

        let title = cmd.title.clone().unwrap_or_else(|| self.title.clone());
        DomainError::ensure_not_blank("title", &title)?;

        Ok(vec![ProjectEvent::ProjectUpdated(ProjectUpdated {
            project_id: cmd.project_id,
            title,
            description: cmd.description.clone().unwrap_or_else(|| self.description.clone()),
            category: cmd.category.clone().unwrap_or_else(|| self.category.clone()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_phase(&self, cmd: &AddPhase) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_mutable()?;
        DomainError::ensure_not_blank("phase name", &cmd.name)?;
        if self.phase(cmd.phase_id).is_some() {
            return Err(DomainError::AlreadyExists);
        }

        Ok(vec![ProjectEvent::PhaseAdded(PhaseAdded {
            project_id: cmd.project_id,
            phase_id: cmd.phase_id,
            name: cmd.name.clone(),
            order: self.phases.len() as u32,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangePhaseStatus) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_mutable()?;
        let phase = self.existing_phase(cmd.phase_id)?;

        if phase.status == cmd.status {
            return Ok(vec![]);
        }

        Ok(vec![ProjectEvent::PhaseStatusChanged(PhaseStatusChanged {
            project_id: cmd.project_id,
            phase_id: cmd.phase_id,
            from: phase.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_phase(&self, cmd: &UpdatePhase) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_mutable()?;
        let phase = self.existing_phase(cmd.phase_id)?;

        let name = cmd.name.clone().unwrap_or_else(|| phase.name.clone());
        DomainError::ensure_not_blank("phase name", &name)?;
        let progress = cmd.progress.unwrap_or(phase.progress);
        if progress > 100 {
            return Err(DomainError::validation(format!(
                "progress must be between 0 and 100 (got {progress})"
            )));
        }

        Ok(vec![ProjectEvent::PhaseUpdated(PhaseUpdated {
            project_id: cmd.project_id,
            phase_id: cmd.phase_id,
            name,
            notes: cmd.notes.clone().unwrap_or_else(|| phase.notes.clone()),
            progress,
            time_spent_minutes: cmd.time_spent_minutes.unwrap_or(phase.time_spent_minutes),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_photo(&self, cmd: &AddPhasePhoto) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_mutable()?;
        self.existing_phase(cmd.phase_id)?;
        DomainError::ensure_not_blank("photo_ref", &cmd.photo_ref)?;

        Ok(vec![ProjectEvent::PhasePhotoAdded(PhasePhotoAdded {
            project_id: cmd.project_id,
            phase_id: cmd.phase_id,
            photo_ref: cmd.photo_ref.clone(),
            caption: cmd.caption.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap()
    }

    fn create_cmd(project_id: AggregateId, phases: &[(PhaseId, &str)]) -> ProjectCommand {
        ProjectCommand::CreateProject(CreateProject {
            project_id,
            title: "Bathroom remodel".to_string(),
            description: None,
            category: Some("home".to_string()),
            initial_phases: phases
                .iter()
                .map(|(phase_id, name)| NewPhase {
                    phase_id: *phase_id,
                    name: name.to_string(),
                })
                .collect(),
            occurred_at: test_time(),
        })
    }

    fn run(project: &mut Project, cmd: ProjectCommand) -> Result<usize, DomainError> {
        let events = project.handle(&cmd)?;
        for event in &events {
            project.apply(event);
        }
        Ok(events.len())
    }

    fn status(project_id: AggregateId, phase_id: PhaseId, status: PhaseStatus) -> ProjectCommand {
        ProjectCommand::ChangePhaseStatus(ChangePhaseStatus {
            project_id,
            phase_id,
            status,
            occurred_at: test_time(),
        })
    }

    fn add_phase(project_id: AggregateId, phase_id: PhaseId, name: &str) -> ProjectCommand {
        ProjectCommand::AddPhase(AddPhase {
            project_id,
            phase_id,
            name: name.to_string(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn phases_are_ordered_and_change_independently() {
        let project_id = AggregateId::new();
        let mut project = Project::empty(project_id);
        run(&mut project, create_cmd(project_id, &[])).unwrap();

        let demo = PhaseId::new();
        let plumbing = PhaseId::new();
        let tiling = PhaseId::new();
        run(&mut project, add_phase(project_id, demo, "Demo")).unwrap();
        run(&mut project, add_phase(project_id, plumbing, "Plumbing")).unwrap();
        run(&mut project, add_phase(project_id, tiling, "Tiling")).unwrap();

        let orders: Vec<u32> = project.phases().iter().map(Phase::order).collect();
        assert_eq!(orders, vec![0, 1, 2]);

        run(&mut project, status(project_id, plumbing, PhaseStatus::Complete)).unwrap();
        assert_eq!(project.phase(plumbing).unwrap().status(), PhaseStatus::Complete);
        assert_eq!(project.phase(demo).unwrap().status(), PhaseStatus::NotStarted);
        assert_eq!(project.phase(tiling).unwrap().status(), PhaseStatus::NotStarted);
        assert_eq!(project.completion_percent(), 33);
    }

    #[test]
    fn replay_check_rejects_unknown_phase_references() {
        let project_id = AggregateId::new();
        let mut project = Project::empty(project_id);
        let demo = PhaseId::new();
        run(&mut project, create_cmd(project_id, &[(demo, "Demo")])).unwrap();

        let stray = ProjectEvent::PhaseStatusChanged(PhaseStatusChanged {
            project_id,
            phase_id: PhaseId::new(),
            from: PhaseStatus::NotStarted,
            to: PhaseStatus::Complete,
            occurred_at: test_time(),
        });
        assert!(project.check_replay(&stray).is_err());

        let known = ProjectEvent::PhaseStatusChanged(PhaseStatusChanged {
            project_id,
            phase_id: demo,
            from: PhaseStatus::NotStarted,
            to: PhaseStatus::Complete,
            occurred_at: test_time(),
        });
        assert!(project.check_replay(&known).is_ok());

        let duplicate = ProjectEvent::PhaseAdded(PhaseAdded {
            project_id,
            phase_id: demo,
            name: "Demo again".to_string(),
            order: 1,
            occurred_at: test_time(),
        });
        assert!(project.check_replay(&duplicate).is_err());
    }

    #[test]
    fn create_with_initial_phases_emits_one_batch() {
        let project_id = AggregateId::new();
        let project = Project::empty(project_id);
        let a = PhaseId::new();
        let b = PhaseId::new();

        let events = project
            .handle(&create_cmd(project_id, &[(a, "Demo"), (b, "Framing")]))
            .unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ProjectEvent::ProjectCreated(_)));
        match &events[2] {
            ProjectEvent::PhaseAdded(e) => {
                assert_eq!(e.phase_id, b);
                assert_eq!(e.order, 1);
            }
            _ => panic!("Expected PhaseAdded event"),
        }
    }

    #[test]
    fn duplicate_phase_ids_are_rejected() {
        let project_id = AggregateId::new();
        let mut project = Project::empty(project_id);
        let a = PhaseId::new();

        assert_eq!(
            project
                .handle(&create_cmd(project_id, &[(a, "Demo"), (a, "Again")]))
                .unwrap_err(),
            DomainError::AlreadyExists
        );

        run(&mut project, create_cmd(project_id, &[(a, "Demo")])).unwrap();
        assert_eq!(
            run(&mut project, add_phase(project_id, a, "Again")).unwrap_err(),
            DomainError::AlreadyExists
        );
    }

    #[test]
    fn same_status_is_a_no_op() {
        let project_id = AggregateId::new();
        let phase_id = PhaseId::new();
        let mut project = Project::empty(project_id);
        run(&mut project, create_cmd(project_id, &[(phase_id, "Demo")])).unwrap();
        let before = project.version();

        let emitted = run(&mut project, status(project_id, phase_id, PhaseStatus::NotStarted)).unwrap();
        assert_eq!(emitted, 0);
        assert_eq!(project.version(), before);

        // Any status may follow any other.
        run(&mut project, status(project_id, phase_id, PhaseStatus::Complete)).unwrap();
        run(&mut project, status(project_id, phase_id, PhaseStatus::NotStarted)).unwrap();
        assert_eq!(project.version(), before.next().next());
    }

    #[test]
    fn unknown_phase_is_not_found() {
        let project_id = AggregateId::new();
        let mut project = Project::empty(project_id);
        run(&mut project, create_cmd(project_id, &[])).unwrap();

        let err = run(&mut project, status(project_id, PhaseId::new(), PhaseStatus::Complete)).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn update_phase_validates_progress() {
        let project_id = AggregateId::new();
        let phase_id = PhaseId::new();
        let mut project = Project::empty(project_id);
        run(&mut project, create_cmd(project_id, &[(phase_id, "Tiling")])).unwrap();

        let update = |progress: u8| {
            ProjectCommand::UpdatePhase(UpdatePhase {
                project_id,
                phase_id,
                name: None,
                notes: Some(Some("grout next week".to_string())),
                progress: Some(progress),
                time_spent_minutes: Some(90),
                occurred_at: test_time(),
            })
        };

        match run(&mut project, update(101)).unwrap_err() {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for progress over 100"),
        }

        run(&mut project, update(60)).unwrap();
        let phase = project.phase(phase_id).unwrap();
        assert_eq!(phase.progress(), 60);
        assert_eq!(phase.time_spent_minutes(), 90);
        assert_eq!(phase.notes(), Some("grout next week"));
        assert_eq!(phase.name(), "Tiling");
    }

    #[test]
    fn photos_attach_to_their_phase() {
        let project_id = AggregateId::new();
        let phase_id = PhaseId::new();
        let other = PhaseId::new();
        let mut project = Project::empty(project_id);
        run(&mut project, create_cmd(project_id, &[(phase_id, "Demo"), (other, "Paint")])).unwrap();

        run(
            &mut project,
            ProjectCommand::AddPhasePhoto(AddPhasePhoto {
                project_id,
                phase_id,
                photo_ref: "photos/demo-1.jpg".to_string(),
                caption: Some("tiles off".to_string()),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let photos = project.phase(phase_id).unwrap().photos();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].photo_ref, "photos/demo-1.jpg");
        assert_eq!(photos[0].added_at, test_time());
        assert!(project.phase(other).unwrap().photos().is_empty());
    }

    #[test]
    fn completion_counts_complete_phases() {
        let project_id = AggregateId::new();
        let a = PhaseId::new();
        let b = PhaseId::new();
        let c = PhaseId::new();
        let mut project = Project::empty(project_id);
        assert_eq!(project.completion_percent(), 0);

        run(&mut project, create_cmd(project_id, &[(a, "A"), (b, "B"), (c, "C")])).unwrap();
        run(&mut project, status(project_id, a, PhaseStatus::Complete)).unwrap();
        assert_eq!(project.completion_percent(), 33);
        run(&mut project, status(project_id, b, PhaseStatus::Complete)).unwrap();
        run(&mut project, status(project_id, c, PhaseStatus::Complete)).unwrap();
        assert_eq!(project.completion_percent(), 100);
    }

    #[test]
    fn archived_project_rejects_phase_changes() {
        let project_id = AggregateId::new();
        let phase_id = PhaseId::new();
        let mut project = Project::empty(project_id);
        run(&mut project, create_cmd(project_id, &[(phase_id, "Demo")])).unwrap();
        let archive = ProjectCommand::ArchiveProject(ArchiveProject {
            project_id,
            occurred_at: test_time(),
        });
        run(&mut project, archive.clone()).unwrap();

        assert_eq!(
            run(&mut project, add_phase(project_id, PhaseId::new(), "Paint")).unwrap_err(),
            DomainError::Archived
        );
        assert_eq!(run(&mut project, archive).unwrap_err(), DomainError::AlreadyArchived);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: phase order always equals insertion position.
            #[test]
            fn phase_order_is_insertion_position(names in proptest::collection::vec("[a-z]{1,12}", 0..10)) {
                let project_id = AggregateId::new();
                let mut project = Project::empty(project_id);
                run(&mut project, create_cmd(project_id, &[])).unwrap();

                for name in &names {
                    run(&mut project, add_phase(project_id, PhaseId::new(), name)).unwrap();
                }

                for (i, phase) in project.phases().iter().enumerate() {
                    prop_assert_eq!(phase.order(), i as u32);
                    prop_assert_eq!(phase.name(), names[i].as_str());
                }
                prop_assert_eq!(project.version(), Version::new(1 + names.len() as u64));
            }
        }
    }
}
