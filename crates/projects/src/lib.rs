//! Projects broken into ordered phases.

pub mod project;

pub use project::{
    AddPhase, AddPhasePhoto, ArchiveProject, ChangePhaseStatus, CreateProject, NewPhase, Phase,
    PhaseAdded, PhasePhoto, PhasePhotoAdded, PhaseStatus, PhaseStatusChanged, PhaseUpdated,
    Project, ProjectArchived, ProjectCommand, ProjectCreated, ProjectEvent, ProjectUpdated,
    UpdatePhase, UpdateProject,
};
