//! Placement intake, eligibility evaluation, and admission control.
//!
//! `evaluation` is the pure core: given a student, a job, and the student's
//! resolved application history, it produces an eligibility verdict with a
//! reason code. `service` is the only component performing I/O, orchestrating
//! the repository, settings store, and event hook around the evaluator.

pub mod domain;
pub(crate) mod evaluation;
pub mod profile;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationRecord, ApplicationStatus, ApprovalState, Company,
    CompanyId, CompanyStatus, Job, JobClassification, JobDraft, JobId, JobStatus, PlacementTrack,
    SelectedApplication, Student, StudentId,
};
pub use evaluation::{
    EligibilityEvaluator, EvaluationError, PlacementHistory, PolicyConfig, ReasonCode, Verdict,
};
pub use profile::{field_policy, filter_changes, FieldPolicy, ProfileSubmission};
pub use repository::{
    AppliedJobView, CandidateJobQuery, EventError, EventPublisher, JobView, PlacementEvent,
    PlacementRepository, RepositoryError, ResumeEntry, Settings, SettingsPatch, SettingsStore,
};
pub use router::placement_router;
pub use service::{PlacementError, PlacementService};
