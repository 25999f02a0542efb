use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationRecord, Company, CompanyId, Job, JobId, PlacementTrack,
    Student, StudentId,
};

/// Coarse candidate-job filter pushed down to the persistence collaborator:
/// approved, open jobs for the given track whose minimums are at or below
/// the student's marks. The evaluator re-checks every rule afterwards; this
/// only bounds how many records come back.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateJobQuery {
    pub track: PlacementTrack,
    pub x_marks: f32,
    pub xii_marks: f32,
    pub cpi: f32,
}

/// Storage abstraction over the external CRUD collaborator, so the service
/// can be exercised against an in-memory double.
///
/// `insert_application` must enforce a unique (student, job) index and
/// report a violation as [`RepositoryError::Conflict`]; that is what makes
/// the check-then-create sequence in the service race-safe.
pub trait PlacementRepository: Send + Sync {
    fn student_by_roll(&self, roll: &str) -> Result<Option<Student>, RepositoryError>;
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError>;
    fn update_student(&self, student: Student) -> Result<(), RepositoryError>;

    fn job(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;
    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError>;
    fn update_job(&self, job: Job) -> Result<(), RepositoryError>;
    fn candidate_jobs(&self, query: &CandidateJobQuery) -> Result<Vec<Job>, RepositoryError>;
    fn open_jobs_for_track(&self, track: PlacementTrack) -> Result<Vec<Job>, RepositoryError>;

    fn company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError>;
    fn insert_company(&self, company: Company) -> Result<Company, RepositoryError>;
    fn update_company(&self, company: Company) -> Result<(), RepositoryError>;

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn applications_for(
        &self,
        student: StudentId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Global placement-cell settings held by the collaborator's key/value
/// store. A single entry is assumed to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub registrations_allowed: bool,
    pub cpi_change_allowed: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registrations_allowed: true,
            cpi_change_allowed: false,
        }
    }
}

/// Partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub registrations_allowed: Option<bool>,
    #[serde(default)]
    pub cpi_change_allowed: Option<bool>,
}

pub trait SettingsStore: Send + Sync {
    fn settings(&self) -> Result<Settings, RepositoryError>;
    fn update(&self, patch: SettingsPatch) -> Result<Settings, RepositoryError>;
}

/// Outbound notification hook (e.g. the mail adapter the surrounding system
/// wires in). The core only records that something notification-worthy
/// happened; delivery is not its concern.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: PlacementEvent) -> Result<(), EventError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementEvent {
    ProfileSubmitted { roll: String },
    ApplicationSubmitted { roll: String, job: JobId },
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Presentation-shaped job record for listings, with the company joined in
/// for display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub title: String,
    pub company: Option<String>,
    pub category: &'static str,
    pub classification: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_date: Option<String>,
}

impl JobView {
    pub fn from_parts(job: &Job, company: Option<&Company>) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            company: company.map(|company| company.name.clone()),
            category: job.category.label(),
            classification: job.classification.label(),
            last_date: job.last_date.clone(),
        }
    }
}

/// One row of a student's applied-jobs listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedJobView {
    pub application: ApplicationId,
    pub job: JobId,
    pub title: String,
    pub company: Option<String>,
    pub status: &'static str,
    pub applied_on: DateTime<Utc>,
}

impl AppliedJobView {
    pub fn from_parts(record: &ApplicationRecord, company: Option<&Company>) -> Self {
        Self {
            application: record.application.id,
            job: record.job.id,
            title: record.job.title.clone(),
            company: company.map(|company| company.name.clone()),
            status: record.application.status.label(),
            applied_on: record.application.created_at,
        }
    }
}

/// One entry of the admin resume manifest: the bundling collaborator turns
/// these URLs into the actual archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeEntry {
    pub roll: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}
