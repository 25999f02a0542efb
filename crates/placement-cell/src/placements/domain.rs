use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier wrapper for student records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub i64);

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub i64);

/// Identifier wrapper for applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub i64);

/// Identifier wrapper for recruiting companies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyId(pub i64);

/// Lifecycle state shared by student accounts and job postings. Both start
/// unapproved and are promoted by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalState {
    Created,
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub const fn label(self) -> &'static str {
        match self {
            ApprovalState::Created => "created",
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
        }
    }
}

/// The hiring track a student registered for; a job's `category` must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementTrack {
    Internship,
    Fte,
}

impl PlacementTrack {
    pub const fn label(self) -> &'static str {
        match self {
            PlacementTrack::Internship => "Internship",
            PlacementTrack::Fte => "FTE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "internship" => Some(Self::Internship),
            "fte" => Some(Self::Fte),
            _ => None,
        }
    }
}

/// Placement-policy classification of a job, governing admission control.
/// Distinct from [`PlacementTrack`]: an FTE-track job can be classified
/// "X", "A1", "A2", or plain "FTE".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobClassification {
    X,
    A1,
    A2,
    Internship,
    Fte,
}

impl JobClassification {
    pub const fn label(self) -> &'static str {
        match self {
            JobClassification::X => "X",
            JobClassification::A1 => "A1",
            JobClassification::A2 => "A2",
            JobClassification::Internship => "Internship",
            JobClassification::Fte => "FTE",
        }
    }
}

/// Lifecycle of a job posting once registered.
///
/// Only `Open` accepts new applications; the other states keep the posting
/// visible for older applications while selection runs its course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Open,
    Ongoing,
    ResultsDeclared,
    Abandoned,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Ongoing => "ongoing",
            JobStatus::ResultsDeclared => "results_declared",
            JobStatus::Abandoned => "abandoned",
        }
    }
}

/// Status of a single application as it moves through selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Selected,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Selected => "selected",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Registration state of a recruiting company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyStatus {
    Registered,
    Approved,
    Blacklisted,
}

impl CompanyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CompanyStatus::Registered => "registered",
            CompanyStatus::Approved => "approved",
            CompanyStatus::Blacklisted => "blacklisted",
        }
    }
}

/// A student record as stored by the persistence collaborator.
///
/// Academic fields are optional because they are filled in over the course
/// of registration; the evaluator treats their absence on an approved
/// account as an input-contract violation rather than ineligibility.
/// Presentation-only fields (address, semester marks, project lists, ...)
/// live in the `profile` bag and never influence policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub roll: String,
    pub name: String,
    pub approval: ApprovalState,
    pub x_marks: Option<f32>,
    pub xii_marks: Option<f32>,
    pub cpi: Option<f32>,
    pub program: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub pwd: bool,
    pub registered_for: PlacementTrack,
    pub resume_url: Option<String>,
    #[serde(default)]
    pub profile: BTreeMap<String, Value>,
}

/// A job posting.
///
/// `eligible_programs` / `eligible_departments` are comma-separated,
/// case-insensitive lists; empty means unrestricted. `start_date` and
/// `last_date` are kept as raw RFC 3339 strings so that a malformed value
/// coming out of the collaborator degrades to "no constraint" instead of
/// failing deserialization of the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub company: CompanyId,
    pub title: String,
    pub min_x_marks: f32,
    pub min_xii_marks: f32,
    pub min_cpi: f32,
    #[serde(default)]
    pub eligible_programs: String,
    #[serde(default)]
    pub eligible_departments: String,
    pub category: PlacementTrack,
    pub classification: JobClassification,
    #[serde(default)]
    pub only_for_ews: bool,
    #[serde(default)]
    pub only_for_pwd: bool,
    pub approval_status: ApprovalState,
    pub job_status: JobStatus,
    pub start_date: Option<String>,
    pub last_date: Option<String>,
}

/// Coordinator-supplied payload for registering a job. The service forces
/// the stored posting into `Pending` approval and `Open` status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDraft {
    pub company: CompanyId,
    pub title: String,
    pub min_x_marks: f32,
    pub min_xii_marks: f32,
    pub min_cpi: f32,
    #[serde(default)]
    pub eligible_programs: String,
    #[serde(default)]
    pub eligible_departments: String,
    pub category: PlacementTrack,
    pub classification: JobClassification,
    #[serde(default)]
    pub only_for_ews: bool,
    #[serde(default)]
    pub only_for_pwd: bool,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub last_date: Option<String>,
}

/// A recruiting company. Jobs may only be registered against an approved one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub status: CompanyStatus,
}

/// One application linking a student to a job. At most one exists per
/// (student, job) pair; the persistence collaborator enforces this with a
/// unique index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student: StudentId,
    pub job: JobId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// An application joined with the job it targets, as loaded for history
/// derivation and applied-jobs listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application: Application,
    pub job: Job,
}

/// A selected application reduced to the fields admission control needs:
/// the related job's classification and category, and when the application
/// was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedApplication {
    pub job: JobId,
    pub classification: JobClassification,
    pub category: PlacementTrack,
    pub created_at: DateTime<Utc>,
}
