use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::super::domain::{ApprovalState, Job, JobId, JobStatus, Student};
use super::config::PolicyConfig;
use super::rules::{admission_rejection, SelectionSummary};
use super::{EvaluationError, PlacementHistory};

/// Enumerates every way a job can be ineligible for a student, so callers
/// can surface the exact rule that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonCode {
    JobNotOpen,
    BelowMinX,
    BelowMinXii,
    BelowMinCpi,
    CategoryMismatch,
    NotEws,
    NotPwd,
    ProgramNotEligible,
    DepartmentNotEligible,
    NotYetOpen,
    DeadlinePassed,
    AlreadyApplied,
    AlreadySelectedInternship,
    AlreadySelectedA1,
    AlreadySelectedA2,
    A1ApplicationQuotaExceeded,
    OfferLimitReached,
}

impl ReasonCode {
    pub const fn summary(self) -> &'static str {
        match self {
            ReasonCode::JobNotOpen => "job is not approved or not open for applications",
            ReasonCode::BelowMinX => "Xth marks below the job minimum",
            ReasonCode::BelowMinXii => "XIIth marks below the job minimum",
            ReasonCode::BelowMinCpi => "CPI below the job minimum",
            ReasonCode::CategoryMismatch => "job category does not match the registered track",
            ReasonCode::NotEws => "job is restricted to EWS students",
            ReasonCode::NotPwd => "job is restricted to PWD students",
            ReasonCode::ProgramNotEligible => "student's program is not in the eligible list",
            ReasonCode::DepartmentNotEligible => {
                "student's department is not in the eligible list"
            }
            ReasonCode::NotYetOpen => "applications have not opened yet",
            ReasonCode::DeadlinePassed => "last date to apply has passed",
            ReasonCode::AlreadyApplied => "already applied to this job",
            ReasonCode::AlreadySelectedInternship => "already selected in an internship",
            ReasonCode::AlreadySelectedA1 => "already selected in an A1 job",
            ReasonCode::AlreadySelectedA2 => "already selected in an A2 job",
            ReasonCode::A1ApplicationQuotaExceeded => {
                "A1 application quota after A2 selection exhausted"
            }
            ReasonCode::OfferLimitReached => "already holding the maximum number of offers",
        }
    }
}

/// The full rule sequence. Returns the first failing rule, `None` when every
/// rule passes. The order is fixed so that identical inputs always produce
/// the identical reason.
pub(crate) fn first_rejection(
    student: &Student,
    job: &Job,
    history: &PlacementHistory,
    config: &PolicyConfig,
    now: DateTime<Utc>,
) -> Result<Option<ReasonCode>, EvaluationError> {
    let x_marks = require(student.x_marks, "X_marks")?;
    let xii_marks = require(student.xii_marks, "XII_marks")?;
    let cpi = require(student.cpi, "cpi")?;
    let program = require_text(student.program.as_deref(), "program")?;
    let department = require_text(student.department.as_deref(), "department")?;

    if job.approval_status != ApprovalState::Approved || job.job_status != JobStatus::Open {
        return Ok(Some(ReasonCode::JobNotOpen));
    }

    if job.min_x_marks > x_marks {
        return Ok(Some(ReasonCode::BelowMinX));
    }
    if job.min_xii_marks > xii_marks {
        return Ok(Some(ReasonCode::BelowMinXii));
    }
    if job.min_cpi > cpi {
        return Ok(Some(ReasonCode::BelowMinCpi));
    }

    if job.category != student.registered_for {
        return Ok(Some(ReasonCode::CategoryMismatch));
    }

    if job.only_for_ews {
        let is_ews = student
            .category
            .as_deref()
            .is_some_and(|category| category.eq_ignore_ascii_case("ews"));
        if !is_ews {
            return Ok(Some(ReasonCode::NotEws));
        }
    }

    if job.only_for_pwd && !student.pwd {
        return Ok(Some(ReasonCode::NotPwd));
    }

    if !list_contains(&job.eligible_programs, program) {
        return Ok(Some(ReasonCode::ProgramNotEligible));
    }
    if !list_contains(&job.eligible_departments, department) {
        return Ok(Some(ReasonCode::DepartmentNotEligible));
    }

    if let Some(raw) = job.start_date.as_deref() {
        if let Some(start) = parse_window(raw, "start_date", job.id) {
            if start > now {
                return Ok(Some(ReasonCode::NotYetOpen));
            }
        }
    }
    if let Some(raw) = job.last_date.as_deref() {
        if let Some(last) = parse_window(raw, "last_date", job.id) {
            if last < now {
                return Ok(Some(ReasonCode::DeadlinePassed));
            }
        }
    }

    if history.applied_jobs.contains(&job.id) {
        return Ok(Some(ReasonCode::AlreadyApplied));
    }

    let summary = SelectionSummary::derive(history);
    Ok(admission_rejection(job.classification, &summary, config))
}

fn require(value: Option<f32>, field: &'static str) -> Result<f32, EvaluationError> {
    value.ok_or(EvaluationError::MissingField(field))
}

fn require_text<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, EvaluationError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(EvaluationError::MissingField(field)),
    }
}

/// Case-insensitive membership in a comma-separated list. An empty list
/// means the job is unrestricted on this dimension.
fn list_contains(list: &str, value: &str) -> bool {
    if list.trim().is_empty() {
        return true;
    }
    list.split(',')
        .any(|entry| entry.trim().eq_ignore_ascii_case(value.trim()))
}

/// A window bound that does not parse is treated as absent; coordinators
/// have entered free-text dates before and a bad one must not hide the job
/// from every student.
fn parse_window(raw: &str, field: &'static str, job: JobId) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            warn!(job = job.0, field, value = raw, %err, "ignoring unparsable job date");
            None
        }
    }
}
