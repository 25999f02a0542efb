mod config;
mod policy;
mod rules;

pub use config::PolicyConfig;
pub use policy::ReasonCode;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationRecord, ApplicationStatus, Job, JobClassification, JobId, SelectedApplication,
    Student,
};

/// Stateless evaluator applying the placement policy to fully-resolved
/// inputs. Performs no I/O and no ambient lookups: the admission controller
/// loads everything and hands it over.
pub struct EligibilityEvaluator {
    config: PolicyConfig,
}

impl EligibilityEvaluator {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Run the full rule sequence for one (student, job) pair.
    ///
    /// A policy failure is a [`Verdict::Ineligible`] with the first failing
    /// rule's reason; a student record missing mandatory academic fields is
    /// an [`EvaluationError`], never silently coerced to ineligibility.
    pub fn evaluate(
        &self,
        student: &Student,
        job: &Job,
        history: &PlacementHistory,
        now: DateTime<Utc>,
    ) -> Result<Verdict, EvaluationError> {
        match policy::first_rejection(student, job, history, &self.config, now)? {
            Some(reason) => Ok(Verdict::Ineligible(reason)),
            None => Ok(Verdict::Eligible),
        }
    }
}

/// Outcome of evaluating a single job for a single student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Eligible,
    Ineligible(ReasonCode),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible)
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Verdict::Eligible => None,
            Verdict::Ineligible(reason) => Some(*reason),
        }
    }
}

/// Input-contract violations: the evaluator was handed a student record
/// without the fields the policy is defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("student record is missing mandatory field `{0}`")]
    MissingField(&'static str),
}

/// The student's application history, resolved once per request by the
/// admission controller and shared across every candidate job.
///
/// `selected` carries every selected application regardless of track;
/// `a1_applications` carries the creation time of every A1-classified
/// application (any status) for the post-A2 quota; `applied_jobs` powers
/// the duplicate-application check without further reads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacementHistory {
    pub selected: Vec<SelectedApplication>,
    pub a1_applications: Vec<DateTime<Utc>>,
    pub applied_jobs: BTreeSet<JobId>,
}

impl PlacementHistory {
    pub fn from_records(records: &[ApplicationRecord]) -> Self {
        let mut history = Self::default();

        for record in records {
            history.applied_jobs.insert(record.job.id);

            if record.job.classification == JobClassification::A1 {
                history.a1_applications.push(record.application.created_at);
            }

            if record.application.status == ApplicationStatus::Selected {
                history.selected.push(SelectedApplication {
                    job: record.job.id,
                    classification: record.job.classification,
                    category: record.job.category,
                    created_at: record.application.created_at,
                });
            }
        }

        history
    }
}
