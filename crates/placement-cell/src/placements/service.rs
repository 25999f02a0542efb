use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApprovalState, Company, CompanyId,
    CompanyStatus, Job, JobDraft, JobId, JobStatus, Student, StudentId,
};
use super::evaluation::{
    EligibilityEvaluator, EvaluationError, PlacementHistory, PolicyConfig, ReasonCode, Verdict,
};
use super::profile::{self, ProfileSubmission};
use super::repository::{
    AppliedJobView, CandidateJobQuery, EventError, EventPublisher, JobView, PlacementEvent,
    PlacementRepository, RepositoryError, ResumeEntry, Settings, SettingsPatch, SettingsStore,
};

/// The admission controller: the only component that performs I/O. Loads
/// students, jobs, and application history from the collaborators and hands
/// fully-resolved data to the pure evaluator.
pub struct PlacementService<R, S, P> {
    repository: Arc<R>,
    settings: Arc<S>,
    events: Arc<P>,
    evaluator: EligibilityEvaluator,
}

static STUDENT_SEQUENCE: AtomicI64 = AtomicI64::new(1);
static JOB_SEQUENCE: AtomicI64 = AtomicI64::new(1);
static COMPANY_SEQUENCE: AtomicI64 = AtomicI64::new(1);
static APPLICATION_SEQUENCE: AtomicI64 = AtomicI64::new(1);

fn next_id(sequence: &AtomicI64) -> i64 {
    sequence.fetch_add(1, Ordering::Relaxed)
}

impl<R, S, P> PlacementService<R, S, P>
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(repository: Arc<R>, settings: Arc<S>, events: Arc<P>, config: PolicyConfig) -> Self {
        Self {
            repository,
            settings,
            events,
            evaluator: EligibilityEvaluator::new(config),
        }
    }

    pub fn evaluator(&self) -> &EligibilityEvaluator {
        &self.evaluator
    }

    fn student(&self, roll: &str) -> Result<Student, PlacementError> {
        self.repository
            .student_by_roll(roll)?
            .ok_or_else(|| PlacementError::StudentNotFound(roll.to_string()))
    }

    fn approved_student(&self, roll: &str) -> Result<Student, PlacementError> {
        let student = self.student(roll)?;
        if student.approval != ApprovalState::Approved {
            return Err(PlacementError::AccountNotApproved);
        }
        Ok(student)
    }

    /// All jobs the student can apply to right now, in candidate order.
    ///
    /// The application history is loaded once and reused across every
    /// candidate; only the coarse prefilter runs in the repository.
    pub fn list_eligible_jobs(
        &self,
        roll: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobView>, PlacementError> {
        let student = self.approved_student(roll)?;
        let cpi = student.cpi.ok_or(PlacementError::CpiNotSet)?;
        let x_marks = student
            .x_marks
            .ok_or(EvaluationError::MissingField("X_marks"))?;
        let xii_marks = student
            .xii_marks
            .ok_or(EvaluationError::MissingField("XII_marks"))?;

        let query = CandidateJobQuery {
            track: student.registered_for,
            x_marks,
            xii_marks,
            cpi,
        };
        let candidates = self.repository.candidate_jobs(&query)?;
        let records = self.repository.applications_for(student.id)?;
        let history = PlacementHistory::from_records(&records);

        let mut eligible = Vec::new();
        for job in candidates {
            match self.evaluator.evaluate(&student, &job, &history, now)? {
                Verdict::Eligible => eligible.push(job),
                Verdict::Ineligible(reason) => {
                    debug!(
                        roll = %student.roll,
                        job = job.id.0,
                        reason = reason.summary(),
                        "candidate job filtered"
                    );
                }
            }
        }

        self.job_views(eligible)
    }

    /// Every approved, open job on the student's track, without eligibility
    /// filtering. Used for the browse-all listing.
    pub fn open_jobs(&self, roll: &str) -> Result<Vec<JobView>, PlacementError> {
        let student = self.approved_student(roll)?;
        let jobs = self.repository.open_jobs_for_track(student.registered_for)?;
        self.job_views(jobs)
    }

    /// Apply to one job. Eligibility is re-evaluated from current state; a
    /// listing produced earlier is never trusted. The duplicate check is
    /// backed by the repository's (student, job) unique index, so a
    /// concurrent double apply resolves to one row plus one
    /// `AlreadyApplied` rejection.
    pub fn apply(
        &self,
        roll: &str,
        job_id: JobId,
        now: DateTime<Utc>,
    ) -> Result<Application, PlacementError> {
        let student = self.approved_student(roll)?;
        let job = self
            .repository
            .job(job_id)?
            .ok_or(PlacementError::JobNotFound(job_id.0))?;

        let records = self.repository.applications_for(student.id)?;
        let history = PlacementHistory::from_records(&records);

        if let Verdict::Ineligible(reason) =
            self.evaluator.evaluate(&student, &job, &history, now)?
        {
            return Err(PlacementError::NotEligible(reason));
        }

        let application = Application {
            id: ApplicationId(next_id(&APPLICATION_SEQUENCE)),
            student: student.id,
            job: job.id,
            status: ApplicationStatus::Applied,
            created_at: now,
        };

        let stored = match self.repository.insert_application(application) {
            Ok(application) => application,
            Err(RepositoryError::Conflict) => {
                return Err(PlacementError::NotEligible(ReasonCode::AlreadyApplied))
            }
            Err(other) => return Err(other.into()),
        };

        self.events.publish(PlacementEvent::ApplicationSubmitted {
            roll: student.roll.clone(),
            job: job.id,
        })?;

        Ok(stored)
    }

    /// The student's applications with job snapshots joined, regardless of
    /// application status.
    pub fn applied_jobs(&self, roll: &str) -> Result<Vec<AppliedJobView>, PlacementError> {
        let student = self.approved_student(roll)?;
        let records = self.repository.applications_for(student.id)?;

        let mut companies = CompanyCache::default();
        let mut views = Vec::with_capacity(records.len());
        for record in &records {
            let company = companies.get(self.repository.as_ref(), record.job.company)?;
            views.push(AppliedJobView::from_parts(record, company.as_ref()));
        }
        Ok(views)
    }

    /// Register a new student profile. The stored record always enters
    /// `Pending`; registrations can be globally disabled by the admin.
    pub fn submit_for_approval(
        &self,
        submission: ProfileSubmission,
    ) -> Result<Student, PlacementError> {
        if !self.settings.settings()?.registrations_allowed {
            return Err(PlacementError::RegistrationsClosed);
        }

        let roll = submission.roll.clone();
        let student = Student {
            id: StudentId(next_id(&STUDENT_SEQUENCE)),
            roll: submission.roll,
            name: submission.name,
            approval: ApprovalState::Pending,
            x_marks: submission.x_marks,
            xii_marks: submission.xii_marks,
            cpi: submission.cpi,
            program: submission.program,
            department: submission.department,
            category: submission.category,
            pwd: submission.pwd,
            registered_for: submission.registered_for,
            resume_url: submission.resume_link,
            profile: submission.profile,
        };

        let stored = match self.repository.insert_student(student) {
            Ok(student) => student,
            Err(RepositoryError::Conflict) => {
                return Err(PlacementError::AlreadyRegistered(roll))
            }
            Err(other) => return Err(other.into()),
        };

        self.events
            .publish(PlacementEvent::ProfileSubmitted { roll })?;

        Ok(stored)
    }

    /// Apply allow-listed profile changes for a student. Fields outside the
    /// allow-list, or locked by approval state or settings, are dropped
    /// silently; the updated record is returned either way.
    pub fn update_profile(
        &self,
        roll: &str,
        changes: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Student, PlacementError> {
        let mut student = self.student(roll)?;
        let settings = self.settings.settings()?;

        let allowed = profile::filter_changes(changes, student.approval, &settings);
        if allowed.is_empty() {
            return Ok(student);
        }

        for (field, value) in &allowed {
            profile::apply_change(&mut student, field, value);
        }
        self.repository.update_student(student.clone())?;
        Ok(student)
    }

    pub fn register_company(&self, name: String) -> Result<Company, PlacementError> {
        let company = Company {
            id: CompanyId(next_id(&COMPANY_SEQUENCE)),
            name,
            status: CompanyStatus::Registered,
        };
        Ok(self.repository.insert_company(company)?)
    }

    /// Register a job for an approved company. The posting always enters
    /// `Pending` approval.
    pub fn register_job(&self, draft: JobDraft) -> Result<Job, PlacementError> {
        let company = self
            .repository
            .company(draft.company)?
            .ok_or(PlacementError::CompanyNotFound(draft.company.0))?;
        if company.status != CompanyStatus::Approved {
            return Err(PlacementError::CompanyNotApproved);
        }

        let job = Job {
            id: JobId(next_id(&JOB_SEQUENCE)),
            company: draft.company,
            title: draft.title,
            min_x_marks: draft.min_x_marks,
            min_xii_marks: draft.min_xii_marks,
            min_cpi: draft.min_cpi,
            eligible_programs: draft.eligible_programs,
            eligible_departments: draft.eligible_departments,
            category: draft.category,
            classification: draft.classification,
            only_for_ews: draft.only_for_ews,
            only_for_pwd: draft.only_for_pwd,
            approval_status: ApprovalState::Pending,
            job_status: JobStatus::Open,
            start_date: draft.start_date,
            last_date: draft.last_date,
        };
        Ok(self.repository.insert_job(job)?)
    }

    pub fn set_student_approval(
        &self,
        roll: &str,
        approval: ApprovalState,
    ) -> Result<Student, PlacementError> {
        let mut student = self.student(roll)?;
        student.approval = approval;
        self.repository.update_student(student.clone())?;
        Ok(student)
    }

    pub fn set_job_approval(
        &self,
        job_id: JobId,
        approval: ApprovalState,
    ) -> Result<Job, PlacementError> {
        let mut job = self
            .repository
            .job(job_id)?
            .ok_or(PlacementError::JobNotFound(job_id.0))?;
        job.approval_status = approval;
        self.repository.update_job(job.clone())?;
        Ok(job)
    }

    pub fn set_company_status(
        &self,
        company_id: CompanyId,
        status: CompanyStatus,
    ) -> Result<Company, PlacementError> {
        let mut company = self
            .repository
            .company(company_id)?
            .ok_or(PlacementError::CompanyNotFound(company_id.0))?;
        company.status = status;
        self.repository.update_company(company.clone())?;
        Ok(company)
    }

    pub fn set_application_status(
        &self,
        application_id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, PlacementError> {
        let mut application = self
            .repository
            .application(application_id)?
            .ok_or(PlacementError::ApplicationNotFound(application_id.0))?;
        application.status = status;
        self.repository.update_application(application.clone())?;
        Ok(application)
    }

    /// Resolve a comma-separated roll list into resume URLs for the bundling
    /// collaborator. Rolls are trimmed and de-duplicated preserving order;
    /// any unknown roll rejects the whole request.
    pub fn resume_manifest(&self, rolls: &str) -> Result<Vec<ResumeEntry>, PlacementError> {
        let mut seen = Vec::new();
        let mut entries = Vec::new();

        for roll in rolls.split(',').map(str::trim).filter(|roll| !roll.is_empty()) {
            if seen.contains(&roll) {
                continue;
            }
            seen.push(roll);
            let student = self.student(roll)?;
            entries.push(ResumeEntry {
                roll: student.roll,
                resume_url: student.resume_url,
            });
        }

        Ok(entries)
    }

    pub fn settings(&self) -> Result<Settings, PlacementError> {
        Ok(self.settings.settings()?)
    }

    pub fn update_settings(&self, patch: SettingsPatch) -> Result<Settings, PlacementError> {
        Ok(self.settings.update(patch)?)
    }

    fn job_views(&self, jobs: Vec<Job>) -> Result<Vec<JobView>, PlacementError> {
        let mut companies = CompanyCache::default();
        let mut views = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let company = companies.get(self.repository.as_ref(), job.company)?;
            views.push(JobView::from_parts(job, company.as_ref()));
        }
        Ok(views)
    }
}

/// Per-request memo of company lookups so a listing with many jobs from the
/// same company reads it once.
#[derive(Default)]
struct CompanyCache {
    loaded: BTreeMap<CompanyId, Option<Company>>,
}

impl CompanyCache {
    fn get<R: PlacementRepository + ?Sized>(
        &mut self,
        repository: &R,
        id: CompanyId,
    ) -> Result<Option<Company>, RepositoryError> {
        if !self.loaded.contains_key(&id) {
            let company = repository.company(id)?;
            self.loaded.insert(id, company);
        }
        Ok(self.loaded.get(&id).cloned().flatten())
    }
}

/// Error raised by the placement service. Policy rejections and not-found
/// conditions are expected outcomes; only `Evaluation`, `Repository`, and
/// `Event` variants are internal failures.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("student `{0}` not found")]
    StudentNotFound(String),
    #[error("job {0} not found")]
    JobNotFound(i64),
    #[error("company {0} not found")]
    CompanyNotFound(i64),
    #[error("application {0} not found")]
    ApplicationNotFound(i64),
    #[error("account not approved yet")]
    AccountNotApproved,
    #[error("cpi not updated yet")]
    CpiNotSet,
    #[error("registrations are not allowed right now")]
    RegistrationsClosed,
    #[error("a profile for `{0}` already exists")]
    AlreadyRegistered(String),
    #[error("company has not been approved")]
    CompanyNotApproved,
    #[error("not eligible: {}", .0.summary())]
    NotEligible(ReasonCode),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Event(#[from] EventError),
}
