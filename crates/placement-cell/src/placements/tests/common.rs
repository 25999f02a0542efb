use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::placements::domain::{
    Application, ApplicationId, ApplicationRecord, ApplicationStatus, ApprovalState, Company,
    CompanyId, CompanyStatus, Job, JobClassification, JobId, JobStatus, PlacementTrack,
    SelectedApplication, Student, StudentId,
};
use crate::placements::evaluation::{EligibilityEvaluator, PlacementHistory, PolicyConfig};
use crate::placements::repository::{
    CandidateJobQuery, EventError, EventPublisher, PlacementEvent, PlacementRepository,
    RepositoryError, Settings, SettingsPatch, SettingsStore,
};
use crate::placements::service::PlacementService;

pub(super) fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn policy_config() -> PolicyConfig {
    PolicyConfig {
        max_selected_offers: 2,
        a1_applications_after_a2: 3,
    }
}

pub(super) fn evaluator() -> EligibilityEvaluator {
    EligibilityEvaluator::new(policy_config())
}

pub(super) fn student() -> Student {
    Student {
        id: StudentId(9001),
        roll: "1901cs01".to_string(),
        name: "Asha Verma".to_string(),
        approval: ApprovalState::Approved,
        x_marks: Some(80.0),
        xii_marks: Some(85.0),
        cpi: Some(8.0),
        program: Some("B.Tech".to_string()),
        department: Some("CS".to_string()),
        category: None,
        pwd: false,
        registered_for: PlacementTrack::Fte,
        resume_url: Some("/uploads/1901cs01.pdf".to_string()),
        profile: BTreeMap::new(),
    }
}

pub(super) fn internship_student() -> Student {
    let mut student = student();
    student.registered_for = PlacementTrack::Internship;
    student
}

pub(super) fn job(id: i64, classification: JobClassification) -> Job {
    Job {
        id: JobId(id),
        company: CompanyId(501),
        title: format!("Engineer {id}"),
        min_x_marks: 70.0,
        min_xii_marks: 75.0,
        min_cpi: 7.5,
        eligible_programs: "B.Tech".to_string(),
        eligible_departments: "CS,EE".to_string(),
        category: PlacementTrack::Fte,
        classification,
        only_for_ews: false,
        only_for_pwd: false,
        approval_status: ApprovalState::Approved,
        job_status: JobStatus::Open,
        start_date: None,
        last_date: None,
    }
}

pub(super) fn internship_job(id: i64) -> Job {
    let mut job = job(id, JobClassification::Internship);
    job.category = PlacementTrack::Internship;
    job
}

pub(super) fn selection(job: i64, classification: JobClassification, day: u32) -> SelectedApplication {
    SelectedApplication {
        job: JobId(job),
        classification,
        category: match classification {
            JobClassification::Internship => PlacementTrack::Internship,
            _ => PlacementTrack::Fte,
        },
        created_at: ts(day),
    }
}

pub(super) fn history(
    selected: Vec<SelectedApplication>,
    a1_applications: Vec<DateTime<Utc>>,
    applied: &[i64],
) -> PlacementHistory {
    PlacementHistory {
        selected,
        a1_applications,
        applied_jobs: applied.iter().map(|id| JobId(*id)).collect(),
    }
}

#[derive(Default)]
struct Records {
    students: HashMap<StudentId, Student>,
    jobs: HashMap<JobId, Job>,
    companies: HashMap<CompanyId, Company>,
    applications: HashMap<ApplicationId, Application>,
    unique_pairs: HashSet<(StudentId, JobId)>,
}

/// In-memory stand-in for the CRUD collaborator, including the (student,
/// job) unique index on applications.
#[derive(Default)]
pub(super) struct MemoryRepository {
    inner: Mutex<Records>,
}

impl PlacementRepository for MemoryRepository {
    fn student_by_roll(&self, roll: &str) -> Result<Option<Student>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner
            .students
            .values()
            .find(|student| student.roll == roll)
            .cloned())
    }

    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if inner
            .students
            .values()
            .any(|existing| existing.roll == student.roll)
        {
            return Err(RepositoryError::Conflict);
        }
        inner.students.insert(student.id, student.clone());
        Ok(student)
    }

    fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if !inner.students.contains_key(&student.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.students.insert(student.id, student);
        Ok(())
    }

    fn job(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner.jobs.get(&id).cloned())
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if inner.jobs.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    fn update_job(&self, job: Job) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if !inner.jobs.contains_key(&job.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.jobs.insert(job.id, job);
        Ok(())
    }

    fn candidate_jobs(&self, query: &CandidateJobQuery) -> Result<Vec<Job>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| {
                job.approval_status == ApprovalState::Approved
                    && job.job_status == JobStatus::Open
                    && job.category == query.track
                    && job.min_x_marks <= query.x_marks
                    && job.min_xii_marks <= query.xii_marks
                    && job.min_cpi <= query.cpi
            })
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    fn open_jobs_for_track(&self, track: PlacementTrack) -> Result<Vec<Job>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| {
                job.approval_status == ApprovalState::Approved
                    && job.job_status == JobStatus::Open
                    && job.category == track
            })
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    fn company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner.companies.get(&id).cloned())
    }

    fn insert_company(&self, company: Company) -> Result<Company, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if inner.companies.contains_key(&company.id) {
            return Err(RepositoryError::Conflict);
        }
        inner.companies.insert(company.id, company.clone());
        Ok(company)
    }

    fn update_company(&self, company: Company) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if !inner.companies.contains_key(&company.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.companies.insert(company.id, company);
        Ok(())
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        Ok(inner.applications.get(&id).cloned())
    }

    fn applications_for(
        &self,
        student: StudentId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let inner = self.inner.lock().expect("repository mutex poisoned");
        let mut records: Vec<ApplicationRecord> = inner
            .applications
            .values()
            .filter(|application| application.student == student)
            .filter_map(|application| {
                inner.jobs.get(&application.job).map(|job| ApplicationRecord {
                    application: application.clone(),
                    job: job.clone(),
                })
            })
            .collect();
        records.sort_by_key(|record| record.application.id);
        Ok(records)
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        let pair = (application.student, application.job);
        if inner.unique_pairs.contains(&pair) || inner.applications.contains_key(&application.id)
        {
            return Err(RepositoryError::Conflict);
        }
        inner.unique_pairs.insert(pair);
        inner.applications.insert(application.id, application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().expect("repository mutex poisoned");
        if !inner.applications.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.applications.insert(application.id, application);
        Ok(())
    }
}

impl MemoryRepository {
    pub(super) fn application_count(&self) -> usize {
        self.inner
            .lock()
            .expect("repository mutex poisoned")
            .applications
            .len()
    }
}

#[derive(Default)]
pub(super) struct MemorySettings {
    state: Mutex<Settings>,
}

impl MemorySettings {
    pub(super) fn set(&self, settings: Settings) {
        *self.state.lock().expect("settings mutex poisoned") = settings;
    }
}

impl SettingsStore for MemorySettings {
    fn settings(&self) -> Result<Settings, RepositoryError> {
        Ok(*self.state.lock().expect("settings mutex poisoned"))
    }

    fn update(&self, patch: SettingsPatch) -> Result<Settings, RepositoryError> {
        let mut state = self.state.lock().expect("settings mutex poisoned");
        if let Some(registrations_allowed) = patch.registrations_allowed {
            state.registrations_allowed = registrations_allowed;
        }
        if let Some(cpi_change_allowed) = patch.cpi_change_allowed {
            state.cpi_change_allowed = cpi_change_allowed;
        }
        Ok(*state)
    }
}

#[derive(Default)]
pub(super) struct MemoryEvents {
    events: Mutex<Vec<PlacementEvent>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<PlacementEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: PlacementEvent) -> Result<(), EventError> {
        self.events.lock().expect("event mutex poisoned").push(event);
        Ok(())
    }
}

/// Repository double that rejects every application insert with a
/// uniqueness conflict, simulating the losing side of the apply race.
pub(super) struct ConflictingRepository {
    pub(super) inner: MemoryRepository,
}

impl PlacementRepository for ConflictingRepository {
    fn student_by_roll(&self, roll: &str) -> Result<Option<Student>, RepositoryError> {
        self.inner.student_by_roll(roll)
    }

    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        self.inner.insert_student(student)
    }

    fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        self.inner.update_student(student)
    }

    fn job(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        self.inner.job(id)
    }

    fn insert_job(&self, job: Job) -> Result<Job, RepositoryError> {
        self.inner.insert_job(job)
    }

    fn update_job(&self, job: Job) -> Result<(), RepositoryError> {
        self.inner.update_job(job)
    }

    fn candidate_jobs(&self, query: &CandidateJobQuery) -> Result<Vec<Job>, RepositoryError> {
        self.inner.candidate_jobs(query)
    }

    fn open_jobs_for_track(&self, track: PlacementTrack) -> Result<Vec<Job>, RepositoryError> {
        self.inner.open_jobs_for_track(track)
    }

    fn company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        self.inner.company(id)
    }

    fn insert_company(&self, company: Company) -> Result<Company, RepositoryError> {
        self.inner.insert_company(company)
    }

    fn update_company(&self, company: Company) -> Result<(), RepositoryError> {
        self.inner.update_company(company)
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.application(id)
    }

    fn applications_for(
        &self,
        student: StudentId,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.inner.applications_for(student)
    }

    fn insert_application(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        self.inner.update_application(application)
    }
}

pub(super) type TestService = PlacementService<MemoryRepository, MemorySettings, MemoryEvents>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemorySettings>,
    Arc<MemoryEvents>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let settings = Arc::new(MemorySettings::default());
    let events = Arc::new(MemoryEvents::default());
    let service = PlacementService::new(
        repository.clone(),
        settings.clone(),
        events.clone(),
        policy_config(),
    );
    (service, repository, settings, events)
}

pub(super) fn seed_company(repository: &MemoryRepository) -> Company {
    let company = Company {
        id: CompanyId(501),
        name: "Orion Systems".to_string(),
        status: CompanyStatus::Approved,
    };
    repository
        .insert_company(company.clone())
        .expect("company seeds");
    company
}

pub(super) fn seed_student(repository: &MemoryRepository) -> Student {
    let student = student();
    repository
        .insert_student(student.clone())
        .expect("student seeds");
    student
}

pub(super) fn seed_job(repository: &MemoryRepository, id: i64, classification: JobClassification) -> Job {
    let job = job(id, classification);
    repository.insert_job(job.clone()).expect("job seeds");
    job
}

pub(super) fn seed_application(
    repository: &MemoryRepository,
    id: i64,
    student: StudentId,
    job: JobId,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
) -> Application {
    let application = Application {
        id: ApplicationId(id),
        student,
        job,
        status,
        created_at,
    };
    repository
        .insert_application(application.clone())
        .expect("application seeds");
    application
}
