use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;
use placement_cell::placements::domain::{
    Application, ApplicationId, ApplicationRecord, ApprovalState, Company, CompanyId, Job, JobId,
    JobStatus, PlacementTrack, Student, StudentId,
};
use placement_cell::placements::repository::{
    CandidateJobQuery, EventError, EventPublisher, PlacementEvent, PlacementRepository,
    RepositoryError, Settings, SettingsPatch, SettingsStore,
};
use placement_cell::placements::PolicyConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Collections {
    students: HashMap<StudentId, Student>,
    jobs: HashMap<JobId, Job>,
    companies: HashMap<CompanyId, Company>,
    applications: HashMap<ApplicationId, Application>,
    application_pairs: HashSet<(StudentId, JobId)>,
}

/// In-memory stand-in for the CRUD collaborator, good for demos and tests.
/// `application_pairs` plays the role of the (student, job) unique index.
#[derive(Default)]
pub(crate) struct InMemoryPlacementRepository {
    inner: Mutex<Collections>,
}

impl PlacementRepository for InMemoryPlacementRepository {
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
        if inner.application_pairs.contains(&pair) {
            return Err(RepositoryError::Conflict);
        }
        inner.application_pairs.insert(pair);
        inner
            .applications
            .insert(application.id, application.clone());
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

#[derive(Default)]
pub(crate) struct InMemorySettingsStore {
    state: Mutex<Settings>,
}

impl SettingsStore for InMemorySettingsStore {
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

/// Logs events instead of delivering them; the real deployment wires the
/// mail adapter here.
#[derive(Default)]
pub(crate) struct LoggingEventPublisher;

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: PlacementEvent) -> Result<(), EventError> {
        tracing::info!(?event, "placement event");
        Ok(())
    }
}

/// Policy constants, overridable per deployment without a rebuild.
pub(crate) fn policy_config_from_env() -> PolicyConfig {
    let defaults = PolicyConfig::default();
    PolicyConfig {
        max_selected_offers: env_u32("PLACEMENT_MAX_OFFERS", defaults.max_selected_offers),
        a1_applications_after_a2: env_u32(
            "PLACEMENT_A1_QUOTA",
            defaults.a1_applications_after_a2,
        ),
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = raw, "ignoring unparsable policy override");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_pair_index_rejects_a_second_application() {
        let repository = InMemoryPlacementRepository::default();
        let application = Application {
            id: ApplicationId(1),
            student: StudentId(1),
            job: JobId(1),
            status: placement_cell::placements::domain::ApplicationStatus::Applied,
            created_at: chrono::Utc::now(),
        };
        repository
            .insert_application(application.clone())
            .expect("first insert succeeds");

        let mut second = application;
        second.id = ApplicationId(2);
        assert!(matches!(
            repository.insert_application(second),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn policy_defaults_apply_without_env_overrides() {
        std::env::remove_var("PLACEMENT_MAX_OFFERS");
        std::env::remove_var("PLACEMENT_A1_QUOTA");
        let config = policy_config_from_env();
        assert_eq!(config, PolicyConfig::default());
    }
}
