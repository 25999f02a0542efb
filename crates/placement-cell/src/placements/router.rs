use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{
    ApplicationId, ApplicationStatus, ApprovalState, CompanyId, CompanyStatus, JobDraft, JobId,
};
use super::evaluation::ReasonCode;
use super::profile::ProfileSubmission;
use super::repository::{EventPublisher, PlacementRepository, SettingsPatch, SettingsStore};
use super::service::{PlacementError, PlacementService};

/// Router builder exposing the placement endpoints. Identity resolution is
/// the surrounding system's concern: by the time a request lands here, the
/// bearer token has already been mapped to the roll in the path.
pub fn placement_router<R, S, P>(service: Arc<PlacementService<R, S, P>>) -> Router
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/students/:roll/jobs/eligible",
            get(eligible_jobs_handler::<R, S, P>),
        )
        .route("/api/v1/students/:roll/jobs", get(open_jobs_handler::<R, S, P>))
        .route(
            "/api/v1/students/:roll/applications",
            get(applied_jobs_handler::<R, S, P>).post(apply_handler::<R, S, P>),
        )
        .route(
            "/api/v1/students/:roll/profile",
            post(submit_profile_handler::<R, S, P>).patch(update_profile_handler::<R, S, P>),
        )
        .route("/api/v1/companies", post(register_company_handler::<R, S, P>))
        .route("/api/v1/jobs", post(register_job_handler::<R, S, P>))
        .route(
            "/api/v1/admin/settings",
            get(get_settings_handler::<R, S, P>).put(update_settings_handler::<R, S, P>),
        )
        .route(
            "/api/v1/admin/resumes",
            get(resume_manifest_handler::<R, S, P>),
        )
        .route(
            "/api/v1/admin/students/:roll/approval",
            put(student_approval_handler::<R, S, P>),
        )
        .route(
            "/api/v1/admin/jobs/:id/approval",
            put(job_approval_handler::<R, S, P>),
        )
        .route(
            "/api/v1/admin/companies/:id/status",
            put(company_status_handler::<R, S, P>),
        )
        .route(
            "/api/v1/admin/applications/:id/status",
            put(application_status_handler::<R, S, P>),
        )
        .with_state(service)
}

impl IntoResponse for PlacementError {
    fn into_response(self) -> Response {
        let status = match &self {
            PlacementError::StudentNotFound(_)
            | PlacementError::JobNotFound(_)
            | PlacementError::CompanyNotFound(_)
            | PlacementError::ApplicationNotFound(_) => StatusCode::NOT_FOUND,
            PlacementError::NotEligible(ReasonCode::AlreadyApplied)
            | PlacementError::AlreadyRegistered(_) => StatusCode::CONFLICT,
            PlacementError::AccountNotApproved
            | PlacementError::CpiNotSet
            | PlacementError::RegistrationsClosed
            | PlacementError::CompanyNotApproved
            | PlacementError::NotEligible(_) => StatusCode::BAD_REQUEST,
            PlacementError::Evaluation(_)
            | PlacementError::Repository(_)
            | PlacementError::Event(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = match &self {
            PlacementError::NotEligible(reason) => json!({
                "error": self.to_string(),
                "reason": reason,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(payload)).into_response()
    }
}

type Service<R, S, P> = State<Arc<PlacementService<R, S, P>>>;

async fn eligible_jobs_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(roll): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.list_eligible_jobs(&roll, Utc::now()) {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn open_jobs_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(roll): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.open_jobs(&roll) {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    pub(crate) job_id: i64,
}

async fn apply_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(roll): Path<String>,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.apply(&roll, JobId(request.job_id), Utc::now()) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn applied_jobs_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(roll): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.applied_jobs(&roll) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn submit_profile_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(roll): Path<String>,
    Json(submission): Json<ProfileSubmission>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    if submission.roll != roll {
        let payload = json!({ "error": "roll in body does not match the authenticated roll" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    match service.submit_for_approval(submission) {
        Ok(student) => (StatusCode::ACCEPTED, Json(student)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn update_profile_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(roll): Path<String>,
    Json(changes): Json<BTreeMap<String, Value>>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.update_profile(&roll, &changes) {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterCompanyRequest {
    pub(crate) name: String,
}

async fn register_company_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Json(request): Json<RegisterCompanyRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.register_company(request.name) {
        Ok(company) => (StatusCode::CREATED, Json(company)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn register_job_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Json(draft): Json<JobDraft>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.register_job(draft) {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_settings_handler<R, S, P>(State(service): Service<R, S, P>) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.settings() {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn update_settings_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Json(patch): Json<SettingsPatch>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.update_settings(patch) {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResumeManifestQuery {
    pub(crate) rolls: String,
}

async fn resume_manifest_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Query(query): Query<ResumeManifestQuery>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.resume_manifest(&query.rolls) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApprovalRequest {
    pub(crate) approval: ApprovalState,
}

async fn student_approval_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(roll): Path<String>,
    Json(request): Json<ApprovalRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.set_student_approval(&roll, request.approval) {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn job_approval_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(id): Path<i64>,
    Json(request): Json<ApprovalRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.set_job_approval(JobId(id), request.approval) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompanyStatusRequest {
    pub(crate) status: CompanyStatus,
}

async fn company_status_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(id): Path<i64>,
    Json(request): Json<CompanyStatusRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.set_company_status(CompanyId(id), request.status) {
        Ok(company) => (StatusCode::OK, Json(company)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationStatusRequest {
    pub(crate) status: ApplicationStatus,
}

async fn application_status_handler<R, S, P>(
    State(service): Service<R, S, P>,
    Path(id): Path<i64>,
    Json(request): Json<ApplicationStatusRequest>,
) -> Response
where
    R: PlacementRepository + 'static,
    S: SettingsStore + 'static,
    P: EventPublisher + 'static,
{
    match service.set_application_status(ApplicationId(id), request.status) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => err.into_response(),
    }
}
