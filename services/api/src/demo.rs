use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Args;

use crate::infra::{
    policy_config_from_env, InMemoryPlacementRepository, InMemorySettingsStore,
    LoggingEventPublisher,
};
use placement_cell::error::AppError;
use placement_cell::placements::domain::{
    ApplicationStatus, ApprovalState, CompanyStatus, JobClassification, JobDraft, PlacementTrack,
};
use placement_cell::placements::profile::ProfileSubmission;
use placement_cell::placements::{PlacementError, PlacementService};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Roll number used for the demo student
    #[arg(long, default_value = "1901cs01")]
    pub(crate) roll: String,
}

type DemoService =
    PlacementService<InMemoryPlacementRepository, InMemorySettingsStore, LoggingEventPublisher>;

/// Walk one student through a placement season against in-memory storage:
/// registration, approvals, eligibility listings, and the admission-control
/// gates tripping one by one.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryPlacementRepository::default());
    let settings = Arc::new(InMemorySettingsStore::default());
    let events = Arc::new(LoggingEventPublisher);
    let service: DemoService = PlacementService::new(
        repository,
        settings,
        events,
        policy_config_from_env(),
    );

    println!("Placement season walkthrough for roll {}", args.roll);

    let company = service.register_company("Orion Systems".to_string())?;
    service.set_company_status(company.id, CompanyStatus::Approved)?;
    println!("registered and approved company: {}", company.name);

    let last_date = Some((Utc::now() + Duration::days(30)).to_rfc3339());
    let mut jobs = Vec::new();
    for (title, classification) in [
        ("Core Engineer (dream)", JobClassification::X),
        ("Backend Engineer", JobClassification::A1),
        ("Platform Engineer", JobClassification::A1),
        ("Systems Engineer", JobClassification::A1),
        ("Data Engineer", JobClassification::A1),
        ("QA Engineer", JobClassification::A2),
    ] {
        let job = service.register_job(JobDraft {
            company: company.id,
            title: title.to_string(),
            min_x_marks: 70.0,
            min_xii_marks: 75.0,
            min_cpi: 7.5,
            eligible_programs: "B.Tech".to_string(),
            eligible_departments: "CS,EE".to_string(),
            category: PlacementTrack::Fte,
            classification,
            only_for_ews: false,
            only_for_pwd: false,
            start_date: None,
            last_date: last_date.clone(),
        })?;
        service.set_job_approval(job.id, ApprovalState::Approved)?;
        jobs.push(job);
    }
    println!("registered and approved {} jobs", jobs.len());

    service.submit_for_approval(ProfileSubmission {
        roll: args.roll.clone(),
        name: "Asha Verma".to_string(),
        registered_for: PlacementTrack::Fte,
        program: Some("B.Tech".to_string()),
        department: Some("CS".to_string()),
        category: None,
        pwd: false,
        x_marks: Some(82.0),
        xii_marks: Some(88.0),
        cpi: Some(8.4),
        resume_link: None,
        profile: Default::default(),
    })?;
    service.set_student_approval(&args.roll, ApprovalState::Approved)?;
    println!("student profile submitted and approved");

    print_listing(&service, &args.roll)?;

    let a2_job = jobs
        .iter()
        .find(|job| job.classification == JobClassification::A2)
        .map(|job| job.id);
    let Some(a2_job) = a2_job else {
        return Ok(());
    };

    let application = service.apply(&args.roll, a2_job, Utc::now())?;
    service.set_application_status(application.id, ApplicationStatus::Selected)?;
    println!("\napplied to the A2 job and got selected");

    print_listing(&service, &args.roll)?;

    println!("\napplying to A1 jobs until a gate trips:");
    for job in jobs
        .iter()
        .filter(|job| job.classification == JobClassification::A1)
    {
        match service.apply(&args.roll, job.id, Utc::now()) {
            Ok(_) => println!("  applied: {}", job.title),
            Err(PlacementError::NotEligible(reason)) => {
                println!("  rejected ({}): {}", job.title, reason.summary());
            }
            Err(other) => return Err(other.into()),
        }
    }

    print_listing(&service, &args.roll)?;
    Ok(())
}

fn print_listing(service: &DemoService, roll: &str) -> Result<(), PlacementError> {
    let listed = service.list_eligible_jobs(roll, Utc::now())?;
    println!("\neligible jobs right now ({}):", listed.len());
    for view in listed {
        println!(
            "  [{}] {} at {}",
            view.classification,
            view.title,
            view.company.as_deref().unwrap_or("unknown company"),
        );
    }
    Ok(())
}
