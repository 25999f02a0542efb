use std::collections::BTreeMap;

use serde_json::json;

use super::common::*;
use crate::placements::domain::ApprovalState;
use crate::placements::profile::{field_policy, filter_changes, FieldPolicy};
use crate::placements::repository::Settings;

fn changes(pairs: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.clone()))
        .collect()
}

#[test]
fn policy_table_covers_the_known_fields() {
    assert_eq!(field_policy("department"), Some(FieldPolicy::BeforeApproval));
    assert_eq!(field_policy("resume_link"), Some(FieldPolicy::Anytime));
    assert_eq!(field_policy("cpi"), Some(FieldPolicy::WhenCpiChangeAllowed));
    assert_eq!(field_policy("spi5"), Some(FieldPolicy::WhenCpiChangeAllowed));
    assert_eq!(field_policy("approved"), None);
    assert_eq!(field_policy("roll"), None);
}

#[test]
fn unknown_fields_are_dropped_silently() {
    let filtered = filter_changes(
        &changes(&[("approved", json!("approved")), ("resume_link", json!("/r.pdf"))]),
        ApprovalState::Approved,
        &Settings::default(),
    );

    assert_eq!(filtered.len(), 1);
    assert!(filtered.contains_key("resume_link"));
}

#[test]
fn pre_approval_fields_lock_after_approval() {
    let requested = changes(&[("department", json!("EE")), ("resume_link", json!("/r.pdf"))]);

    let before = filter_changes(&requested, ApprovalState::Pending, &Settings::default());
    assert!(before.contains_key("department"));

    let after = filter_changes(&requested, ApprovalState::Approved, &Settings::default());
    assert!(!after.contains_key("department"));
    assert!(after.contains_key("resume_link"));
}

#[test]
fn cpi_fields_require_the_admin_toggle() {
    let requested = changes(&[("cpi", json!(9.1))]);

    let closed = filter_changes(&requested, ApprovalState::Approved, &Settings::default());
    assert!(closed.is_empty());

    let open = filter_changes(
        &requested,
        ApprovalState::Approved,
        &Settings {
            registrations_allowed: true,
            cpi_change_allowed: true,
        },
    );
    assert!(open.contains_key("cpi"));
}

#[test]
fn update_profile_applies_only_allowed_changes() {
    let (service, repository, settings, _) = build_service();
    seed_student(&repository);
    settings.set(Settings {
        registrations_allowed: true,
        cpi_change_allowed: true,
    });

    let updated = service
        .update_profile(
            "1901cs01",
            &changes(&[
                ("cpi", json!(9.2)),
                ("resume_link", json!("/uploads/new.pdf")),
                ("department", json!("EE")),
                ("approved", json!("rejected")),
            ]),
        )
        .expect("update succeeds");

    assert_eq!(updated.cpi, Some(9.2));
    assert_eq!(updated.resume_url.as_deref(), Some("/uploads/new.pdf"));
    // Approved profile: department is locked, approval untouched.
    assert_eq!(updated.department.as_deref(), Some("CS"));
    assert_eq!(updated.approval, ApprovalState::Approved);
}

#[test]
fn update_profile_with_no_allowed_fields_is_a_no_op() {
    let (service, repository, _, _) = build_service();
    let stored = seed_student(&repository);

    let updated = service
        .update_profile("1901cs01", &changes(&[("approved", json!("rejected"))]))
        .expect("update succeeds");

    assert_eq!(updated, stored);
}

#[test]
fn presentation_fields_land_in_the_profile_bag() {
    let (service, repository, _, _) = build_service();
    seed_student(&repository);

    let updated = service
        .update_profile(
            "1901cs01",
            &changes(&[("projects", json!(["ray tracer", "kv store"]))]),
        )
        .expect("update succeeds");

    assert_eq!(
        updated.profile.get("projects"),
        Some(&json!(["ray tracer", "kv store"]))
    );
}
