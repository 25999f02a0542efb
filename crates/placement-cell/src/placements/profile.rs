use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{ApprovalState, PlacementTrack, Student};
use super::repository::Settings;

/// When a profile field may be modified by its owning student.
///
/// Every field not covered by the table is immutable through the profile
/// route (approval state, ids, and anything unknown), so a request can
/// never smuggle in a field the workflow owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Locked once the profile has been approved or rejected.
    BeforeApproval,
    /// Editable at any time.
    Anytime,
    /// Editable only while the admin has globally enabled CPI/SPI updates.
    WhenCpiChangeAllowed,
}

const BEFORE_APPROVAL_FIELDS: &[&str] = &[
    "name",
    "gender",
    "date_of_birth",
    "category",
    "rank",
    "registered_for",
    "program",
    "department",
    "course",
    "address",
    "X_marks",
    "XII_marks",
    "ug_college",
    "ug_cpi",
];

const ANYTIME_FIELDS: &[&str] = &[
    "resume_link",
    "other_achievements",
    "projects",
    "profile_picture",
    "current_sem",
];

const CPI_FIELDS: &[&str] = &[
    "spi1", "spi2", "spi3", "spi4", "spi5", "spi6", "spi7", "spi8", "cpi",
];

pub fn field_policy(field: &str) -> Option<FieldPolicy> {
    if BEFORE_APPROVAL_FIELDS.contains(&field) {
        Some(FieldPolicy::BeforeApproval)
    } else if ANYTIME_FIELDS.contains(&field) {
        Some(FieldPolicy::Anytime)
    } else if CPI_FIELDS.contains(&field) {
        Some(FieldPolicy::WhenCpiChangeAllowed)
    } else {
        None
    }
}

/// Keep only the changes the student is currently allowed to make. Unknown
/// fields are dropped, not rejected, matching how the profile route has
/// always behaved.
pub fn filter_changes(
    changes: &BTreeMap<String, Value>,
    approval: ApprovalState,
    settings: &Settings,
) -> BTreeMap<String, Value> {
    let pre_approval = matches!(approval, ApprovalState::Created | ApprovalState::Pending);

    changes
        .iter()
        .filter(|(field, _)| match field_policy(field) {
            Some(FieldPolicy::Anytime) => true,
            Some(FieldPolicy::BeforeApproval) => pre_approval,
            Some(FieldPolicy::WhenCpiChangeAllowed) => settings.cpi_change_allowed,
            None => false,
        })
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

/// Write one allow-listed change onto the typed student record. Fields the
/// policy core reads are mapped onto their typed columns; the rest land in
/// the presentation-only `profile` bag.
pub(crate) fn apply_change(student: &mut Student, field: &str, value: &Value) {
    match field {
        "name" => {
            if let Some(text) = value.as_str() {
                student.name = text.to_string();
            }
        }
        "category" => student.category = value.as_str().map(str::to_string),
        "program" => student.program = value.as_str().map(str::to_string),
        "department" => student.department = value.as_str().map(str::to_string),
        "registered_for" => {
            if let Some(track) = value.as_str().and_then(PlacementTrack::parse) {
                student.registered_for = track;
            }
        }
        "X_marks" => {
            if let Some(marks) = value.as_f64() {
                student.x_marks = Some(marks as f32);
            }
        }
        "XII_marks" => {
            if let Some(marks) = value.as_f64() {
                student.xii_marks = Some(marks as f32);
            }
        }
        "cpi" => {
            if let Some(cpi) = value.as_f64() {
                student.cpi = Some(cpi as f32);
            }
        }
        "resume_link" => student.resume_url = value.as_str().map(str::to_string),
        other => {
            student.profile.insert(other.to_string(), value.clone());
        }
    }
}

/// Payload for the registration route. The service forces the stored record
/// into `Pending` approval no matter what the caller sent; approval is the
/// admin workflow's call alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSubmission {
    pub roll: String,
    pub name: String,
    pub registered_for: PlacementTrack,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub pwd: bool,
    #[serde(default)]
    pub x_marks: Option<f32>,
    #[serde(default)]
    pub xii_marks: Option<f32>,
    #[serde(default)]
    pub cpi: Option<f32>,
    #[serde(default)]
    pub resume_link: Option<String>,
    #[serde(default)]
    pub profile: BTreeMap<String, Value>,
}
