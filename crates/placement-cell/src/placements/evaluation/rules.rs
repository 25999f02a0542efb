use chrono::{DateTime, Utc};

use super::super::domain::JobClassification;
use super::config::PolicyConfig;
use super::policy::ReasonCode;
use super::PlacementHistory;

/// Admission-control state for one student, recomputed from the application
/// history on every evaluation. Nothing here is persisted: if a selection
/// is withdrawn, the derived state (and any gate it implied) disappears
/// with it.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct SelectionSummary {
    pub(crate) selected_internship: bool,
    pub(crate) selected_a1: bool,
    pub(crate) first_a2_selection: Option<DateTime<Utc>>,
    /// A1 applications created strictly after the first A2 selection, or
    /// every A1 application when no A2 selection exists.
    pub(crate) post_a2_a1_applications: u32,
    pub(crate) total_selected: u32,
}

impl SelectionSummary {
    pub(crate) fn derive(history: &PlacementHistory) -> Self {
        let mut selected_internship = false;
        let mut selected_a1 = false;
        let mut first_a2_selection: Option<DateTime<Utc>> = None;

        for selection in &history.selected {
            match selection.classification {
                JobClassification::Internship => selected_internship = true,
                JobClassification::A1 => selected_a1 = true,
                JobClassification::A2 => {
                    first_a2_selection = match first_a2_selection {
                        Some(existing) if existing <= selection.created_at => Some(existing),
                        _ => Some(selection.created_at),
                    };
                }
                JobClassification::X | JobClassification::Fte => {}
            }
        }

        let post_a2_a1_applications = history
            .a1_applications
            .iter()
            .filter(|created_at| match first_a2_selection {
                Some(cutoff) => **created_at > cutoff,
                None => true,
            })
            .count() as u32;

        Self {
            selected_internship,
            selected_a1,
            first_a2_selection,
            post_a2_a1_applications,
            total_selected: history.selected.len() as u32,
        }
    }
}

/// Stage-9 admission control. Classification "X" bypasses every check here.
///
/// Ordering is part of the policy: the internship-exclusivity check runs
/// before the universal offer cap for internship jobs, while "A1"/"A2"
/// jobs hit the cap first.
pub(crate) fn admission_rejection(
    classification: JobClassification,
    summary: &SelectionSummary,
    config: &PolicyConfig,
) -> Option<ReasonCode> {
    let over_cap = summary.total_selected >= config.max_selected_offers;

    match classification {
        JobClassification::X => None,
        JobClassification::Internship => {
            if summary.selected_internship {
                return Some(ReasonCode::AlreadySelectedInternship);
            }
            if over_cap {
                return Some(ReasonCode::OfferLimitReached);
            }
            None
        }
        JobClassification::A1 => {
            if over_cap {
                return Some(ReasonCode::OfferLimitReached);
            }
            if summary.selected_a1 {
                return Some(ReasonCode::AlreadySelectedA1);
            }
            // The quota only bites once an A2 selection exists.
            if summary.first_a2_selection.is_some()
                && summary.post_a2_a1_applications >= config.a1_applications_after_a2
            {
                return Some(ReasonCode::A1ApplicationQuotaExceeded);
            }
            None
        }
        JobClassification::A2 => {
            if over_cap {
                return Some(ReasonCode::OfferLimitReached);
            }
            if summary.first_a2_selection.is_some() {
                return Some(ReasonCode::AlreadySelectedA2);
            }
            None
        }
        JobClassification::Fte => {
            if over_cap {
                return Some(ReasonCode::OfferLimitReached);
            }
            None
        }
    }
}
