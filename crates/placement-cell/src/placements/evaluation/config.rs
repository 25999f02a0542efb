use serde::{Deserialize, Serialize};

/// Policy dials for admission control. These numbers are placement-cell
/// policy, not code: they have changed between placement seasons, so they
/// are carried as configuration and threaded through the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// A student holding this many selected offers is out of process for
    /// every non-"X" job.
    pub max_selected_offers: u32,
    /// Number of A1 applications a student may still make after being
    /// selected in an A2 job.
    pub a1_applications_after_a2: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_selected_offers: 2,
            a1_applications_after_a2: 3,
        }
    }
}
