//! Commit status and mergeability models.

use serde::{Deserialize, Serialize};

/// Combined state of the head commit's status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Success,
    Pending,
    Failure,
    Error,
    Unknown,
}

impl From<&str> for CheckState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "success" => Self::Success,
            "pending" => Self::Pending,
            "failure" => Self::Failure,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Pending => write!(f, "pending"),
            Self::Failure => write!(f, "failure"),
            Self::Error => write!(f, "error"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reduced view of the head commit's combined status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSummary {
    /// Combined state copied from the platform.
    pub overall_state: CheckState,

    /// Number of sub-statuses reported.
    pub total_count: i64,

    /// Number of sub-statuses that succeeded.
    pub succeeded_count: i64,

    /// Context names of failing/errored sub-statuses.
    pub failing_names: Vec<String>,
}

impl CheckSummary {
    /// Placeholder summary used when the status endpoint was unavailable.
    pub fn unknown() -> Self {
        Self {
            overall_state: CheckState::Unknown,
            total_count: 0,
            succeeded_count: 0,
            failing_names: Vec::new(),
        }
    }
}

/// Mergeability of a pull request's branch against its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeableState {
    Clean,
    Behind,
    Dirty,
    Blocked,
    Unstable,
    Draft,
    Unknown,
}

impl From<&str> for MergeableState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "clean" => Self::Clean,
            "behind" => Self::Behind,
            "dirty" => Self::Dirty,
            "blocked" => Self::Blocked,
            "unstable" => Self::Unstable,
            "draft" => Self::Draft,
            _ => Self::Unknown,
        }
    }
}

impl MergeableState {
    /// Whether the branch must be rebased before it can merge cleanly.
    pub fn needs_rebase(&self) -> bool {
        matches!(self, Self::Behind | Self::Dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_state_from_str() {
        assert_eq!(CheckState::from("success"), CheckState::Success);
        assert_eq!(CheckState::from("FAILURE"), CheckState::Failure);
        assert_eq!(CheckState::from("something-new"), CheckState::Unknown);
    }

    #[test]
    fn test_needs_rebase() {
        assert!(MergeableState::Behind.needs_rebase());
        assert!(MergeableState::Dirty.needs_rebase());
        assert!(!MergeableState::Clean.needs_rebase());
        assert!(!MergeableState::Blocked.needs_rebase());
    }
}
