//! Wire types for the orchestration API.
//!
//! This module defines the phase enumeration and the payloads exchanged with
//! the remote service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse lifecycle phase of a remote workload.
///
/// The canonical creation path is `Pending -> Starting -> Serving`, with
/// side branches for updates, pauses, and failures, and a terminal
/// `Deleted`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Accepted by the service, not yet scheduled.
    Pending,
    /// Containers are coming up.
    Starting,
    /// Steady state, traffic is served.
    Serving,
    /// A spec update or custom action is being applied.
    Updating,
    /// Scaled to zero by a pause action.
    Paused,
    /// The service gave up on the workload.
    Failed,
    /// The workload has been removed. Terminal.
    Deleted,
}

impl Phase {
    /// Parses a phase from its wire representation, case-insensitively.
    ///
    /// Returns `None` for unknown or empty values; callers treat that the
    /// same as a missing phase field (a transient fetch).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "starting" => Some(Self::Starting),
            "serving" => Some(Self::Serving),
            "updating" => Some(Self::Updating),
            "paused" => Some(Self::Paused),
            "failed" => Some(Self::Failed),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Returns true if the workload is serving traffic.
    #[must_use]
    pub const fn is_serving(self) -> bool {
        matches!(self, Self::Serving)
    }

    /// Returns true if the workload has been removed.
    #[must_use]
    pub const fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            Self::Pending => "Pending",
            Self::Starting => "Starting",
            Self::Serving => "Serving",
            Self::Updating => "Updating",
            Self::Paused => "Paused",
            Self::Failed => "Failed",
            Self::Deleted => "Deleted",
        };
        write!(f, "{phase}")
    }
}

/// A state-changing action against an already-running workload.
///
/// Each action maps to its own remote endpoint (`PUT
/// /workloads/{id}:{action}`) and its own expected phase path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomAction {
    /// Restart all executors.
    Restart,
    /// Scale to zero, keeping the remote identifier.
    Pause,
    /// Bring a paused workload back to serving.
    Resume,
    /// Change the replica count of an executor.
    Scale,
    /// Bring a deleted workload back under the same identifier.
    Recreate,
}

impl CustomAction {
    /// The action verb as it appears in the endpoint path.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Restart => "restart",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Scale => "scale",
            Self::Recreate => "recreate",
        }
    }
}

impl std::fmt::Display for CustomAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}

/// Response to a submit, update, action, or delete call.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReceipt {
    /// Remote workload identifier.
    pub id: String,
    /// Phase reported at acceptance time, if any.
    #[serde(default)]
    pub phase: Option<String>,
}

/// Observed status of a workload.
#[derive(Debug, Clone, Default)]
pub struct WorkloadStatus {
    /// Parsed phase, `None` when the response carried no usable phase.
    pub phase: Option<Phase>,
    /// Raw phase string as reported by the service.
    pub raw_phase: Option<String>,
    /// Public endpoints, keyed by protocol or executor name.
    pub endpoints: HashMap<String, String>,
    /// Human-readable conditions attached by the service.
    pub conditions: Vec<String>,
}

/// One row of a workload listing.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadSummary {
    /// Remote workload identifier.
    pub id: String,
    /// Workload name.
    #[serde(default)]
    pub name: String,
    /// Current phase as reported by the service.
    #[serde(default)]
    pub phase: String,
    /// Public endpoints.
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parse_case_insensitive() {
        assert_eq!(Phase::parse("Serving"), Some(Phase::Serving));
        assert_eq!(Phase::parse("SERVING"), Some(Phase::Serving));
        assert_eq!(Phase::parse("pending"), Some(Phase::Pending));
        assert_eq!(Phase::parse(""), None);
        assert_eq!(Phase::parse("Scheduling"), None);
    }

    #[test]
    fn test_action_verbs() {
        assert_eq!(CustomAction::Pause.verb(), "pause");
        assert_eq!(CustomAction::Recreate.verb(), "recreate");
        assert_eq!(format!("{}", CustomAction::Scale), "scale");
    }
}
