//! Gateway trait for all workload network I/O.
//!
//! The lifecycle state machine talks to the orchestration service only
//! through this trait, so it can be driven by a scripted gateway in tests.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

use super::types::{CustomAction, SubmitReceipt, WorkloadStatus, WorkloadSummary};

/// Remote operations on workloads.
///
/// Implementations attach authentication themselves; callers never see
/// tokens or headers.
#[async_trait]
pub trait WorkloadGateway: Send + Sync {
    /// Validates a spec without submitting it.
    ///
    /// Returns the list of validation errors, empty when the spec is fine.
    async fn validate(&self, spec_yaml: &str) -> Result<Vec<String>>;

    /// Submits a new workload spec and returns the acceptance receipt.
    async fn submit(&self, spec_yaml: &str, name: Option<&str>) -> Result<SubmitReceipt>;

    /// Fetches the current status of a workload.
    async fn fetch_status(&self, workload_id: &str) -> Result<WorkloadStatus>;

    /// Replaces the spec of an existing workload.
    async fn update(&self, workload_id: &str, spec_yaml: &str) -> Result<SubmitReceipt>;

    /// Issues a custom action against a workload.
    ///
    /// `replicas` is only meaningful for [`CustomAction::Scale`].
    async fn custom_action(
        &self,
        workload_id: &str,
        action: CustomAction,
        replicas: Option<u32>,
    ) -> Result<SubmitReceipt>;

    /// Deletes a workload.
    async fn delete(&self, workload_id: &str) -> Result<SubmitReceipt>;

    /// Lists workloads, optionally filtered by phase and name.
    async fn list(
        &self,
        phase: Option<&str>,
        name: Option<&str>,
        labels: Option<&HashMap<String, String>>,
    ) -> Result<Vec<WorkloadSummary>>;

    /// Fetches the logs of a workload.
    async fn logs(&self, workload_id: &str) -> Result<String>;
}
