//! Concurrent removal of multiple workloads.
//!
//! Each target gets its own removal task; one failing target never stops
//! the others. The caller receives a report of per-target outcomes instead
//! of an error for the batch.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::api::WorkloadGateway;
use crate::error::{FlowctlError, Result};

use super::controller::{LifecycleController, PollConfig, TerminationStatus};

/// Aggregate outcome of one removal batch.
///
/// Per-target failures are logged as they happen; the report only carries
/// the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Number of targets in the batch.
    pub attempted: usize,
    /// Number of targets removed, including already-gone workloads.
    pub succeeded: usize,
    /// True if any target failed to remove.
    pub any_failed: bool,
}

/// Removes a set of workloads concurrently.
#[derive(Debug)]
pub struct BulkRemover<G> {
    gateway: Arc<G>,
    poll: PollConfig,
    concurrency: Option<usize>,
}

impl<G: WorkloadGateway + 'static> BulkRemover<G> {
    /// Creates a remover with unbounded concurrency.
    #[must_use]
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            poll: PollConfig::default(),
            concurrency: None,
        }
    }

    /// Caps the number of removals in flight at once.
    ///
    /// A cap of zero is treated as one.
    #[must_use]
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    /// Sets the polling parameters used to watch each deletion.
    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Removes all given workloads and waits for each deletion to finish.
    ///
    /// Targets fail independently; the report carries every outcome.
    pub async fn remove_all(&self, workload_ids: &[String]) -> RemovalReport {
        let total = workload_ids.len();
        info!("Removing {total} workloads");

        let limiter = self
            .concurrency
            .map(|n| Arc::new(Semaphore::new(n)));

        let mut tasks = JoinSet::new();
        for id in workload_ids {
            let gateway = Arc::clone(&self.gateway);
            let poll = self.poll.clone();
            let limiter = limiter.clone();
            let id = id.clone();
            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            let err = FlowctlError::internal("removal limiter closed");
                            return (id, Err(err));
                        }
                    },
                    None => None,
                };
                let outcome = Self::remove_one(gateway, &id, poll).await;
                (id, outcome)
            });
        }

        let mut report = RemovalReport {
            attempted: total,
            ..RemovalReport::default()
        };
        let mut done = 0usize;
        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok((id, Ok(()))) => {
                    info!("({done}/{total}) Removed workload {id}");
                    report.succeeded += 1;
                }
                Ok((id, Err(e))) => {
                    warn!("({done}/{total}) Failed to remove workload {id}: {e}");
                    report.any_failed = true;
                }
                Err(e) => {
                    warn!("({done}/{total}) Removal task failed: {e}");
                    report.any_failed = true;
                }
            }
        }

        report
    }

    /// Removes one workload, waiting for its deletion watch.
    async fn remove_one(gateway: Arc<G>, workload_id: &str, poll: PollConfig) -> Result<()> {
        let mut controller =
            LifecycleController::attach(gateway, workload_id).with_poll_config(poll);
        match controller.terminate().await? {
            TerminationStatus::AlreadyRemoved => Ok(()),
            TerminationStatus::Accepted => controller.wait_deleted().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CustomAction, Phase, SubmitReceipt, WorkloadStatus, WorkloadSummary};
    use crate::error::ApiError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Gateway where deletes fail for scripted identifiers and every
    /// surviving workload reports `Deleted` immediately, except the
    /// "stuck" ones, which report `Serving` forever.
    #[derive(Debug)]
    struct PartialFailureGateway {
        failing: Vec<String>,
        already_gone: Vec<String>,
        stuck: Vec<String>,
        deletes: AtomicUsize,
        fetches: AtomicUsize,
    }

    impl PartialFailureGateway {
        fn new(failing: &[&str], already_gone: &[&str]) -> Arc<Self> {
            Self::with_stuck(failing, already_gone, &[])
        }

        fn with_stuck(
            failing: &[&str],
            already_gone: &[&str],
            stuck: &[&str],
        ) -> Arc<Self> {
            Arc::new(Self {
                failing: failing.iter().map(ToString::to_string).collect(),
                already_gone: already_gone.iter().map(ToString::to_string).collect(),
                stuck: stuck.iter().map(ToString::to_string).collect(),
                deletes: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WorkloadGateway for PartialFailureGateway {
        async fn validate(&self, _spec_yaml: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn submit(
            &self,
            _spec_yaml: &str,
            _name: Option<&str>,
        ) -> Result<SubmitReceipt> {
            Ok(SubmitReceipt {
                id: String::from("flow-test"),
                phase: None,
            })
        }

        async fn fetch_status(&self, workload_id: &str) -> Result<WorkloadStatus> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let phase = if self.stuck.iter().any(|id| id == workload_id) {
                Phase::Serving
            } else {
                Phase::Deleted
            };
            Ok(WorkloadStatus {
                phase: Some(phase),
                raw_phase: Some(phase.to_string()),
                endpoints: HashMap::new(),
                conditions: Vec::new(),
            })
        }

        async fn update(&self, workload_id: &str, _spec_yaml: &str) -> Result<SubmitReceipt> {
            Ok(SubmitReceipt {
                id: workload_id.to_string(),
                phase: None,
            })
        }

        async fn custom_action(
            &self,
            workload_id: &str,
            _action: CustomAction,
            _replicas: Option<u32>,
        ) -> Result<SubmitReceipt> {
            Ok(SubmitReceipt {
                id: workload_id.to_string(),
                phase: None,
            })
        }

        async fn delete(&self, workload_id: &str) -> Result<SubmitReceipt> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            if self.failing.iter().any(|id| id == workload_id) {
                return Err(FlowctlError::Api(ApiError::RequestFailed {
                    status: 500,
                    message: String::from("internal error"),
                }));
            }
            if self.already_gone.iter().any(|id| id == workload_id) {
                return Err(FlowctlError::Api(ApiError::NotFound {
                    workload_id: workload_id.to_string(),
                }));
            }
            Ok(SubmitReceipt {
                id: workload_id.to_string(),
                phase: None,
            })
        }

        async fn list(
            &self,
            _phase: Option<&str>,
            _name: Option<&str>,
            _labels: Option<&HashMap<String, String>>,
        ) -> Result<Vec<WorkloadSummary>> {
            Ok(Vec::new())
        }

        async fn logs(&self, _workload_id: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            timeout: Duration::from_millis(50),
            interval: Duration::from_millis(10),
            transient_retry: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_one_failing_target_does_not_stop_the_rest() {
        let gateway = PartialFailureGateway::new(&["flow-3"], &[]);
        let remover = BulkRemover::new(Arc::clone(&gateway)).with_poll_config(fast_poll());

        let targets = ids(&["flow-1", "flow-2", "flow-3", "flow-4", "flow-5"]);
        let report = remover.remove_all(&targets).await;

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 4);
        assert!(report.any_failed);
        // Every target got its own delete call.
        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_already_removed_counts_as_success() {
        let gateway = PartialFailureGateway::new(&[], &["flow-gone"]);
        let remover = BulkRemover::new(gateway).with_poll_config(fast_poll());

        let report = remover.remove_all(&ids(&["flow-gone", "flow-live"])).await;

        assert_eq!(report.succeeded, 2);
        assert!(!report.any_failed);
    }

    #[tokio::test]
    async fn test_concurrency_cap_removes_everything() {
        let gateway = PartialFailureGateway::new(&[], &[]);
        let remover = BulkRemover::new(gateway)
            .with_poll_config(fast_poll())
            .with_concurrency(2);

        let report = remover.remove_all(&ids(&["a", "b", "c", "d", "e"])).await;

        assert_eq!(report.succeeded, 5);
        assert!(!report.any_failed);
    }

    #[tokio::test]
    async fn test_no_deletion_watch_outlives_the_batch() {
        let gateway = PartialFailureGateway::with_stuck(&[], &[], &["flow-stuck"]);
        let remover = BulkRemover::new(Arc::clone(&gateway)).with_poll_config(fast_poll());

        let report = remover.remove_all(&ids(&["flow-stuck", "flow-live"])).await;

        // The stuck target never reaches Deleted, so its watch times out.
        assert_eq!(report.succeeded, 1);
        assert!(report.any_failed);

        // Once the batch returns, nothing keeps polling in the background.
        let fetches_at_return = gateway.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), fetches_at_return);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_noop() {
        let gateway = PartialFailureGateway::new(&[], &[]);
        let remover = BulkRemover::new(gateway);

        let report = remover.remove_all(&[]).await;
        assert_eq!(report.attempted, 0);
        assert!(!report.any_failed);
    }
}
