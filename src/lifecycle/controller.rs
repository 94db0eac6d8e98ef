//! Lifecycle controller for a single remote workload.
//!
//! One controller owns one workload: it submits the spec, polls the remote
//! phase until a desired terminal phase is reached, drives custom actions,
//! and watches deletions in the background. State-changing operations on the
//! same controller must be serialized by the caller (`&mut self`); separate
//! controllers for different workloads are fully independent.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::{CustomAction, Phase, WorkloadGateway};
use crate::error::{FlowctlError, LifecycleError, Result};

use super::actions::{action_path, creation_path, deletion_path, update_path, PhasePath};

/// Default wait budget for reaching a desired phase.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1800);

/// Default sleep between status fetches when the phase has not changed.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default pause before retrying a fetch that carried no usable phase.
const DEFAULT_TRANSIENT_RETRY: Duration = Duration::from_secs(1);

/// Polling parameters for [`LifecycleController::poll_until`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Total "no progress" budget before giving up.
    pub timeout: Duration,
    /// Sleep between fetches while the phase is unchanged.
    pub interval: Duration,
    /// Pause before retrying a transient fetch; does not consume the budget.
    pub transient_retry: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
            transient_retry: DEFAULT_TRANSIENT_RETRY,
        }
    }
}

impl PollConfig {
    /// Creates a poll configuration with the given timeout and interval.
    #[must_use]
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            transient_retry: DEFAULT_TRANSIENT_RETRY,
        }
    }
}

/// Local view of a submitted workload.
#[derive(Debug, Clone)]
pub struct WorkloadHandle {
    /// Remote workload identifier.
    pub remote_id: String,
    /// Last phase observed by the polling loop.
    pub last_known_phase: Option<Phase>,
    /// When the phase last changed.
    pub last_transition: DateTime<Utc>,
}

impl WorkloadHandle {
    /// Creates a handle for a workload with no observations yet.
    #[must_use]
    pub fn new(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            last_known_phase: None,
            last_transition: Utc::now(),
        }
    }
}

/// Payload returned when a desired phase is reached.
#[derive(Debug, Clone, Default)]
pub struct PollOutcome {
    /// Public endpoints reported alongside the desired phase.
    pub endpoints: HashMap<String, String>,
}

/// Result of a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStatus {
    /// The service accepted the delete; a background watch is running.
    Accepted,
    /// The workload was already gone. Nothing to wait for.
    AlreadyRemoved,
}

/// Controller owning one remote workload's lifecycle.
#[derive(Debug)]
pub struct LifecycleController<G> {
    /// Gateway for all network I/O.
    gateway: Arc<G>,
    /// Handle to the owned workload.
    handle: WorkloadHandle,
    /// Polling parameters.
    poll: PollConfig,
    /// Background watch for an in-progress deletion.
    deletion_watch: Option<JoinHandle<Result<PollOutcome>>>,
}

impl<G: WorkloadGateway + 'static> LifecycleController<G> {
    /// Attaches a controller to an already-submitted workload.
    #[must_use]
    pub fn attach(gateway: Arc<G>, remote_id: impl Into<String>) -> Self {
        Self {
            gateway,
            handle: WorkloadHandle::new(remote_id),
            poll: PollConfig::default(),
            deletion_watch: None,
        }
    }

    /// Sets the polling parameters.
    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Validates and submits a new spec, returning a controller for the
    /// accepted workload.
    ///
    /// Returns as soon as the service hands back an identifier; call
    /// [`Self::poll_until`] with [`creation_path`] to wait for `Serving`.
    ///
    /// # Errors
    ///
    /// Returns an error if validation reports problems or the submit call
    /// fails.
    pub async fn submit(
        gateway: Arc<G>,
        spec_yaml: &str,
        name: Option<&str>,
    ) -> Result<Self> {
        let errors = gateway.validate(spec_yaml).await?;
        if !errors.is_empty() {
            return Err(FlowctlError::Lifecycle(LifecycleError::ValidationFailed {
                count: errors.len(),
                errors: errors.join("\n"),
            }));
        }

        let receipt = gateway.submit(spec_yaml, name).await?;
        info!("Successfully submitted workload with ID {}", receipt.id);

        let mut controller = Self::attach(gateway, receipt.id);
        if let Some(phase) = receipt.phase.as_deref().and_then(Phase::parse) {
            controller.observe(phase);
        }
        Ok(controller)
    }

    /// Returns the handle of the owned workload.
    #[must_use]
    pub const fn handle(&self) -> &WorkloadHandle {
        &self.handle
    }

    /// Returns the remote workload identifier.
    #[must_use]
    pub fn remote_id(&self) -> &str {
        &self.handle.remote_id
    }

    /// Records a phase observation on the handle.
    fn observe(&mut self, phase: Phase) {
        if self.handle.last_known_phase != Some(phase) {
            self.handle.last_known_phase = Some(phase);
            self.handle.last_transition = Utc::now();
        }
    }

    /// Polls the workload status until the desired phase of `path` is
    /// reached.
    ///
    /// Fetches that yield no usable phase are retried without consuming the
    /// wait budget. Retryable fetch errors (the gateway already retries
    /// transient failures internally) are retried on the poll interval and
    /// count toward the budget, so a persistently failing fetch ends in a
    /// timeout instead of waiting forever. A phase change restarts the
    /// budget; an unchanged phase sleeps for the poll interval and counts
    /// toward it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnexpectedPhase`] as soon as a phase
    /// outside the in-flight set is observed, and
    /// [`LifecycleError::Timeout`] when the budget runs out.
    pub async fn poll_until(&mut self, path: &PhasePath) -> Result<PollOutcome> {
        let desired = path.desired;
        debug!(
            "Waiting for workload {} to reach phase {desired}",
            self.handle.remote_id
        );

        let mut waited = Duration::ZERO;
        let mut last_good: Option<Phase> = None;

        while waited < self.poll.timeout {
            let status = match self.gateway.fetch_status(&self.handle.remote_id).await {
                Ok(status) => status,
                Err(e) if e.is_retryable() => {
                    debug!("Retryable status fetch failure: {e}");
                    tokio::time::sleep(self.poll.interval).await;
                    waited += self.poll.interval;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let Some(phase) = status.phase else {
                // Intermittently the service responds without a phase field.
                debug!("Status response carried no usable phase, retrying");
                tokio::time::sleep(self.poll.transient_retry).await;
                continue;
            };

            self.observe(phase);

            if phase == desired {
                debug!("Successfully reached phase {desired}");
                return Ok(PollOutcome {
                    endpoints: status.endpoints,
                });
            }

            if !path.tolerates(phase) {
                return Err(FlowctlError::Lifecycle(LifecycleError::UnexpectedPhase {
                    workload_id: self.handle.remote_id.clone(),
                    last_good: last_good
                        .map_or_else(|| String::from("submission"), |p| p.to_string()),
                    observed: phase.to_string(),
                }));
            }

            if last_good != Some(phase) {
                // Progressed to a new in-flight phase: restart the budget.
                debug!("Current phase is {phase}");
                last_good = Some(phase);
                waited = Duration::ZERO;
                continue;
            }

            tokio::time::sleep(self.poll.interval).await;
            waited += self.poll.interval;
        }

        Err(FlowctlError::Lifecycle(LifecycleError::Timeout {
            workload_id: self.handle.remote_id.clone(),
            desired: desired.to_string(),
            waited_secs: waited.as_secs(),
        }))
    }

    /// Waits out the canonical creation path to `Serving`.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::poll_until`] errors.
    pub async fn wait_serving(&mut self) -> Result<PollOutcome> {
        self.poll_until(&creation_path()).await
    }

    /// Replaces the spec of the workload and waits for it to serve again.
    ///
    /// # Errors
    ///
    /// Returns an error if the update call fails or the workload diverges
    /// from the update phase path.
    pub async fn update(&mut self, spec_yaml: &str) -> Result<PollOutcome> {
        let receipt = self.gateway.update(&self.handle.remote_id, spec_yaml).await?;
        info!("Successfully submitted update for workload {}", receipt.id);
        self.poll_until(&update_path()).await
    }

    /// Issues a custom action and waits out its phase path.
    ///
    /// `replicas` is only meaningful for [`CustomAction::Scale`].
    ///
    /// # Errors
    ///
    /// Returns an error if the action call fails or the workload diverges
    /// from the action's phase path.
    pub async fn custom_action(
        &mut self,
        action: CustomAction,
        replicas: Option<u32>,
    ) -> Result<PollOutcome> {
        info!(
            "Issuing {action} on workload {}",
            self.handle.remote_id
        );
        self.gateway
            .custom_action(&self.handle.remote_id, action, replicas)
            .await?;
        self.poll_until(&action_path(action)).await
    }

    /// Restarts all executors of the workload.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::custom_action`] errors.
    pub async fn restart(&mut self) -> Result<PollOutcome> {
        self.custom_action(CustomAction::Restart, None).await
    }

    /// Pauses the workload, scaling it to zero.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::custom_action`] errors.
    pub async fn pause(&mut self) -> Result<PollOutcome> {
        self.custom_action(CustomAction::Pause, None).await
    }

    /// Resumes a paused workload.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::custom_action`] errors.
    pub async fn resume(&mut self) -> Result<PollOutcome> {
        self.custom_action(CustomAction::Resume, None).await
    }

    /// Scales the workload to the given replica count.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::custom_action`] errors.
    pub async fn scale(&mut self, replicas: u32) -> Result<PollOutcome> {
        self.custom_action(CustomAction::Scale, Some(replicas)).await
    }

    /// Recreates a deleted workload under the same remote identifier.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::custom_action`] errors.
    pub async fn recreate(&mut self) -> Result<PollOutcome> {
        self.custom_action(CustomAction::Recreate, None).await
    }

    /// Issues a delete call for the workload.
    ///
    /// On acceptance a background task starts watching for the `Deleted`
    /// phase; await it with [`Self::wait_deleted`]. A workload the service
    /// no longer knows is reported as [`TerminationStatus::AlreadyRemoved`],
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete call fails for any reason other than
    /// the workload being gone.
    pub async fn terminate(&mut self) -> Result<TerminationStatus> {
        let observed = self.handle.last_known_phase;
        info!("Removing workload {}", self.handle.remote_id);

        match self.gateway.delete(&self.handle.remote_id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                info!(
                    "Workload {} is already removed",
                    self.handle.remote_id
                );
                return Ok(TerminationStatus::AlreadyRemoved);
            }
            Err(e) => return Err(e),
        }

        let path = deletion_path(observed);
        let gateway = Arc::clone(&self.gateway);
        let remote_id = self.handle.remote_id.clone();
        let poll = self.poll.clone();
        let watch = tokio::spawn(async move {
            let mut watcher = Self::attach(gateway, remote_id).with_poll_config(poll);
            watcher.poll_until(&path).await
        });
        self.deletion_watch = Some(watch);

        Ok(TerminationStatus::Accepted)
    }

    /// Awaits the background deletion watch started by [`Self::terminate`].
    ///
    /// # Errors
    ///
    /// Returns an error if no deletion is in progress, the watch was
    /// cancelled, or the watch itself failed.
    pub async fn wait_deleted(&mut self) -> Result<()> {
        let Some(watch) = self.deletion_watch.take() else {
            return Err(FlowctlError::internal("no deletion in progress"));
        };

        match watch.await {
            Ok(result) => {
                result?;
                self.observe(Phase::Deleted);
                Ok(())
            }
            Err(e) if e.is_cancelled() => {
                Err(FlowctlError::internal("deletion watch was cancelled"))
            }
            Err(e) => Err(FlowctlError::internal(format!(
                "deletion watch failed: {e}"
            ))),
        }
    }

    /// Takes the background deletion watch, if one is still running.
    ///
    /// The caller becomes responsible for awaiting or aborting it.
    pub fn take_deletion_watch(&mut self) -> Option<JoinHandle<Result<PollOutcome>>> {
        self.deletion_watch.take()
    }
}

impl<G> Drop for LifecycleController<G> {
    fn drop(&mut self) {
        // A dropped controller must not leave its watch polling forever.
        if let Some(watch) = self.deletion_watch.take() {
            watch.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SubmitReceipt, WorkloadStatus, WorkloadSummary};
    use crate::error::ApiError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Gateway driven by a scripted sequence of phase observations.
    ///
    /// The last scripted entry repeats forever, so a sequence ending in
    /// `Starting` models a workload stuck in that phase.
    #[derive(Debug)]
    struct ScriptedGateway {
        phases: Mutex<VecDeque<Option<Phase>>>,
        fetches: AtomicUsize,
        delete_not_found: bool,
        fetch_fails: bool,
    }

    impl ScriptedGateway {
        fn new(phases: &[Option<Phase>]) -> Arc<Self> {
            Arc::new(Self {
                phases: Mutex::new(phases.iter().copied().collect()),
                fetches: AtomicUsize::new(0),
                delete_not_found: false,
                fetch_fails: false,
            })
        }

        fn with_delete_not_found(phases: &[Option<Phase>]) -> Arc<Self> {
            Arc::new(Self {
                phases: Mutex::new(phases.iter().copied().collect()),
                fetches: AtomicUsize::new(0),
                delete_not_found: true,
                fetch_fails: false,
            })
        }

        fn with_failing_fetch() -> Arc<Self> {
            Arc::new(Self {
                phases: Mutex::new(VecDeque::new()),
                fetches: AtomicUsize::new(0),
                delete_not_found: false,
                fetch_fails: true,
            })
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn receipt(id: &str) -> SubmitReceipt {
            SubmitReceipt {
                id: id.to_string(),
                phase: Some(String::from("Pending")),
            }
        }
    }

    #[async_trait]
    impl WorkloadGateway for ScriptedGateway {
        async fn validate(&self, _spec_yaml: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn submit(
            &self,
            _spec_yaml: &str,
            _name: Option<&str>,
        ) -> Result<SubmitReceipt> {
            Ok(Self::receipt("flow-test"))
        }

        async fn fetch_status(&self, _workload_id: &str) -> Result<WorkloadStatus> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fetch_fails {
                return Err(FlowctlError::Api(ApiError::RequestFailed {
                    status: 500,
                    message: String::from("internal error"),
                }));
            }
            let mut phases = self.phases.lock().unwrap();
            let phase = if phases.len() > 1 {
                phases.pop_front().unwrap_or(None)
            } else {
                phases.front().copied().unwrap_or(None)
            };
            Ok(WorkloadStatus {
                phase,
                raw_phase: phase.map(|p| p.to_string()),
                endpoints: HashMap::new(),
                conditions: Vec::new(),
            })
        }

        async fn update(&self, workload_id: &str, _spec_yaml: &str) -> Result<SubmitReceipt> {
            Ok(Self::receipt(workload_id))
        }

        async fn custom_action(
            &self,
            workload_id: &str,
            _action: CustomAction,
            _replicas: Option<u32>,
        ) -> Result<SubmitReceipt> {
            Ok(Self::receipt(workload_id))
        }

        async fn delete(&self, workload_id: &str) -> Result<SubmitReceipt> {
            if self.delete_not_found {
                return Err(FlowctlError::Api(ApiError::NotFound {
                    workload_id: workload_id.to_string(),
                }));
            }
            Ok(Self::receipt(workload_id))
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

    fn fast_poll() -> PollConfig {
        PollConfig {
            timeout: Duration::from_millis(50),
            interval: Duration::from_millis(10),
            transient_retry: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_poll_reaches_serving_through_creation_path() {
        let gateway = ScriptedGateway::new(&[
            Some(Phase::Pending),
            Some(Phase::Starting),
            Some(Phase::Serving),
        ]);
        let mut controller = LifecycleController::attach(Arc::clone(&gateway), "flow-test")
            .with_poll_config(fast_poll());

        let outcome = controller.poll_until(&creation_path()).await;
        assert!(outcome.is_ok());
        // Two non-terminal observations, then the desired phase.
        assert_eq!(gateway.fetch_count(), 3);
        assert_eq!(controller.handle().last_known_phase, Some(Phase::Serving));
    }

    #[tokio::test]
    async fn test_unexpected_phase_fails_fast() {
        let gateway = ScriptedGateway::new(&[Some(Phase::Pending), Some(Phase::Failed)]);
        let mut controller = LifecycleController::attach(Arc::clone(&gateway), "flow-test")
            .with_poll_config(fast_poll());

        let err = controller.poll_until(&creation_path()).await.unwrap_err();
        match err {
            FlowctlError::Lifecycle(LifecycleError::UnexpectedPhase {
                last_good,
                observed,
                ..
            }) => {
                assert_eq!(last_good, "Pending");
                assert_eq!(observed, "Failed");
            }
            other => panic!("expected UnexpectedPhase, got {other}"),
        }
        // No timeout was waited out.
        assert_eq!(gateway.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_stuck_phase_times_out() {
        let gateway = ScriptedGateway::new(&[Some(Phase::Starting)]);
        let mut controller = LifecycleController::attach(gateway, "flow-test")
            .with_poll_config(fast_poll());

        let err = controller.poll_until(&creation_path()).await.unwrap_err();
        assert!(
            matches!(
                err,
                FlowctlError::Lifecycle(LifecycleError::Timeout { .. })
            ),
            "expected Timeout, got {err}"
        );
    }

    #[tokio::test]
    async fn test_persistent_fetch_failure_times_out() {
        let gateway = ScriptedGateway::with_failing_fetch();
        let mut controller = LifecycleController::attach(Arc::clone(&gateway), "flow-test")
            .with_poll_config(fast_poll());

        let err = controller.poll_until(&creation_path()).await.unwrap_err();
        assert!(
            matches!(
                err,
                FlowctlError::Lifecycle(LifecycleError::Timeout { .. })
            ),
            "expected Timeout, got {err}"
        );
        // The failing fetches consumed the budget instead of looping.
        assert!(gateway.fetch_count() <= 6);
    }

    #[tokio::test]
    async fn test_missing_phase_is_retried_without_failing() {
        let gateway = ScriptedGateway::new(&[
            None,
            Some(Phase::Pending),
            None,
            Some(Phase::Serving),
        ]);
        let mut controller = LifecycleController::attach(Arc::clone(&gateway), "flow-test")
            .with_poll_config(fast_poll());

        let outcome = controller.poll_until(&creation_path()).await;
        assert!(outcome.is_ok());
        assert_eq!(gateway.fetch_count(), 4);
    }

    #[tokio::test]
    async fn test_terminate_not_found_is_already_removed() {
        let gateway = ScriptedGateway::with_delete_not_found(&[]);
        let mut controller = LifecycleController::attach(gateway, "flow-gone")
            .with_poll_config(fast_poll());

        let status = controller.terminate().await.unwrap();
        assert_eq!(status, TerminationStatus::AlreadyRemoved);
        assert!(controller.take_deletion_watch().is_none());
    }

    #[tokio::test]
    async fn test_terminate_watches_until_deleted() {
        let gateway = ScriptedGateway::new(&[Some(Phase::Serving), Some(Phase::Deleted)]);
        let mut controller = LifecycleController::attach(gateway, "flow-test")
            .with_poll_config(fast_poll());

        let status = controller.terminate().await.unwrap();
        assert_eq!(status, TerminationStatus::Accepted);
        controller.wait_deleted().await.unwrap();
        assert_eq!(controller.handle().last_known_phase, Some(Phase::Deleted));
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_spec() {
        #[derive(Debug)]
        struct RejectingGateway(ScriptedGateway);

        // Delegate everything except validate.
        #[async_trait]
        impl WorkloadGateway for RejectingGateway {
            async fn validate(&self, _spec_yaml: &str) -> Result<Vec<String>> {
                Ok(vec![String::from("executors[0]: image is required")])
            }
            async fn submit(
                &self,
                spec_yaml: &str,
                name: Option<&str>,
            ) -> Result<SubmitReceipt> {
                self.0.submit(spec_yaml, name).await
            }
            async fn fetch_status(&self, workload_id: &str) -> Result<WorkloadStatus> {
                self.0.fetch_status(workload_id).await
            }
            async fn update(
                &self,
                workload_id: &str,
                spec_yaml: &str,
            ) -> Result<SubmitReceipt> {
                self.0.update(workload_id, spec_yaml).await
            }
            async fn custom_action(
                &self,
                workload_id: &str,
                action: CustomAction,
                replicas: Option<u32>,
            ) -> Result<SubmitReceipt> {
                self.0.custom_action(workload_id, action, replicas).await
            }
            async fn delete(&self, workload_id: &str) -> Result<SubmitReceipt> {
                self.0.delete(workload_id).await
            }
            async fn list(
                &self,
                phase: Option<&str>,
                name: Option<&str>,
                labels: Option<&HashMap<String, String>>,
            ) -> Result<Vec<WorkloadSummary>> {
                self.0.list(phase, name, labels).await
            }
            async fn logs(&self, workload_id: &str) -> Result<String> {
                self.0.logs(workload_id).await
            }
        }

        let inner = ScriptedGateway {
            phases: Mutex::new(VecDeque::new()),
            fetches: AtomicUsize::new(0),
            delete_not_found: false,
            fetch_fails: false,
        };
        let gateway = Arc::new(RejectingGateway(inner));

        let err = LifecycleController::submit(gateway, "kind: flow", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowctlError::Lifecycle(LifecycleError::ValidationFailed { count: 1, .. })
        ));
    }
}
