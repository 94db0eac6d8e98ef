//! Workload lifecycle tracking.
//!
//! This module owns the phase state machine: submitting a spec, polling the
//! remote phase until a desired terminal phase is reached, driving custom
//! actions with their own expected phase paths, and bulk removal.

mod actions;
mod controller;
mod remover;

pub use actions::{action_path, creation_path, deletion_path, update_path, PhasePath};
pub use controller::{
    LifecycleController, PollConfig, PollOutcome, TerminationStatus, WorkloadHandle,
};
pub use remover::{BulkRemover, RemovalReport};
