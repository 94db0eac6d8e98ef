//! Orchestration API surface.
//!
//! This module provides the wire types, the [`WorkloadGateway`] trait that
//! abstracts all network I/O, and the [`ApiClient`] REST implementation.

mod client;
mod gateway;
mod types;

pub use client::{ApiClient, DEFAULT_API_URL};
pub use gateway::WorkloadGateway;
pub use types::{
    CustomAction, Phase, SubmitReceipt, WorkloadStatus, WorkloadSummary,
};
