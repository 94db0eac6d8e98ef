// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # flowctl
//!
//! A command-line client for deploying declarative workload specifications
//! ("Flows" and "Deployments") to a remote orchestration service.
//!
//! ## Overview
//!
//! flowctl takes a YAML workload spec, expands all placeholder variables in
//! it, submits it to the orchestration API, and then tracks the workload
//! through its asynchronous phase transitions:
//!
//! - Define your workload as a YAML spec with `${{ ... }}` placeholders
//! - Deploy it and wait for the `Serving` phase
//! - Drive lifecycle operations: update, pause, resume, scale, restart,
//!   recreate, remove
//! - Remove many workloads concurrently with partial-failure tolerance
//!
//! ## Architecture
//!
//! Two subsystems carry the interesting logic:
//!
//! 1. **Variable resolution** ([`resolve`]): a multi-pass template engine
//!    that expands context variables, environment variables, and internal
//!    cross-document references inside the spec tree.
//! 2. **Lifecycle control** ([`lifecycle`]): an async state machine that
//!    submits a spec and polls the remote phase until a desired terminal
//!    phase is reached, validating every intermediate phase on the way.
//!
//! ## Modules
//!
//! - [`spec`]: Spec document loading and `.env` context building
//! - [`resolve`]: Placeholder expansion over the spec tree
//! - [`api`]: Orchestration API client and wire types
//! - [`lifecycle`]: Phase state machine and bulk removal
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! kind: flow
//! name: sentiment-api
//! executors:
//!   - name: encoder
//!     replicas: "${{ REPLICAS }}"
//!     env:
//!       HF_TOKEN: "${{ ENV.HF_TOKEN }}"
//! gateway:
//!   monitor_port: "${{root.executors[0].replicas}}"
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod cli;
pub mod error;
pub mod lifecycle;
pub mod resolve;
pub mod spec;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{ApiClient, CustomAction, Phase, WorkloadGateway, WorkloadStatus};
pub use cli::{Cli, Commands, OutputFormatter};
pub use error::{FlowctlError, Result};
pub use lifecycle::{BulkRemover, LifecycleController, PollConfig, RemovalReport};
pub use resolve::{ResolutionContext, Resolver};
pub use spec::{SpecDocument, SpecLoader, WorkloadKind};
