//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flowctl - declarative workload deployment client.
#[derive(Parser, Debug)]
#[command(name = "flowctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base URL of the orchestration API.
    #[arg(long, global = true, env = "FLOWCTL_API")]
    pub api: Option<String>,

    /// API bearer token.
    #[arg(long, global = true, env = "FLOWCTL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a spec and submit it as a new workload.
    Deploy {
        /// Path to the spec file.
        path: PathBuf,

        /// Workload name override.
        #[arg(long)]
        name: Option<String>,

        /// Env files feeding placeholder resolution, later files winning.
        #[arg(long = "env-file")]
        env_files: Vec<PathBuf>,

        /// Context variable bindings in KEY=VALUE form.
        #[arg(long = "set")]
        context_vars: Vec<String>,

        /// Return as soon as the workload is accepted, without waiting for
        /// it to serve.
        #[arg(long)]
        no_wait: bool,
    },

    /// Resolve a spec and run server-side validation without submitting.
    Validate {
        /// Path to the spec file.
        path: PathBuf,

        /// Env files feeding placeholder resolution, later files winning.
        #[arg(long = "env-file")]
        env_files: Vec<PathBuf>,

        /// Context variable bindings in KEY=VALUE form.
        #[arg(long = "set")]
        context_vars: Vec<String>,
    },

    /// Show the current status of a workload.
    Status {
        /// Remote workload identifier.
        workload_id: String,
    },

    /// List workloads.
    List {
        /// Only show workloads in this phase.
        #[arg(long)]
        phase: Option<String>,

        /// Only show workloads whose name contains this string.
        #[arg(long)]
        name: Option<String>,
    },

    /// Replace the spec of a running workload.
    Update {
        /// Remote workload identifier.
        workload_id: String,

        /// Path to the new spec file.
        path: PathBuf,

        /// Env files feeding placeholder resolution, later files winning.
        #[arg(long = "env-file")]
        env_files: Vec<PathBuf>,

        /// Context variable bindings in KEY=VALUE form.
        #[arg(long = "set")]
        context_vars: Vec<String>,
    },

    /// Restart all executors of a workload.
    Restart {
        /// Remote workload identifier.
        workload_id: String,
    },

    /// Pause a workload, scaling it to zero.
    Pause {
        /// Remote workload identifier.
        workload_id: String,
    },

    /// Resume a paused workload.
    Resume {
        /// Remote workload identifier.
        workload_id: String,
    },

    /// Scale a workload to a replica count.
    Scale {
        /// Remote workload identifier.
        workload_id: String,

        /// Desired replica count.
        #[arg(long)]
        replicas: u32,
    },

    /// Recreate a deleted workload under the same identifier.
    Recreate {
        /// Remote workload identifier.
        workload_id: String,
    },

    /// Remove one or more workloads.
    Remove {
        /// Remote workload identifiers.
        #[arg(required = true)]
        workload_ids: Vec<String>,

        /// Cap on concurrent removals (unbounded when omitted).
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Show the logs of a workload.
    Logs {
        /// Remote workload identifier.
        workload_id: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
