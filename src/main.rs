//! Flowctl CLI entrypoint.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use flowctl::api::{ApiClient, CustomAction, WorkloadGateway, DEFAULT_API_URL};
use flowctl::cli::{Cli, Commands, OutputFormatter};
use flowctl::error::{ApiError, FlowctlError, LifecycleError, Result};
use flowctl::lifecycle::{BulkRemover, LifecycleController};
use flowctl::resolve::{ResolutionContext, Resolver};
use flowctl::spec::{SpecDocument, SpecLoader};

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    // A .env next to the invocation is optional.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let client = build_client(cli.api, cli.token)?;

    match cli.command {
        Commands::Deploy {
            path,
            name,
            env_files,
            context_vars,
            no_wait,
        } => {
            cmd_deploy(
                client,
                &path,
                name,
                &env_files,
                &context_vars,
                no_wait,
                &formatter,
            )
            .await
        }
        Commands::Validate {
            path,
            env_files,
            context_vars,
        } => cmd_validate(client, &path, &env_files, &context_vars, &formatter).await,
        Commands::Status { workload_id } => cmd_status(client, &workload_id, &formatter).await,
        Commands::List { phase, name } => {
            cmd_list(client, phase.as_deref(), name.as_deref(), &formatter).await
        }
        Commands::Update {
            workload_id,
            path,
            env_files,
            context_vars,
        } => {
            cmd_update(
                client,
                workload_id,
                &path,
                &env_files,
                &context_vars,
                &formatter,
            )
            .await
        }
        Commands::Restart { workload_id } => {
            cmd_action(client, workload_id, CustomAction::Restart, None, &formatter).await
        }
        Commands::Pause { workload_id } => {
            cmd_action(client, workload_id, CustomAction::Pause, None, &formatter).await
        }
        Commands::Resume { workload_id } => {
            cmd_action(client, workload_id, CustomAction::Resume, None, &formatter).await
        }
        Commands::Scale {
            workload_id,
            replicas,
        } => {
            cmd_action(
                client,
                workload_id,
                CustomAction::Scale,
                Some(replicas),
                &formatter,
            )
            .await
        }
        Commands::Recreate { workload_id } => {
            cmd_action(client, workload_id, CustomAction::Recreate, None, &formatter).await
        }
        Commands::Remove {
            workload_ids,
            concurrency,
        } => cmd_remove(client, &workload_ids, concurrency, &formatter).await,
        Commands::Logs { workload_id } => cmd_logs(client, &workload_id).await,
    }
}

/// Builds the API client from CLI arguments and environment.
fn build_client(api: Option<String>, token: Option<String>) -> Result<ApiClient> {
    let base_url = api.unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let Some(token) = token else {
        return Err(FlowctlError::Api(ApiError::AuthenticationFailed {
            message: String::from(
                "No API token configured; set FLOWCTL_TOKEN or pass --token",
            ),
        }));
    };
    ApiClient::new(&base_url, &token)
}

/// Loads a spec file and resolves its placeholders.
fn load_resolved(
    path: &Path,
    env_files: &[PathBuf],
    context_vars: &[String],
) -> Result<SpecDocument> {
    let loader = SpecLoader::new();
    let mut doc = loader.load_file(path)?;

    let mut ctx = ResolutionContext::from_process_env();
    ctx.extend_env(loader.load_env_files(env_files)?);
    for binding in context_vars {
        let Some((key, value)) = binding.split_once('=') else {
            return Err(FlowctlError::internal(format!(
                "Invalid --set binding `{binding}`, expected KEY=VALUE"
            )));
        };
        ctx.context_vars
            .insert(key.to_string(), value.to_string());
    }

    Resolver::new().resolve(&mut doc, &ctx)?;
    debug!("Resolved {} spec from {}", doc.kind(), path.display());
    Ok(doc)
}

/// Deploys a spec as a new workload.
async fn cmd_deploy(
    client: ApiClient,
    path: &Path,
    name: Option<String>,
    env_files: &[PathBuf],
    context_vars: &[String],
    no_wait: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let doc = load_resolved(path, env_files, context_vars)?;
    let spec_yaml = doc.to_yaml()?;
    let name = name.or_else(|| doc.name().map(ToString::to_string));

    let gateway = Arc::new(client);
    let mut controller =
        LifecycleController::submit(gateway, &spec_yaml, name.as_deref()).await?;

    if no_wait {
        print!("{}", formatter.format_accepted(controller.remote_id()));
        return Ok(());
    }

    let outcome = controller.wait_serving().await?;
    print!(
        "{}",
        formatter.format_serving(controller.remote_id(), &outcome.endpoints)
    );
    Ok(())
}

/// Resolves a spec and runs server-side validation.
async fn cmd_validate(
    client: ApiClient,
    path: &Path,
    env_files: &[PathBuf],
    context_vars: &[String],
    formatter: &OutputFormatter,
) -> Result<()> {
    let doc = load_resolved(path, env_files, context_vars)?;
    let errors = client.validate(&doc.to_yaml()?).await?;
    print!("{}", formatter.format_validation(&errors));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(FlowctlError::Lifecycle(LifecycleError::ValidationFailed {
            count: errors.len(),
            errors: errors.join("\n"),
        }))
    }
}

/// Shows the status of one workload.
async fn cmd_status(
    client: ApiClient,
    workload_id: &str,
    formatter: &OutputFormatter,
) -> Result<()> {
    let status = client.fetch_status(workload_id).await?;
    print!("{}", formatter.format_status(workload_id, &status));
    Ok(())
}

/// Lists workloads.
async fn cmd_list(
    client: ApiClient,
    phase: Option<&str>,
    name: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let workloads = client.list(phase, name, None).await?;
    print!("{}", formatter.format_list(&workloads));
    Ok(())
}

/// Replaces the spec of a running workload.
async fn cmd_update(
    client: ApiClient,
    workload_id: String,
    path: &Path,
    env_files: &[PathBuf],
    context_vars: &[String],
    formatter: &OutputFormatter,
) -> Result<()> {
    let doc = load_resolved(path, env_files, context_vars)?;
    let spec_yaml = doc.to_yaml()?;

    let mut controller = LifecycleController::attach(Arc::new(client), workload_id);
    let outcome = controller.update(&spec_yaml).await?;
    print!(
        "{}",
        formatter.format_serving(controller.remote_id(), &outcome.endpoints)
    );
    Ok(())
}

/// Issues a custom action and waits out its phase path.
async fn cmd_action(
    client: ApiClient,
    workload_id: String,
    action: CustomAction,
    replicas: Option<u32>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut controller = LifecycleController::attach(Arc::new(client), workload_id);
    controller.custom_action(action, replicas).await?;
    print!(
        "{}",
        formatter.format_action(controller.remote_id(), action.verb())
    );
    Ok(())
}

/// Removes one or more workloads concurrently.
async fn cmd_remove(
    client: ApiClient,
    workload_ids: &[String],
    concurrency: Option<usize>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut remover = BulkRemover::new(Arc::new(client));
    if let Some(limit) = concurrency {
        remover = remover.with_concurrency(limit);
    }

    let report = remover.remove_all(workload_ids).await;
    print!("{}", formatter.format_removal(&report));

    if report.any_failed {
        return Err(FlowctlError::Lifecycle(LifecycleError::RemovalFailed {
            failed: report.attempted - report.succeeded,
            attempted: report.attempted,
        }));
    }
    Ok(())
}

/// Prints the logs of a workload.
async fn cmd_logs(client: ApiClient, workload_id: &str) -> Result<()> {
    let logs = client.logs(workload_id).await?;
    print!("{logs}");
    Ok(())
}
