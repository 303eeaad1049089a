//! hgroup CLI entrypoint.
//!
//! Drives the update handler from request documents, keeping the callback
//! context between runs the way the workflow engine would.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use hierarchy_group_reconciler::cli::{Cli, Commands, ContextCommands, LogFormat, OutputFormatter};
use hierarchy_group_reconciler::config::{ContextBackend, ReconcilerSettings, SettingsLoader};
use hierarchy_group_reconciler::context::{
    generate_holder_id, ContextStore, LocalContextStore, S3ContextStore, CONTEXT_DIR,
};
use hierarchy_group_reconciler::error::{ReconcilerError, Result};
use hierarchy_group_reconciler::handler::{HandlerOptions, ProgressOutcome, UpdateHandler};
use hierarchy_group_reconciler::model::{RequestDocument, SnapshotValidator};
use hierarchy_group_reconciler::remote::{ConnectInvoker, DryRunInvoker, RemoteInvoker};
use hierarchy_group_reconciler::CallbackContext;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose, cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Validate { request, warnings } => cmd_validate(&request, warnings, &formatter),
        Commands::Plan { request } => cmd_plan(config, &request, &formatter),
        Commands::Apply {
            request,
            dry_run,
            yes,
            step_budget,
        } => cmd_apply(config, &request, dry_run, yes, step_budget, &formatter).await,
        Commands::Context { command } => cmd_context(config, command, &formatter).await,
    }
}

/// Validates a request document.
fn cmd_validate(request: &Path, show_warnings: bool, formatter: &OutputFormatter) -> Result<ExitCode> {
    let document = RequestDocument::load_file(request)?;
    let result = SnapshotValidator::new().validate(&document)?;

    print_stdout(&formatter.format_validation(&document, &result, show_warnings))?;
    Ok(ExitCode::SUCCESS)
}

/// Shows the remote calls an update would make.
fn cmd_plan(config: Option<&Path>, request: &Path, formatter: &OutputFormatter) -> Result<ExitCode> {
    let settings = load_settings(config)?;
    let document = RequestDocument::load_file(request)?;

    let handler = UpdateHandler::with_options(DryRunInvoker::new(), settings.handler_options());
    let plan = handler.plan(&document.desired_resource_state, &document.previous_resource_state)?;

    print_stdout(&formatter.format_plan(&plan))?;
    Ok(ExitCode::SUCCESS)
}

/// Applies an update, resuming from any stored context.
async fn cmd_apply(
    config: Option<&Path>,
    request: &Path,
    dry_run: bool,
    auto_approve: bool,
    step_budget: Option<usize>,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let settings = load_settings(config)?;
    let document = RequestDocument::load_file(request)?;
    SnapshotValidator::new().validate(&document)?;

    let mut options: HandlerOptions = settings.handler_options();
    if step_budget.is_some() {
        options.step_budget = step_budget.filter(|budget| *budget > 0);
    }

    let invoker: Box<dyn RemoteInvoker> = if dry_run {
        info!("Dry run: remote calls will be logged, not made");
        Box::new(DryRunInvoker::new())
    } else {
        Box::new(
            ConnectInvoker::from_env(settings.aws.region.as_deref(), settings.aws.endpoint_url.as_deref()).await,
        )
    };
    let handler = UpdateHandler::with_options(invoker, options);

    let plan = handler.plan(&document.desired_resource_state, &document.previous_resource_state)?;
    if plan.is_empty() {
        print_stdout(&formatter.format_plan(&plan))?;
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("{}", formatter.format_plan(&plan));

    if !auto_approve && !dry_run && !confirm("Do you want to apply this update?")? {
        eprintln!("Apply cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let store = create_context_store(&settings, config).await?;
    let resource = document.resource_key();
    let lock = store.acquire_lock(&resource, &generate_holder_id()).await?;
    debug!("Acquired lock {} on {resource}", lock.lock_id);

    let outcome = apply_with_context(&handler, store.as_ref(), &document, &resource, dry_run).await;

    if let Err(e) = store.release_lock(&resource, &lock.lock_id).await {
        warn!("Failed to release lock on {resource}: {e}");
    }

    let outcome = outcome?;
    print_stdout(&formatter.format_outcome(&outcome))?;

    Ok(match outcome {
        ProgressOutcome::Failed { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

/// Runs one handler invocation against the stored context and persists the result.
async fn apply_with_context(
    handler: &UpdateHandler<Box<dyn RemoteInvoker>>,
    store: &dyn ContextStore,
    document: &RequestDocument,
    resource: &str,
    dry_run: bool,
) -> Result<ProgressOutcome> {
    let mut context = store
        .load(resource)
        .await?
        .map(|record| record.context)
        .unwrap_or_default();

    if !context.is_empty() {
        info!("Resuming {resource} from stored context");
    }

    let outcome = handler.handle_document(document, &mut context).await;

    if dry_run {
        debug!("Dry run: stored context left untouched");
        return Ok(outcome);
    }

    persist_context(store, resource, &outcome, &context).await?;
    Ok(outcome)
}

/// Saves or clears the stored context after an invocation.
async fn persist_context(
    store: &dyn ContextStore,
    resource: &str,
    outcome: &ProgressOutcome,
    context: &CallbackContext,
) -> Result<()> {
    match outcome {
        ProgressOutcome::Success(_) => store.delete(resource).await,
        ProgressOutcome::InProgress(next) => store.save(resource, next).await,
        ProgressOutcome::Failed { .. } if context.is_empty() => Ok(()),
        ProgressOutcome::Failed { .. } => store.save(resource, context).await,
    }
}

/// Manages stored contexts.
async fn cmd_context(config: Option<&Path>, command: ContextCommands, formatter: &OutputFormatter) -> Result<ExitCode> {
    let settings = load_settings(config)?;
    let store = create_context_store(&settings, config).await?;

    match command {
        ContextCommands::Show { request } => {
            let resource = RequestDocument::load_file(&request)?.resource_key();
            let record = store.load(&resource).await?;
            let lock = store.get_lock_info(&resource).await?;
            print_stdout(&formatter.format_context(record.as_ref(), lock.as_ref()))?;
        }
        ContextCommands::Clear { request } => {
            let resource = RequestDocument::load_file(&request)?.resource_key();
            store.delete(&resource).await?;
            eprintln!("Context cleared for {resource}.");
        }
        ContextCommands::Unlock { request, lock_id, force } => {
            let resource = RequestDocument::load_file(&request)?.resource_key();
            if force {
                if let Some(lock) = store.get_lock_info(&resource).await? {
                    store.release_lock(&resource, &lock.lock_id).await?;
                    eprintln!("Lock on {resource} forcefully released.");
                } else {
                    eprintln!("No lock held on {resource}.");
                }
            } else if let Some(id) = lock_id {
                store.release_lock(&resource, &id).await?;
                eprintln!("Lock on {resource} released.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads `.env` next to the settings file, then the settings themselves.
fn load_settings(config: Option<&Path>) -> Result<ReconcilerSettings> {
    let base = config
        .and_then(Path::parent)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let loader = SettingsLoader::new().with_base_path(base);
    loader.load_dotenv()?;
    loader.resolve(config)
}

/// Creates the context store selected by the settings.
async fn create_context_store(settings: &ReconcilerSettings, config: Option<&Path>) -> Result<Box<dyn ContextStore>> {
    let store: Box<dyn ContextStore> = match settings.context.backend {
        ContextBackend::Local => {
            let path = settings.context.path.as_ref().map_or_else(
                || {
                    config
                        .and_then(Path::parent)
                        .unwrap_or_else(|| Path::new("."))
                        .join(CONTEXT_DIR)
                },
                PathBuf::from,
            );
            Box::new(LocalContextStore::with_base_dir(path))
        }
        ContextBackend::S3 => {
            let bucket = settings
                .context
                .bucket
                .as_deref()
                .ok_or_else(|| ReconcilerError::internal("S3 bucket not configured"))?;
            let region = settings.context.region.as_deref().or(settings.aws.region.as_deref());
            Box::new(S3ContextStore::new(bucket, settings.context.prefix.as_deref(), region).await)
        }
    };

    debug!("Using {} context store", store.backend_type());
    Ok(store)
}

/// Asks for confirmation on stderr.
fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N]: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Writes command output to stdout.
fn print_stdout(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.trim_end())?;
    Ok(())
}
