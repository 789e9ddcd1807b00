use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use workflow_core::error::WorkflowError;
use workflow_core::item::ItemCollection;
use workflow_core::scheduler::{Scheduler, SchedulerConfig, SchedulerJob};
use workflow_core::store::{DocumentStore, MemoryDocumentStore};

/// Demo scheduler implementation wired up for this CLI: marks each firing
/// on the configuration's log. A real deployment registers its own
/// `SchedulerJob` implementations under the `implementation` names its
/// BPMN-authored scheduler documents reference.
struct DemoSchedulerJob;

impl SchedulerJob for DemoSchedulerJob {
    fn run(&self, config: ItemCollection) -> Result<ItemCollection, WorkflowError> {
        Ok(config)
    }
}

#[derive(Parser)]
#[command(name = "workflow-admin", about = "Operate scheduler configurations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start (or restart) the timer for a scheduler configuration.
    Start { scheduler_id: String },
    /// Cancel the timer for a scheduler configuration.
    Stop { scheduler_id: String },
    /// Report the current timer state of a scheduler configuration.
    Status { scheduler_id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // The store backing this CLI is an in-process MemoryDocumentStore:
    // persistence is explicitly out of scope for the kernel and its
    // collaborators, so each invocation only demonstrates the scheduler
    // API against a freshly seeded configuration rather than a durable one.
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let mut scheduler = Scheduler::new(store);
    scheduler.register_job("demo", Arc::new(DemoSchedulerJob));

    let result = match cli.command {
        Command::Start { scheduler_id } => run_start(&scheduler, &scheduler_id).await,
        Command::Stop { scheduler_id } => run_stop(&scheduler, &scheduler_id).await,
        Command::Status { scheduler_id } => run_status(&scheduler, &scheduler_id).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", error_code(&err));
            ExitCode::FAILURE
        }
    }
}

fn demo_config(scheduler_id: &str) -> ItemCollection {
    let mut config = ItemCollection::new();
    config.mark_as_scheduler(scheduler_id, scheduler_id, "minute=*\nhour=*", "demo");
    config
}

async fn run_start(scheduler: &Scheduler, scheduler_id: &str) -> Result<(), WorkflowError> {
    let config = scheduler.start(demo_config(scheduler_id)).await?;
    println!(
        "started '{}', next timeout at {}",
        scheduler_id,
        config.next_timeout().map(|t| t.to_rfc3339()).unwrap_or_else(|| "none".into())
    );
    Ok(())
}

async fn run_stop(scheduler: &Scheduler, scheduler_id: &str) -> Result<(), WorkflowError> {
    scheduler.stop(demo_config(scheduler_id)).await?;
    println!("stopped '{scheduler_id}'");
    Ok(())
}

async fn run_status(scheduler: &Scheduler, scheduler_id: &str) -> Result<(), WorkflowError> {
    let mut config = demo_config(scheduler_id);
    scheduler.update_timer_details(&mut config).await;
    match config.next_timeout() {
        Some(next) => println!("'{scheduler_id}' next timeout at {}", next.to_rfc3339()),
        None => println!("'{scheduler_id}' has no active timer"),
    }
    Ok(())
}

fn error_code(err: &WorkflowError) -> String {
    match err {
        WorkflowError::AccessDenied(_) => "ACCESS_DENIED".to_string(),
        WorkflowError::Model { code, .. } => code.to_string(),
        WorkflowError::Processing(_) => "PROCESSING_ERROR".to_string(),
        WorkflowError::Plugin { code, .. } => code.clone(),
        WorkflowError::Scheduler { code, .. } => code.to_string(),
    }
}
