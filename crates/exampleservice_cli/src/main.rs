//! Synchronizer host entry point.
//!
//! # Responsibility
//! - Load configuration, initialize logging and open the resource store.
//! - Drive the event step, the policy scheduler and the periodic sync step.

use clap::{Parser, Subcommand};
use exampleservice_core::db::open_db;
use exampleservice_core::{
    core_version, init_logging, ExampleEventStep, PolicyScheduler, ReconciliationPolicy,
    ResourceStore, SchedulerReport, SqliteResourceStore, SyncConfig, SyncServiceInstanceStep,
    SyncStep, CONFIG_PATH_ENV,
};
use log::{info, warn};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Example service synchronizer.
#[derive(Parser)]
#[command(name = "exampleservice", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply one `SimpleExampleEvent` payload and reconcile the changes.
    Event {
        /// Raw JSON payload `{"service_instance": .., "tenant_message": ..}`.
        payload: String,
    },
    /// Reconcile every stored service instance.
    Reconcile,
    /// Run the periodic sync step over live service instances.
    Sync,
    /// Print the core version.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    if let Command::Version = cli.command {
        println!("exampleservice_core version={}", core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = SyncConfig::resolve_path(cli.config.as_deref(), |key| {
        std::env::var(key).ok()
    });
    let config = SyncConfig::load_from(&config_path)?;
    init_logging(&config.logging.level, config.logging.dir.as_deref())?;
    info!(
        "event=cli_start module=cli status=ok config={} db={}",
        config_path.display(),
        config.db_path.display()
    );

    let conn = open_db(&config.db_path)?;
    let (store, changes) = SqliteResourceStore::with_change_feed(&conn);
    let scheduler = PolicyScheduler::new(
        ReconciliationPolicy::new(store.clone(), config.policy.clone())?,
        changes,
    );

    let report = match cli.command {
        Command::Event { payload } => {
            let updated = ExampleEventStep::new(store).process_event(&payload)?;
            println!("updated={updated}");
            scheduler.run_pending()
        }
        Command::Reconcile => {
            let mut report = scheduler.reconcile_all()?;
            report.merge(scheduler.run_pending());
            report
        }
        Command::Sync => {
            let step = SyncServiceInstanceStep;
            let instances = store.list_service_instances(false)?;
            for instance in &instances {
                step.sync_record(instance)?;
            }
            info!(
                "event=sync_pass module=cli status=ok observes={} records={}",
                step.observes(),
                instances.len()
            );
            println!("synced={}", instances.len());
            return Ok(ExitCode::SUCCESS);
        }
        Command::Version => return Ok(ExitCode::SUCCESS),
    };

    Ok(print_report(&report))
}

fn print_report(report: &SchedulerReport) -> ExitCode {
    for (instance_id, outcome) in &report.outcomes {
        println!("instance={instance_id} outcome={}", outcome.as_str());
    }
    for instance_id in &report.purged {
        println!("instance={instance_id} purged=true");
    }
    for failure in &report.failures {
        warn!(
            "event=cli_report module=cli status=error instance_id={} error_code={}",
            failure.instance_id,
            failure.error.code()
        );
        println!(
            "instance={} change={} error={}",
            failure.instance_id,
            failure.change.as_str(),
            failure.error
        );
    }
    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
