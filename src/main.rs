use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scour::cleanup::{self, CleanupError, RunConfig};
use scour::config::Config;
use scour::models::Category;
use scour::store::SqliteStore;

/// Remove old jobs, project and inventory updates, and notifications
/// from the run-history database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Remove records created more than N days ago
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    days: Option<u32>,

    /// Show what would be removed without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Path to a TOML config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Path to the run-history database (overrides the config file)
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace); RUST_LOG wins
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Clean up jobs
    #[arg(long)]
    jobs: bool,

    /// Clean up ad hoc commands
    #[arg(long)]
    ad_hoc_commands: bool,

    /// Clean up project updates
    #[arg(long)]
    project_updates: bool,

    /// Clean up inventory updates
    #[arg(long)]
    inventory_updates: bool,

    /// Clean up management jobs
    #[arg(long)]
    management_jobs: bool,

    /// Clean up workflow jobs
    #[arg(long)]
    workflow_jobs: bool,

    /// Clean up notifications
    #[arg(long)]
    notifications: bool,
}

impl Args {
    /// Categories selected by flags. Empty means no flag was given and
    /// the config file (or "all") decides.
    fn selected_categories(&self) -> Vec<Category> {
        let flags = [
            (self.jobs, Category::Job),
            (self.ad_hoc_commands, Category::AdHocCommand),
            (self.project_updates, Category::ProjectUpdate),
            (self.inventory_updates, Category::InventoryUpdate),
            (self.management_jobs, Category::ManagementJob),
            (self.workflow_jobs, Category::WorkflowJob),
            (self.notifications, Category::Notification),
        ];
        flags
            .into_iter()
            .filter_map(|(selected, category)| selected.then_some(category))
            .collect()
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(error = %err, "Invalid configuration");
                return ExitCode::from(2);
            }
        },
        None => Config::default(),
    };

    let selected = args.selected_categories();
    let run_config = RunConfig {
        days: args.days.unwrap_or(config.days),
        dry_run: args.dry_run || config.dry_run,
        categories: if selected.is_empty() {
            config.categories.clone()
        } else {
            selected
        },
    };
    let database = args.database.unwrap_or(config.database.path);

    let store = match SqliteStore::open(&database).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(database = %database.display(), error = %err, "Failed to open run-history database");
            return ExitCode::FAILURE;
        }
    };

    match cleanup::run(&store, &store, &run_config).await {
        Ok(report) => {
            for line in report.summaries() {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err @ CleanupError::HorizonTooLarge { .. }) => {
            tracing::error!(error = %err, "Invalid configuration");
            ExitCode::from(2)
        }
        Err(err) => {
            tracing::error!(error = %err, "Cleanup run failed; all deletions rolled back");
            ExitCode::FAILURE
        }
    }
}
