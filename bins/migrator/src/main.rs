//! Database migration runner for Strata.
//!
//! Usage:
//!   migrator run [--strict]            - Apply all pending migrations as one batch
//!   migrator rollback [BATCH]          - Roll back a batch (default: the latest)
//!   migrator rollback-all              - Roll back every applied migration
//!   migrator status                    - Show applied and pending migrations
//!   migrator create <NAME...>          - Scaffold a new migration

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strata_db::{application_manager, connect_with};
use strata_db::migrator::{
    ManagerOptions, MigrationManager, RollbackReport, ScaffoldPaths, Scaffolder,
};
use strata_shared::{AppConfig, OrphanPolicy};

#[derive(Parser)]
#[command(name = "migrator")]
#[command(about = "Apply, roll back and scaffold schema migrations")]
struct Cli {
    /// Database connection URL (overrides configuration)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Abort a rollback on records with no registered migration
    #[arg(long, global = true)]
    fail_on_orphans: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations as a new batch
    Run {
        /// Run the whole batch in one transaction
        #[arg(long)]
        strict: bool,
    },

    /// Roll back one batch
    Rollback {
        /// Batch number; the latest batch when omitted or not positive
        batch: Option<i32>,

        /// Roll back in one transaction
        #[arg(long)]
        strict: bool,
    },

    /// Roll back every applied migration, newest first
    RollbackAll {
        /// Roll back in one transaction
        #[arg(long)]
        strict: bool,
    },

    /// Show applied and pending migrations
    Status,

    /// Scaffold a new migration
    Create {
        /// Migration label, e.g. `create orders table`
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strata_db=info,migrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if cli.fail_on_orphans {
        config.migrations.orphan_policy = OrphanPolicy::Fail;
    }

    match cli.command {
        Commands::Create { name } => create(&config, &name.join(" "))?,
        Commands::Run { strict } => {
            let report = manager(&config, strict)
                .await?
                .run()
                .await
                .context("migration run failed")?;
            if report.applied.is_empty() {
                println!("Nothing to migrate.");
            } else {
                for name in &report.applied {
                    println!("Applied: {name}");
                }
                println!(
                    "Applied {} migration(s) in batch {}.",
                    report.applied_count(),
                    report.batch
                );
            }
        }
        Commands::Rollback { batch, strict } => {
            let report = manager(&config, strict)
                .await?
                .rollback(batch)
                .await
                .context("rollback failed")?;
            print_rollback(&report);
        }
        Commands::RollbackAll { strict } => {
            let report = manager(&config, strict)
                .await?
                .rollback_all()
                .await
                .context("rollback failed")?;
            print_rollback(&report);
        }
        Commands::Status => {
            let report = manager(&config, false)
                .await?
                .status()
                .await
                .context("failed to read status")?;

            for record in &report.applied {
                println!(
                    "{}  batch {}  applied {}",
                    record.name,
                    record.batch,
                    record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            println!("Total: {}", report.total());
            println!("Pending: {}", report.pending_count());
            for name in &report.pending {
                println!("  pending  {name}");
            }
            for name in &report.orphaned {
                println!("  orphaned {name}");
            }
        }
    }

    Ok(())
}

/// Builds the application registry and connects a manager to the database.
async fn manager(config: &AppConfig, strict: bool) -> anyhow::Result<MigrationManager> {
    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;

    let options = ManagerOptions {
        strict: strict || config.migrations.strict,
        ..ManagerOptions::from(&config.migrations)
    };
    let manager = application_manager(db, options).context("invalid migration registry")?;
    info!(migrations = manager.registry().len(), "connected to database");
    Ok(manager)
}

fn create(config: &AppConfig, label: &str) -> anyhow::Result<()> {
    let scaffolder = Scaffolder::new(ScaffoldPaths::from(&config.migrations))
        .context("failed to load scaffold templates")?;
    let outcome = scaffolder
        .create(label)
        .with_context(|| format!("failed to create migration `{label}`"))?;

    println!("Created migration {}", outcome.migration_file.display());
    if let Some(entity) = &outcome.entity_file {
        println!("Created entity {}", entity.display());
    }
    for warning in &outcome.warnings {
        println!("Warning: {warning}");
    }
    println!("Rebuild to include {} in the next run.", outcome.name);
    Ok(())
}

fn print_rollback(report: &RollbackReport) {
    for name in &report.rolled_back {
        println!("Rolled back: {name}");
    }
    for name in &report.orphaned {
        println!("Removed orphaned record: {name}");
    }
    println!(
        "Rolled back {} migration(s) from batch(es) {:?}.",
        report.rolled_back_count(),
        report.batches
    );
}
