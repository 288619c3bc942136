mod accounts;
mod ingest;
mod responsiveness;
mod score;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fairscore_core::Platform;
use tracing_subscriber::EnvFilter;

use crate::accounts::AccountsCommands;
use crate::responsiveness::ResponsivenessCommands;
use crate::score::ScoreCommands;

#[derive(Debug, Parser)]
#[command(name = "fairscore")]
#[command(about = "FAIR score pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Manage the tracked account registry
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Fetch engagement for tracked accounts and store it
    Ingest {
        /// First day of the fetch window (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the fetch window, inclusive
        #[arg(long)]
        end: NaiveDate,
        /// Restrict to one category (defaults to every registry category)
        #[arg(long)]
        category: Option<String>,
        /// Restrict to one platform (defaults to FAIRSCORE_DEFAULT_PLATFORMS)
        #[arg(long)]
        platform: Option<Platform>,
        /// Fetch and count without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Per-post responsiveness maintenance
    Responsiveness {
        #[command(subcommand)]
        command: ResponsivenessCommands,
    },
    /// Compute and inspect FAIR scores
    Score {
        #[command(subcommand)]
        command: ScoreCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("fairscore ready; run `fairscore --help` for commands");
        return Ok(());
    };

    let config = fairscore_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = fairscore_db::PoolConfig::from_app_config(&config);
    let pool = fairscore_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            fairscore_db::ping(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = fairscore_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Accounts { command } => accounts::run(&pool, &config, command).await?,
        Commands::Ingest {
            start,
            end,
            category,
            platform,
            dry_run,
        } => {
            ingest::run_ingest(
                &pool,
                &config,
                ingest::IngestArgs {
                    start,
                    end,
                    category,
                    platform,
                    dry_run,
                },
            )
            .await?;
        }
        Commands::Responsiveness { command } => {
            responsiveness::run(&pool, &config, command).await?;
        }
        Commands::Score { command } => score::run(&pool, &config, command).await?,
    }

    Ok(())
}

/// Creates a `batch_runs` row for a CLI-triggered run and marks it running.
async fn begin_run(pool: &sqlx::PgPool, run_type: &'static str) -> anyhow::Result<i64> {
    let run = fairscore_db::create_batch_run(pool, run_type, "cli").await?;
    if let Err(e) = fairscore_db::start_batch_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, run_type, format!("{e:#}")).await;
        return Err(e.into());
    }
    Ok(run.id)
}

/// Marks a run succeeded, or failed when nothing at all went through.
async fn finish_run(
    pool: &sqlx::PgPool,
    run_id: i64,
    run_type: &'static str,
    processed: i32,
    failed: i32,
    total_failure: bool,
) -> anyhow::Result<()> {
    if total_failure {
        let message = format!("every unit of the {run_type} run failed ({failed} failures)");
        fail_run_best_effort(pool, run_id, run_type, message.clone()).await;
        anyhow::bail!("{message}");
    }

    if let Err(err) = fairscore_db::complete_batch_run(pool, run_id, processed, failed).await {
        fail_run_best_effort(pool, run_id, run_type, format!("{err:#}")).await;
        return Err(err.into());
    }
    Ok(())
}

/// Attempt to mark a batch run as failed, logging any secondary error.
async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = fairscore_db::fail_batch_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}

#[cfg(test)]
mod tests;
