//! `responsiveness` command handlers.

use chrono::{Months, NaiveDate, Utc};
use clap::Subcommand;
use fairscore_core::{first_of_month, AppConfig};
use fairscore_engine::{BackfillScope, PgStore};

use crate::{begin_run, fail_run_best_effort, finish_run};

/// Sub-commands available under `responsiveness`.
#[derive(Debug, Subcommand)]
pub enum ResponsivenessCommands {
    /// Compute per-post responsiveness for posts not yet processed
    Backfill {
        #[arg(long)]
        category: String,
        /// Only posts created after this date (defaults to the first of last month)
        #[arg(long)]
        since: Option<NaiveDate>,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: ResponsivenessCommands,
) -> anyhow::Result<()> {
    match command {
        ResponsivenessCommands::Backfill { category, since } => {
            let since = since.unwrap_or_else(|| default_since(Utc::now().date_naive()));
            run_backfill(pool, config, category, since).await
        }
    }
}

/// First day of the month before `today`.
fn default_since(today: NaiveDate) -> NaiveDate {
    let this_month = first_of_month(today);
    this_month
        .checked_sub_months(Months::new(1))
        .unwrap_or(this_month)
}

async fn run_backfill(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    category: String,
    since: NaiveDate,
) -> anyhow::Result<()> {
    let store = PgStore::new(pool.clone(), config.reporting_tz.clone());
    let scope = BackfillScope::Pending { category, since };

    let run_id = begin_run(pool, "responsiveness").await?;
    let summary = match fairscore_engine::backfill_responsiveness(&store, &scope).await {
        Ok(summary) => summary,
        Err(e) => {
            fail_run_best_effort(pool, run_id, "responsiveness", format!("{e:#}")).await;
            return Err(e.into());
        }
    };

    let processed = i32::try_from(summary.posts_updated).unwrap_or(i32::MAX);
    let failed = i32::try_from(summary.posts_failed).unwrap_or(i32::MAX);
    finish_run(
        pool,
        run_id,
        "responsiveness",
        processed,
        failed,
        summary.posts_updated == 0 && summary.posts_failed > 0,
    )
    .await?;

    println!(
        "backfilled {} of {} posts ({} without a defined ratio, {} failed)",
        summary.posts_updated, summary.posts_seen, summary.nulls, summary.posts_failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_since_is_first_of_previous_month() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 18).unwrap();
        assert_eq!(
            default_since(today),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
        let january = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(
            default_since(january),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
        );
    }
}
