//! `score` command handlers.

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use fairscore_core::{AppConfig, Granularity, Platform};
use fairscore_engine::{
    peer_insight, rank_rows, BatchOptions, Orchestrator, PgStore, RangeRequest, RankedRow,
};

use crate::{begin_run, fail_run_best_effort, finish_run};

/// Which passes `score run` executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GranularityArg {
    /// Monthly then daily
    All,
    Daily,
    Monthly,
}

impl GranularityArg {
    fn passes(self) -> &'static [Granularity] {
        match self {
            GranularityArg::All => &[Granularity::Monthly, Granularity::Daily],
            GranularityArg::Daily => &[Granularity::Daily],
            GranularityArg::Monthly => &[Granularity::Monthly],
        }
    }
}

/// Sub-commands available under `score`.
#[derive(Debug, Subcommand)]
pub enum ScoreCommands {
    /// Compute and persist scores for every date in a range
    Run {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Restrict to one category (defaults to every registry category)
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        platform: Option<Platform>,
        #[arg(long, value_enum, default_value = "all")]
        granularity: GranularityArg,
        /// Skip the responsiveness backfill that precedes the passes
        #[arg(long)]
        skip_backfill: bool,
    },
    /// Score one window as a single bucket without persisting anything
    Adhoc {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        category: String,
        #[arg(long)]
        platform: Platform,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the latest stored ranking inside a window
    Ranking {
        #[arg(long)]
        granularity: Granularity,
        #[arg(long)]
        category: String,
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Show the top three plus this account
        #[arg(long)]
        username: Option<String>,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: ScoreCommands,
) -> anyhow::Result<()> {
    match command {
        ScoreCommands::Run {
            start,
            end,
            category,
            platform,
            granularity,
            skip_backfill,
        } => {
            let request = RangeRequest {
                start,
                end,
                category,
                platform,
            };
            run_score(pool, config, &request, granularity, skip_backfill).await
        }
        ScoreCommands::Adhoc {
            start,
            end,
            category,
            platform,
            json,
        } => run_adhoc(pool, config, start, end, &category, platform, json).await,
        ScoreCommands::Ranking {
            granularity,
            category,
            platform,
            start,
            end,
            username,
        } => {
            run_ranking(
                pool,
                granularity,
                &category,
                platform,
                start,
                end,
                username.as_deref(),
            )
            .await
        }
    }
}

fn orchestrator(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    skip_backfill: bool,
) -> Orchestrator<PgStore> {
    let store = PgStore::new(pool.clone(), config.reporting_tz.clone());
    let options = BatchOptions {
        skip_backfill,
        ..BatchOptions::from_app_config(config)
    };
    Orchestrator::new(store, options)
}

async fn run_score(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    request: &RangeRequest,
    granularity: GranularityArg,
    skip_backfill: bool,
) -> anyhow::Result<()> {
    let orchestrator = orchestrator(pool, config, skip_backfill);

    let run_id = begin_run(pool, "score").await?;
    let summary = match orchestrator.run(request, granularity.passes()).await {
        Ok(summary) => summary,
        Err(e) => {
            fail_run_best_effort(pool, run_id, "score", format!("{e:#}")).await;
            return Err(e.into());
        }
    };

    finish_run(
        pool,
        run_id,
        "score",
        summary.records_processed(),
        summary.records_failed(),
        summary.is_total_failure(),
    )
    .await?;

    println!(
        "scored {} rows across {} peer groups ({} groups failed, {} rows failed, {} posts backfilled)",
        summary.rows_scored,
        summary.groups_processed,
        summary.groups_failed,
        summary.rows_failed,
        summary.posts_backfilled
    );
    Ok(())
}

async fn run_adhoc(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    start: NaiveDate,
    end: NaiveDate,
    category: &str,
    platform: Platform,
    json: bool,
) -> anyhow::Result<()> {
    let orchestrator = orchestrator(pool, config, true);
    let rows = orchestrator
        .compute_ad_hoc(start, end, category, platform)
        .await?;
    let ranked = rank_rows(rows);

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else if ranked.is_empty() {
        println!("no {platform} accounts tracked in {category}");
    } else {
        print_ranking(&ranked);
    }
    Ok(())
}

async fn run_ranking(
    pool: &sqlx::PgPool,
    granularity: Granularity,
    category: &str,
    platform: Platform,
    start: NaiveDate,
    end: NaiveDate,
    username: Option<&str>,
) -> anyhow::Result<()> {
    let Some(date) =
        fairscore_db::latest_scored_date(pool, granularity, category, platform, start, end).await?
    else {
        println!("no {granularity} scores for {category}/{platform} between {start} and {end}");
        return Ok(());
    };

    let rows = fairscore_db::list_score_rows(pool, granularity, category, platform, date)
        .await?
        .iter()
        .map(fairscore_db::ScoreRow::to_view)
        .collect::<Result<Vec<_>, _>>()?;
    let ranked = rank_rows(rows);

    println!("{granularity} ranking for {category}/{platform} on {date}");
    match username {
        Some(username) => {
            let insight = peer_insight(&ranked, username);
            print_ranking(&insight.rows);
            if !insight.found {
                println!("{username} is not ranked on {date}");
            }
        }
        None => print_ranking(&ranked),
    }
    Ok(())
}

fn print_ranking(rows: &[RankedRow]) {
    println!(
        "{:<6}{:<28}{:>12}{:>9}{:>9}{:>9}{:>9}{:>9}",
        "RANK", "USERNAME", "FOLLOWERS", "F", "A", "I", "R", "FAIR"
    );
    for ranked in rows {
        let row = &ranked.row;
        println!(
            "{:<6}{:<28}{:>12}{:>9.2}{:>9.2}{:>9.2}{:>9.2}{:>9.2}",
            ranked.rank,
            row.username,
            row.raw.followers,
            row.scores.followers,
            row.scores.activities,
            row.scores.interactions,
            row.scores.responsiveness,
            row.fair_score
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_runs_monthly_before_daily() {
        assert_eq!(
            GranularityArg::All.passes(),
            &[Granularity::Monthly, Granularity::Daily]
        );
        assert_eq!(GranularityArg::Daily.passes(), &[Granularity::Daily]);
    }
}
