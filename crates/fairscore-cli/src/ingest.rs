//! `ingest` command handler.

use chrono::NaiveDate;
use fairscore_core::{AppConfig, DateWindow, Platform};
use fairscore_engine::{IngestRequest, PgStore};
use fairscore_source::SourceClient;

use crate::{begin_run, fail_run_best_effort, finish_run};

#[derive(Debug)]
pub(crate) struct IngestArgs {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub category: Option<String>,
    pub platform: Option<Platform>,
    pub dry_run: bool,
}

/// Fetch engagement for every selected account and persist it.
///
/// A dry run fetches and reports counts without creating a batch run or
/// writing anything.
///
/// # Errors
///
/// Returns an error if the window is inverted, the data source is not
/// configured, or the batch run cannot be tracked. Per-account failures are
/// logged and counted; the run only fails when every account failed.
pub(crate) async fn run_ingest(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    args: IngestArgs,
) -> anyhow::Result<()> {
    let window = DateWindow::new(args.start, args.end)?;
    let source = SourceClient::from_app_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build data source client: {e}"))?;
    let store = PgStore::new(pool.clone(), config.reporting_tz.clone());

    let request = IngestRequest {
        window,
        category: args.category,
        platform: args.platform,
        dry_run: args.dry_run,
    };

    if request.dry_run {
        let summary =
            fairscore_engine::ingest(&store, &source, &request, &config.default_platforms).await?;
        println!(
            "dry-run: {} accounts would ingest {} posts, {} comments, {} replies ({} failed)",
            summary.accounts_processed,
            summary.posts,
            summary.comments,
            summary.child_comments,
            summary.accounts_failed
        );
        return Ok(());
    }

    let run_id = begin_run(pool, "ingest").await?;

    let summary =
        match fairscore_engine::ingest(&store, &source, &request, &config.default_platforms).await
        {
            Ok(summary) => summary,
            Err(e) => {
                fail_run_best_effort(pool, run_id, "ingest", format!("{e:#}")).await;
                return Err(e.into());
            }
        };

    let processed = i32::try_from(summary.posts).unwrap_or(i32::MAX);
    let failed = i32::try_from(summary.accounts_failed).unwrap_or(i32::MAX);
    finish_run(
        pool,
        run_id,
        "ingest",
        processed,
        failed,
        summary.is_total_failure(),
    )
    .await?;

    println!(
        "ingested {} accounts ({} failed): {} posts, {} comments, {} replies",
        summary.accounts_processed,
        summary.accounts_failed,
        summary.posts,
        summary.comments,
        summary.child_comments
    );
    Ok(())
}
