//! Recurring scoring job.
//!
//! Each tick recomputes the current month to date for every registry
//! category on the default platforms. Rerunning a day overwrites its rows,
//! so ticks that overlap earlier ones are harmless.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use fairscore_core::{first_of_month, AppConfig};
use fairscore_engine::{BatchOptions, Orchestrator, PgStore, RangeRequest};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

const RUN_TYPE: &str = "score";
const TRIGGER: &str = "scheduler";

/// Builds and starts the job scheduler with the scoring job registered.
///
/// The returned handle must be kept alive; dropping it stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot be started.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_scoring_job(&scheduler, pool, config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_scoring_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let cron = config.schedule_cron.clone();
    let orchestrator = Arc::new(Orchestrator::new(
        PgStore::new(pool.clone(), config.reporting_tz.clone()),
        BatchOptions::from_app_config(&config),
    ));
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let orchestrator = Arc::clone(&orchestrator);

        Box::pin(async move {
            let request = month_to_date(Utc::now().date_naive());
            tracing::info!(
                start = %request.start,
                end = %request.end,
                "scheduler: starting scoring run"
            );
            run_scoring_job(&pool, &orchestrator, &request).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Every category and default platform from the first of the month to `today`.
fn month_to_date(today: NaiveDate) -> RangeRequest {
    RangeRequest {
        start: first_of_month(today),
        end: today,
        category: None,
        platform: None,
    }
}

async fn run_scoring_job(
    pool: &PgPool,
    orchestrator: &Orchestrator<PgStore>,
    request: &RangeRequest,
) {
    let run_id = match fairscore_db::create_batch_run(pool, RUN_TYPE, TRIGGER).await {
        Ok(run) => run.id,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to create batch run");
            return;
        }
    };
    if let Err(e) = fairscore_db::start_batch_run(pool, run_id).await {
        fail_run_best_effort(pool, run_id, format!("{e:#}")).await;
        return;
    }

    let summary = match orchestrator.compute_for_range(request).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(run_id, error = %e, "scheduler: scoring run failed");
            fail_run_best_effort(pool, run_id, format!("{e:#}")).await;
            return;
        }
    };

    if summary.is_total_failure() {
        let message = format!(
            "every peer group failed ({} groups, {} rows)",
            summary.groups_failed, summary.rows_failed
        );
        tracing::error!(run_id, "scheduler: {message}");
        fail_run_best_effort(pool, run_id, message).await;
        return;
    }

    match fairscore_db::complete_batch_run(
        pool,
        run_id,
        summary.records_processed(),
        summary.records_failed(),
    )
    .await
    {
        Ok(()) => tracing::info!(
            run_id,
            rows_scored = summary.rows_scored,
            groups_failed = summary.groups_failed,
            "scheduler: scoring run complete"
        ),
        Err(e) => fail_run_best_effort(pool, run_id, format!("{e:#}")).await,
    }
}

async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = fairscore_db::fail_batch_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "scheduler: failed to mark scoring run as failed"
        );
    }
}
