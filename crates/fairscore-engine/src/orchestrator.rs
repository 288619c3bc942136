//! Batch orchestration: extract → persist raw → normalize → compose →
//! persist scores, for every date and peer group in a range.

use std::collections::HashMap;

use chrono::NaiveDate;
use fairscore_core::{
    first_of_month, Account, AppConfig, DateWindow, Granularity, Metric, PeerGroupKey,
    Platform, RawMetrics, ScoreRowView,
};
use futures::future::join_all;
use serde::Serialize;

use crate::compose::{compose, round2};
use crate::error::{EngineError, PeerGap};
use crate::extract::{extract_metrics, Bucket};
use crate::normalize::normalize_group;
use crate::responsiveness::{backfill_responsiveness, BackfillScope};
use crate::store::{AccountRegistry, FairStore, StoreError};

const DEFAULT_EXTRACT_BATCH_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Options and requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Accounts extracted concurrently within one peer group.
    pub extract_batch_size: usize,
    /// Platforms scored when a request names none.
    pub default_platforms: Vec<Platform>,
    /// Skip the per-post responsiveness backfill before the passes.
    pub skip_backfill: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            extract_batch_size: DEFAULT_EXTRACT_BATCH_SIZE,
            default_platforms: vec![Platform::Instagram, Platform::TikTok],
            skip_backfill: false,
        }
    }
}

impl BatchOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            extract_batch_size: config.extract_batch_size,
            default_platforms: config.default_platforms.clone(),
            skip_backfill: false,
        }
    }
}

/// Input to a persisted run. `None` means every registry category or every
/// default platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub category: Option<String>,
    pub platform: Option<Platform>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub groups_processed: usize,
    pub groups_failed: usize,
    pub rows_written: usize,
    pub rows_failed: usize,
    pub rows_scored: usize,
    pub posts_backfilled: usize,
    pub backfill_failures: usize,
    /// Peer groups that reached normalization empty, plus metrics whose
    /// group maximum was zero. Logged as warnings; not failures.
    pub missing_peer_data: usize,
}

impl RunSummary {
    #[must_use]
    pub fn records_processed(&self) -> i32 {
        i32::try_from(self.rows_scored).unwrap_or(i32::MAX)
    }

    #[must_use]
    pub fn records_failed(&self) -> i32 {
        let failed = self.rows_failed + self.groups_failed + self.backfill_failures;
        i32::try_from(failed).unwrap_or(i32::MAX)
    }

    /// Something was attempted and nothing at all was written.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.rows_written == 0 && (self.rows_failed > 0 || self.groups_failed > 0)
    }
}

// ---------------------------------------------------------------------------
// Per-run state
// ---------------------------------------------------------------------------

/// Account lists fetched during one run, keyed by `(category, platform)`.
/// Dropped with the run.
#[derive(Debug, Default)]
struct RunContext {
    accounts: HashMap<(String, Platform), Vec<Account>>,
}

impl RunContext {
    async fn accounts<S>(
        &mut self,
        store: &S,
        category: &str,
        platform: Platform,
    ) -> Result<&[Account], StoreError>
    where
        S: AccountRegistry + ?Sized,
    {
        let key = (category.to_string(), platform);
        if !self.accounts.contains_key(&key) {
            let listed = store.list_accounts(category, platform).await?;
            self.accounts.insert(key.clone(), listed);
        }
        Ok(self.accounts.entry(key).or_default().as_slice())
    }
}

struct RunPlan {
    window: DateWindow,
    categories: Vec<String>,
    platforms: Vec<Platform>,
}

#[derive(Debug, Default)]
struct GroupOutcome {
    rows_written: usize,
    rows_failed: usize,
    rows_scored: usize,
    missing_peer_data: usize,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<S> {
    store: S,
    options: BatchOptions,
}

impl<S: FairStore> Orchestrator<S> {
    pub fn new(store: S, options: BatchOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Monthly then daily over the whole range, after a responsiveness
    /// backfill covering the range's first month onwards.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] when the request cannot be
    /// resolved to at least one date, category, and platform. Every other
    /// failure is logged and counted in the summary.
    pub async fn compute_for_range(
        &self,
        request: &RangeRequest,
    ) -> Result<RunSummary, EngineError> {
        self.run(request, &[Granularity::Monthly, Granularity::Daily])
            .await
    }

    /// Runs the requested granularities, monthly always before daily.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] for unusable input.
    pub async fn run(
        &self,
        request: &RangeRequest,
        granularities: &[Granularity],
    ) -> Result<RunSummary, EngineError> {
        let mut passes = granularities.to_vec();
        passes.sort_by_key(|g| g.pass_order());
        passes.dedup();
        if passes.is_empty() {
            return Err(EngineError::Configuration(
                "no granularity requested".to_string(),
            ));
        }

        let plan = self.plan(request).await?;
        let mut summary = RunSummary::default();
        let mut ctx = RunContext::default();

        tracing::info!(
            window = %plan.window,
            categories = plan.categories.len(),
            platforms = plan.platforms.len(),
            "starting scoring run"
        );

        if !self.options.skip_backfill {
            self.backfill(&plan, &mut summary).await;
        }

        for granularity in passes {
            for date in plan.window.dates() {
                for category in &plan.categories {
                    for &platform in &plan.platforms {
                        let group = PeerGroupKey {
                            date,
                            category: category.clone(),
                            platform,
                        };
                        match self.process_group(&mut ctx, granularity, &group).await {
                            Ok(outcome) => {
                                summary.groups_processed += 1;
                                summary.rows_written += outcome.rows_written;
                                summary.rows_failed += outcome.rows_failed;
                                summary.rows_scored += outcome.rows_scored;
                                summary.missing_peer_data += outcome.missing_peer_data;
                            }
                            Err(e) => {
                                summary.groups_failed += 1;
                                tracing::warn!(
                                    %granularity,
                                    category = %group.category,
                                    platform = %group.platform,
                                    date = %group.date,
                                    error = %e,
                                    "peer group failed; continuing"
                                );
                            }
                        }
                    }
                }
            }
            tracing::info!(%granularity, window = %plan.window, "pass complete");
        }

        tracing::info!(
            groups = summary.groups_processed,
            groups_failed = summary.groups_failed,
            rows_scored = summary.rows_scored,
            rows_failed = summary.rows_failed,
            "scoring run finished"
        );

        Ok(summary)
    }

    /// Scores `[start, end]` as one bucket and returns the rows without
    /// persisting them. `fair_score` is rounded to two decimals.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Configuration`] for an inverted range or blank category.
    /// - [`EngineError::UpstreamFetch`] if the peer group cannot be listed.
    pub async fn compute_ad_hoc(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        category: &str,
        platform: Platform,
    ) -> Result<Vec<ScoreRowView>, EngineError> {
        let window =
            DateWindow::new(start, end).map_err(|e| EngineError::Configuration(e.to_string()))?;
        let category = category.trim();
        if category.is_empty() {
            return Err(EngineError::Configuration(
                "category must not be blank".to_string(),
            ));
        }

        let accounts = self
            .store
            .list_accounts(category, platform)
            .await
            .map_err(|e| EngineError::upstream(format!("{category}/{platform} accounts"), e))?;

        let bucket = Bucket::Range(window);
        let extracted = self.extract_all(&accounts, category, &bucket).await;

        let mut members: Vec<(&Account, RawMetrics)> = Vec::with_capacity(extracted.len());
        for (account, result) in extracted {
            match result {
                Ok(raw) => members.push((account, raw)),
                Err(e) => tracing::warn!(
                    username = %account.username,
                    window = %window,
                    error = %e,
                    "skipping account in ad-hoc range"
                ),
            }
        }

        let raws: Vec<RawMetrics> = members.iter().map(|(_, raw)| *raw).collect();
        let normalized = normalize_group(&raws);
        let group = format!("{category}/{platform}/{window}");
        warn_missing_peer_data(&group, raws.len(), &normalized.degenerate);

        Ok(members
            .into_iter()
            .zip(normalized.scores)
            .map(|((account, raw), scores)| {
                let composed = compose(&scores);
                ScoreRowView {
                    list_id: account.id,
                    username: account.username.clone(),
                    date: window.end,
                    category: category.to_string(),
                    platform,
                    raw,
                    scores: composed.scores,
                    weighted: composed.weighted,
                    fair_score: round2(composed.fair_score),
                }
            })
            .collect())
    }

    async fn plan(&self, request: &RangeRequest) -> Result<RunPlan, EngineError> {
        let window = DateWindow::new(request.start, request.end)
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        if self.options.extract_batch_size == 0 {
            return Err(EngineError::Configuration(
                "extract batch size must be at least 1".to_string(),
            ));
        }

        let categories = match request.category.as_deref().map(str::trim) {
            Some("") => {
                return Err(EngineError::Configuration(
                    "category must not be blank".to_string(),
                ))
            }
            Some(category) => vec![category.to_string()],
            None => self.store.list_categories().await.map_err(|e| {
                EngineError::Configuration(format!("cannot resolve categories: {e}"))
            })?,
        };
        if categories.is_empty() {
            return Err(EngineError::Configuration(
                "no categories known to the account registry".to_string(),
            ));
        }

        let platforms = match request.platform {
            Some(platform) => vec![platform],
            None => self.options.default_platforms.clone(),
        };
        if platforms.is_empty() {
            return Err(EngineError::Configuration(
                "no platform given and no default platforms configured".to_string(),
            ));
        }

        Ok(RunPlan {
            window,
            categories,
            platforms,
        })
    }

    async fn backfill(&self, plan: &RunPlan, summary: &mut RunSummary) {
        let window = DateWindow {
            start: first_of_month(plan.window.start),
            end: plan.window.end,
        };
        for category in &plan.categories {
            let scope = BackfillScope::Window {
                category: category.clone(),
                window,
            };
            match backfill_responsiveness(&self.store, &scope).await {
                Ok(done) => {
                    summary.posts_backfilled += done.posts_updated;
                    summary.backfill_failures += done.posts_failed;
                }
                Err(e) => {
                    summary.backfill_failures += 1;
                    tracing::warn!(%scope, error = %e, "responsiveness backfill skipped");
                }
            }
        }
    }

    async fn process_group(
        &self,
        ctx: &mut RunContext,
        granularity: Granularity,
        group: &PeerGroupKey,
    ) -> Result<GroupOutcome, EngineError> {
        let accounts = ctx
            .accounts(&self.store, &group.category, group.platform)
            .await
            .map_err(|e| EngineError::upstream(format!("accounts for {group}"), e))?;

        let mut outcome = GroupOutcome::default();
        if accounts.is_empty() {
            outcome.missing_peer_data = warn_missing_peer_data(&group.to_string(), 0, &[]);
            return Ok(outcome);
        }

        let bucket = match granularity {
            Granularity::Daily => Bucket::Daily(group.date),
            Granularity::Monthly => Bucket::MonthToDate(group.date),
        };

        // Phase 1: raw metrics.
        let mut written: Vec<(&Account, RawMetrics)> = Vec::with_capacity(accounts.len());
        for (account, result) in self
            .extract_all(accounts, &group.category, &bucket)
            .await
        {
            let key = group.key_for(account.id);
            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    outcome.rows_failed += 1;
                    let err = EngineError::upstream(key.to_string(), e);
                    tracing::warn!(%granularity, username = %account.username, error = %err, "extraction failed");
                    continue;
                }
            };
            match self
                .store
                .upsert_raw_metrics(granularity, &key, &account.username, &raw)
                .await
            {
                Ok(()) => {
                    outcome.rows_written += 1;
                    written.push((account, raw));
                }
                Err(e) => {
                    outcome.rows_failed += 1;
                    let err = EngineError::persistence(key.to_string(), e);
                    tracing::warn!(%granularity, username = %account.username, error = %err, "raw metric upsert failed");
                }
            }
        }

        // Phase 2: scores over the rows that made it to storage.
        let raws: Vec<RawMetrics> = written.iter().map(|(_, raw)| *raw).collect();
        let normalized = normalize_group(&raws);
        outcome.missing_peer_data =
            warn_missing_peer_data(&group.to_string(), raws.len(), &normalized.degenerate);

        for ((account, _), scores) in written.iter().zip(normalized.scores) {
            let key = group.key_for(account.id);
            let composed = compose(&scores);
            match self
                .store
                .upsert_scores(granularity, &key, &account.username, &composed)
                .await
            {
                Ok(()) => outcome.rows_scored += 1,
                Err(e) => {
                    outcome.rows_failed += 1;
                    let err = EngineError::persistence(key.to_string(), e);
                    tracing::warn!(%granularity, username = %account.username, error = %err, "score upsert failed");
                }
            }
        }

        tracing::debug!(
            %granularity,
            %group,
            written = outcome.rows_written,
            scored = outcome.rows_scored,
            "peer group scored"
        );

        Ok(outcome)
    }

    /// Extracts every account, `extract_batch_size` at a time. Each batch
    /// settles before the next one starts.
    async fn extract_all<'a>(
        &self,
        accounts: &'a [Account],
        category: &str,
        bucket: &Bucket,
    ) -> Vec<(&'a Account, Result<RawMetrics, StoreError>)> {
        let mut results = Vec::with_capacity(accounts.len());
        for chunk in accounts.chunks(self.options.extract_batch_size.max(1)) {
            let batch = join_all(
                chunk
                    .iter()
                    .map(|account| extract_metrics(&self.store, account, category, bucket)),
            )
            .await;
            results.extend(chunk.iter().zip(batch));
        }
        results
    }
}

/// One error when no rows reached normalization, otherwise one per metric
/// whose group maximum was zero.
fn missing_peer_data(group: &str, row_count: usize, degenerate: &[Metric]) -> Vec<EngineError> {
    let gaps: Vec<PeerGap> = if row_count == 0 {
        vec![PeerGap::NoRows]
    } else {
        degenerate.iter().copied().map(PeerGap::ZeroMaximum).collect()
    };
    gaps.into_iter()
        .map(|gap| EngineError::MissingPeerData {
            group: group.to_string(),
            gap,
        })
        .collect()
}

/// Logs each gap at `warn` and returns how many there were.
fn warn_missing_peer_data(group: &str, row_count: usize, degenerate: &[Metric]) -> usize {
    let errors = missing_peer_data(group, row_count, degenerate);
    for err in &errors {
        tracing::warn!(error = %err, "peer group scored with missing data");
    }
    errors.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_score_instagram_and_tiktok() {
        let options = BatchOptions::default();
        assert_eq!(
            options.default_platforms,
            vec![Platform::Instagram, Platform::TikTok]
        );
        assert_eq!(options.extract_batch_size, 10);
        assert!(!options.skip_backfill);
    }

    #[test]
    fn summary_counts_feed_batch_run_columns() {
        let summary = RunSummary {
            groups_processed: 4,
            groups_failed: 1,
            rows_written: 10,
            rows_failed: 2,
            rows_scored: 9,
            posts_backfilled: 3,
            backfill_failures: 1,
            missing_peer_data: 2,
        };
        assert_eq!(summary.records_processed(), 9);
        assert_eq!(summary.records_failed(), 4);
        assert!(!summary.is_total_failure());
    }

    #[test]
    fn empty_group_is_one_missing_peer_data_error() {
        let errors = missing_peer_data("beauty/instagram/2025-01-15", 0, &[]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            EngineError::MissingPeerData {
                gap: PeerGap::NoRows,
                ..
            }
        ));
        assert_eq!(
            errors[0].to_string(),
            "peer group beauty/instagram/2025-01-15 has no rows to normalize"
        );
    }

    #[test]
    fn zero_maximum_metrics_are_reported_individually() {
        let errors = missing_peer_data(
            "beauty/tiktok/2025-01-15",
            3,
            &[Metric::Activities, Metric::Responsiveness],
        );
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors[1],
            EngineError::MissingPeerData {
                gap: PeerGap::ZeroMaximum(Metric::Responsiveness),
                ..
            }
        ));
        assert!(missing_peer_data("beauty/tiktok/2025-01-15", 3, &[]).is_empty());
    }

    #[test]
    fn total_failure_requires_an_attempt() {
        assert!(!RunSummary::default().is_total_failure());
        let failed = RunSummary {
            groups_failed: 2,
            ..RunSummary::default()
        };
        assert!(failed.is_total_failure());
    }
}
