//! Database operations for `fair_scores_daily` and `fair_scores_monthly`.
//!
//! Raw metrics and scores are written by separate statements. A raw upsert
//! never touches score columns and a score upsert never touches raw
//! columns, so a rerun may briefly leave fresh raw values beside stale
//! scores until the group's scoring pass catches up.

use chrono::{DateTime, NaiveDate, Utc};
use fairscore_core::{
    ComposedScore, Granularity, MetricScores, Platform, RawMetrics, ScoreKey, ScoreRowView,
    WeightedScores,
};
use sqlx::PgPool;

use crate::DbError;

const SCORE_COLUMNS: &str = "id, list_id, date, category, platform, username, \
     followers, activities, nilai_aktifitas, interactions, responsiveness, \
     followers_score, activities_score, interactions_score, responsiveness_score, \
     followers_weighted, activities_weighted, interactions_weighted, responsiveness_weighted, \
     fair_score, raw_updated_at, scored_at";

/// Table holding rows of the given granularity.
#[must_use]
pub fn score_table(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Daily => "fair_scores_daily",
        Granularity::Monthly => "fair_scores_monthly",
    }
}

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from either score table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoreRow {
    pub id: i64,
    pub list_id: i64,
    pub date: NaiveDate,
    pub category: String,
    pub platform: String,
    pub username: String,
    pub followers: i64,
    pub activities: f64,
    pub nilai_aktifitas: i64,
    pub interactions: f64,
    pub responsiveness: f64,
    pub followers_score: Option<f64>,
    pub activities_score: Option<f64>,
    pub interactions_score: Option<f64>,
    pub responsiveness_score: Option<f64>,
    pub followers_weighted: Option<f64>,
    pub activities_weighted: Option<f64>,
    pub interactions_weighted: Option<f64>,
    pub responsiveness_weighted: Option<f64>,
    pub fair_score: Option<f64>,
    pub raw_updated_at: Option<DateTime<Utc>>,
    pub scored_at: Option<DateTime<Utc>>,
}

impl ScoreRow {
    #[must_use]
    pub fn raw(&self) -> RawMetrics {
        RawMetrics {
            followers: self.followers,
            activities: self.activities,
            nilai_aktifitas: self.nilai_aktifitas,
            interactions: self.interactions,
            responsiveness: self.responsiveness,
        }
    }

    /// Converts to the caller-facing view. Unscored columns read as 0.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if the stored platform is unknown.
    pub fn to_view(&self) -> Result<ScoreRowView, DbError> {
        let platform: Platform = self.platform.parse()?;
        Ok(ScoreRowView {
            list_id: self.list_id,
            username: self.username.clone(),
            date: self.date,
            category: self.category.clone(),
            platform,
            raw: self.raw(),
            scores: MetricScores {
                followers: self.followers_score.unwrap_or(0.0),
                activities: self.activities_score.unwrap_or(0.0),
                interactions: self.interactions_score.unwrap_or(0.0),
                responsiveness: self.responsiveness_score.unwrap_or(0.0),
            },
            weighted: WeightedScores {
                followers: self.followers_weighted.unwrap_or(0.0),
                activities: self.activities_weighted.unwrap_or(0.0),
                interactions: self.interactions_weighted.unwrap_or(0.0),
                responsiveness: self.responsiveness_weighted.unwrap_or(0.0),
            },
            fair_score: self.fair_score.unwrap_or(0.0),
        })
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts the row or overwrites its raw metrics, keyed by
/// `(list_id, date, category, platform)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_raw_metrics(
    pool: &PgPool,
    granularity: Granularity,
    key: &ScoreKey,
    username: &str,
    raw: &RawMetrics,
) -> Result<(), DbError> {
    let table = score_table(granularity);
    let sql = format!(
        "INSERT INTO {table} \
             (list_id, date, category, platform, username, \
              followers, activities, nilai_aktifitas, interactions, responsiveness, raw_updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) \
         ON CONFLICT (list_id, date, category, platform) DO UPDATE SET \
             username = EXCLUDED.username, \
             followers = EXCLUDED.followers, \
             activities = EXCLUDED.activities, \
             nilai_aktifitas = EXCLUDED.nilai_aktifitas, \
             interactions = EXCLUDED.interactions, \
             responsiveness = EXCLUDED.responsiveness, \
             raw_updated_at = NOW()"
    );

    sqlx::query(&sql)
        .bind(key.list_id)
        .bind(key.date)
        .bind(&key.category)
        .bind(key.platform.as_str())
        .bind(username)
        .bind(raw.followers)
        .bind(raw.activities)
        .bind(raw.nilai_aktifitas)
        .bind(raw.interactions)
        .bind(raw.responsiveness)
        .execute(pool)
        .await?;

    Ok(())
}

/// Writes all normalized, weighted and final score columns for one key in a
/// single statement. If the row does not exist yet its raw columns take
/// their defaults.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_scores(
    pool: &PgPool,
    granularity: Granularity,
    key: &ScoreKey,
    username: &str,
    composed: &ComposedScore,
) -> Result<(), DbError> {
    let table = score_table(granularity);
    let sql = format!(
        "INSERT INTO {table} \
             (list_id, date, category, platform, username, \
              followers_score, activities_score, interactions_score, responsiveness_score, \
              followers_weighted, activities_weighted, interactions_weighted, responsiveness_weighted, \
              fair_score, scored_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW()) \
         ON CONFLICT (list_id, date, category, platform) DO UPDATE SET \
             followers_score = EXCLUDED.followers_score, \
             activities_score = EXCLUDED.activities_score, \
             interactions_score = EXCLUDED.interactions_score, \
             responsiveness_score = EXCLUDED.responsiveness_score, \
             followers_weighted = EXCLUDED.followers_weighted, \
             activities_weighted = EXCLUDED.activities_weighted, \
             interactions_weighted = EXCLUDED.interactions_weighted, \
             responsiveness_weighted = EXCLUDED.responsiveness_weighted, \
             fair_score = EXCLUDED.fair_score, \
             scored_at = NOW()"
    );

    sqlx::query(&sql)
        .bind(key.list_id)
        .bind(key.date)
        .bind(&key.category)
        .bind(key.platform.as_str())
        .bind(username)
        .bind(composed.scores.followers)
        .bind(composed.scores.activities)
        .bind(composed.scores.interactions)
        .bind(composed.scores.responsiveness)
        .bind(composed.weighted.followers)
        .bind(composed.weighted.activities)
        .bind(composed.weighted.interactions)
        .bind(composed.weighted.responsiveness)
        .bind(composed.fair_score)
        .execute(pool)
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_score_row(
    pool: &PgPool,
    granularity: Granularity,
    key: &ScoreKey,
) -> Result<Option<ScoreRow>, DbError> {
    let table = score_table(granularity);
    let sql = format!(
        "SELECT {SCORE_COLUMNS} FROM {table} \
         WHERE list_id = $1 AND date = $2 AND category = $3 AND platform = $4"
    );

    let row = sqlx::query_as::<_, ScoreRow>(&sql)
        .bind(key.list_id)
        .bind(key.date)
        .bind(&key.category)
        .bind(key.platform.as_str())
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Scored rows of one peer group, highest `fair_score` first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_score_rows(
    pool: &PgPool,
    granularity: Granularity,
    category: &str,
    platform: Platform,
    date: NaiveDate,
) -> Result<Vec<ScoreRow>, DbError> {
    let table = score_table(granularity);
    let sql = format!(
        "SELECT {SCORE_COLUMNS} FROM {table} \
         WHERE category = $1 AND platform = $2 AND date = $3 AND fair_score IS NOT NULL \
         ORDER BY fair_score DESC, username"
    );

    let rows = sqlx::query_as::<_, ScoreRow>(&sql)
        .bind(category)
        .bind(platform.as_str())
        .bind(date)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Most recent date in `[start, end]` that has at least one scored row for
/// the peer group.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_scored_date(
    pool: &PgPool,
    granularity: Granularity,
    category: &str,
    platform: Platform,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Option<NaiveDate>, DbError> {
    let table = score_table(granularity);
    let sql = format!(
        "SELECT MAX(date) FROM {table} \
         WHERE category = $1 AND platform = $2 AND date BETWEEN $3 AND $4 \
           AND fair_score IS NOT NULL"
    );

    let date = sqlx::query_scalar::<_, Option<NaiveDate>>(&sql)
        .bind(category)
        .bind(platform.as_str())
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

    Ok(date)
}
