//! Database operations for the `posts` table.
//!
//! Calendar-date filters convert `created_at` into the caller's reporting
//! time zone before truncating, so a post made at 23:30 local time lands on
//! that local date regardless of the server zone.

use chrono::{DateTime, NaiveDate, Utc};
use fairscore_core::{MembershipSet, Platform};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Input for [`upsert_post`].
#[derive(Debug, Clone)]
pub struct NewPost {
    pub account_id: i64,
    pub platform: Platform,
    pub source_post_id: String,
    pub username: String,
    pub categories: MembershipSet,
    pub client_accounts: MembershipSet,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub plays: i64,
    /// Follower count captured alongside the post, when the source has one.
    pub followers: Option<i64>,
    pub caption: Option<String>,
    pub permalink: Option<String>,
}

/// The subset of a post the metric extractor reads.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostFactRow {
    pub id: i64,
    pub source_post_id: String,
    pub created_at: DateTime<Utc>,
    /// `created_at` as a calendar date in the reporting time zone.
    pub local_date: NaiveDate,
    pub likes: i64,
    pub comments: i64,
    pub followers: Option<i64>,
    pub responsiveness: Option<f64>,
}

/// A post selected for per-post responsiveness computation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingPostRow {
    pub id: i64,
    pub platform: String,
    pub source_post_id: String,
    pub username: String,
    pub comments: i64,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts or refreshes a post and returns its internal `id`.
///
/// Engagement counters are overwritten with the latest values; category and
/// client-account tags are merged by union. A post whose comment counter
/// changed is flagged for responsiveness recomputation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_post(pool: &PgPool, post: &NewPost) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO posts \
             (account_id, platform, source_post_id, username, categories, client_accounts, \
              created_at, likes, comments, shares, plays, followers, caption, permalink) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (platform, source_post_id) DO UPDATE SET \
             categories = ARRAY( \
                 SELECT DISTINCT t FROM unnest(posts.categories || EXCLUDED.categories) AS t \
                 ORDER BY t), \
             client_accounts = ARRAY( \
                 SELECT DISTINCT t FROM unnest(posts.client_accounts || EXCLUDED.client_accounts) AS t \
                 ORDER BY t), \
             likes = EXCLUDED.likes, \
             comments = EXCLUDED.comments, \
             shares = EXCLUDED.shares, \
             plays = EXCLUDED.plays, \
             followers = COALESCE(EXCLUDED.followers, posts.followers), \
             caption = COALESCE(EXCLUDED.caption, posts.caption), \
             permalink = COALESCE(EXCLUDED.permalink, posts.permalink), \
             responsiveness_processed = \
                 posts.responsiveness_processed AND posts.comments = EXCLUDED.comments, \
             fetched_at = NOW() \
         RETURNING id",
    )
    .bind(post.account_id)
    .bind(post.platform.as_str())
    .bind(&post.source_post_id)
    .bind(&post.username)
    .bind(post.categories.to_vec())
    .bind(post.client_accounts.to_vec())
    .bind(post.created_at)
    .bind(post.likes)
    .bind(post.comments)
    .bind(post.shares)
    .bind(post.plays)
    .bind(post.followers)
    .bind(post.caption.as_deref())
    .bind(post.permalink.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Stores a per-post responsiveness value (or NULL) and marks it processed.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no post has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_post_responsiveness(
    pool: &PgPool,
    post_id: i64,
    responsiveness: Option<f64>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE posts \
         SET responsiveness = $1, responsiveness_processed = true \
         WHERE id = $2",
    )
    .bind(responsiveness)
    .bind(post_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Posts by one account, tagged with `category`, whose local creation date
/// falls in `[start, end]`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn posts_in_window(
    pool: &PgPool,
    account_id: i64,
    category: &str,
    start: NaiveDate,
    end: NaiveDate,
    tz: &str,
) -> Result<Vec<PostFactRow>, DbError> {
    let rows = sqlx::query_as::<_, PostFactRow>(
        "SELECT id, source_post_id, created_at, (created_at AT TIME ZONE $5)::date AS local_date, \
                likes, comments, followers, responsiveness \
         FROM posts \
         WHERE account_id = $1 \
           AND $2 = ANY(categories) \
           AND (created_at AT TIME ZONE $5)::date BETWEEN $3 AND $4 \
         ORDER BY created_at, id",
    )
    .bind(account_id)
    .bind(category)
    .bind(start)
    .bind(end)
    .bind(tz)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Follower count attached to the account's most recent `category` post on
/// or before `as_of`, or `None` when no such post carries a snapshot.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_follower_snapshot(
    pool: &PgPool,
    account_id: i64,
    category: &str,
    as_of: NaiveDate,
    tz: &str,
) -> Result<Option<i64>, DbError> {
    let followers = sqlx::query_scalar::<_, i64>(
        "SELECT followers \
         FROM posts \
         WHERE account_id = $1 \
           AND $2 = ANY(categories) \
           AND followers IS NOT NULL \
           AND (created_at AT TIME ZONE $4)::date <= $3 \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(account_id)
    .bind(category)
    .bind(as_of)
    .bind(tz)
    .fetch_optional(pool)
    .await?;

    Ok(followers)
}

/// Posts in `category` with at least one comment, never processed, and
/// created after `since` (local date).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn posts_needing_responsiveness(
    pool: &PgPool,
    category: &str,
    since: NaiveDate,
    tz: &str,
) -> Result<Vec<PendingPostRow>, DbError> {
    let rows = sqlx::query_as::<_, PendingPostRow>(
        "SELECT id, platform, source_post_id, username, comments \
         FROM posts \
         WHERE $1 = ANY(categories) \
           AND comments > 0 \
           AND responsiveness_processed = false \
           AND (created_at AT TIME ZONE $3)::date > $2 \
         ORDER BY created_at, id",
    )
    .bind(category)
    .bind(since)
    .bind(tz)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every post in `category` with at least one comment whose local creation
/// date falls in `[start, end]`, processed or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn posts_with_comments_in_window(
    pool: &PgPool,
    category: &str,
    start: NaiveDate,
    end: NaiveDate,
    tz: &str,
) -> Result<Vec<PendingPostRow>, DbError> {
    let rows = sqlx::query_as::<_, PendingPostRow>(
        "SELECT id, platform, source_post_id, username, comments \
         FROM posts \
         WHERE $1 = ANY(categories) \
           AND comments > 0 \
           AND (created_at AT TIME ZONE $4)::date BETWEEN $2 AND $3 \
         ORDER BY created_at, id",
    )
    .bind(category)
    .bind(start)
    .bind(end)
    .bind(tz)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
