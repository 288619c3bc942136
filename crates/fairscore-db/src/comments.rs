//! Database operations for `main_comments` and `child_comments`.

use chrono::{DateTime, Utc};
use fairscore_core::Platform;
use sqlx::PgPool;

use crate::DbError;

/// Comment totals across a set of posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct CommentTotalsRow {
    pub incoming: i64,
    pub owner_replies: i64,
}

#[derive(Debug, Clone)]
pub struct NewMainComment {
    pub platform: Platform,
    pub source_comment_id: String,
    pub source_post_id: String,
    pub commenter_username: String,
    pub body: Option<String>,
    pub like_count: i64,
    pub reply_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewChildComment {
    pub platform: Platform,
    pub source_child_comment_id: String,
    pub source_comment_id: String,
    pub source_post_id: String,
    pub replier_username: String,
    pub body: Option<String>,
    pub like_count: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_main_comment(pool: &PgPool, comment: &NewMainComment) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO main_comments \
             (platform, source_comment_id, source_post_id, commenter_username, body, \
              like_count, reply_count, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (platform, source_comment_id) DO UPDATE SET \
             body = COALESCE(EXCLUDED.body, main_comments.body), \
             like_count = EXCLUDED.like_count, \
             reply_count = EXCLUDED.reply_count, \
             fetched_at = NOW()",
    )
    .bind(comment.platform.as_str())
    .bind(&comment.source_comment_id)
    .bind(&comment.source_post_id)
    .bind(&comment.commenter_username)
    .bind(comment.body.as_deref())
    .bind(comment.like_count)
    .bind(comment.reply_count)
    .bind(comment.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_child_comment(
    pool: &PgPool,
    comment: &NewChildComment,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO child_comments \
             (platform, source_child_comment_id, source_comment_id, source_post_id, \
              replier_username, body, like_count, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (platform, source_child_comment_id) DO UPDATE SET \
             body = COALESCE(EXCLUDED.body, child_comments.body), \
             like_count = EXCLUDED.like_count, \
             fetched_at = NOW()",
    )
    .bind(comment.platform.as_str())
    .bind(&comment.source_child_comment_id)
    .bind(&comment.source_comment_id)
    .bind(&comment.source_post_id)
    .bind(&comment.replier_username)
    .bind(comment.body.as_deref())
    .bind(comment.like_count)
    .bind(comment.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Stored main plus child comments on one post.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_comments_on_post(
    pool: &PgPool,
    platform: Platform,
    source_post_id: &str,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT \
             (SELECT COUNT(*) FROM main_comments WHERE platform = $1 AND source_post_id = $2) + \
             (SELECT COUNT(*) FROM child_comments WHERE platform = $1 AND source_post_id = $2)",
    )
    .bind(platform.as_str())
    .bind(source_post_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Main and child comments on one post written by `owner_username`
/// (case-insensitive).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_owner_replies(
    pool: &PgPool,
    platform: Platform,
    source_post_id: &str,
    owner_username: &str,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT \
             (SELECT COUNT(*) FROM main_comments \
              WHERE platform = $1 AND source_post_id = $2 \
                AND LOWER(commenter_username) = LOWER($3)) + \
             (SELECT COUNT(*) FROM child_comments \
              WHERE platform = $1 AND source_post_id = $2 \
                AND LOWER(replier_username) = LOWER($3))",
    )
    .bind(platform.as_str())
    .bind(source_post_id)
    .bind(owner_username)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Main plus child comments on every post in `source_post_ids`, and how many
/// of them `owner_username` wrote (case-insensitive), in one round trip.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn comment_totals(
    pool: &PgPool,
    platform: Platform,
    source_post_ids: &[String],
    owner_username: &str,
) -> Result<CommentTotalsRow, DbError> {
    if source_post_ids.is_empty() {
        return Ok(CommentTotalsRow::default());
    }

    let totals = sqlx::query_as::<_, CommentTotalsRow>(
        "WITH authors AS ( \
             SELECT commenter_username AS author FROM main_comments \
             WHERE platform = $1 AND source_post_id = ANY($2) \
             UNION ALL \
             SELECT replier_username FROM child_comments \
             WHERE platform = $1 AND source_post_id = ANY($2) \
         ) \
         SELECT COUNT(*) AS incoming, \
                COUNT(*) FILTER (WHERE LOWER(author) = LOWER($3)) AS owner_replies \
         FROM authors",
    )
    .bind(platform.as_str())
    .bind(source_post_ids)
    .bind(owner_username)
    .fetch_one(pool)
    .await?;

    Ok(totals)
}
