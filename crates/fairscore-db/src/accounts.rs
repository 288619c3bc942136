//! Database operations for the `accounts` table.

use chrono::{DateTime, Utc};
use fairscore_core::{Account, MembershipSet, Platform};
use sqlx::PgPool;

use crate::DbError;

const ACCOUNT_COLUMNS: &str = "id, platform, username, categories, client_accounts, \
     source_user_id, followers, following, media_count, is_active, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub platform: String,
    pub username: String,
    pub categories: Vec<String>,
    pub client_accounts: Vec<String>,
    pub source_user_id: Option<String>,
    pub followers: i64,
    pub following: i64,
    pub media_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DbError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            platform: row.platform.parse()?,
            username: row.username,
            categories: MembershipSet::from(row.categories),
            client_accounts: MembershipSet::from(row.client_accounts),
            followers: row.followers,
            following: row.following,
        })
    }
}

/// Latest profile counters reported by the data source.
#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    pub source_user_id: Option<String>,
    pub followers: i64,
    pub following: i64,
    pub media_count: i64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Creates the account if needed and folds `categories` and
/// `client_accounts` into its existing sets.
///
/// Existing tags are never removed, so repeating the call is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn add_membership(
    pool: &PgPool,
    platform: Platform,
    username: &str,
    categories: &MembershipSet,
    client_accounts: &MembershipSet,
) -> Result<AccountRow, DbError> {
    let sql = format!(
        "INSERT INTO accounts (platform, username, categories, client_accounts) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (platform, username) DO UPDATE SET \
             categories = ARRAY( \
                 SELECT DISTINCT t FROM unnest(accounts.categories || EXCLUDED.categories) AS t \
                 ORDER BY t), \
             client_accounts = ARRAY( \
                 SELECT DISTINCT t FROM unnest(accounts.client_accounts || EXCLUDED.client_accounts) AS t \
                 ORDER BY t), \
             is_active = true, \
             updated_at = NOW() \
         RETURNING {ACCOUNT_COLUMNS}"
    );

    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(platform.as_str())
        .bind(username)
        .bind(categories.to_vec())
        .bind(client_accounts.to_vec())
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Returns active accounts, optionally restricted to one category and/or
/// platform, ordered by platform then username.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_accounts(
    pool: &PgPool,
    category: Option<&str>,
    platform: Option<Platform>,
) -> Result<Vec<AccountRow>, DbError> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} \
         FROM accounts \
         WHERE is_active = true \
           AND ($1::text IS NULL OR $1 = ANY(categories)) \
           AND ($2::text IS NULL OR platform = $2) \
         ORDER BY platform, username"
    );

    let rows = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(category)
        .bind(platform.map(Platform::as_str))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns a single account by `(platform, username)`, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_account(
    pool: &PgPool,
    platform: Platform,
    username: &str,
) -> Result<Option<AccountRow>, DbError> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE platform = $1 AND username = $2"
    );

    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(platform.as_str())
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Every category any active account belongs to, sorted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category \
         FROM accounts, unnest(categories) AS category \
         WHERE is_active = true \
         ORDER BY category",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Overwrites the follower/following/media counters with the latest snapshot.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no account has the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_profile(
    pool: &PgPool,
    account_id: i64,
    profile: &ProfileSnapshot,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE accounts \
         SET source_user_id = COALESCE($1, source_user_id), \
             followers = $2, following = $3, media_count = $4, updated_at = NOW() \
         WHERE id = $5",
    )
    .bind(profile.source_user_id.as_deref())
    .bind(profile.followers)
    .bind(profile.following)
    .bind(profile.media_count)
    .bind(account_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
