//! Postgres-backed implementation of the engine's store traits.

use async_trait::async_trait;
use chrono::NaiveDate;
use fairscore_core::{Account, ComposedScore, DateWindow, Granularity, Platform, RawMetrics, ScoreKey};
use fairscore_db::{
    DbError, NewChildComment, NewMainComment, NewPost, PendingPostRow, PostFactRow,
    ProfileSnapshot,
};
use fairscore_source::{RawChildComment, RawComment, RawPost, RawProfile};
use sqlx::PgPool;

use crate::responsiveness::BackfillScope;
use crate::store::{
    AccountRegistry, BackfillPost, CommentStore, CommentTotals, IngestStore, PostFact, PostStore,
    ScoreStore, StoreError,
};

/// Store over a shared pool. Post dates are bucketed in `tz`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    tz: String,
}

impl PgStore {
    pub fn new(pool: PgPool, tz: impl Into<String>) -> Self {
        Self {
            pool,
            tz: tz.into(),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[must_use]
    pub fn timezone(&self) -> &str {
        &self.tz
    }
}

fn to_fact(row: PostFactRow) -> PostFact {
    PostFact {
        id: row.id,
        source_post_id: row.source_post_id,
        created_at: row.created_at,
        local_date: row.local_date,
        likes: row.likes,
        comments: row.comments,
        followers: row.followers,
        responsiveness: row.responsiveness,
    }
}

fn to_backfill(row: PendingPostRow) -> Result<BackfillPost, StoreError> {
    let platform: Platform = row.platform.parse().map_err(DbError::from)?;
    Ok(BackfillPost {
        id: row.id,
        platform,
        source_post_id: row.source_post_id,
        owner_username: row.username,
        comments: row.comments,
    })
}

#[async_trait]
impl AccountRegistry for PgStore {
    async fn list_accounts(
        &self,
        category: &str,
        platform: Platform,
    ) -> Result<Vec<Account>, StoreError> {
        let rows = fairscore_db::list_accounts(&self.pool, Some(category), Some(platform)).await?;
        let accounts = rows
            .into_iter()
            .map(Account::try_from)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(accounts)
    }

    async fn list_categories(&self) -> Result<Vec<String>, StoreError> {
        Ok(fairscore_db::list_categories(&self.pool).await?)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn posts_in_window(
        &self,
        account: &Account,
        category: &str,
        window: &DateWindow,
    ) -> Result<Vec<PostFact>, StoreError> {
        let rows = fairscore_db::posts_in_window(
            &self.pool,
            account.id,
            category,
            window.start,
            window.end,
            &self.tz,
        )
        .await?;
        Ok(rows.into_iter().map(to_fact).collect())
    }

    async fn latest_follower_snapshot(
        &self,
        account: &Account,
        category: &str,
        as_of: NaiveDate,
    ) -> Result<Option<i64>, StoreError> {
        Ok(fairscore_db::latest_follower_snapshot(
            &self.pool, account.id, category, as_of, &self.tz,
        )
        .await?)
    }

    async fn posts_for_backfill(
        &self,
        scope: &BackfillScope,
    ) -> Result<Vec<BackfillPost>, StoreError> {
        let rows = match scope {
            BackfillScope::Pending { category, since } => {
                fairscore_db::posts_needing_responsiveness(&self.pool, category, *since, &self.tz)
                    .await?
            }
            BackfillScope::Window { category, window } => {
                fairscore_db::posts_with_comments_in_window(
                    &self.pool,
                    category,
                    window.start,
                    window.end,
                    &self.tz,
                )
                .await?
            }
        };
        rows.into_iter().map(to_backfill).collect()
    }

    async fn set_post_responsiveness(
        &self,
        post_id: i64,
        responsiveness: Option<f64>,
    ) -> Result<(), StoreError> {
        Ok(fairscore_db::set_post_responsiveness(&self.pool, post_id, responsiveness).await?)
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn incoming_count(
        &self,
        platform: Platform,
        source_post_id: &str,
    ) -> Result<i64, StoreError> {
        Ok(fairscore_db::count_comments_on_post(&self.pool, platform, source_post_id).await?)
    }

    async fn own_reply_count(
        &self,
        platform: Platform,
        source_post_id: &str,
        owner_username: &str,
    ) -> Result<i64, StoreError> {
        Ok(
            fairscore_db::count_owner_replies(&self.pool, platform, source_post_id, owner_username)
                .await?,
        )
    }

    async fn comment_totals(
        &self,
        platform: Platform,
        source_post_ids: &[String],
        owner_username: &str,
    ) -> Result<CommentTotals, StoreError> {
        let row =
            fairscore_db::comment_totals(&self.pool, platform, source_post_ids, owner_username)
                .await?;
        Ok(CommentTotals {
            incoming: row.incoming,
            owner_replies: row.owner_replies,
        })
    }
}

#[async_trait]
impl ScoreStore for PgStore {
    async fn upsert_raw_metrics(
        &self,
        granularity: Granularity,
        key: &ScoreKey,
        username: &str,
        raw: &RawMetrics,
    ) -> Result<(), StoreError> {
        Ok(fairscore_db::upsert_raw_metrics(&self.pool, granularity, key, username, raw).await?)
    }

    async fn upsert_scores(
        &self,
        granularity: Granularity,
        key: &ScoreKey,
        username: &str,
        composed: &ComposedScore,
    ) -> Result<(), StoreError> {
        Ok(fairscore_db::upsert_scores(&self.pool, granularity, key, username, composed).await?)
    }
}

#[async_trait]
impl IngestStore for PgStore {
    async fn update_profile(
        &self,
        account: &Account,
        profile: &RawProfile,
    ) -> Result<(), StoreError> {
        let snapshot = ProfileSnapshot {
            source_user_id: profile.user_id.clone(),
            followers: profile.followers,
            following: profile.following,
            media_count: profile.media_count,
        };
        Ok(fairscore_db::update_profile(&self.pool, account.id, &snapshot).await?)
    }

    async fn upsert_post(&self, account: &Account, post: &RawPost) -> Result<i64, StoreError> {
        let new_post = NewPost {
            account_id: account.id,
            platform: account.platform,
            source_post_id: post.id.clone(),
            username: account.username.clone(),
            categories: account.categories.clone(),
            client_accounts: account.client_accounts.clone(),
            created_at: post.created_at,
            likes: post.likes,
            comments: post.comments,
            shares: post.shares,
            plays: post.plays,
            followers: post.followers,
            caption: post.caption.clone(),
            permalink: post.permalink.clone(),
        };
        Ok(fairscore_db::upsert_post(&self.pool, &new_post).await?)
    }

    async fn upsert_comment(
        &self,
        platform: Platform,
        comment: &RawComment,
    ) -> Result<(), StoreError> {
        let row = NewMainComment {
            platform,
            source_comment_id: comment.id.clone(),
            source_post_id: comment.post_id.clone(),
            commenter_username: comment.username.clone(),
            body: comment.text.clone(),
            like_count: comment.like_count,
            reply_count: comment.reply_count,
            created_at: comment.created_at,
        };
        Ok(fairscore_db::upsert_main_comment(&self.pool, &row).await?)
    }

    async fn upsert_child_comment(
        &self,
        platform: Platform,
        child: &RawChildComment,
    ) -> Result<(), StoreError> {
        let row = NewChildComment {
            platform,
            source_child_comment_id: child.id.clone(),
            source_comment_id: child.comment_id.clone(),
            source_post_id: child.post_id.clone(),
            replier_username: child.username.clone(),
            body: child.text.clone(),
            like_count: child.like_count,
            created_at: child.created_at,
        };
        Ok(fairscore_db::upsert_child_comment(&self.pool, &row).await?)
    }
}
