//! Store traits the scoring engine depends on.
//!
//! The orchestrator, extractor and backfill only see these traits, so tests
//! drive them with an in-memory store and production wires in `PgStore`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fairscore_core::{
    Account, ComposedScore, DateWindow, Granularity, Platform, RawMetrics, ScoreKey,
};
use fairscore_db::DbError;
use fairscore_source::{RawChildComment, RawComment, RawPost, RawProfile};
use thiserror::Error;

use crate::responsiveness::BackfillScope;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("{0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Fact types
// ---------------------------------------------------------------------------

/// One post as the metric extractor sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFact {
    pub id: i64,
    pub source_post_id: String,
    pub created_at: DateTime<Utc>,
    /// Calendar date of `created_at` in the reporting time zone.
    pub local_date: NaiveDate,
    pub likes: i64,
    pub comments: i64,
    pub followers: Option<i64>,
    /// Cached per-post responsiveness, `None` when degenerate or not yet computed.
    pub responsiveness: Option<f64>,
}

/// Incoming comments and owner replies summed over a set of posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentTotals {
    pub incoming: i64,
    pub owner_replies: i64,
}

/// A post selected for per-post responsiveness computation.
#[derive(Debug, Clone, PartialEq)]
pub struct BackfillPost {
    pub id: i64,
    pub platform: Platform,
    pub source_post_id: String,
    pub owner_username: String,
    /// The post's own comment counter, used as the incoming count.
    pub comments: i64,
}

// ---------------------------------------------------------------------------
// AccountRegistry
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// Tracked accounts in one peer group.
    async fn list_accounts(
        &self,
        category: &str,
        platform: Platform,
    ) -> Result<Vec<Account>, StoreError>;

    /// Every category with at least one tracked account.
    async fn list_categories(&self) -> Result<Vec<String>, StoreError>;
}

// ---------------------------------------------------------------------------
// PostStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PostStore: Send + Sync {
    /// The account's posts tagged with `category` in `window`.
    async fn posts_in_window(
        &self,
        account: &Account,
        category: &str,
        window: &DateWindow,
    ) -> Result<Vec<PostFact>, StoreError>;

    /// Follower snapshot from the latest `category` post on or before `as_of`.
    async fn latest_follower_snapshot(
        &self,
        account: &Account,
        category: &str,
        as_of: NaiveDate,
    ) -> Result<Option<i64>, StoreError>;

    async fn posts_for_backfill(
        &self,
        scope: &BackfillScope,
    ) -> Result<Vec<BackfillPost>, StoreError>;

    async fn set_post_responsiveness(
        &self,
        post_id: i64,
        responsiveness: Option<f64>,
    ) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// CommentStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Stored main and child comments on one post.
    async fn incoming_count(
        &self,
        platform: Platform,
        source_post_id: &str,
    ) -> Result<i64, StoreError>;

    /// Stored main and child comments on one post written by its owner.
    async fn own_reply_count(
        &self,
        platform: Platform,
        source_post_id: &str,
        owner_username: &str,
    ) -> Result<i64, StoreError>;

    /// Both counts summed over several posts in one round trip.
    async fn comment_totals(
        &self,
        platform: Platform,
        source_post_ids: &[String],
        owner_username: &str,
    ) -> Result<CommentTotals, StoreError>;
}

// ---------------------------------------------------------------------------
// ScoreStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn upsert_raw_metrics(
        &self,
        granularity: Granularity,
        key: &ScoreKey,
        username: &str,
        raw: &RawMetrics,
    ) -> Result<(), StoreError>;

    async fn upsert_scores(
        &self,
        granularity: Granularity,
        key: &ScoreKey,
        username: &str,
        composed: &ComposedScore,
    ) -> Result<(), StoreError>;
}

/// Everything a scoring run needs.
pub trait FairStore: AccountRegistry + PostStore + CommentStore + ScoreStore {}

impl<T> FairStore for T where T: AccountRegistry + PostStore + CommentStore + ScoreStore {}

// ---------------------------------------------------------------------------
// IngestStore
// ---------------------------------------------------------------------------

/// Write side used when folding fetched engagement into storage.
#[async_trait]
pub trait IngestStore: Send + Sync {
    async fn update_profile(&self, account: &Account, profile: &RawProfile)
        -> Result<(), StoreError>;

    /// Upserts a post tagged with the account's categories; returns its id.
    async fn upsert_post(&self, account: &Account, post: &RawPost) -> Result<i64, StoreError>;

    async fn upsert_comment(
        &self,
        platform: Platform,
        comment: &RawComment,
    ) -> Result<(), StoreError>;

    async fn upsert_child_comment(
        &self,
        platform: Platform,
        child: &RawChildComment,
    ) -> Result<(), StoreError>;
}
