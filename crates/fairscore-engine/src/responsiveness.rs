//! Per-post responsiveness backfill.
//!
//! Computes how much of a post's comment traffic the owner answered and
//! caches it on the post. The daily and monthly passes average these cached
//! values, so a backfill over the run's window must finish first.

use chrono::NaiveDate;
use fairscore_core::DateWindow;

use crate::error::EngineError;
use crate::store::{BackfillPost, CommentStore, PostStore};

/// Which posts a backfill touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillScope {
    /// Posts with comments that were never processed, created after `since`.
    Pending { category: String, since: NaiveDate },
    /// Every post with comments created inside `window`, processed or not.
    Window { category: String, window: DateWindow },
}

impl BackfillScope {
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            BackfillScope::Pending { category, .. } | BackfillScope::Window { category, .. } => {
                category
            }
        }
    }
}

impl std::fmt::Display for BackfillScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackfillScope::Pending { category, since } => {
                write!(f, "{category} pending since {since}")
            }
            BackfillScope::Window { category, window } => write!(f, "{category} {window}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub posts_seen: usize,
    pub posts_updated: usize,
    pub posts_failed: usize,
    /// Posts stored with no value because the ratio was undefined.
    pub nulls: usize,
}

/// `replies / (incoming − replies) × 100`.
///
/// `None` when there is no incoming traffic or the owner's replies account
/// for all of it (or more). A fully answered thread is not reported as 100.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn post_responsiveness(incoming: i64, replies: i64) -> Option<f64> {
    if incoming <= 0 || incoming <= replies {
        return None;
    }
    Some(replies as f64 / (incoming - replies) as f64 * 100.0)
}

/// Recomputes and stores per-post responsiveness for every post in `scope`.
///
/// # Errors
///
/// Returns [`EngineError::UpstreamFetch`] when the post list itself cannot
/// be loaded. Failures on individual posts are logged and counted.
pub async fn backfill_responsiveness<S>(
    store: &S,
    scope: &BackfillScope,
) -> Result<BackfillSummary, EngineError>
where
    S: PostStore + CommentStore + ?Sized,
{
    let posts = store
        .posts_for_backfill(scope)
        .await
        .map_err(|e| EngineError::upstream(format!("backfill {scope}"), e))?;

    let mut summary = BackfillSummary {
        posts_seen: posts.len(),
        ..BackfillSummary::default()
    };

    for post in &posts {
        match backfill_one(store, post).await {
            Ok(value) => {
                summary.posts_updated += 1;
                if value.is_none() {
                    summary.nulls += 1;
                }
            }
            Err(e) => {
                summary.posts_failed += 1;
                tracing::warn!(
                    post_id = post.id,
                    source_post_id = %post.source_post_id,
                    platform = %post.platform,
                    error = %e,
                    "responsiveness backfill failed for post"
                );
            }
        }
    }

    tracing::info!(
        scope = %scope,
        seen = summary.posts_seen,
        updated = summary.posts_updated,
        failed = summary.posts_failed,
        "responsiveness backfill finished"
    );

    Ok(summary)
}

async fn backfill_one<S>(store: &S, post: &BackfillPost) -> Result<Option<f64>, EngineError>
where
    S: PostStore + CommentStore + ?Sized,
{
    let replies = store
        .own_reply_count(post.platform, &post.source_post_id, &post.owner_username)
        .await
        .map_err(|e| EngineError::upstream(format!("replies on {}", post.source_post_id), e))?;

    let value = post_responsiveness(post.comments, replies);

    store
        .set_post_responsiveness(post.id, value)
        .await
        .map_err(|e| EngineError::persistence(format!("post {}", post.id), e))?;

    Ok(value)
}
