//! Folds engagement fetched from the data source into storage.

use std::collections::BTreeMap;

use fairscore_core::{Account, DateWindow, Platform};
use fairscore_source::{EngagementBundle, EngagementSource};
use serde::Serialize;

use crate::error::EngineError;
use crate::store::{AccountRegistry, IngestStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub window: DateWindow,
    pub category: Option<String>,
    pub platform: Option<Platform>,
    /// Fetch and count without writing anything.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub accounts_processed: usize,
    pub accounts_failed: usize,
    pub posts: usize,
    pub comments: usize,
    pub child_comments: usize,
}

impl IngestSummary {
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.accounts_processed == 0 && self.accounts_failed > 0
    }
}

/// Fetches and stores engagement for every tracked account the request
/// selects. Accounts in several selected categories are fetched once.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] when no category or platform can
/// be resolved, or the account registry cannot be read. Failures for a
/// single account are logged and counted.
pub async fn ingest<S, C>(
    store: &S,
    source: &C,
    request: &IngestRequest,
    default_platforms: &[Platform],
) -> Result<IngestSummary, EngineError>
where
    S: AccountRegistry + IngestStore + ?Sized,
    C: EngagementSource + ?Sized,
{
    let accounts = select_accounts(store, request, default_platforms).await?;
    let mut summary = IngestSummary::default();

    tracing::info!(
        window = %request.window,
        accounts = accounts.len(),
        dry_run = request.dry_run,
        "starting ingest"
    );

    for account in accounts.values() {
        match ingest_account(store, source, account, request).await {
            Ok(counts) => {
                summary.accounts_processed += 1;
                summary.posts += counts.posts;
                summary.comments += counts.comments;
                summary.child_comments += counts.child_comments;
            }
            Err(e) => {
                summary.accounts_failed += 1;
                tracing::warn!(
                    platform = %account.platform,
                    username = %account.username,
                    error = %e,
                    "ingest failed for account; continuing"
                );
            }
        }
    }

    tracing::info!(
        processed = summary.accounts_processed,
        failed = summary.accounts_failed,
        posts = summary.posts,
        "ingest finished"
    );

    Ok(summary)
}

async fn select_accounts<S>(
    store: &S,
    request: &IngestRequest,
    default_platforms: &[Platform],
) -> Result<BTreeMap<i64, Account>, EngineError>
where
    S: AccountRegistry + ?Sized,
{
    let categories = match request.category.as_deref().map(str::trim) {
        Some("") => {
            return Err(EngineError::Configuration(
                "category must not be blank".to_string(),
            ))
        }
        Some(category) => vec![category.to_string()],
        None => store.list_categories().await.map_err(|e| {
            EngineError::Configuration(format!("cannot resolve categories: {e}"))
        })?,
    };
    let platforms = match request.platform {
        Some(platform) => vec![platform],
        None => default_platforms.to_vec(),
    };
    if categories.is_empty() || platforms.is_empty() {
        return Err(EngineError::Configuration(
            "nothing to ingest: no categories or platforms".to_string(),
        ));
    }

    let mut accounts = BTreeMap::new();
    for category in &categories {
        for &platform in &platforms {
            let listed = store.list_accounts(category, platform).await.map_err(|e| {
                EngineError::Configuration(format!(
                    "cannot list accounts for {category}/{platform}: {e}"
                ))
            })?;
            for account in listed {
                accounts.entry(account.id).or_insert(account);
            }
        }
    }
    Ok(accounts)
}

async fn ingest_account<S, C>(
    store: &S,
    source: &C,
    account: &Account,
    request: &IngestRequest,
) -> Result<IngestSummary, EngineError>
where
    S: IngestStore + ?Sized,
    C: EngagementSource + ?Sized,
{
    let bundle = source
        .fetch_engagement(account.platform, &account.username, &request.window)
        .await
        .map_err(|e| EngineError::fetch(format!("{}/{}", account.platform, account.username), e))?;

    let counts = IngestSummary {
        accounts_processed: 1,
        accounts_failed: 0,
        posts: bundle.posts.len(),
        comments: bundle.comments.len(),
        child_comments: bundle.child_comments.len(),
    };

    if request.dry_run {
        tracing::info!(
            username = %account.username,
            posts = counts.posts,
            comments = counts.comments,
            "dry run: nothing written"
        );
        return Ok(counts);
    }

    store_bundle(store, account, bundle).await?;
    Ok(counts)
}

async fn store_bundle<S>(
    store: &S,
    account: &Account,
    mut bundle: EngagementBundle,
) -> Result<(), EngineError>
where
    S: IngestStore + ?Sized,
{
    let persist = |what: &str, e: StoreError| {
        EngineError::persistence(format!("{what} for {}", account.username), e)
    };

    store
        .update_profile(account, &bundle.profile)
        .await
        .map_err(|e| persist("profile", e))?;

    // Posts without their own snapshot take the profile's follower count.
    let profile_followers = (bundle.profile.followers > 0).then_some(bundle.profile.followers);
    for post in &mut bundle.posts {
        if post.followers.is_none() {
            post.followers = profile_followers;
        }
        store
            .upsert_post(account, post)
            .await
            .map_err(|e| persist("post", e))?;
    }

    for comment in &bundle.comments {
        store
            .upsert_comment(account.platform, comment)
            .await
            .map_err(|e| persist("comment", e))?;
    }
    for child in &bundle.child_comments {
        store
            .upsert_child_comment(account.platform, child)
            .await
            .map_err(|e| persist("reply", e))?;
    }

    Ok(())
}
