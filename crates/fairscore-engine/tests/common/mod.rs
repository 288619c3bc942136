//! In-memory store implementing every engine trait, with failure injection
//! and a write log for ordering assertions.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use fairscore_core::{
    Account, ComposedScore, DateWindow, Granularity, MembershipSet, Platform, RawMetrics,
    ScoreKey,
};
use fairscore_engine::{
    AccountRegistry, BackfillPost, BackfillScope, CommentStore, CommentTotals, IngestStore,
    PostFact, PostStore, ScoreStore, StoreError,
};
use fairscore_source::{RawChildComment, RawComment, RawPost, RawProfile};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Debug, Clone)]
pub struct StoredPost {
    pub account_id: i64,
    pub platform: Platform,
    pub owner: String,
    pub categories: MembershipSet,
    pub processed: bool,
    pub fact: PostFact,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    posts: Vec<StoredPost>,
    /// Commenter usernames per `(platform, source_post_id)`, main and child.
    comments: HashMap<(Platform, String), Vec<String>>,
    raw: HashMap<(Granularity, ScoreKey), RawMetrics>,
    scores: HashMap<(Granularity, ScoreKey), ComposedScore>,
    log: Vec<String>,
    fail_extraction: HashSet<i64>,
    fail_raw_upsert: HashSet<i64>,
    fail_score_upsert: HashSet<i64>,
    fail_category_listing: bool,
    fail_account_listing: HashSet<(String, Platform)>,
    per_post_comment_queries: usize,
    comment_total_queries: usize,
    next_post_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_account(
        &self,
        id: i64,
        platform: Platform,
        username: &str,
        categories: &[&str],
        followers: i64,
    ) -> Account {
        let account = Account {
            id,
            platform,
            username: username.to_string(),
            categories: categories.iter().collect(),
            client_accounts: MembershipSet::new(),
            followers,
            following: 0,
        };
        self.lock().accounts.push(account.clone());
        account
    }

    /// Adds a post created at 03:00 UTC on `day`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_post(
        &self,
        account: &Account,
        source_post_id: &str,
        day: NaiveDate,
        likes: i64,
        comments: i64,
        followers: Option<i64>,
        responsiveness: Option<f64>,
    ) -> i64 {
        let mut state = self.lock();
        state.next_post_id += 1;
        let id = state.next_post_id;
        let created_at = Utc.from_utc_datetime(&day.and_hms_opt(3, 0, 0).unwrap());
        state.posts.push(StoredPost {
            account_id: account.id,
            platform: account.platform,
            owner: account.username.clone(),
            categories: account.categories.clone(),
            processed: responsiveness.is_some(),
            fact: PostFact {
                id,
                source_post_id: source_post_id.to_string(),
                created_at,
                local_date: day,
                likes,
                comments,
                followers,
                responsiveness,
            },
        });
        id
    }

    pub fn add_comment(&self, platform: Platform, source_post_id: &str, username: &str) {
        self.lock()
            .comments
            .entry((platform, source_post_id.to_string()))
            .or_default()
            .push(username.to_string());
    }

    pub fn fail_extraction_for(&self, account_id: i64) {
        self.lock().fail_extraction.insert(account_id);
    }

    pub fn fail_raw_upsert_for(&self, account_id: i64) {
        self.lock().fail_raw_upsert.insert(account_id);
    }

    pub fn fail_score_upsert_for(&self, account_id: i64) {
        self.lock().fail_score_upsert.insert(account_id);
    }

    pub fn fail_category_listing(&self) {
        self.lock().fail_category_listing = true;
    }

    pub fn fail_account_listing_for(&self, category: &str, platform: Platform) {
        self.lock()
            .fail_account_listing
            .insert((category.to_string(), platform));
    }

    /// Replaces the category tags on a stored post.
    pub fn retag_post(&self, source_post_id: &str, categories: &[&str]) {
        let mut state = self.lock();
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.fact.source_post_id == source_post_id)
            .unwrap();
        post.categories = categories.iter().collect();
    }

    /// `(per-post count queries, aggregate total queries)` served so far.
    pub fn comment_query_counts(&self) -> (usize, usize) {
        let state = self.lock();
        (state.per_post_comment_queries, state.comment_total_queries)
    }

    pub fn raw(&self, granularity: Granularity, key: &ScoreKey) -> Option<RawMetrics> {
        self.lock().raw.get(&(granularity, key.clone())).copied()
    }

    pub fn score(&self, granularity: Granularity, key: &ScoreKey) -> Option<ComposedScore> {
        self.lock().scores.get(&(granularity, key.clone())).copied()
    }

    pub fn raw_row_count(&self) -> usize {
        self.lock().raw.len()
    }

    pub fn score_row_count(&self) -> usize {
        self.lock().scores.len()
    }

    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn account(&self, id: i64) -> Option<Account> {
        self.lock().accounts.iter().find(|a| a.id == id).cloned()
    }

    pub fn post(&self, source_post_id: &str) -> Option<StoredPost> {
        self.lock()
            .posts
            .iter()
            .find(|p| p.fact.source_post_id == source_post_id)
            .cloned()
    }

    pub fn comment_count(&self) -> usize {
        self.lock().comments.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl AccountRegistry for MemoryStore {
    async fn list_accounts(
        &self,
        category: &str,
        platform: Platform,
    ) -> Result<Vec<Account>, StoreError> {
        let state = self.lock();
        if state
            .fail_account_listing
            .contains(&(category.to_string(), platform))
        {
            return Err(StoreError::Unavailable(format!(
                "{category}/{platform} listing unavailable"
            )));
        }
        Ok(state
            .accounts
            .iter()
            .filter(|a| a.platform == platform && a.categories.contains(category))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<String>, StoreError> {
        let state = self.lock();
        if state.fail_category_listing {
            return Err(StoreError::Unavailable("registry offline".to_string()));
        }
        let mut categories: Vec<String> = state
            .accounts
            .iter()
            .flat_map(|a| a.categories.iter().map(str::to_string))
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn posts_in_window(
        &self,
        account: &Account,
        category: &str,
        window: &DateWindow,
    ) -> Result<Vec<PostFact>, StoreError> {
        let state = self.lock();
        if state.fail_extraction.contains(&account.id) {
            return Err(StoreError::Unavailable(format!(
                "posts for {} unavailable",
                account.username
            )));
        }
        Ok(state
            .posts
            .iter()
            .filter(|p| p.account_id == account.id && p.categories.contains(category))
            .filter(|p| window.contains(p.fact.local_date))
            .map(|p| p.fact.clone())
            .collect())
    }

    async fn latest_follower_snapshot(
        &self,
        account: &Account,
        category: &str,
        as_of: NaiveDate,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self
            .lock()
            .posts
            .iter()
            .filter(|p| p.account_id == account.id && p.categories.contains(category))
            .filter(|p| p.fact.local_date <= as_of)
            .filter(|p| p.fact.followers.is_some())
            .max_by_key(|p| p.fact.created_at)
            .and_then(|p| p.fact.followers))
    }

    async fn posts_for_backfill(
        &self,
        scope: &BackfillScope,
    ) -> Result<Vec<BackfillPost>, StoreError> {
        let state = self.lock();
        Ok(state
            .posts
            .iter()
            .filter(|p| p.categories.contains(scope.category()) && p.fact.comments > 0)
            .filter(|p| match scope {
                BackfillScope::Pending { since, .. } => {
                    !p.processed && p.fact.local_date > *since
                }
                BackfillScope::Window { window, .. } => window.contains(p.fact.local_date),
            })
            .map(|p| BackfillPost {
                id: p.fact.id,
                platform: p.platform,
                source_post_id: p.fact.source_post_id.clone(),
                owner_username: p.owner.clone(),
                comments: p.fact.comments,
            })
            .collect())
    }

    async fn set_post_responsiveness(
        &self,
        post_id: i64,
        responsiveness: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.fact.id == post_id)
            .ok_or_else(|| StoreError::Unavailable(format!("no post {post_id}")))?;
        post.fact.responsiveness = responsiveness;
        post.processed = true;
        state.log.push(format!("backfill post={post_id}"));
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn incoming_count(
        &self,
        platform: Platform,
        source_post_id: &str,
    ) -> Result<i64, StoreError> {
        let mut state = self.lock();
        state.per_post_comment_queries += 1;
        let n = state
            .comments
            .get(&(platform, source_post_id.to_string()))
            .map_or(0, Vec::len);
        Ok(i64::try_from(n).unwrap())
    }

    async fn own_reply_count(
        &self,
        platform: Platform,
        source_post_id: &str,
        owner_username: &str,
    ) -> Result<i64, StoreError> {
        let mut state = self.lock();
        state.per_post_comment_queries += 1;
        let n = state
            .comments
            .get(&(platform, source_post_id.to_string()))
            .map_or(0, |c| {
                c.iter()
                    .filter(|u| u.eq_ignore_ascii_case(owner_username))
                    .count()
            });
        Ok(i64::try_from(n).unwrap())
    }

    async fn comment_totals(
        &self,
        platform: Platform,
        source_post_ids: &[String],
        owner_username: &str,
    ) -> Result<CommentTotals, StoreError> {
        let mut state = self.lock();
        state.comment_total_queries += 1;
        let authors: Vec<&String> = source_post_ids
            .iter()
            .filter_map(|id| state.comments.get(&(platform, id.clone())))
            .flatten()
            .collect();
        let owner_replies = authors
            .iter()
            .filter(|u| u.eq_ignore_ascii_case(owner_username))
            .count();
        Ok(CommentTotals {
            incoming: i64::try_from(authors.len()).unwrap(),
            owner_replies: i64::try_from(owner_replies).unwrap(),
        })
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn upsert_raw_metrics(
        &self,
        granularity: Granularity,
        key: &ScoreKey,
        _username: &str,
        raw: &RawMetrics,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_raw_upsert.contains(&key.list_id) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        state.raw.insert((granularity, key.clone()), *raw);
        state
            .log
            .push(format!("raw {granularity} list_id={} {}", key.list_id, key.date));
        Ok(())
    }

    async fn upsert_scores(
        &self,
        granularity: Granularity,
        key: &ScoreKey,
        _username: &str,
        composed: &ComposedScore,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_score_upsert.contains(&key.list_id) {
            return Err(StoreError::Unavailable("score write rejected".to_string()));
        }
        state.scores.insert((granularity, key.clone()), *composed);
        state
            .log
            .push(format!("score {granularity} list_id={} {}", key.list_id, key.date));
        Ok(())
    }
}

#[async_trait]
impl IngestStore for MemoryStore {
    async fn update_profile(
        &self,
        account: &Account,
        profile: &RawProfile,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let stored = state
            .accounts
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or_else(|| StoreError::Unavailable(format!("no account {}", account.id)))?;
        stored.followers = profile.followers;
        stored.following = profile.following;
        Ok(())
    }

    async fn upsert_post(&self, account: &Account, post: &RawPost) -> Result<i64, StoreError> {
        let mut state = self.lock();
        if let Some(existing) = state
            .posts
            .iter_mut()
            .find(|p| p.platform == account.platform && p.fact.source_post_id == post.id)
        {
            existing.categories.merge(&account.categories);
            existing.fact.likes = post.likes;
            existing.fact.comments = post.comments;
            existing.fact.followers = post.followers;
            return Ok(existing.fact.id);
        }
        state.next_post_id += 1;
        let id = state.next_post_id;
        state.posts.push(StoredPost {
            account_id: account.id,
            platform: account.platform,
            owner: account.username.clone(),
            categories: account.categories.clone(),
            processed: false,
            fact: PostFact {
                id,
                source_post_id: post.id.clone(),
                created_at: post.created_at,
                local_date: post.created_at.date_naive(),
                likes: post.likes,
                comments: post.comments,
                followers: post.followers,
                responsiveness: None,
            },
        });
        Ok(id)
    }

    async fn upsert_comment(
        &self,
        platform: Platform,
        comment: &RawComment,
    ) -> Result<(), StoreError> {
        self.add_comment(platform, &comment.post_id, &comment.username);
        Ok(())
    }

    async fn upsert_child_comment(
        &self,
        platform: Platform,
        child: &RawChildComment,
    ) -> Result<(), StoreError> {
        self.add_comment(platform, &child.post_id, &child.username);
        Ok(())
    }
}
