//! Raw metric extraction for one account in one time bucket.
//!
//! | metric          | Daily(D)          | MonthToDate(D)            | Range(S..E)                  |
//! |-----------------|-------------------|---------------------------|------------------------------|
//! | followers       | snapshot ≤ D      | snapshot ≤ D              | snapshot ≤ E                 |
//! | activities      | posts on D        | posts MTD / day-of-month  | posts / days in range        |
//! | nilai_aktifitas | posts on D        | posts on D                | posts in range               |
//! | interactions    | mean likes        | mean likes MTD            | mean likes in range          |
//! | responsiveness  | mean per-post     | mean per-post MTD         | own replies / comments × 100 |
//!
//! Followers fall back to the account's current count when no post carries
//! a snapshot. Every other metric is 0 for an account with no posts.

use chrono::{Datelike, NaiveDate};
use fairscore_core::{Account, DateWindow, RawMetrics};

use crate::store::{CommentStore, PostFact, PostStore, StoreError};

/// The time bucket a metric row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Daily(NaiveDate),
    MonthToDate(NaiveDate),
    Range(DateWindow),
}

impl Bucket {
    #[must_use]
    pub fn window(&self) -> DateWindow {
        match *self {
            Bucket::Daily(date) => DateWindow::single(date),
            Bucket::MonthToDate(date) => DateWindow::month_to_date(date),
            Bucket::Range(window) => window,
        }
    }

    /// Date the follower snapshot is taken at.
    #[must_use]
    pub fn as_of(&self) -> NaiveDate {
        self.window().end
    }

    /// Divisor turning a post count into a per-day rate.
    #[must_use]
    pub fn activity_days(&self) -> i64 {
        match *self {
            Bucket::Daily(_) => 1,
            Bucket::MonthToDate(date) => i64::from(date.day()),
            Bucket::Range(window) => window.days(),
        }
    }
}

/// Computes the raw metrics for `account` in `bucket`, counting only posts
/// tagged with `category`.
///
/// # Errors
///
/// Returns [`StoreError`] if any underlying fact query fails. Missing facts
/// are never an error; they produce zeros.
pub async fn extract_metrics<S>(
    store: &S,
    account: &Account,
    category: &str,
    bucket: &Bucket,
) -> Result<RawMetrics, StoreError>
where
    S: PostStore + CommentStore + ?Sized,
{
    let posts = store
        .posts_in_window(account, category, &bucket.window())
        .await?;
    let followers = store
        .latest_follower_snapshot(account, category, bucket.as_of())
        .await?
        .unwrap_or(account.followers);

    if posts.is_empty() {
        return Ok(RawMetrics::idle(followers));
    }

    let post_count = i64::try_from(posts.len()).unwrap_or(i64::MAX);
    let nilai_aktifitas = match *bucket {
        Bucket::MonthToDate(date) => count_on(&posts, date),
        Bucket::Daily(_) | Bucket::Range(_) => post_count,
    };

    let responsiveness = match bucket {
        Bucket::Daily(_) | Bucket::MonthToDate(_) => mean_post_responsiveness(&posts),
        Bucket::Range(_) => {
            let ids: Vec<String> = posts.iter().map(|p| p.source_post_id.clone()).collect();
            let totals = store
                .comment_totals(account.platform, &ids, &account.username)
                .await?;
            reply_ratio(totals.owner_replies, totals.incoming)
        }
    };

    Ok(RawMetrics {
        followers,
        activities: daily_rate(post_count, bucket.activity_days()),
        nilai_aktifitas,
        interactions: average_likes(&posts),
        responsiveness,
    })
}

fn count_on(posts: &[PostFact], date: NaiveDate) -> i64 {
    let n = posts.iter().filter(|p| p.local_date == date).count();
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Posts per day. Zero when `days` is not positive.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn daily_rate(post_count: i64, days: i64) -> f64 {
    if days <= 0 {
        return 0.0;
    }
    post_count as f64 / days as f64
}

/// Mean likes per post. Zero for an empty slice.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn average_likes(posts: &[PostFact]) -> f64 {
    if posts.is_empty() {
        return 0.0;
    }
    let total: i64 = posts.iter().map(|p| p.likes).sum();
    total as f64 / posts.len() as f64
}

/// Mean of the cached per-post responsiveness values that are present.
/// Zero when no post has one.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn mean_post_responsiveness(posts: &[PostFact]) -> f64 {
    let values: Vec<f64> = posts
        .iter()
        .filter_map(|p| p.responsiveness)
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Own replies as a percentage of incoming comments. Zero when there is
/// nothing to respond to.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn reply_ratio(replies: i64, incoming: i64) -> f64 {
    if incoming <= 0 {
        return 0.0;
    }
    replies as f64 / incoming as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn post(day: u32, likes: i64, responsiveness: Option<f64>) -> PostFact {
        PostFact {
            id: i64::from(day),
            source_post_id: format!("P{day}"),
            created_at: Utc.with_ymd_and_hms(2025, 1, day, 3, 0, 0).unwrap(),
            local_date: d(day),
            likes,
            comments: 0,
            followers: None,
            responsiveness,
        }
    }

    #[test]
    fn bucket_windows() {
        assert_eq!(Bucket::Daily(d(15)).window(), DateWindow::single(d(15)));
        assert_eq!(Bucket::MonthToDate(d(15)).window().start, d(1));
        assert_eq!(Bucket::MonthToDate(d(15)).activity_days(), 15);
        let range = DateWindow::new(d(10), d(19)).unwrap();
        assert_eq!(Bucket::Range(range).activity_days(), 10);
        assert_eq!(Bucket::Range(range).as_of(), d(19));
    }

    #[test]
    fn average_likes_divides_by_post_count() {
        let posts = vec![post(1, 30, None), post(2, 70, None)];
        assert!((average_likes(&posts) - 50.0).abs() < f64::EPSILON);
        assert!(average_likes(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_responsiveness_ignores_missing_values() {
        let posts = vec![post(1, 0, Some(20.0)), post(2, 0, None), post(3, 0, Some(40.0))];
        assert!((mean_post_responsiveness(&posts) - 30.0).abs() < f64::EPSILON);
        assert!(mean_post_responsiveness(&[post(1, 0, None)]).abs() < f64::EPSILON);
    }

    #[test]
    fn reply_ratio_guards_zero_incoming() {
        assert!(reply_ratio(0, 0).abs() < f64::EPSILON);
        assert!((reply_ratio(1, 4) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn daily_rate_guards_zero_days() {
        assert!(daily_rate(3, 0).abs() < f64::EPSILON);
        assert!((daily_rate(3, 15) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn count_on_matches_local_date_only() {
        let posts = vec![post(14, 0, None), post(15, 0, None), post(15, 0, None)];
        assert_eq!(count_on(&posts, d(15)), 2);
        assert_eq!(count_on(&posts, d(13)), 0);
    }
}
