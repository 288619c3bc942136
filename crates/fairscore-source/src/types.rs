//! Wire types for the engagement gateway.
//!
//! Counters default to zero and optional text defaults to `None` so that
//! platforms which omit a field still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the gateway knows about one account for one date window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementBundle {
    pub profile: RawProfile,
    #[serde(default)]
    pub posts: Vec<RawPost>,
    #[serde(default)]
    pub comments: Vec<RawComment>,
    #[serde(default)]
    pub child_comments: Vec<RawChildComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProfile {
    pub username: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub followers: i64,
    #[serde(default)]
    pub following: i64,
    #[serde(default)]
    pub media_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub shares: i64,
    #[serde(default)]
    pub plays: i64,
    /// Follower count at the time the post was fetched.
    #[serde(default)]
    pub followers: Option<i64>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawComment {
    pub id: String,
    pub post_id: String,
    pub username: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChildComment {
    pub id: String,
    pub comment_id: String,
    pub post_id: String,
    pub username: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
