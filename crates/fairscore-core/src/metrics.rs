use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{CoreError, MembershipSet, Platform};

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// A tracked account as the scoring pipeline sees it.
///
/// `id` is the stable `list_id` every score row points back to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub platform: Platform,
    pub username: String,
    pub categories: MembershipSet,
    pub client_accounts: MembershipSet,
    pub followers: i64,
    pub following: i64,
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Persisted score tables. The ad-hoc range path never persists and so has
/// no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    /// Position in a combined run. Monthly must finish before daily starts.
    #[must_use]
    pub fn pass_order(self) -> u8 {
        match self {
            Granularity::Monthly => 0,
            Granularity::Daily => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Granularity::Daily),
            "monthly" => Ok(Granularity::Monthly),
            _ => Err(CoreError::UnknownGranularity(s.to_string())),
        }
    }
}

/// Identity of one score row: `(list_id, date, category, platform)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreKey {
    pub list_id: i64,
    pub date: NaiveDate,
    pub category: String,
    pub platform: Platform,
}

impl ScoreKey {
    #[must_use]
    pub fn peer_group(&self) -> PeerGroupKey {
        PeerGroupKey {
            date: self.date,
            category: self.category.clone(),
            platform: self.platform,
        }
    }
}

impl std::fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "list_id={} date={} category={} platform={}",
            self.list_id, self.date, self.category, self.platform
        )
    }
}

/// Rows sharing this key are normalized against each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerGroupKey {
    pub date: NaiveDate,
    pub category: String,
    pub platform: Platform,
}

impl PeerGroupKey {
    #[must_use]
    pub fn key_for(&self, list_id: i64) -> ScoreKey {
        ScoreKey {
            list_id,
            date: self.date,
            category: self.category.clone(),
            platform: self.platform,
        }
    }
}

impl std::fmt::Display for PeerGroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.category, self.platform, self.date)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// The four scored dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Followers,
    Activities,
    Interactions,
    Responsiveness,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Followers,
        Metric::Activities,
        Metric::Interactions,
        Metric::Responsiveness,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Followers => "followers",
            Metric::Activities => "activities",
            Metric::Interactions => "interactions",
            Metric::Responsiveness => "responsiveness",
        }
    }
}

/// Raw per-account values for one bucket.
///
/// `nilai_aktifitas` is the plain post count and is stored for reporting
/// only; it never feeds a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub followers: i64,
    pub activities: f64,
    pub nilai_aktifitas: i64,
    pub interactions: f64,
    pub responsiveness: f64,
}

impl RawMetrics {
    /// Metrics for an account with no posts in the bucket.
    #[must_use]
    pub fn idle(followers: i64) -> Self {
        Self {
            followers,
            ..Self::default()
        }
    }

    /// Value of a scored dimension as a float.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Followers => self.followers as f64,
            Metric::Activities => self.activities,
            Metric::Interactions => self.interactions,
            Metric::Responsiveness => self.responsiveness,
        }
    }
}

/// Normalized scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricScores {
    pub followers: f64,
    pub activities: f64,
    pub interactions: f64,
    pub responsiveness: f64,
}

impl MetricScores {
    pub fn from_fn(mut f: impl FnMut(Metric) -> f64) -> Self {
        Self {
            followers: f(Metric::Followers),
            activities: f(Metric::Activities),
            interactions: f(Metric::Interactions),
            responsiveness: f(Metric::Responsiveness),
        }
    }

    #[must_use]
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Followers => self.followers,
            Metric::Activities => self.activities,
            Metric::Interactions => self.interactions,
            Metric::Responsiveness => self.responsiveness,
        }
    }
}

/// Per-dimension contribution: normalized score times its weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedScores {
    pub followers: f64,
    pub activities: f64,
    pub interactions: f64,
    pub responsiveness: f64,
}

impl WeightedScores {
    /// Sum of the four contributions, added in dimension order.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.followers + self.activities + self.interactions + self.responsiveness
    }
}

/// Everything the scoring pass writes back onto a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposedScore {
    pub scores: MetricScores,
    pub weighted: WeightedScores,
    pub fair_score: f64,
}

/// A fully scored row as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRowView {
    pub list_id: i64,
    pub username: String,
    pub date: NaiveDate,
    pub category: String,
    pub platform: Platform,
    pub raw: RawMetrics,
    pub scores: MetricScores,
    pub weighted: WeightedScores,
    pub fair_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ScoreKey {
        ScoreKey {
            list_id: 7,
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            category: "beauty".to_string(),
            platform: Platform::Instagram,
        }
    }

    #[test]
    fn monthly_runs_before_daily() {
        let mut passes = vec![Granularity::Daily, Granularity::Monthly];
        passes.sort_by_key(|g| g.pass_order());
        assert_eq!(passes, vec![Granularity::Monthly, Granularity::Daily]);
    }

    #[test]
    fn granularity_parse() {
        assert_eq!("Daily".parse::<Granularity>().unwrap(), Granularity::Daily);
        assert_eq!(
            "monthly".parse::<Granularity>().unwrap(),
            Granularity::Monthly
        );
        assert!("weekly".parse::<Granularity>().is_err());
    }

    #[test]
    fn peer_group_round_trip() {
        let k = key();
        let group = k.peer_group();
        assert_eq!(group.to_string(), "beauty/instagram/2025-01-15");
        assert_eq!(group.key_for(7), k);
    }

    #[test]
    fn idle_metrics_keep_followers() {
        let raw = RawMetrics::idle(1200);
        assert!((raw.value(Metric::Followers) - 1200.0).abs() < f64::EPSILON);
        for metric in [
            Metric::Activities,
            Metric::Interactions,
            Metric::Responsiveness,
        ] {
            assert!(raw.value(metric).abs() < f64::EPSILON);
        }
        assert_eq!(raw.nilai_aktifitas, 0);
    }

    #[test]
    fn scores_from_fn_fills_every_dimension() {
        let scores = MetricScores::from_fn(|m| match m {
            Metric::Followers => 0.1,
            Metric::Activities => 0.2,
            Metric::Interactions => 0.3,
            Metric::Responsiveness => 0.4,
        });
        for (metric, expected) in Metric::ALL.into_iter().zip([0.1, 0.2, 0.3, 0.4]) {
            assert!((scores.get(metric) - expected).abs() < f64::EPSILON);
        }
    }
}
