//! Max-based peer normalization.
//!
//! Each metric is divided by its maximum within the peer group. A group whose
//! maximum for a metric is zero (or not a finite positive number) scores 0 on
//! that metric for every row.

use fairscore_core::{Metric, MetricScores, RawMetrics};

/// Scores for one peer group, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGroup {
    pub scores: Vec<MetricScores>,
    /// Metrics whose group maximum was not positive.
    pub degenerate: Vec<Metric>,
}

/// Largest finite value of `metric` across `rows`, or 0 when there is none.
#[must_use]
pub fn group_max(rows: &[RawMetrics], metric: Metric) -> f64 {
    rows.iter()
        .map(|r| r.value(metric))
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}

/// `raw / max`, clamped to `[0, 1]`; 0 when `max` is not positive or either
/// side is not finite.
#[must_use]
pub fn scale(raw: f64, max: f64) -> f64 {
    if !(max.is_finite() && max > 0.0) || !raw.is_finite() {
        return 0.0;
    }
    (raw / max).clamp(0.0, 1.0)
}

/// Normalizes every row against the group's per-metric maxima.
#[must_use]
pub fn normalize_group(rows: &[RawMetrics]) -> NormalizedGroup {
    let maxima = MetricScores::from_fn(|m| group_max(rows, m));
    let degenerate = if rows.is_empty() {
        Vec::new()
    } else {
        Metric::ALL
            .into_iter()
            .filter(|m| maxima.get(*m) <= 0.0)
            .collect()
    };

    let scores = rows
        .iter()
        .map(|row| MetricScores::from_fn(|m| scale(row.value(m), maxima.get(m))))
        .collect();

    NormalizedGroup { scores, degenerate }
}
