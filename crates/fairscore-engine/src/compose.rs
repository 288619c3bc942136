//! Weighted FAIR score composition.
//!
//! `fair = (followers×2 + activities×2 + interactions×3 + responsiveness×1) / 8 × 100`

use fairscore_core::{ComposedScore, Metric, MetricScores, WeightedScores};

pub const FOLLOWERS_WEIGHT: u32 = 2;
pub const ACTIVITIES_WEIGHT: u32 = 2;
pub const INTERACTIONS_WEIGHT: u32 = 3;
pub const RESPONSIVENESS_WEIGHT: u32 = 1;
pub const WEIGHT_TOTAL: u32 = 8;

const _: () = assert!(
    FOLLOWERS_WEIGHT + ACTIVITIES_WEIGHT + INTERACTIONS_WEIGHT + RESPONSIVENESS_WEIGHT
        == WEIGHT_TOTAL,
    "FAIR weights must sum to WEIGHT_TOTAL"
);

#[must_use]
pub fn weight(metric: Metric) -> f64 {
    let w = match metric {
        Metric::Followers => FOLLOWERS_WEIGHT,
        Metric::Activities => ACTIVITIES_WEIGHT,
        Metric::Interactions => INTERACTIONS_WEIGHT,
        Metric::Responsiveness => RESPONSIVENESS_WEIGHT,
    };
    f64::from(w)
}

/// Applies the fixed weights and produces the final 0–100 score at full
/// precision.
#[must_use]
pub fn compose(scores: &MetricScores) -> ComposedScore {
    let weighted = WeightedScores {
        followers: scores.followers * weight(Metric::Followers),
        activities: scores.activities * weight(Metric::Activities),
        interactions: scores.interactions * weight(Metric::Interactions),
        responsiveness: scores.responsiveness * weight(Metric::Responsiveness),
    };
    let fair_score = weighted.total() / f64::from(WEIGHT_TOTAL) * 100.0;

    ComposedScore {
        scores: *scores,
        weighted,
        fair_score,
    }
}

/// Rounds half away from zero to two decimals, for display.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worked_example_scores_53_4375() {
        let scores = MetricScores {
            followers: 0.5,
            activities: 0.5,
            interactions: 0.625,
            responsiveness: 0.4,
        };
        let composed = compose(&scores);
        assert!((composed.weighted.followers - 1.0).abs() < 1e-12);
        assert!((composed.weighted.activities - 1.0).abs() < 1e-12);
        assert!((composed.weighted.interactions - 1.875).abs() < 1e-12);
        assert!((composed.weighted.responsiveness - 0.4).abs() < 1e-12);
        assert!((composed.fair_score - 53.4375).abs() < 1e-9);
    }

    #[test]
    fn fair_score_equals_weighted_formula_exactly() {
        let scores = MetricScores {
            followers: 0.123,
            activities: 0.987,
            interactions: 0.5,
            responsiveness: 0.333,
        };
        let composed = compose(&scores);
        let expected = (scores.followers * 2.0
            + scores.activities * 2.0
            + scores.interactions * 3.0
            + scores.responsiveness * 1.0)
            / 8.0
            * 100.0;
        assert_eq!(composed.fair_score.to_bits(), expected.to_bits());
    }

    #[test]
    fn perfect_and_empty_scores() {
        let all_one = MetricScores::from_fn(|_| 1.0);
        assert!((compose(&all_one).fair_score - 100.0).abs() < 1e-12);
        let all_zero = MetricScores::default();
        assert!(compose(&all_zero).fair_score.abs() < f64::EPSILON);
    }

    #[test]
    fn round2_matches_display_precision() {
        assert!((round2(53.4375) - 53.44).abs() < 1e-12);
        assert!((round2(12.344) - 12.34).abs() < 1e-12);
        assert!((round2(0.0) - 0.0).abs() < f64::EPSILON);
    }
}
