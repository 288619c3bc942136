use fairscore_core::ScoreRowView;
use serde::Serialize;

/// Number of leaders always included in a peer insight.
pub const INSIGHT_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    pub rank: usize,
    #[serde(flatten)]
    pub row: ScoreRowView,
}

/// Orders rows by `fair_score` descending, ties broken by username, and
/// numbers them from 1.
#[must_use]
pub fn rank_rows(mut rows: Vec<ScoreRowView>) -> Vec<RankedRow> {
    rows.sort_by(|a, b| {
        b.fair_score
            .total_cmp(&a.fair_score)
            .then_with(|| a.username.cmp(&b.username))
    });
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RankedRow { rank: i + 1, row })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerInsight {
    pub rows: Vec<RankedRow>,
    /// Whether the requested account appears in the ranking at all.
    pub found: bool,
}

/// The top three plus `username` when it ranks below them.
#[must_use]
pub fn peer_insight(ranked: &[RankedRow], username: &str) -> PeerInsight {
    let wanted = username.trim().trim_start_matches('@');
    let mut rows: Vec<RankedRow> = ranked.iter().take(INSIGHT_TOP_N).cloned().collect();

    let position = ranked
        .iter()
        .position(|r| r.row.username.eq_ignore_ascii_case(wanted));

    if let Some(idx) = position {
        if idx >= INSIGHT_TOP_N {
            rows.push(ranked[idx].clone());
        }
    }

    PeerInsight {
        rows,
        found: position.is_some(),
    }
}
