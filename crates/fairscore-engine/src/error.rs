use fairscore_core::Metric;
use fairscore_source::SourceError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while computing scores.
///
/// Only [`EngineError::Configuration`] escapes a batch run. The other
/// variants describe a single failed unit of work; the orchestrator logs
/// them with the unit's key, counts them, and moves on.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid run configuration: {0}")]
    Configuration(String),

    #[error("failed to read facts for {context}: {source}")]
    UpstreamFetch {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("data source request for {context} failed: {source}")]
    Source {
        context: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to persist {context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("peer group {group} has {gap}")]
    MissingPeerData { group: String, gap: PeerGap },
}

/// What a peer group lacked when it reached normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerGap {
    /// No rows at all: no tracked accounts, or every one of them failed.
    NoRows,
    /// Every row had zero for this metric, so all of them score zero on it.
    ZeroMaximum(Metric),
}

impl std::fmt::Display for PeerGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerGap::NoRows => f.write_str("no rows to normalize"),
            PeerGap::ZeroMaximum(metric) => {
                write!(f, "no positive maximum for {}", metric.as_str())
            }
        }
    }
}

impl EngineError {
    pub(crate) fn upstream(context: impl Into<String>, source: StoreError) -> Self {
        Self::UpstreamFetch {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn fetch(context: impl Into<String>, source: SourceError) -> Self {
        Self::Source {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn persistence(context: impl Into<String>, source: StoreError) -> Self {
        Self::Persistence {
            context: context.into(),
            source,
        }
    }
}
