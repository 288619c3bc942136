//! FAIR score engine: metric extraction, peer normalization, weighted
//! composition, and the batch orchestration that ties them to storage.

pub mod compose;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod insights;
pub mod normalize;
pub mod orchestrator;
pub mod pg;
pub mod responsiveness;
pub mod store;

pub use compose::{compose, round2, WEIGHT_TOTAL};
pub use error::{EngineError, PeerGap};
pub use extract::{extract_metrics, Bucket};
pub use ingest::{ingest, IngestRequest, IngestSummary};
pub use insights::{peer_insight, rank_rows, PeerInsight, RankedRow};
pub use normalize::{normalize_group, NormalizedGroup};
pub use orchestrator::{BatchOptions, Orchestrator, RangeRequest, RunSummary};
pub use pg::PgStore;
pub use responsiveness::{
    backfill_responsiveness, post_responsiveness, BackfillScope, BackfillSummary,
};
pub use store::{
    AccountRegistry, BackfillPost, CommentStore, CommentTotals, FairStore, IngestStore, PostFact,
    PostStore, ScoreStore, StoreError,
};
