pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::{EngagementSource, SourceClient};
pub use error::SourceError;
pub use retry::RetryPolicy;
pub use types::{EngagementBundle, RawChildComment, RawComment, RawPost, RawProfile};
