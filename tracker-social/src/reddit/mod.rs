//! Reddit integration: the API seam, its OAuth implementation, wire models,
//! comment-tree expansion and normalization into flat records.
pub mod api;
pub mod client;
pub mod extract;
pub mod forest;
pub mod types;

pub use api::{ApiError, RedditApi, Submissions};
pub use client::RedditClient;
pub use forest::{CommentForest, CommentNode};
