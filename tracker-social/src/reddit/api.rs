//! The remote collaborator seam.
//!
//! [`RedditApi`] is everything the collector needs from Reddit. The HTTP
//! implementation lives in [`super::client`]; tests substitute in-memory ones.
use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use tracker_http::HttpError;

use super::forest::CommentForest;
use super::types::{Identity, MoreChildren, Submission, Thing};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("Reddit rejected the request: {0}")]
    Remote(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// HTTP status code, when the failure was an HTTP error response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Submissions<'a> = BoxStream<'a, Result<Submission, ApiError>>;

#[async_trait]
pub trait RedditApi: Send + Sync {
    /// Authenticated identity check; fails when the credentials are rejected.
    async fn identity(&self) -> Result<Identity, ApiError>;

    /// Top posts of `subreddit` within `time_filter`, in rank order, at most `limit`.
    fn top(&self, subreddit: &str, time_filter: &str, limit: usize) -> Submissions<'_>;

    /// Search within `subreddit` (`all` for the whole site), in relevance order.
    fn search(
        &self,
        subreddit: &str,
        query: &str,
        time_filter: &str,
        limit: usize,
    ) -> Submissions<'_>;

    /// Comment tree of a post, placeholders included.
    async fn comment_forest(&self, post_id: &str) -> Result<CommentForest, ApiError>;

    /// Load what a placeholder stands for. Returned things carry their `parent_id`
    /// and may contain further placeholders.
    async fn expand_more(&self, link_id: &str, more: &MoreChildren)
    -> Result<Vec<Thing>, ApiError>;
}
