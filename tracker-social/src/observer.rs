//! Progress reporting for collection runs.
//!
//! The collector never logs directly; it reports to a [`CollectObserver`].
//! [`TracingObserver`] turns those reports into `tracing` events carrying a
//! human-readable message plus structured fields.
use std::fmt;

use crate::error::CollectError;
use crate::reddit::types::Identity;

/// One collector call, with the arguments it was made with.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    TopPosts {
        subreddit: String,
        time_filter: String,
        limit: usize,
    },
    Comments {
        post_id: String,
        limit: usize,
    },
    Search {
        query: String,
        /// `None` searches all of Reddit.
        subreddit: Option<String>,
        time_filter: String,
        limit: usize,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::TopPosts { .. } => "top_posts",
            Operation::Comments { .. } => "comments",
            Operation::Search { .. } => "search",
        }
    }

    pub fn limit(&self) -> usize {
        match self {
            Operation::TopPosts { limit, .. }
            | Operation::Comments { limit, .. }
            | Operation::Search { limit, .. } => *limit,
        }
    }

    pub fn started_line(&self) -> String {
        match self {
            Operation::TopPosts { subreddit, .. } => format!("Collecting posts from r/{subreddit}"),
            Operation::Comments { post_id, .. } => format!("Collecting comments from post {post_id}"),
            Operation::Search {
                query,
                subreddit: Some(subreddit),
                ..
            } => format!("Searching r/{subreddit} for: {query}"),
            Operation::Search { query, .. } => format!("Searching all of Reddit for: {query}"),
        }
    }

    pub fn collected_line(&self, count: usize) -> String {
        match self {
            Operation::TopPosts { subreddit, .. } => {
                format!("Collected {count} posts from r/{subreddit}")
            }
            Operation::Comments { post_id, .. } => {
                format!("Collected {count} comments from post {post_id}")
            }
            Operation::Search { query, .. } => format!("Found {count} posts matching: {query}"),
        }
    }

    pub fn failed_line(&self, error: &dyn fmt::Display) -> String {
        match self {
            Operation::TopPosts { subreddit, .. } => {
                format!("Error collecting posts from r/{subreddit}: {error}")
            }
            Operation::Comments { post_id, .. } => {
                format!("Error collecting comments from post {post_id}: {error}")
            }
            Operation::Search { query, .. } => format!("Error searching for: {query} - {error}"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::TopPosts {
                subreddit,
                time_filter,
                limit,
            } => write!(f, "top r/{subreddit} t={time_filter} limit={limit}"),
            Operation::Comments { post_id, limit } => write!(f, "comments {post_id} limit={limit}"),
            Operation::Search {
                query,
                subreddit,
                time_filter,
                limit,
            } => write!(
                f,
                "search r/{} q={query:?} t={time_filter} limit={limit}",
                subreddit.as_deref().unwrap_or("all")
            ),
        }
    }
}

pub trait CollectObserver: Send + Sync {
    fn connected(&self, _identity: &Identity) {}

    fn connection_failed(&self, _error: &CollectError) {}

    fn started(&self, op: &Operation);

    fn collected(&self, op: &Operation, count: usize);

    /// Called exactly once per failed operation.
    fn failed(&self, op: &Operation, error: &CollectError);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CollectObserver for TracingObserver {
    fn connected(&self, identity: &Identity) {
        tracing::info!(user = identity.display_name(), "Connected to Reddit");
    }

    fn connection_failed(&self, error: &CollectError) {
        tracing::error!(error = %error, "Failed to connect to Reddit");
    }

    fn started(&self, op: &Operation) {
        tracing::info!(op = op.kind(), limit = op.limit(), "{}", op.started_line());
    }

    fn collected(&self, op: &Operation, count: usize) {
        tracing::info!(op = op.kind(), count, "{}", op.collected_line(count));
    }

    fn failed(&self, op: &Operation, error: &CollectError) {
        tracing::error!(
            op = op.kind(),
            status = error.api_error().status_code(),
            "{}",
            op.failed_line(error.api_error())
        );
    }
}
