//! The collector: bounded, paced fetches of posts and comments.
//!
//! Each operation reports `started`, then either `collected` or `failed`
//! (exactly once) to the observer. The plain operations turn a failure into an
//! empty result; the `try_*` variants hand the error back instead. Nothing
//! collected before a failure is kept.
use std::sync::Arc;

use futures::StreamExt;
use tracker_config::{CollectorConfig, RedditConfig};

use crate::error::CollectError;
use crate::observer::{CollectObserver, Operation, TracingObserver};
use crate::pacing::{FixedDelay, Pacer};
use crate::reddit::extract::{comment_from_raw, post_from_submission};
use crate::reddit::types::Identity;
use crate::reddit::{ApiError, RedditApi, RedditClient, Submissions};
use crate::records::{Comment, Post};

pub const DEFAULT_LIMIT: usize = 100;
pub const DEFAULT_TOP_TIME_FILTER: &str = "day";
pub const DEFAULT_SEARCH_TIME_FILTER: &str = "week";
/// Community searched when no subreddit is given.
pub const ALL_SUBREDDITS: &str = "all";

pub struct Collector {
    api: Arc<dyn RedditApi>,
    pacer: Arc<dyn Pacer>,
    observer: Arc<dyn CollectObserver>,
    identity: Identity,
}

impl Collector {
    /// Authenticate against Reddit and verify the credentials with one identity check.
    pub async fn connect(
        reddit: &RedditConfig,
        collector: &CollectorConfig,
    ) -> Result<Self, CollectError> {
        let observer: Arc<dyn CollectObserver> = Arc::new(TracingObserver);
        let api = match RedditClient::authenticate(reddit).await {
            Ok(api) => api,
            Err(e) => {
                let err = CollectError::Connect(e);
                observer.connection_failed(&err);
                return Err(err);
            }
        };
        Self::with_api(
            Arc::new(api),
            Arc::new(FixedDelay::from_config(collector)),
            observer,
        )
        .await
    }

    /// Build on an existing API handle. The identity check still runs.
    pub async fn with_api(
        api: Arc<dyn RedditApi>,
        pacer: Arc<dyn Pacer>,
        observer: Arc<dyn CollectObserver>,
    ) -> Result<Self, CollectError> {
        match api.identity().await {
            Ok(identity) => {
                observer.connected(&identity);
                Ok(Self {
                    api,
                    pacer,
                    observer,
                    identity,
                })
            }
            Err(e) => {
                let err = CollectError::Connect(e);
                observer.connection_failed(&err);
                Err(err)
            }
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Top posts of `subreddit` for `time_filter`, in rank order. Empty on failure.
    pub async fn fetch_top_posts(&self, subreddit: &str, limit: usize, time_filter: &str) -> Vec<Post> {
        self.try_fetch_top_posts(subreddit, limit, time_filter)
            .await
            .unwrap_or_default()
    }

    pub async fn try_fetch_top_posts(
        &self,
        subreddit: &str,
        limit: usize,
        time_filter: &str,
    ) -> Result<Vec<Post>, CollectError> {
        let op = Operation::TopPosts {
            subreddit: subreddit.to_string(),
            time_filter: time_filter.to_string(),
            limit,
        };
        self.observer.started(&op);
        let result = self
            .drain(self.api.top(subreddit, time_filter, limit), limit)
            .await;
        self.finish(&op, result)
    }

    /// Comments of a post, breadth first, with every collapsed branch loaded
    /// before the first record is counted. Empty on failure.
    pub async fn fetch_comments(&self, post_id: &str, limit: usize) -> Vec<Comment> {
        self.try_fetch_comments(post_id, limit)
            .await
            .unwrap_or_default()
    }

    pub async fn try_fetch_comments(
        &self,
        post_id: &str,
        limit: usize,
    ) -> Result<Vec<Comment>, CollectError> {
        let op = Operation::Comments {
            post_id: post_id.to_string(),
            limit,
        };
        self.observer.started(&op);
        let result = self.collect_comments(post_id, limit).await;
        self.finish(&op, result)
    }

    /// Relevance-ordered search, across all of Reddit when `subreddit` is `None`.
    /// Empty on failure.
    pub async fn search_posts(
        &self,
        query: &str,
        subreddit: Option<&str>,
        limit: usize,
        time_filter: &str,
    ) -> Vec<Post> {
        self.try_search_posts(query, subreddit, limit, time_filter)
            .await
            .unwrap_or_default()
    }

    pub async fn try_search_posts(
        &self,
        query: &str,
        subreddit: Option<&str>,
        limit: usize,
        time_filter: &str,
    ) -> Result<Vec<Post>, CollectError> {
        let op = Operation::Search {
            query: query.to_string(),
            subreddit: subreddit.map(str::to_string),
            time_filter: time_filter.to_string(),
            limit,
        };
        self.observer.started(&op);
        let scope = subreddit.unwrap_or(ALL_SUBREDDITS);
        let result = self
            .drain(self.api.search(scope, query, time_filter, limit), limit)
            .await;
        self.finish(&op, result)
    }

    async fn drain(&self, mut items: Submissions<'_>, limit: usize) -> Result<Vec<Post>, ApiError> {
        let mut posts = Vec::new();
        while posts.len() < limit {
            let Some(next) = items.next().await else {
                break;
            };
            posts.push(post_from_submission(next?));
            self.pacer.wait_before_next_item().await;
        }
        Ok(posts)
    }

    async fn collect_comments(&self, post_id: &str, limit: usize) -> Result<Vec<Comment>, ApiError> {
        let mut forest = self.api.comment_forest(post_id).await?;
        let placeholders = forest.placeholder_count();
        let expansions = forest.replace_more(self.api.as_ref()).await?;
        tracing::debug!(post_id, placeholders, expansions, "reddit.comments.expanded");

        let mut comments = Vec::new();
        for raw in forest.flatten().into_iter().take(limit) {
            comments.push(comment_from_raw(raw, post_id));
            self.pacer.wait_before_next_item().await;
        }
        Ok(comments)
    }

    fn finish<T>(&self, op: &Operation, result: Result<Vec<T>, ApiError>) -> Result<Vec<T>, CollectError> {
        match result {
            Ok(items) => {
                self.observer.collected(op, items.len());
                Ok(items)
            }
            Err(source) => {
                let err = CollectError::Remote {
                    operation: op.kind(),
                    source,
                };
                self.observer.failed(op, &err);
                Err(err)
            }
        }
    }
}
