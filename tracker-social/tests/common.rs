#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use tracker_social::reddit::types::{Identity, MoreChildren, RawComment, Submission, Thing};
use tracker_social::reddit::{ApiError, CommentForest, RedditApi, Submissions};
use tracker_common::observability::{LogConfig, LogFormat, init_logging};
use tracker_social::{CollectError, CollectObserver, Operation, Pacer};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

/// Route test logs to a temp directory; `TRACKER_LOG_FORMAT=json` switches the format.
pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "tracker-tests",
            log_dir: Some(std::env::temp_dir().join("tracker-tests")),
            format: if std::env::var("TRACKER_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".into(),
            ..LogConfig::default()
        };

        init_logging(config).unwrap_or_default()
    });
}

/// In-memory Reddit. Listings ignore `limit` so the collector's own cap is what gets tested.
#[derive(Default)]
pub struct MockReddit {
    pub posts: Vec<Submission>,
    /// Fail the listing after this many posts.
    pub fail_after: Option<usize>,
    pub reject_identity: bool,
    pub comments: Vec<Thing>,
    pub fail_comments: bool,
    /// Placeholder id -> things it expands to.
    pub expansions: HashMap<String, Vec<Thing>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockReddit {
    pub fn with_posts(posts: Vec<Submission>) -> Self {
        Self {
            posts,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn listing(&self) -> Submissions<'_> {
        let mut items: Vec<Result<Submission, ApiError>> = Vec::new();
        for (i, post) in self.posts.iter().enumerate() {
            if self.fail_after == Some(i) {
                items.push(Err(ApiError::Remote("listing broke".into())));
                break;
            }
            items.push(Ok(post.clone()));
        }
        futures::stream::iter(items).boxed()
    }
}

#[async_trait]
impl RedditApi for MockReddit {
    async fn identity(&self) -> Result<Identity, ApiError> {
        self.record("identity".into());
        if self.reject_identity {
            return Err(ApiError::Auth("invalid_grant".into()));
        }
        Ok(Identity {
            name: Some("tester".into()),
            id: Some("u1".into()),
        })
    }

    fn top(&self, subreddit: &str, time_filter: &str, limit: usize) -> Submissions<'_> {
        self.record(format!("top:{subreddit}:{time_filter}:{limit}"));
        self.listing()
    }

    fn search(
        &self,
        subreddit: &str,
        query: &str,
        time_filter: &str,
        limit: usize,
    ) -> Submissions<'_> {
        self.record(format!("search:{subreddit}:{query}:{time_filter}:{limit}"));
        self.listing()
    }

    async fn comment_forest(&self, post_id: &str) -> Result<CommentForest, ApiError> {
        self.record(format!("comments:{post_id}"));
        if self.fail_comments {
            return Err(ApiError::Unexpected("post not found".into()));
        }
        Ok(CommentForest::new(post_id, self.comments.clone()))
    }

    async fn expand_more(&self, link_id: &str, more: &MoreChildren) -> Result<Vec<Thing>, ApiError> {
        self.record(format!("more:{link_id}:{}", more.id));
        Ok(self.expansions.get(&more.id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct CountingPacer {
    waits: AtomicUsize,
}

impl CountingPacer {
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn wait_before_next_item(&self) {
        self.waits.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn failures(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with("failed:"))
            .count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl CollectObserver for RecordingObserver {
    fn connected(&self, identity: &Identity) {
        self.push(format!("connected:{}", identity.display_name()));
    }

    fn connection_failed(&self, _error: &CollectError) {
        self.push("connection_failed".into());
    }

    fn started(&self, op: &Operation) {
        self.push(format!("started:{}", op.kind()));
    }

    fn collected(&self, op: &Operation, count: usize) {
        self.push(format!("collected:{}:{count}", op.kind()));
    }

    fn failed(&self, op: &Operation, _error: &CollectError) {
        self.push(format!("failed:{}", op.kind()));
    }
}

pub fn submission(id: &str, subreddit: &str) -> Submission {
    Submission {
        id: id.into(),
        title: format!("Post {id}"),
        selftext: String::new(),
        author: Some(format!("author_{id}")),
        subreddit: subreddit.into(),
        score: 10,
        upvote_ratio: Some(0.9),
        num_comments: 3,
        created_utc: 1_700_000_000.0,
        url: format!("https://www.reddit.com/r/{subreddit}/comments/{id}/"),
        is_self: true,
    }
}

pub fn comment(id: &str, parent: &str, post: &str) -> Thing {
    Thing::Comment(Box::new(RawComment {
        id: id.into(),
        name: Some(format!("t1_{id}")),
        body: format!("comment {id}"),
        author: Some("commenter".into()),
        subreddit: "Python".into(),
        score: 1,
        created_utc: 1_700_000_100.0,
        parent_id: parent.into(),
        link_id: format!("t3_{post}"),
        is_submitter: false,
        replies: Vec::new(),
    }))
}

pub fn more(id: &str, parent: &str, children: &[&str]) -> Thing {
    Thing::More(MoreChildren {
        id: id.into(),
        count: children.len() as u64,
        parent_id: parent.into(),
        depth: 0,
        children: children.iter().map(|c| c.to_string()).collect(),
    })
}
